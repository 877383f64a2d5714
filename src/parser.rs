//! A recursive descent parser for the Schemata notation.
//!
//! The parser owns the source text and a [`NamedSource`] handle for
//! diagnostics; scan position lives in a [`Marker`] threaded through every
//! routine. Productions that may legitimately be absent return
//! `Ok(None)` without advancing past the point of divergence; productions
//! that are committed raise a [`ParserError`] naming the offset at which
//! the expectation failed.
//!
//! One ambiguity runs through the whole grammar: in content position, a
//! bare reference cannot be told apart from a data type reference until
//! all structures are known. The parser always produces an
//! [`ElementUsageReference`] there and leaves the reclassification to the
//! post-processing passes.

use std::collections::HashSet;
use std::sync::Arc;

use miette::{NamedSource, SourceSpan};

use crate::error::ParserError;
use crate::model::{
    ArrayStructure, AttributeStructure, AttributeUsage, AttributeUsageReference,
    AttributeValueType, ContentModel, DataStructure, ElementStructure, ElementUsageReference,
    ListFunction, ObjectStructure, PropertyStructure, PropertyUsage, PropertyUsageReference,
    Scalar, Structure, StructureList, StructureListKind, StructureMetadata,
};
use crate::scan::{self, ComparisonOp, Marker, ScanError};
use crate::utils;

/// The fixed set of property names a structure body may contain.
const PROPERTY_NAMES: [&str; 14] = [
    "baseType",
    "tagName",
    "allowedPattern",
    "allowedValues",
    "minimumValue",
    "maximumValue",
    "defaultValue",
    "valueType",
    "attributes",
    "allowedContent",
    "itemType",
    "properties",
    "isSelfClosing",
    "lineBreaks",
];

/// An `import "path";` statement, with its span for diagnostics raised
/// during resolution.
#[derive(Debug, Clone)]
pub struct ImportStatement {
    pub path: String,
    pub span: SourceSpan,
}

/// A parsed `(name, value)` property pair. The name dictates which variant
/// the value takes; structure builders match on both and ignore pairs that
/// do not apply to their structure kind.
#[derive(Debug, Clone)]
enum PropertyValue {
    Reference(String),
    Str(String),
    Integer(i64),
    Bool(bool),
    Scalar(Scalar),
    Scalars(Vec<Scalar>),
    Integers(Vec<i64>),
    ValueType(AttributeValueType),
    AttributeUsages(Vec<AttributeUsage>),
    PropertyUsages(Vec<PropertyUsage>),
    Content(ContentModel),
}

/// The uniform interior of a structure definition: reference, optional
/// metadata comment, property pairs.
struct ParsedBody {
    reference: String,
    ref_span: SourceSpan,
    metadata: StructureMetadata,
    properties: Vec<(String, PropertyValue)>,
}

#[derive(Debug)]
pub struct Parser<'a> {
    source: Arc<NamedSource<String>>,
    text: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::new_with_name(text, "source.schema".to_string())
    }

    pub fn new_with_name(text: &'a str, name: String) -> Self {
        Self {
            source: Arc::new(NamedSource::new(name, text.to_string())),
            text,
        }
    }

    pub fn source(&self) -> Arc<NamedSource<String>> {
        Arc::clone(&self.source)
    }

    // === Entry points, in the order a schema file is consumed ===

    /// Consumes leading whitespace and the optional header comment, and
    /// extracts the `Format Name:` annotation from it if present.
    pub fn parse_format_name(&self, marker: &mut Marker) -> Result<Option<String>, ParserError> {
        self.ws(marker);
        Ok(self
            .comment(marker)?
            .as_deref()
            .and_then(utils::extract_format_name))
    }

    /// Consumes the run of `import "path";`-style statements following the
    /// header. Resolution of the paths is the loader's job.
    pub fn parse_import_statements(
        &self,
        marker: &mut Marker,
    ) -> Result<Vec<ImportStatement>, ParserError> {
        let mut imports = Vec::new();

        loop {
            self.ws(marker);
            let start = marker.position;

            if !self.eat(marker, "import") {
                break;
            }

            self.ws(marker);
            let path_at = marker.position;

            match self.string(marker)? {
                Some(path) if !path.is_empty() => {
                    log::debug!("Found import statement for '{path}'.");
                    imports.push(ImportStatement {
                        path,
                        span: (start, marker.position - start).into(),
                    });
                }
                _ => return Err(self.err_expected(path_at, "a path string")),
            }

            self.ws(marker);
            if !self.eat(marker, ";") {
                return Err(self.err_expected(marker.position, "';'"));
            }
        }

        Ok(imports)
    }

    /// Consumes structure definitions until end of input. Anything that is
    /// neither whitespace, a comment, nor a structure definition is an
    /// error, as is a reference already defined in this file.
    pub fn parse_structures(&self, marker: &mut Marker) -> Result<Vec<Structure>, ParserError> {
        let mut structures: Vec<Structure> = Vec::new();
        let mut references: HashSet<String> = HashSet::new();

        loop {
            // Whitespace and comments are free between definitions.
            loop {
                let before = marker.position;
                self.ws(marker);
                self.comment(marker)?;
                if marker.position == before {
                    break;
                }
            }

            if marker.position >= self.text.len() {
                break;
            }

            let at = marker.position;

            match self.parse_structure(marker)? {
                Some((structure, ref_span)) => {
                    if !references.insert(structure.reference().to_string()) {
                        return Err(ParserError::DuplicateReference {
                            src: (*self.source).clone(),
                            span: ref_span,
                            reference: structure.reference().to_string(),
                        });
                    }

                    log::debug!("Found structure '{}'.", structure.reference());
                    structures.push(structure);
                }
                None => return Err(self.err_expected(at, "a structure definition")),
            }
        }

        log::debug!("Found {} structures.", structures.len());

        Ok(structures)
    }

    // === Structure definitions ===

    fn parse_structure(
        &self,
        marker: &mut Marker,
    ) -> Result<Option<(Structure, SourceSpan)>, ParserError> {
        self.ws(marker);

        if self.eat(marker, "dataType") {
            let body = self.parse_structure_body(marker)?;
            let span = body.ref_span;
            return Ok(Some((build_data_structure(body), span)));
        }

        if self.eat(marker, "attribute") {
            let body = self.parse_structure_body(marker)?;
            let span = body.ref_span;
            return Ok(Some((build_attribute_structure(body), span)));
        }

        if self.eat(marker, "root") {
            self.ws(marker);

            if self.eat(marker, "element") {
                let body = self.parse_structure_body(marker)?;
                let span = body.ref_span;
                return Ok(Some((build_element_structure(body, true), span)));
            }

            if self.eat(marker, "object") {
                let body = self.parse_structure_body(marker)?;
                let span = body.ref_span;
                return Ok(Some((build_object_structure(body, true), span)));
            }

            return Err(self.err_expected(marker.position, "'element' or 'object'"));
        }

        if self.eat(marker, "element") {
            let body = self.parse_structure_body(marker)?;
            let span = body.ref_span;
            return Ok(Some((build_element_structure(body, false), span)));
        }

        if self.eat(marker, "property") {
            let body = self.parse_structure_body(marker)?;
            let span = body.ref_span;
            return Ok(Some((build_property_structure(body), span)));
        }

        if self.eat(marker, "array") {
            let body = self.parse_structure_body(marker)?;
            let span = body.ref_span;
            return Ok(Some((build_array_structure(body), span)));
        }

        if self.eat(marker, "object") {
            let body = self.parse_structure_body(marker)?;
            let span = body.ref_span;
            return Ok(Some((build_object_structure(body, false), span)));
        }

        Ok(None)
    }

    /// `<reference> { <comment>? <property>* }` — the shape every structure
    /// kind shares after its keyword.
    fn parse_structure_body(&self, marker: &mut Marker) -> Result<ParsedBody, ParserError> {
        self.ws(marker);

        let ref_at = marker.position;
        let reference = scan::scan_reference(self.text, marker)
            .ok_or_else(|| self.err_expected(ref_at, "a reference"))?
            .to_string();
        let ref_span: SourceSpan = (ref_at, reference.len()).into();

        self.ws(marker);
        if !self.eat(marker, "{") {
            return Err(self.err_expected(marker.position, "'{'"));
        }

        self.ws(marker);
        let metadata = self
            .comment(marker)?
            .map(|c| utils::extract_metadata(&c))
            .unwrap_or_default();
        self.ws(marker);

        let mut properties = Vec::new();

        while marker.position < self.text.len() {
            match self.parse_property(marker)? {
                Some(property) => properties.push(property),
                None => break,
            }
        }

        self.ws(marker);
        if !self.eat(marker, "}") {
            return Err(self.err_expected(marker.position, "'}'"));
        }

        Ok(ParsedBody {
            reference,
            ref_span,
            metadata,
            properties,
        })
    }

    // === Properties ===

    /// Parses one `name: value;` pair. A missing name, or a recognized name
    /// not followed by a colon, ends the property list without error; an
    /// unrecognized name and a wrong value type are hard errors.
    fn parse_property(
        &self,
        marker: &mut Marker,
    ) -> Result<Option<(String, PropertyValue)>, ParserError> {
        self.ws(marker);

        let name_at = marker.position;
        let Some(name) = scan::scan_property_name(self.text, marker) else {
            return Ok(None);
        };
        let name = name.to_string();

        if !PROPERTY_NAMES.contains(&name.as_str()) {
            return Err(ParserError::InvalidPropertyName {
                src: (*self.source).clone(),
                span: (name_at, name.len()).into(),
                name,
            });
        }

        self.ws(marker);
        if !self.eat(marker, ":") {
            return Ok(None);
        }

        self.ws(marker);
        let value_at = marker.position;

        let value = match name.as_str() {
            "baseType" | "itemType" => match scan::scan_reference(self.text, marker) {
                Some(reference) => PropertyValue::Reference(reference.to_string()),
                None => return Err(self.err_value(value_at, &name, "a reference")),
            },
            "tagName" | "allowedPattern" => match self.string(marker)? {
                Some(s) => PropertyValue::Str(s),
                None => return Err(self.err_value(value_at, &name, "a string")),
            },
            "allowedValues" => {
                match self.parse_comma_list(marker, |p, m| p.parse_scalar_item(m))? {
                    Some(values) => PropertyValue::Scalars(values),
                    None => return Err(self.err_value(value_at, &name, "a list of values")),
                }
            }
            "minimumValue" | "maximumValue" => match scan::scan_integer(self.text, marker) {
                Some(value) => PropertyValue::Integer(value),
                None => return Err(self.err_value(value_at, &name, "an integer")),
            },
            "defaultValue" => match self.parse_scalar_with_booleans(marker)? {
                Some(value) => PropertyValue::Scalar(value),
                None => {
                    return Err(self.err_value(value_at, &name, "a string, integer, or boolean"))
                }
            },
            "valueType" => {
                if let Some(function) = self.parse_list_function(marker)? {
                    PropertyValue::ValueType(AttributeValueType::List(function))
                } else {
                    match scan::scan_reference(self.text, marker) {
                        Some(reference) => PropertyValue::ValueType(AttributeValueType::Reference(
                            reference.to_string(),
                        )),
                        None => return Err(self.err_value(value_at, &name, "a reference")),
                    }
                }
            }
            "attributes" => {
                match self.parse_usage_list(marker, |p, m| p.parse_attribute_usage(m))? {
                    Some(usages) => PropertyValue::AttributeUsages(usages),
                    None => {
                        return Err(self.err_value(
                            value_at,
                            &name,
                            "an attribute usage reference list",
                        ))
                    }
                }
            }
            "properties" => {
                match self.parse_usage_list(marker, |p, m| p.parse_property_usage(m))? {
                    Some(usages) => PropertyValue::PropertyUsages(usages),
                    None => {
                        return Err(self.err_value(
                            value_at,
                            &name,
                            "a property usage reference list",
                        ))
                    }
                }
            }
            "allowedContent" => match self.parse_subelement_usages(marker)? {
                Some(content) => PropertyValue::Content(content),
                None => {
                    return Err(self.err_value(
                        value_at,
                        &name,
                        "a structure usage reference or structure list",
                    ))
                }
            },
            "isSelfClosing" => match scan::scan_boolean(self.text, marker) {
                Some(value) => PropertyValue::Bool(value),
                None => return Err(self.err_value(value_at, &name, "a boolean")),
            },
            "lineBreaks" => {
                match self.parse_comma_list(marker, |p, m| Ok(scan::scan_integer(p.text, m)))? {
                    Some(values) => PropertyValue::Integers(values),
                    None => return Err(self.err_value(value_at, &name, "a list of integers")),
                }
            }
            _ => unreachable!("property name was checked against the allow-list"),
        };

        self.ws(marker);
        if !self.eat(marker, ";") {
            return Err(self.err_expected(marker.position, "';'"));
        }

        log::debug!("Found property '{name}'.");

        Ok(Some((name, value)))
    }

    fn parse_scalar_item(&self, marker: &mut Marker) -> Result<Option<Scalar>, ParserError> {
        if let Some(s) = self.string(marker)? {
            return Ok(Some(Scalar::String(s)));
        }

        if let Some(i) = scan::scan_integer(self.text, marker) {
            return Ok(Some(Scalar::Integer(i)));
        }

        Ok(None)
    }

    fn parse_scalar_with_booleans(
        &self,
        marker: &mut Marker,
    ) -> Result<Option<Scalar>, ParserError> {
        if let Some(scalar) = self.parse_scalar_item(marker)? {
            return Ok(Some(scalar));
        }

        Ok(scan::scan_boolean(self.text, marker).map(Scalar::Boolean))
    }

    /// A comma-separated run of items. Stops at the first position where no
    /// item can be parsed; `None` if there was not even a first item.
    fn parse_comma_list<T>(
        &self,
        marker: &mut Marker,
        item: impl Fn(&Self, &mut Marker) -> Result<Option<T>, ParserError>,
    ) -> Result<Option<Vec<T>>, ParserError> {
        let mut items = Vec::new();

        while marker.position < self.text.len() {
            self.ws(marker);

            if !items.is_empty() && !self.eat(marker, ",") {
                break;
            }

            self.ws(marker);

            match item(self, marker)? {
                Some(value) => items.push(value),
                None => break,
            }
        }

        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(items))
        }
    }

    /// A usage reference list, optionally enclosed in square brackets.
    fn parse_usage_list<T>(
        &self,
        marker: &mut Marker,
        item: impl Fn(&Self, &mut Marker) -> Result<Option<T>, ParserError>,
    ) -> Result<Option<Vec<T>>, ParserError> {
        self.ws(marker);
        let bracketed = self.eat(marker, "[");

        let items = self.parse_comma_list(marker, item)?;

        if bracketed {
            self.ws(marker);
            if !self.eat(marker, "]") {
                return Err(self.err_expected(marker.position, "']'"));
            }
        }

        Ok(items)
    }

    // === Usage references ===

    fn parse_attribute_usage(
        &self,
        marker: &mut Marker,
    ) -> Result<Option<AttributeUsage>, ParserError> {
        self.ws(marker);

        if self.eat(marker, "*any attributes*") {
            return Ok(Some(AttributeUsage::Any));
        }

        let Some(reference) = scan::scan_reference(self.text, marker) else {
            return Ok(None);
        };
        let reference = reference.to_string();

        self.ws(marker);

        let mut is_optional = false;

        if self.eat(marker, "(") {
            self.ws(marker);

            if self.eat(marker, "optional") {
                is_optional = true;
                self.ws(marker);

                if !self.eat(marker, ")") {
                    return Err(self.err_expected(marker.position, "')'"));
                }
            } else {
                return Err(self.err_expected(marker.position, "a keyword"));
            }
        }

        Ok(Some(AttributeUsage::Reference(AttributeUsageReference {
            attribute_structure_reference: reference,
            is_optional,
        })))
    }

    fn parse_property_usage(
        &self,
        marker: &mut Marker,
    ) -> Result<Option<PropertyUsage>, ParserError> {
        self.ws(marker);

        if self.eat(marker, "*any properties*") {
            return Ok(Some(PropertyUsage::Any));
        }

        let Some(reference) = scan::scan_reference(self.text, marker) else {
            return Ok(None);
        };
        let reference = reference.to_string();

        self.ws(marker);

        let mut is_optional = false;

        if self.eat(marker, "(") {
            self.ws(marker);

            if self.eat(marker, "optional") {
                is_optional = true;
                self.ws(marker);

                if !self.eat(marker, ")") {
                    return Err(self.err_expected(marker.position, "')'"));
                }
            } else {
                return Err(self.err_expected(marker.position, "a keyword"));
            }
        }

        Ok(Some(PropertyUsage::Reference(PropertyUsageReference {
            property_structure_reference: reference,
            is_optional,
        })))
    }

    /// A reference in content position, with its optional occurrence
    /// suffix. This also picks up data type references; the two are
    /// indistinguishable here and are sorted out by a later pass.
    fn parse_element_usage_reference(
        &self,
        marker: &mut Marker,
    ) -> Result<Option<ElementUsageReference>, ParserError> {
        self.ws(marker);

        let Some(reference) = scan::scan_reference(self.text, marker) else {
            return Ok(None);
        };

        let mut usage = ElementUsageReference::new(reference);

        self.ws(marker);

        if self.eat(marker, "(") {
            self.ws(marker);

            // Inside parentheses the default flips to "any number".
            usage.minimum_number_of_occurrences = 0;
            usage.maximum_number_of_occurrences = -1;

            if let Some(terms) = self.parse_n_expression(marker)? {
                usage.n_expression = Some(terms);

                if !self.eat(marker, ")") {
                    return Err(self.err_expected(marker.position, "')'"));
                }
            } else if self.eat(marker, "optional") {
                usage.n_expression = Some(vec![(ComparisonOp::Ge, 0), (ComparisonOp::Le, 1)]);
                self.ws(marker);

                if !self.eat(marker, ")") {
                    return Err(self.err_expected(marker.position, "')'"));
                }
            } else {
                return Err(self.err_expected(marker.position, "an expression or keyword"));
            }
        }

        usage.apply_n_expression();

        Ok(Some(usage))
    }

    /// `n >= 0`, `0 <= n <= 5`, and so on. `None` only when nothing of an
    /// n-expression is present; a number with no operator, or a prefix with
    /// no `n`, is a hard error. A prefix operator is negated when recorded,
    /// since the variable sits on its other side.
    fn parse_n_expression(
        &self,
        marker: &mut Marker,
    ) -> Result<Option<Vec<(ComparisonOp, i64)>>, ParserError> {
        self.ws(marker);
        let prefix_value = scan::scan_integer(self.text, marker);
        self.ws(marker);

        let mut prefix_operator = None;

        if prefix_value.is_some() {
            prefix_operator = scan::scan_operator(self.text, marker);

            if prefix_operator.is_none() {
                return Err(self.err_expected(marker.position, "an operator"));
            }
        }

        self.ws(marker);

        if !self.eat(marker, "n") {
            if prefix_value.is_none() && prefix_operator.is_none() {
                return Ok(None);
            }

            return Err(self.err_expected(marker.position, "'n'"));
        }

        self.ws(marker);

        let Some(operator) = scan::scan_operator(self.text, marker) else {
            return Err(self.err_expected(marker.position, "an operator"));
        };

        self.ws(marker);

        let Some(value) = scan::scan_integer(self.text, marker) else {
            return Err(self.err_expected(marker.position, "a number"));
        };

        let mut terms = Vec::new();

        if let (Some(prefix_value), Some(prefix_operator)) = (prefix_value, prefix_operator) {
            terms.push((prefix_operator.negated(), prefix_value));
        }

        terms.push((operator, value));

        Ok(Some(terms))
    }

    // === Content models ===

    /// The productions allowed in content position, in priority order.
    fn parse_subelement_usages(
        &self,
        marker: &mut Marker,
    ) -> Result<Option<ContentModel>, ParserError> {
        if let Some(usage) = self.parse_element_usage_reference(marker)? {
            return Ok(Some(ContentModel::Element(usage)));
        }

        if self.eat(marker, "*any elements*") {
            return Ok(Some(ContentModel::AnyElements));
        }

        if self.eat(marker, "*any text*") {
            return Ok(Some(ContentModel::AnyText));
        }

        self.parse_subelement_list(marker)
    }

    /// A bracketed content list. The bracket kind and the first separator
    /// together fix the list semantics: `[,]` is a sequence, `{,}` an
    /// any-order set, `{/}` a choice; square brackets reject slashes.
    ///
    /// Parsing is speculative. Everything happens on a copy of the marker
    /// and the caller's position is overwritten only once the list is
    /// confirmed, so the content-position alternatives can be tried in
    /// order without corrupting the cursor.
    fn parse_subelement_list(
        &self,
        marker: &mut Marker,
    ) -> Result<Option<ContentModel>, ParserError> {
        let mut probe = *marker;

        self.ws(&mut probe);
        self.comment(&mut probe)?;
        self.ws(&mut probe);

        let square = if self.eat(&mut probe, "{") {
            false
        } else if self.eat(&mut probe, "[") {
            true
        } else {
            return Ok(None);
        };

        self.ws(&mut probe);
        self.comment(&mut probe)?;
        self.ws(&mut probe);

        let mut items: Vec<ContentModel> = Vec::new();
        let mut slash_separated = false;

        while probe.position < self.text.len() {
            self.ws(&mut probe);
            self.comment(&mut probe)?;
            self.ws(&mut probe);

            let n = items.len();

            if n == 1 {
                // The first separator locks in the kind for the whole list.
                match self.text.as_bytes().get(probe.position) {
                    Some(b',') => {
                        probe.position += 1;
                    }
                    Some(b'/') => {
                        if square {
                            return Err(self.err_expected(probe.position, "','"));
                        }

                        slash_separated = true;
                        probe.position += 1;
                    }
                    _ => {}
                }
            } else if n > 1 {
                match (slash_separated, self.text.as_bytes().get(probe.position)) {
                    (false, Some(b',')) | (true, Some(b'/')) => probe.position += 1,
                    (false, Some(b'/')) | (true, Some(b',')) => {
                        return Err(ParserError::MixedSeparators {
                            src: (*self.source).clone(),
                            span: (probe.position, 1).into(),
                            position: probe.position,
                        });
                    }
                    _ => break,
                }
            }

            self.ws(&mut probe);
            self.comment(&mut probe)?;
            self.ws(&mut probe);

            match self.parse_subelement_usages(&mut probe)? {
                Some(item) => items.push(item),
                None => break,
            }
        }

        self.ws(&mut probe);
        self.comment(&mut probe)?;
        self.ws(&mut probe);

        let closing = if square { "]" } else { "}" };
        if !self.eat(&mut probe, closing) {
            return Err(self.err_expected(probe.position, "a closing bracket"));
        }

        let kind = match (square, slash_separated) {
            (true, false) => StructureListKind::Ordered,
            (false, false) => StructureListKind::Unordered,
            (false, true) => StructureListKind::Choice,
            (true, true) => unreachable!("slashes in square brackets are rejected at lock-in"),
        };

        log::debug!("Found {kind:?} list with {} items.", items.len());

        marker.position = probe.position;

        Ok(Some(ContentModel::List(StructureList {
            kind,
            structures: items,
        })))
    }

    /// `list(<reference>, '<separator>')` in value-type position. `None`
    /// unless `list` followed by an opening parenthesis is present, so a
    /// plain reference that merely starts with "list" falls through to the
    /// reference production.
    fn parse_list_function(&self, marker: &mut Marker) -> Result<Option<ListFunction>, ParserError> {
        let mut probe = *marker;

        self.ws(&mut probe);

        if !self.eat(&mut probe, "list") {
            return Ok(None);
        }

        self.ws(&mut probe);

        if !self.eat(&mut probe, "(") {
            return Ok(None);
        }

        self.ws(&mut probe);

        let ref_at = probe.position;
        let reference = scan::scan_reference(self.text, &mut probe)
            .ok_or_else(|| self.err_expected(ref_at, "a reference"))?
            .to_string();

        self.ws(&mut probe);

        if !self.eat(&mut probe, ",") {
            return Err(self.err_expected(probe.position, "','"));
        }

        self.ws(&mut probe);

        let separator_at = probe.position;
        let separator = self
            .string(&mut probe)?
            .ok_or_else(|| self.err_expected(separator_at, "a string"))?;

        self.ws(&mut probe);

        if !self.eat(&mut probe, ")") {
            return Err(self.err_expected(probe.position, "')'"));
        }

        *marker = probe;

        Ok(Some(ListFunction {
            data_structure_reference: reference,
            separator,
        }))
    }

    // === Low-level helpers ===

    fn rest(&self, marker: &Marker) -> &str {
        &self.text[marker.position..]
    }

    fn eat(&self, marker: &mut Marker, token: &str) -> bool {
        if self.rest(marker).starts_with(token) {
            marker.position += token.len();
            true
        } else {
            false
        }
    }

    fn ws(&self, marker: &mut Marker) {
        scan::scan_whitespace(self.text, marker);
    }

    fn comment(&self, marker: &mut Marker) -> Result<Option<String>, ParserError> {
        let open = marker.position;
        scan::scan_comment(self.text, marker).map_err(|e| self.lift(e, open))
    }

    fn string(&self, marker: &mut Marker) -> Result<Option<String>, ParserError> {
        let open = marker.position;
        scan::scan_string(self.text, marker).map_err(|e| self.lift(e, open))
    }

    fn lift(&self, error: ScanError, open: usize) -> ParserError {
        match error {
            ScanError::UnterminatedComment { position } => ParserError::UnterminatedComment {
                src: (*self.source).clone(),
                span: (open, 2).into(),
                position,
            },
            ScanError::UnterminatedString { quote, position } => ParserError::UnterminatedString {
                src: (*self.source).clone(),
                span: (open, 1).into(),
                quote,
                position,
            },
        }
    }

    fn err_expected(&self, position: usize, expected: &str) -> ParserError {
        ParserError::Expected {
            src: (*self.source).clone(),
            span: (position, 0).into(),
            expected: expected.to_string(),
            position,
        }
    }

    fn err_value(&self, position: usize, property: &str, expected: &str) -> ParserError {
        ParserError::ExpectedPropertyValue {
            src: (*self.source).clone(),
            span: (position, 0).into(),
            property: property.to_string(),
            expected: expected.to_string(),
        }
    }
}

// === Structure builders ===
//
// Each builder folds the parsed property pairs into its structure kind.
// Pairs whose name does not apply to the kind are dropped; a repeated name
// overwrites the earlier assignment.

fn build_data_structure(body: ParsedBody) -> Structure {
    let mut structure = DataStructure::new(body.reference);
    structure.metadata = body.metadata;

    for (name, value) in body.properties {
        match (name.as_str(), value) {
            ("baseType", PropertyValue::Reference(r)) => {
                structure.base_structure_reference = Some(r)
            }
            ("allowedPattern", PropertyValue::Str(s)) => structure.pattern = Some(s),
            ("allowedValues", PropertyValue::Scalars(values)) => structure.allowed_values = values,
            ("minimumValue", PropertyValue::Integer(v)) => structure.minimum_value = Some(v),
            ("maximumValue", PropertyValue::Integer(v)) => structure.maximum_value = Some(v),
            ("defaultValue", PropertyValue::Scalar(v)) => structure.default_value = Some(v),
            _ => {}
        }
    }

    Structure::Data(structure)
}

fn build_attribute_structure(body: ParsedBody) -> Structure {
    let mut structure = AttributeStructure::new(body.reference);
    structure.metadata = body.metadata;

    for (name, value) in body.properties {
        match (name.as_str(), value) {
            ("baseType", PropertyValue::Reference(r)) => {
                structure.base_structure_reference = Some(r)
            }
            ("tagName", PropertyValue::Str(s)) => structure.attribute_name = Some(s),
            ("valueType", PropertyValue::ValueType(vt)) => structure.value_type = Some(vt),
            ("defaultValue", PropertyValue::Scalar(v)) => structure.default_value = Some(v),
            _ => {}
        }
    }

    if structure.attribute_name.is_none() {
        structure.attribute_name = Some(structure.reference.clone());
    }

    Structure::Attribute(structure)
}

fn build_element_structure(body: ParsedBody, can_be_root: bool) -> Structure {
    let mut structure = ElementStructure::new(body.reference);
    structure.metadata = body.metadata;
    structure.can_be_root_element = can_be_root;

    for (name, value) in body.properties {
        match (name.as_str(), value) {
            ("baseType", PropertyValue::Reference(r)) => {
                structure.base_structure_reference = Some(r)
            }
            ("tagName", PropertyValue::Str(s)) => structure.element_name = Some(s),
            ("attributes", PropertyValue::AttributeUsages(usages)) => {
                structure.attributes = usages
            }
            ("allowedContent", PropertyValue::Content(content)) => {
                structure.allowed_content = Some(content)
            }
            ("isSelfClosing", PropertyValue::Bool(v)) => structure.is_self_closing = v,
            ("lineBreaks", PropertyValue::Integers(values)) => structure.line_breaks = values,
            _ => {}
        }
    }

    if structure.element_name.is_none() {
        structure.element_name = Some(structure.reference.clone());
    }

    Structure::Element(structure)
}

fn build_property_structure(body: ParsedBody) -> Structure {
    let mut structure = PropertyStructure::new(body.reference);
    structure.metadata = body.metadata;

    for (name, value) in body.properties {
        match (name.as_str(), value) {
            ("baseType", PropertyValue::Reference(r)) => {
                structure.base_structure_reference = Some(r)
            }
            ("tagName", PropertyValue::Str(s)) => structure.property_name = Some(s),
            ("valueType", PropertyValue::ValueType(AttributeValueType::Reference(r))) => {
                structure.value_type_reference = Some(r)
            }
            ("defaultValue", PropertyValue::Scalar(v)) => structure.default_value = Some(v),
            _ => {}
        }
    }

    if structure.property_name.is_none() {
        structure.property_name = Some(structure.reference.clone());
    }

    Structure::Property(structure)
}

fn build_array_structure(body: ParsedBody) -> Structure {
    let mut structure = ArrayStructure::new(body.reference);
    structure.metadata = body.metadata;

    for (name, value) in body.properties {
        match (name.as_str(), value) {
            ("baseType", PropertyValue::Reference(r)) => {
                structure.base_structure_reference = Some(r)
            }
            ("itemType", PropertyValue::Reference(r)) => structure.item_type_reference = Some(r),
            _ => {}
        }
    }

    Structure::Array(structure)
}

fn build_object_structure(body: ParsedBody, can_be_root: bool) -> Structure {
    let mut structure = ObjectStructure::new(body.reference);
    structure.metadata = body.metadata;
    structure.can_be_root_object = can_be_root;

    for (name, value) in body.properties {
        match (name.as_str(), value) {
            ("baseType", PropertyValue::Reference(r)) => {
                structure.base_structure_reference = Some(r)
            }
            ("properties", PropertyValue::PropertyUsages(usages)) => {
                structure.properties = usages
            }
            _ => {}
        }
    }

    Structure::Object(structure)
}
