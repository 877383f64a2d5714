//! The structural model a parsed Schemata source compiles into.
//!
//! A [`Schema`] owns the structures defined in one source file plus the
//! schemas of its direct imports. Lookups consult local structures first, so
//! a local definition shadows an imported one with the same reference.
//! Serialization of the model is shaped for consumers of the compiled form:
//! enums carry a `type` tag, field names are camelCase, and bookkeeping
//! fields such as usage flags on references stay internal.

use serde::Serialize;

use crate::scan::ComparisonOp;

/// A complete compiled format definition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub format_name: Option<String>,
    pub structures: Vec<Structure>,
    #[serde(skip)]
    pub dependencies: Vec<Schema>,
}

impl Schema {
    pub fn new(format_name: Option<String>) -> Self {
        Self {
            format_name,
            structures: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Resolves a reference, preferring later local definitions, then later
    /// definitions in direct imports. Imports of imports are not visible.
    pub fn structure_by_reference(&self, reference: &str) -> Option<&Structure> {
        if let Some(found) = self
            .structures
            .iter()
            .rev()
            .find(|s| s.reference() == reference)
        {
            return Some(found);
        }

        self.dependencies
            .iter()
            .flat_map(|d| d.structures.iter().rev())
            .find(|s| s.reference() == reference)
    }

    /// All structures visible from this schema: direct imports first, then
    /// local definitions.
    pub fn all_structures(&self) -> impl Iterator<Item = &Structure> {
        self.dependencies
            .iter()
            .flat_map(|d| d.structures.iter())
            .chain(self.structures.iter())
    }

    pub fn data_structures(&self) -> impl Iterator<Item = &DataStructure> {
        self.all_structures().filter_map(|s| match s {
            Structure::Data(d) => Some(d),
            _ => None,
        })
    }

    pub fn attribute_structures(&self) -> impl Iterator<Item = &AttributeStructure> {
        self.all_structures().filter_map(|s| match s {
            Structure::Attribute(a) => Some(a),
            _ => None,
        })
    }

    pub fn element_structures(&self) -> impl Iterator<Item = &ElementStructure> {
        self.all_structures().filter_map(|s| match s {
            Structure::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn property_structures(&self) -> impl Iterator<Item = &PropertyStructure> {
        self.all_structures().filter_map(|s| match s {
            Structure::Property(p) => Some(p),
            _ => None,
        })
    }

    pub fn object_structures(&self) -> impl Iterator<Item = &ObjectStructure> {
        self.all_structures().filter_map(|s| match s {
            Structure::Object(o) => Some(o),
            _ => None,
        })
    }

    pub fn root_element_structures(&self) -> impl Iterator<Item = &ElementStructure> {
        self.element_structures().filter(|e| e.can_be_root_element)
    }

    pub fn root_object_structures(&self) -> impl Iterator<Item = &ObjectStructure> {
        self.object_structures().filter(|o| o.can_be_root_object)
    }
}

/// Free-text annotations attached to a structure through the comment that
/// opens its body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_value: Option<String>,
}

/// A scalar literal appearing as a property value or enumeration entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Boolean(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Structure {
    #[serde(rename = "DataStructure")]
    Data(DataStructure),
    #[serde(rename = "AttributeStructure")]
    Attribute(AttributeStructure),
    #[serde(rename = "ElementStructure")]
    Element(ElementStructure),
    #[serde(rename = "PropertyStructure")]
    Property(PropertyStructure),
    #[serde(rename = "ArrayStructure")]
    Array(ArrayStructure),
    #[serde(rename = "ObjectStructure")]
    Object(ObjectStructure),
}

impl Structure {
    pub fn reference(&self) -> &str {
        match self {
            Structure::Data(s) => &s.reference,
            Structure::Attribute(s) => &s.reference,
            Structure::Element(s) => &s.reference,
            Structure::Property(s) => &s.reference,
            Structure::Array(s) => &s.reference,
            Structure::Object(s) => &s.reference,
        }
    }

    pub fn base_structure_reference(&self) -> Option<&str> {
        match self {
            Structure::Data(s) => s.base_structure_reference.as_deref(),
            Structure::Attribute(s) => s.base_structure_reference.as_deref(),
            Structure::Element(s) => s.base_structure_reference.as_deref(),
            Structure::Property(s) => s.base_structure_reference.as_deref(),
            Structure::Array(s) => s.base_structure_reference.as_deref(),
            Structure::Object(s) => s.base_structure_reference.as_deref(),
        }
    }

    pub fn metadata(&self) -> &StructureMetadata {
        match self {
            Structure::Data(s) => &s.metadata,
            Structure::Attribute(s) => &s.metadata,
            Structure::Element(s) => &s.metadata,
            Structure::Property(s) => &s.metadata,
            Structure::Array(s) => &s.metadata,
            Structure::Object(s) => &s.metadata,
        }
    }

    pub fn is_used(&self) -> bool {
        match self {
            Structure::Data(s) => s.is_used,
            Structure::Attribute(s) => s.is_used,
            Structure::Element(s) => s.is_used,
            Structure::Property(s) => s.is_used,
            Structure::Array(s) => s.is_used,
            Structure::Object(s) => s.is_used,
        }
    }

    pub fn set_used(&mut self) {
        match self {
            Structure::Data(s) => s.is_used = true,
            Structure::Attribute(s) => s.is_used = true,
            Structure::Element(s) => s.is_used = true,
            Structure::Property(s) => s.is_used = true,
            Structure::Array(s) => s.is_used = true,
            Structure::Object(s) => s.is_used = true,
        }
    }
}

/// A constrained scalar value space, derived from a built-in base type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStructure {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_structure_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Scalar>,
    #[serde(flatten)]
    pub metadata: StructureMetadata,
    #[serde(skip)]
    pub is_used: bool,
}

impl DataStructure {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            base_structure_reference: None,
            pattern: None,
            allowed_values: Vec::new(),
            minimum_value: None,
            maximum_value: None,
            default_value: None,
            metadata: StructureMetadata::default(),
            is_used: false,
        }
    }
}

/// A named XML attribute whose value space is given by a data structure or
/// a list function over one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeStructure {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_structure_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<AttributeValueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Scalar>,
    #[serde(flatten)]
    pub metadata: StructureMetadata,
    #[serde(skip)]
    pub is_used: bool,
}

impl AttributeStructure {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            base_structure_reference: None,
            attribute_name: None,
            value_type: None,
            default_value: None,
            metadata: StructureMetadata::default(),
            is_used: false,
        }
    }
}

/// The value space of an attribute: a plain reference to a data structure,
/// or a separated list of values of one.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AttributeValueType {
    Reference(String),
    List(ListFunction),
}

/// A `list(<data structure>, '<separator>')` value type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFunction {
    pub data_structure_reference: String,
    pub separator: String,
}

/// An XML element: its tag name, attributes, allowed content, and layout
/// hints for example generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStructure {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_structure_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_name: Option<String>,
    pub can_be_root_element: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_content: Option<ContentModel>,
    #[serde(skip)]
    pub value_type_reference: Option<String>,
    pub is_self_closing: bool,
    pub line_breaks: Vec<i64>,
    #[serde(flatten)]
    pub metadata: StructureMetadata,
    #[serde(skip)]
    pub is_used: bool,
}

impl ElementStructure {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            base_structure_reference: None,
            element_name: None,
            can_be_root_element: false,
            attributes: Vec::new(),
            allowed_content: None,
            value_type_reference: None,
            is_self_closing: false,
            line_breaks: vec![0, 1, 1, 1],
            metadata: StructureMetadata::default(),
            is_used: false,
        }
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn has_content(&self) -> bool {
        match &self.allowed_content {
            None => false,
            Some(ContentModel::List(list)) => !list.structures.is_empty(),
            Some(_) => true,
        }
    }

    /// Whether the content model mentions any element usage, at any nesting
    /// depth.
    pub fn contains_element_usage_reference(&self) -> bool {
        fn walk(content: &ContentModel) -> bool {
            match content {
                ContentModel::Element(_) | ContentModel::AnyElements => true,
                ContentModel::List(list) => list.structures.iter().any(walk),
                ContentModel::Data(_) | ContentModel::AnyText => false,
            }
        }

        self.allowed_content.as_ref().is_some_and(walk)
    }

    /// Whether the content model mentions `*any text*`, at any nesting
    /// depth.
    pub fn contains_any_text(&self) -> bool {
        fn walk(content: &ContentModel) -> bool {
            match content {
                ContentModel::AnyText => true,
                ContentModel::List(list) => list.structures.iter().any(walk),
                _ => false,
            }
        }

        self.allowed_content.as_ref().is_some_and(walk)
    }

    pub fn content_is_any_text(&self) -> bool {
        self.contains_any_text() && !self.contains_element_usage_reference()
    }

    /// Whether the element holds a single typed value.
    pub fn content_is_single_value(&self) -> bool {
        matches!(self.allowed_content, Some(ContentModel::Data(_)))
    }

    pub fn content_is_elements_only(&self) -> bool {
        self.contains_element_usage_reference() && !self.contains_any_text()
    }

    pub fn content_is_elements_and_any_text(&self) -> bool {
        self.contains_element_usage_reference() && self.contains_any_text()
    }
}

/// An attribute slot on an element: a reference to an attribute structure,
/// or the `*any attributes*` wildcard.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AttributeUsage {
    Reference(AttributeUsageReference),
    Any,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeUsageReference {
    pub attribute_structure_reference: String,
    pub is_optional: bool,
}

/// A JSON object property, named and typed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyStructure {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_structure_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Scalar>,
    #[serde(flatten)]
    pub metadata: StructureMetadata,
    #[serde(skip)]
    pub is_used: bool,
}

impl PropertyStructure {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            base_structure_reference: None,
            property_name: None,
            value_type_reference: None,
            default_value: None,
            metadata: StructureMetadata::default(),
            is_used: false,
        }
    }
}

/// A JSON array with a single item type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayStructure {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_structure_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type_reference: Option<String>,
    #[serde(flatten)]
    pub metadata: StructureMetadata,
    #[serde(skip)]
    pub is_used: bool,
}

impl ArrayStructure {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            base_structure_reference: None,
            item_type_reference: None,
            metadata: StructureMetadata::default(),
            is_used: false,
        }
    }
}

/// A JSON object listing its allowed properties.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStructure {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_structure_reference: Option<String>,
    pub can_be_root_object: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyUsage>,
    #[serde(flatten)]
    pub metadata: StructureMetadata,
    #[serde(skip)]
    pub is_used: bool,
}

impl ObjectStructure {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            base_structure_reference: None,
            can_be_root_object: false,
            properties: Vec::new(),
            metadata: StructureMetadata::default(),
            is_used: false,
        }
    }
}

/// A property slot on an object: a reference to a property structure, or
/// the `*any properties*` wildcard.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PropertyUsage {
    Reference(PropertyUsageReference),
    Any,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUsageReference {
    pub property_structure_reference: String,
    pub is_optional: bool,
}

/// One node of an element's content model.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ContentModel {
    Element(ElementUsageReference),
    Data(DataUsageReference),
    AnyElements,
    AnyText,
    List(StructureList),
}

/// A reference to an element structure in content position, together with
/// the occurrence bounds folded out of its n-expression.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementUsageReference {
    pub element_structure_reference: String,
    #[serde(skip)]
    pub n_expression: Option<Vec<(ComparisonOp, i64)>>,
    pub minimum_number_of_occurrences: i64,
    pub maximum_number_of_occurrences: i64,
}

impl ElementUsageReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            element_structure_reference: reference.into(),
            n_expression: None,
            minimum_number_of_occurrences: 1,
            maximum_number_of_occurrences: 1,
        }
    }

    /// Folds the attached n-expression into the occurrence bounds. A
    /// maximum of `-1` means unbounded.
    pub fn apply_n_expression(&mut self) {
        let Some(terms) = self.n_expression.take() else {
            return;
        };

        for (operator, value) in &terms {
            match operator {
                ComparisonOp::Ge => self.minimum_number_of_occurrences = *value,
                ComparisonOp::Gt => self.minimum_number_of_occurrences = *value + 1,
                ComparisonOp::Le => self.maximum_number_of_occurrences = *value,
                ComparisonOp::Lt => self.maximum_number_of_occurrences = *value - 1,
                ComparisonOp::Eq => {
                    self.minimum_number_of_occurrences = *value;
                    self.maximum_number_of_occurrences = *value;
                }
                ComparisonOp::Ne => {}
            }
        }

        self.n_expression = Some(terms);
    }
}

/// A reference to a data structure in content position. Written in source
/// as an element reference; a post-parse pass resolves which it is.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUsageReference {
    pub data_structure_reference: String,
}

/// An ordered or unordered group of content items, or a choice among them.
#[derive(Debug, Clone, Serialize)]
pub struct StructureList {
    #[serde(rename = "type")]
    pub kind: StructureListKind,
    pub structures: Vec<ContentModel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StructureListKind {
    #[serde(rename = "OrderedStructureList")]
    Ordered,
    #[serde(rename = "UnorderedStructureList")]
    Unordered,
    #[serde(rename = "StructureChoice")]
    Choice,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element_with_content(content: ContentModel) -> ElementStructure {
        let mut element = ElementStructure::new("e");
        element.allowed_content = Some(content);
        element
    }

    #[test]
    fn local_definitions_shadow_imported_ones() {
        let mut imported = Schema::new(None);
        imported
            .structures
            .push(Structure::Data(DataStructure::new("id")));

        let mut schema = Schema::new(None);
        let mut local = DataStructure::new("id");
        local.pattern = Some("[a-z]+".to_string());
        schema.structures.push(Structure::Data(local));
        schema.dependencies.push(imported);

        let found = schema.structure_by_reference("id").unwrap();
        match found {
            Structure::Data(d) => assert_eq!(d.pattern.as_deref(), Some("[a-z]+")),
            other => panic!("unexpected structure: {other:?}"),
        }
    }

    #[test]
    fn later_definitions_win_within_a_file() {
        let mut schema = Schema::new(None);
        schema
            .structures
            .push(Structure::Data(DataStructure::new("id")));
        let mut second = DataStructure::new("id");
        second.minimum_value = Some(3);
        schema.structures.push(Structure::Data(second));

        let found = schema.structure_by_reference("id").unwrap();
        match found {
            Structure::Data(d) => assert_eq!(d.minimum_value, Some(3)),
            other => panic!("unexpected structure: {other:?}"),
        }
    }

    #[test]
    fn n_expression_folding_matches_operator_semantics() {
        let cases: [(&[(ComparisonOp, i64)], i64, i64); 6] = [
            (&[(ComparisonOp::Eq, 3)], 3, 3),
            (&[(ComparisonOp::Ge, 2), (ComparisonOp::Le, 4)], 2, 4),
            (&[(ComparisonOp::Gt, 1), (ComparisonOp::Lt, 5)], 2, 4),
            (&[(ComparisonOp::Gt, 0), (ComparisonOp::Le, 5)], 1, 5),
            (&[(ComparisonOp::Ge, 0), (ComparisonOp::Le, 1)], 0, 1),
            (&[(ComparisonOp::Ne, 7)], 1, 1),
        ];

        for (terms, minimum, maximum) in cases {
            let mut usage = ElementUsageReference::new("e");
            usage.n_expression = Some(terms.to_vec());
            usage.apply_n_expression();
            assert_eq!(
                usage.minimum_number_of_occurrences, minimum,
                "terms: {terms:?}"
            );
            assert_eq!(
                usage.maximum_number_of_occurrences, maximum,
                "terms: {terms:?}"
            );
        }
    }

    #[test]
    fn content_shape_predicates() {
        let element = element_with_content(ContentModel::AnyText);
        assert!(element.content_is_any_text());
        assert!(!element.content_is_elements_only());

        let element = element_with_content(ContentModel::Data(DataUsageReference {
            data_structure_reference: "d".to_string(),
        }));
        assert!(element.content_is_single_value());

        let element = element_with_content(ContentModel::List(StructureList {
            kind: StructureListKind::Ordered,
            structures: vec![
                ContentModel::Element(ElementUsageReference::new("a")),
                ContentModel::List(StructureList {
                    kind: StructureListKind::Choice,
                    structures: vec![ContentModel::AnyText],
                }),
            ],
        }));
        assert!(element.contains_element_usage_reference());
        assert!(element.contains_any_text());
        assert!(element.content_is_elements_and_any_text());
        assert!(!element.content_is_elements_only());
    }
}
