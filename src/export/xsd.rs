//! XSD export.
//!
//! Every used data structure becomes a named `xs:simpleType` and every used
//! element structure a named `xs:simpleType` or `xs:complexType`, keyed by a
//! deterministic type-name scheme (`__type__d__<ref>`, `__type__e__<ref>`,
//! `__type__a__<ref>`). Root elements are emitted last as top-level
//! `xs:element` declarations, so the file reads bottom-up.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::ExportError;
use crate::model::{
    AttributeUsage, AttributeValueType, ContentModel, DataStructure, ElementStructure, Scalar,
    Schema, Structure, StructureListKind,
};

const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
const BUILTIN_TYPES: [&str; 3] = ["string", "integer", "boolean"];

type XmlWriter = Writer<Vec<u8>>;

#[derive(Debug)]
pub struct XsdExporter {
    type_prefix: String,
}

impl Default for XsdExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl XsdExporter {
    pub fn new() -> Self {
        Self {
            type_prefix: "__type__".to_string(),
        }
    }

    /// Renders the schema as an XSD document.
    pub fn export(&self, schema: &Schema, version: &str) -> Result<String, ExportError> {
        log::debug!(
            "Exporting schema for {:?} as XSD.",
            schema.format_name.as_deref().unwrap_or("")
        );

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut root = BytesStart::new("xs:schema");
        root.push_attribute(("xmlns:xs", XS_NAMESPACE));
        root.push_attribute(("elementFormDefault", "qualified"));
        writer.write_event(Event::Start(root))?;

        if let Some(format_name) = &schema.format_name {
            writer.write_event(Event::Comment(BytesText::new(&format!(
                " An XSD file for {format_name} ({version}). "
            ))))?;
        }

        // Data structures first, then the element structures built on them,
        // then the root element declarations.
        for data in schema.data_structures().filter(|d| d.is_used) {
            self.write_data_structure(data, &mut writer)?;
        }

        for element in schema.element_structures().filter(|e| e.is_used) {
            self.write_element_structure(schema, element, &mut writer)?;
        }

        for root in schema.root_element_structures() {
            log::debug!("Exporting root element <{:?}>.", root.element_name);

            let mut declaration = BytesStart::new("xs:element");
            declaration.push_attribute(("name", element_name(root)));
            declaration.push_attribute(("type", self.element_type_name(&root.reference).as_str()));
            writer.write_event(Event::Empty(declaration))?;
        }

        writer.write_event(Event::End(BytesEnd::new("xs:schema")))?;

        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    fn data_type_name(&self, reference: &str) -> String {
        format!("{}d__{reference}", self.type_prefix)
    }

    fn element_type_name(&self, reference: &str) -> String {
        format!("{}e__{reference}", self.type_prefix)
    }

    fn attribute_type_name(&self, reference: &str) -> String {
        format!("{}a__{reference}", self.type_prefix)
    }

    fn type_name(&self, structure: &Structure) -> Result<String, ExportError> {
        match structure {
            Structure::Data(d) => Ok(self.data_type_name(&d.reference)),
            Structure::Element(e) => Ok(self.element_type_name(&e.reference)),
            Structure::Attribute(a) => Ok(self.attribute_type_name(&a.reference)),
            other => Err(ExportError::UnsupportedStructure {
                reference: other.reference().to_string(),
            }),
        }
    }

    fn write_data_structure(
        &self,
        data: &DataStructure,
        writer: &mut XmlWriter,
    ) -> Result<(), ExportError> {
        log::debug!("Exporting data structure '{}'.", data.reference);

        let mut simple_type = BytesStart::new("xs:simpleType");
        simple_type.push_attribute(("name", self.data_type_name(&data.reference).as_str()));

        match data.base_structure_reference.as_deref() {
            Some("string") => {
                writer.write_event(Event::Start(simple_type))?;

                if let Some(pattern) = &data.pattern {
                    write_wrapped(writer, "xs:restriction", &[("base", "xs:string")], |w| {
                        write_empty(w, "xs:pattern", &[("value", pattern)])
                    })?;
                } else if !data.allowed_values.is_empty() {
                    write_wrapped(writer, "xs:restriction", &[("base", "xs:string")], |w| {
                        for value in &data.allowed_values {
                            write_empty(w, "xs:enumeration", &[("value", &scalar_text(value))])?;
                        }
                        Ok(())
                    })?;
                } else {
                    write_empty(writer, "xs:restriction", &[("base", "xs:string")])?;
                }

                writer.write_event(Event::End(BytesEnd::new("xs:simpleType")))?;
            }
            Some("decimal") => {
                writer.write_event(Event::Start(simple_type))?;
                write_empty(writer, "xs:restriction", &[("base", "xs:decimal")])?;
                writer.write_event(Event::End(BytesEnd::new("xs:simpleType")))?;
            }
            Some("integer") => {
                writer.write_event(Event::Start(simple_type))?;

                if data.minimum_value.is_some() || data.maximum_value.is_some() {
                    write_wrapped(writer, "xs:restriction", &[("base", "xs:integer")], |w| {
                        if let Some(minimum) = data.minimum_value {
                            write_empty(w, "xs:minInclusive", &[("value", &minimum.to_string())])?;
                        }
                        if let Some(maximum) = data.maximum_value {
                            write_empty(w, "xs:maxInclusive", &[("value", &maximum.to_string())])?;
                        }
                        Ok(())
                    })?;
                } else {
                    write_empty(writer, "xs:restriction", &[("base", "xs:integer")])?;
                }

                writer.write_event(Event::End(BytesEnd::new("xs:simpleType")))?;
            }
            Some("boolean") => {
                writer.write_event(Event::Start(simple_type))?;
                write_empty(writer, "xs:restriction", &[("base", "xs:boolean")])?;
                writer.write_event(Event::End(BytesEnd::new("xs:simpleType")))?;
            }
            _ => {
                // No recognized base: an unconstrained named type.
                writer.write_event(Event::Empty(simple_type))?;
            }
        }

        Ok(())
    }

    fn write_element_structure(
        &self,
        schema: &Schema,
        element: &ElementStructure,
        writer: &mut XmlWriter,
    ) -> Result<(), ExportError> {
        log::debug!(
            "Exporting element structure '{}' <{}>.",
            element.reference,
            element_name(element)
        );

        let type_name = self.element_type_name(&element.reference);

        if !element.has_content() {
            let mut complex_type = BytesStart::new("xs:complexType");
            complex_type.push_attribute(("name", type_name.as_str()));

            if element.has_attributes() {
                writer.write_event(Event::Start(complex_type))?;
                self.write_attributes(schema, &element.attributes, writer)?;
                writer.write_event(Event::End(BytesEnd::new("xs:complexType")))?;
            } else {
                writer.write_event(Event::Empty(complex_type))?;
            }

            return Ok(());
        }

        if element.content_is_elements_only() || element.content_is_elements_and_any_text() {
            let mixed = element.content_is_elements_and_any_text();

            let mut complex_type = BytesStart::new("xs:complexType");
            complex_type.push_attribute(("name", type_name.as_str()));
            complex_type.push_attribute(("mixed", if mixed { "true" } else { "false" }));
            writer.write_event(Event::Start(complex_type))?;

            if let Some(content) = &element.allowed_content {
                self.write_subelements(schema, content, writer)?;
            }

            self.write_attributes(schema, &element.attributes, writer)?;

            writer.write_event(Event::End(BytesEnd::new("xs:complexType")))?;

            return Ok(());
        }

        if element.content_is_any_text() {
            if element.has_attributes() {
                // Text content with attributes: a complex type extending a
                // simple one.
                let mut complex_type = BytesStart::new("xs:complexType");
                complex_type.push_attribute(("name", type_name.as_str()));
                writer.write_event(Event::Start(complex_type))?;
                writer.write_event(Event::Start(BytesStart::new("xs:simpleContent")))?;

                let mut extension = BytesStart::new("xs:extension");
                extension.push_attribute(("base", "xs:string"));
                writer.write_event(Event::Start(extension))?;

                self.write_attributes(schema, &element.attributes, writer)?;

                writer.write_event(Event::End(BytesEnd::new("xs:extension")))?;
                writer.write_event(Event::End(BytesEnd::new("xs:simpleContent")))?;
                writer.write_event(Event::End(BytesEnd::new("xs:complexType")))?;
            } else {
                let mut simple_type = BytesStart::new("xs:simpleType");
                simple_type.push_attribute(("name", type_name.as_str()));
                writer.write_event(Event::Start(simple_type))?;
                write_empty(writer, "xs:restriction", &[("base", "xs:string")])?;
                writer.write_event(Event::End(BytesEnd::new("xs:simpleType")))?;
            }

            return Ok(());
        }

        if element.content_is_single_value() {
            let base = self.value_type_base(schema, element)?;

            if element.has_attributes() {
                let mut complex_type = BytesStart::new("xs:complexType");
                complex_type.push_attribute(("name", type_name.as_str()));
                writer.write_event(Event::Start(complex_type))?;
                writer.write_event(Event::Start(BytesStart::new("xs:simpleContent")))?;

                let mut extension = BytesStart::new("xs:extension");
                extension.push_attribute(("base", base.as_str()));
                writer.write_event(Event::Start(extension))?;

                self.write_attributes(schema, &element.attributes, writer)?;

                writer.write_event(Event::End(BytesEnd::new("xs:extension")))?;
                writer.write_event(Event::End(BytesEnd::new("xs:simpleContent")))?;
                writer.write_event(Event::End(BytesEnd::new("xs:complexType")))?;
            } else {
                let mut simple_type = BytesStart::new("xs:simpleType");
                simple_type.push_attribute(("name", type_name.as_str()));
                writer.write_event(Event::Start(simple_type))?;
                write_empty(writer, "xs:restriction", &[("base", base.as_str())])?;
                writer.write_event(Event::End(BytesEnd::new("xs:simpleType")))?;
            }

            return Ok(());
        }

        log::warn!(
            "Could not export element structure '{}' <{}>.",
            element.reference,
            element_name(element)
        );

        Ok(())
    }

    /// The XSD base type for an element whose content is a single value.
    fn value_type_base(
        &self,
        schema: &Schema,
        element: &ElementStructure,
    ) -> Result<String, ExportError> {
        let reference = element.value_type_reference.as_deref().unwrap_or_default();

        match reference {
            "string" => Ok("xs:string".to_string()),
            "decimal" => Ok("xs:decimal".to_string()),
            "integer" => Ok("xs:integer".to_string()),
            "boolean" => Ok("xs:boolean".to_string()),
            _ => {
                let structure = schema.structure_by_reference(reference).ok_or_else(|| {
                    ExportError::UnresolvedReference {
                        reference: reference.to_string(),
                    }
                })?;

                self.type_name(structure)
            }
        }
    }

    /// Writes a content model as an XSD content indicator. A sequence maps
    /// to `xs:sequence`, a choice to `xs:choice`, and an unordered list to
    /// an unbounded `xs:choice`, which is the closest XSD equivalent. A
    /// bare element usage is treated as a one-item sequence.
    fn write_subelements(
        &self,
        schema: &Schema,
        content: &ContentModel,
        writer: &mut XmlWriter,
    ) -> Result<(), ExportError> {
        let (items, kind): (&[ContentModel], StructureListKind) = match content {
            ContentModel::List(list) => (&list.structures, list.kind),
            single => (std::slice::from_ref(single), StructureListKind::Ordered),
        };

        let indicator = match kind {
            StructureListKind::Ordered => "xs:sequence",
            StructureListKind::Unordered | StructureListKind::Choice => "xs:choice",
        };

        let mut open = BytesStart::new(indicator);

        if kind == StructureListKind::Unordered {
            open.push_attribute(("minOccurs", "0"));
            open.push_attribute(("maxOccurs", "unbounded"));
        }

        writer.write_event(Event::Start(open))?;

        for item in items {
            match item {
                ContentModel::List(_) => self.write_subelements(schema, item, writer)?,
                ContentModel::Element(usage) => {
                    let structure = schema
                        .structure_by_reference(&usage.element_structure_reference)
                        .ok_or_else(|| ExportError::UnresolvedReference {
                            reference: usage.element_structure_reference.clone(),
                        })?;

                    let Structure::Element(target) = structure else {
                        return Err(ExportError::UnsupportedStructure {
                            reference: usage.element_structure_reference.clone(),
                        });
                    };

                    let mut child = BytesStart::new("xs:element");
                    child.push_attribute(("name", element_name(target)));
                    child.push_attribute((
                        "type",
                        self.element_type_name(&target.reference).as_str(),
                    ));

                    // Occurrence bounds only make sense inside a sequence;
                    // choice members inherit the indicator's bounds.
                    if kind == StructureListKind::Ordered {
                        let minimum = usage.minimum_number_of_occurrences;
                        let maximum = usage.maximum_number_of_occurrences;

                        if minimum != 1 {
                            child.push_attribute(("minOccurs", minimum.to_string().as_str()));
                        }

                        if maximum != 1 {
                            let value = if maximum == -1 {
                                "unbounded".to_string()
                            } else {
                                maximum.to_string()
                            };
                            child.push_attribute(("maxOccurs", value.as_str()));
                        }
                    }

                    writer.write_event(Event::Empty(child))?;
                }
                ContentModel::AnyElements => {
                    write_empty(writer, "xs:any", &[("processContents", "lax")])?;
                }
                ContentModel::AnyText | ContentModel::Data(_) => {}
            }
        }

        writer.write_event(Event::End(BytesEnd::new(indicator)))?;

        Ok(())
    }

    fn write_attributes(
        &self,
        schema: &Schema,
        attributes: &[AttributeUsage],
        writer: &mut XmlWriter,
    ) -> Result<(), ExportError> {
        for usage in attributes {
            let usage = match usage {
                AttributeUsage::Reference(usage) => usage,
                AttributeUsage::Any => {
                    write_empty(writer, "xs:anyAttribute", &[("processContents", "lax")])?;
                    continue;
                }
            };

            let structure = schema
                .structure_by_reference(&usage.attribute_structure_reference)
                .ok_or_else(|| ExportError::UnresolvedReference {
                    reference: usage.attribute_structure_reference.clone(),
                })?;

            let Structure::Attribute(attribute) = structure else {
                return Err(ExportError::UnsupportedStructure {
                    reference: usage.attribute_structure_reference.clone(),
                });
            };

            let mut declaration = BytesStart::new("xs:attribute");
            declaration.push_attribute((
                "name",
                attribute
                    .attribute_name
                    .as_deref()
                    .unwrap_or(&attribute.reference),
            ));

            let value_type = match &attribute.value_type {
                Some(AttributeValueType::Reference(reference)) => reference.as_str(),
                Some(AttributeValueType::List(function)) => {
                    function.data_structure_reference.as_str()
                }
                None => "string",
            };

            if BUILTIN_TYPES.contains(&value_type) {
                declaration.push_attribute(("type", format!("xs:{value_type}").as_str()));
            } else {
                let target = schema.structure_by_reference(value_type).ok_or_else(|| {
                    ExportError::UnresolvedReference {
                        reference: value_type.to_string(),
                    }
                })?;

                declaration.push_attribute(("type", self.type_name(target)?.as_str()));
            }

            declaration.push_attribute((
                "use",
                if usage.is_optional {
                    "optional"
                } else {
                    "required"
                },
            ));

            writer.write_event(Event::Empty(declaration))?;
        }

        Ok(())
    }
}

fn element_name(element: &ElementStructure) -> &str {
    element.element_name.as_deref().unwrap_or(&element.reference)
}

fn scalar_text(scalar: &Scalar) -> String {
    match scalar {
        Scalar::String(s) => s.clone(),
        Scalar::Integer(i) => i.to_string(),
        Scalar::Boolean(b) => b.to_string(),
    }
}

fn write_empty(
    writer: &mut XmlWriter,
    name: &str,
    attributes: &[(&str, &str)],
) -> Result<(), ExportError> {
    let mut element = BytesStart::new(name);
    for (key, value) in attributes {
        element.push_attribute((*key, *value));
    }
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn write_wrapped(
    writer: &mut XmlWriter,
    name: &str,
    attributes: &[(&str, &str)],
    body: impl FnOnce(&mut XmlWriter) -> Result<(), ExportError>,
) -> Result<(), ExportError> {
    let mut element = BytesStart::new(name);
    for (key, value) in attributes {
        element.push_attribute((*key, *value));
    }
    writer.write_event(Event::Start(element))?;
    body(writer)?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
