//! Example XML file generation.
//!
//! Writes one example document per root element of the schema. Attribute
//! and text values come from the example values given in structure
//! metadata comments; elements with no example value get placeholder
//! content.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::ExportError;
use crate::model::{
    AttributeStructure, AttributeUsage, AttributeValueType, ContentModel, ElementStructure,
    Schema, Structure, StructureListKind,
};

/// Recursive schemas would otherwise expand without end.
const MAXIMUM_DEPTH: usize = 16;

#[derive(Debug, Default)]
pub struct ExampleFileGenerator;

impl ExampleFileGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Writes an example XML file for each root element of the schema into
    /// the given directory, creating it if necessary.
    pub fn generate(&self, schema: &Schema, directory: &Path) -> Result<(), ExportError> {
        log::debug!(
            "Generating example files for {:?}.",
            schema.format_name.as_deref().unwrap_or("")
        );

        fs::create_dir_all(directory)?;

        for root in schema.root_element_structures() {
            let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

            writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

            self.write_element(schema, root, &mut writer, 0)?;

            let path = directory.join(format!("example_{}.xml", root.reference));
            let body = writer.into_inner();

            fs::write(&path, body)?;

            log::debug!("Wrote {}.", path.display());
        }

        Ok(())
    }

    fn write_element(
        &self,
        schema: &Schema,
        element: &ElementStructure,
        writer: &mut Writer<Vec<u8>>,
        depth: usize,
    ) -> Result<(), ExportError> {
        let name = element
            .element_name
            .as_deref()
            .unwrap_or(&element.reference);

        let mut start = BytesStart::new(name);

        for usage in &element.attributes {
            let AttributeUsage::Reference(usage) = usage else {
                continue;
            };

            let Some(Structure::Attribute(attribute)) =
                schema.structure_by_reference(&usage.attribute_structure_reference)
            else {
                continue;
            };

            let attribute_name = attribute
                .attribute_name
                .as_deref()
                .unwrap_or(&attribute.reference);

            let value = attribute_example_value(schema, attribute).unwrap_or("...");

            start.push_attribute((attribute_name, value));
        }

        if element.is_self_closing {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;

        if element.content_is_single_value() || element.content_is_any_text() {
            let text = element_example_value(schema, element).unwrap_or("...");
            writer.write_event(Event::Text(BytesText::new(text)))?;
        } else if depth < MAXIMUM_DEPTH {
            self.write_subelements(schema, element, writer, depth)?;
        }

        writer.write_event(Event::End(BytesEnd::new(name)))?;

        Ok(())
    }

    fn write_subelements(
        &self,
        schema: &Schema,
        element: &ElementStructure,
        writer: &mut Writer<Vec<u8>>,
        depth: usize,
    ) -> Result<(), ExportError> {
        let usages: Vec<_> = match &element.allowed_content {
            Some(ContentModel::Element(usage)) => vec![usage],
            Some(ContentModel::List(list)) if list.kind == StructureListKind::Ordered => list
                .structures
                .iter()
                .filter_map(|item| match item {
                    ContentModel::Element(usage) => Some(usage),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        for usage in usages {
            let Some(Structure::Element(subelement)) =
                schema.structure_by_reference(&usage.element_structure_reference)
            else {
                log::warn!(
                    "The element reference '{}' does not resolve to an element structure.",
                    usage.element_structure_reference
                );
                continue;
            };

            let repetitions = match usage.maximum_number_of_occurrences {
                -1 => 3,
                n => n.clamp(0, 3) as usize,
            };

            for _ in 0..repetitions {
                self.write_element(schema, subelement, writer, depth + 1)?;
            }
        }

        Ok(())
    }
}

fn attribute_example_value<'a>(
    schema: &'a Schema,
    attribute: &'a AttributeStructure,
) -> Option<&'a str> {
    let reference = match attribute.value_type.as_ref()? {
        AttributeValueType::Reference(reference) => reference.as_str(),
        AttributeValueType::List(list) => list.data_structure_reference.as_str(),
    };

    match schema.structure_by_reference(reference) {
        Some(Structure::Data(data)) => data.metadata.example_value.as_deref(),
        _ => None,
    }
}

/// The element's own example value, falling back to the one on its value
/// type.
fn element_example_value<'a>(schema: &'a Schema, element: &'a ElementStructure) -> Option<&'a str> {
    if let Some(value) = element.metadata.example_value.as_deref() {
        return Some(value);
    }

    let reference = element.value_type_reference.as_deref()?;

    match schema.structure_by_reference(reference) {
        Some(Structure::Data(data)) => data.metadata.example_value.as_deref(),
        _ => None,
    }
}
