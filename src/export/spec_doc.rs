//! Markdown specification generation.
//!
//! Produces a human-readable document describing each element of the
//! format: its attributes, its possible subelements, and a short usage
//! example. The output is a starting point for hand-written documentation
//! rather than a finished text.

use std::fmt::Write;

use crate::model::{
    AttributeStructure, AttributeUsage, AttributeValueType, ContentModel, DataStructure,
    ElementStructure, Schema, Structure,
};

#[derive(Debug, Default)]
pub struct SpecificationGenerator;

impl SpecificationGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Renders the schema as a Markdown specification document.
    pub fn generate(&self, schema: &Schema) -> String {
        log::debug!(
            "Generating a specification for {:?}.",
            schema.format_name.as_deref().unwrap_or("")
        );

        let format_name = schema.format_name.as_deref().unwrap_or("");

        let mut elements: Vec<&ElementStructure> = schema
            .root_element_structures()
            .filter(|e| e.is_used)
            .collect();

        elements.extend(
            schema
                .element_structures()
                .filter(|e| e.is_used && !e.can_be_root_element),
        );

        let mut document = String::new();

        let _ = writeln!(document, "# {format_name} Specification\n");
        let _ = writeln!(
            document,
            "This document gives the specification for {format_name}.\n"
        );
        let _ = writeln!(document, "## Table of Contents\n");

        for element in &elements {
            let name = element_name(element);

            let _ = writeln!(
                document,
                "- [The &lt;{name}&gt; element](#the-{}-element)",
                name.replace('_', "-")
            );
        }

        for element in &elements {
            self.write_element_section(schema, element, &mut document);
        }

        document
    }

    fn write_element_section(
        &self,
        schema: &Schema,
        element: &ElementStructure,
        document: &mut String,
    ) {
        let name = element_name(element);

        let _ = writeln!(document, "\n\n<br /><br />\n");
        let _ = writeln!(document, "## The &lt;{name}&gt; element\n");

        if let Some(description) = &element.metadata.description {
            let _ = writeln!(
                document,
                "{}\n",
                description.replace('<', "&lt;").replace('>', "&gt;")
            );
        }

        let _ = writeln!(document, "### Attributes\n");

        let attributes = resolve_attributes(schema, element);

        if attributes.is_empty() {
            let _ = writeln!(document, "None\n");
        } else {
            let _ = writeln!(document, "| Name | Required | Allowed Values | Description |");
            let _ = writeln!(document, "|---|---|---|---|");

            for (usage_is_optional, attribute) in &attributes {
                let attribute_name = attribute
                    .attribute_name
                    .as_deref()
                    .unwrap_or(&attribute.reference);

                let required = if *usage_is_optional {
                    "Optional"
                } else {
                    "Required"
                };

                let allowed_values =
                    allowed_values_text(schema, attribute).unwrap_or_default();

                let description = attribute.metadata.description.as_deref().unwrap_or("");

                let _ = writeln!(
                    document,
                    "| `{attribute_name}` | {required} | {allowed_values} | {description} |"
                );
            }

            let _ = writeln!(document);
        }

        let _ = writeln!(document, "### Possible Subelements\n");

        let subelements = resolve_subelements(schema, element);

        if subelements.is_empty() {
            let _ = writeln!(document, "None\n");
        } else {
            for subelement in &subelements {
                let _ = writeln!(document, "- &lt;{}&gt;", element_name(subelement));
            }

            let _ = writeln!(document);
        }

        let _ = writeln!(document, "### Examples\n");
        let _ = writeln!(
            document,
            "Below is shown an example of the `<{name}>` element.\n"
        );
        let _ = writeln!(document, "```xml");

        self.write_example(schema, element, &attributes, &subelements, document);

        let _ = writeln!(document, "```\n");
    }

    fn write_example(
        &self,
        schema: &Schema,
        element: &ElementStructure,
        attributes: &[(bool, &AttributeStructure)],
        subelements: &[&ElementStructure],
        document: &mut String,
    ) {
        let name = element_name(element);

        let attribute_string = attributes
            .iter()
            .map(|(_, attribute)| {
                let attribute_name = attribute
                    .attribute_name
                    .as_deref()
                    .unwrap_or(&attribute.reference);

                let value = attribute_example_value(schema, attribute).unwrap_or("...");

                format!("{attribute_name}=\"{value}\"")
            })
            .collect::<Vec<_>>()
            .join(" ");

        if element.is_self_closing {
            if attributes.is_empty() {
                let _ = writeln!(document, "<{name} />");
            } else {
                let _ = writeln!(document, "<{name} {attribute_string} />");
            }

            return;
        }

        if attributes.is_empty() {
            let _ = writeln!(document, "<{name}>");
        } else {
            let _ = writeln!(document, "<{name} {attribute_string}>");
        }

        if element.content_is_any_text() || element.content_is_single_value() {
            let text = element
                .metadata
                .example_value
                .as_deref()
                .unwrap_or("...");

            let _ = writeln!(document, "    {text}");
        } else {
            for subelement in subelements {
                let subelement_name = element_name(subelement);

                if subelement.is_self_closing {
                    let _ = writeln!(document, "    <{subelement_name} />");
                } else {
                    let _ = writeln!(document, "    <{subelement_name}></{subelement_name}>");
                }
            }
        }

        let _ = writeln!(document, "</{name}>");
    }
}

fn element_name(element: &ElementStructure) -> &str {
    element.element_name.as_deref().unwrap_or(&element.reference)
}

/// Resolves the element's attribute usages to attribute structures,
/// keeping each usage's optionality. Wildcard and dangling usages are
/// skipped.
fn resolve_attributes<'a>(
    schema: &'a Schema,
    element: &ElementStructure,
) -> Vec<(bool, &'a AttributeStructure)> {
    let mut attributes = Vec::new();

    for usage in &element.attributes {
        let AttributeUsage::Reference(usage) = usage else {
            continue;
        };

        match schema.structure_by_reference(&usage.attribute_structure_reference) {
            Some(Structure::Attribute(attribute)) => {
                attributes.push((usage.is_optional, attribute));
            }
            _ => {
                log::warn!(
                    "The attribute reference '{}' does not resolve to an attribute structure.",
                    usage.attribute_structure_reference
                );
            }
        }
    }

    attributes
}

/// Resolves the top level of the element's content model to element
/// structures.
fn resolve_subelements<'a>(
    schema: &'a Schema,
    element: &ElementStructure,
) -> Vec<&'a ElementStructure> {
    let usages: Vec<&str> = match &element.allowed_content {
        Some(ContentModel::Element(usage)) => vec![usage.element_structure_reference.as_str()],
        Some(ContentModel::List(list)) => list
            .structures
            .iter()
            .filter_map(|item| match item {
                ContentModel::Element(usage) => Some(usage.element_structure_reference.as_str()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut subelements = Vec::new();

    for reference in usages {
        match schema.structure_by_reference(reference) {
            Some(Structure::Element(subelement)) => subelements.push(subelement),
            _ => {
                log::warn!(
                    "The element reference '{reference}' does not resolve to an element structure."
                );
            }
        }
    }

    subelements
}

fn attribute_data_structure<'a>(
    schema: &'a Schema,
    attribute: &AttributeStructure,
) -> Option<&'a DataStructure> {
    let reference = match attribute.value_type.as_ref()? {
        AttributeValueType::Reference(reference) => reference.as_str(),
        AttributeValueType::List(list) => list.data_structure_reference.as_str(),
    };

    match schema.structure_by_reference(reference) {
        Some(Structure::Data(data)) => Some(data),
        _ => None,
    }
}

/// Describes the values an attribute accepts, preferring the data
/// structure's own description over derived text.
fn allowed_values_text(schema: &Schema, attribute: &AttributeStructure) -> Option<String> {
    let data = attribute_data_structure(schema, attribute)?;

    if let Some(description) = &data.metadata.description {
        return Some(description.clone());
    }

    if !data.allowed_values.is_empty() {
        let values = data
            .allowed_values
            .iter()
            .map(|v| format!("`{v}`"))
            .collect::<Vec<_>>()
            .join(", ");

        return Some(format!("one of: {values}"));
    }

    if let Some(pattern) = &data.pattern {
        if data.base_structure_reference.as_deref() == Some("string") {
            return Some(format!("a string with the pattern `{pattern}`"));
        }
    }

    None
}

fn attribute_example_value<'a>(
    schema: &'a Schema,
    attribute: &'a AttributeStructure,
) -> Option<&'a str> {
    attribute_data_structure(schema, attribute)
        .and_then(|data| data.metadata.example_value.as_deref())
}
