//! JSON Schema export.
//!
//! The export is rooted at the schema's first root object structure and
//! walks objects, properties, and arrays recursively, producing a single
//! draft 2020-12 document.

use serde_json::{json, Map, Value};

use crate::error::ExportError;
use crate::model::{
    ArrayStructure, DataStructure, ObjectStructure, PropertyStructure, PropertyUsage, Scalar,
    Schema, Structure,
};

const SPECIFICATION: &str = "https://json-schema.org/draft/2020-12/schema";

/// Recursive schemas would otherwise expand without end.
const MAXIMUM_DEPTH: usize = 16;

#[derive(Debug, Default)]
pub struct JsonSchemasExporter;

impl JsonSchemasExporter {
    pub fn new() -> Self {
        Self
    }

    /// Renders the schema as a JSON Schema document.
    pub fn export(
        &self,
        schema: &Schema,
        version: &str,
        schema_uri: &str,
    ) -> Result<Value, ExportError> {
        log::debug!(
            "Exporting schema for {:?} as JSON Schema.",
            schema.format_name.as_deref().unwrap_or("")
        );

        let root = schema
            .root_object_structures()
            .next()
            .ok_or(ExportError::NoRootObject)?;

        let mut document = Map::new();
        document.insert("$schema".to_string(), json!(SPECIFICATION));
        document.insert("$id".to_string(), json!(schema_uri));
        document.insert(
            "title".to_string(),
            json!(format!(
                "{} ({version})",
                schema.format_name.as_deref().unwrap_or("")
            )),
        );

        self.export_object(schema, root, &mut document, 0);

        Ok(Value::Object(document))
    }

    fn export_object(
        &self,
        schema: &Schema,
        object: &ObjectStructure,
        target: &mut Map<String, Value>,
        depth: usize,
    ) {
        log::debug!("Exporting object structure {}.", object.reference);

        if depth >= MAXIMUM_DEPTH {
            log::warn!(
                "The object structure {} exceeds the maximum nesting depth.",
                object.reference
            );
            target.insert("type".to_string(), json!("object"));
            return;
        }

        let mut properties = Map::new();
        let mut required: Vec<Value> = Vec::new();
        let mut additional = false;

        for usage in &object.properties {
            let usage = match usage {
                PropertyUsage::Reference(usage) => usage,
                PropertyUsage::Any => {
                    additional = true;
                    continue;
                }
            };

            let Some(Structure::Property(property)) =
                schema.structure_by_reference(&usage.property_structure_reference)
            else {
                log::warn!(
                    "The property reference '{}' does not resolve to a property structure.",
                    usage.property_structure_reference
                );
                continue;
            };

            let name = property
                .property_name
                .clone()
                .unwrap_or_else(|| property.reference.clone());

            let mut body = Map::new();

            if let Some(description) = &property.metadata.description {
                body.insert("description".to_string(), json!(description));
            }

            self.export_property(schema, property, &mut body, depth);

            if !usage.is_optional {
                required.push(json!(name));
            }

            properties.insert(name, Value::Object(body));
        }

        target.insert("type".to_string(), json!("object"));
        target.insert("properties".to_string(), Value::Object(properties));
        target.insert("required".to_string(), Value::Array(required));
        target.insert("additionalProperties".to_string(), json!(additional));
    }

    fn export_property(
        &self,
        schema: &Schema,
        property: &PropertyStructure,
        target: &mut Map<String, Value>,
        depth: usize,
    ) {
        log::debug!("Exporting property structure {}.", property.reference);

        let reference = property.value_type_reference.as_deref().unwrap_or_default();

        match reference {
            "string" => {
                target.insert("type".to_string(), json!("string"));
            }
            "integer" => {
                target.insert("type".to_string(), json!("integer"));
            }
            "decimal" => {
                target.insert("type".to_string(), json!("number"));
            }
            "boolean" => {
                target.insert("type".to_string(), json!("boolean"));
            }
            _ => match schema.structure_by_reference(reference) {
                Some(Structure::Data(data)) => {
                    insert_data_constraints(data, target);
                }
                Some(Structure::Array(array)) => {
                    self.export_array(schema, array, target);
                }
                Some(Structure::Object(object)) => {
                    self.export_object(schema, object, target, depth + 1);
                }
                _ => {
                    log::warn!(
                        "The value type '{reference}' of property '{}' does not resolve.",
                        property.reference
                    );
                }
            },
        }
    }

    fn export_array(&self, schema: &Schema, array: &ArrayStructure, target: &mut Map<String, Value>) {
        log::debug!("Exporting array structure {}.", array.reference);

        target.insert("type".to_string(), json!("array"));

        let reference = array.item_type_reference.as_deref().unwrap_or_default();

        match reference {
            "string" | "integer" | "boolean" => {
                target.insert("items".to_string(), json!({ "type": reference }));
            }
            "decimal" => {
                target.insert("items".to_string(), json!({ "type": "number" }));
            }
            _ => {
                if let Some(Structure::Data(data)) = schema.structure_by_reference(reference) {
                    if data.base_structure_reference.as_deref() == Some("string") {
                        let mut items = Map::new();
                        items.insert("type".to_string(), json!("string"));
                        insert_string_constraints(data, &mut items);
                        target.insert("items".to_string(), Value::Object(items));
                    }
                }
            }
        }
    }
}

fn insert_data_constraints(data: &DataStructure, target: &mut Map<String, Value>) {
    match data.base_structure_reference.as_deref() {
        Some("integer") => {
            target.insert("type".to_string(), json!("integer"));

            if let Some(minimum) = data.minimum_value {
                target.insert("minimum".to_string(), json!(minimum));
            }

            if let Some(maximum) = data.maximum_value {
                target.insert("maximum".to_string(), json!(maximum));
            }
        }
        Some("boolean") => {
            target.insert("type".to_string(), json!("boolean"));
        }
        _ => {
            target.insert("type".to_string(), json!("string"));
            insert_string_constraints(data, target);
        }
    }
}

fn insert_string_constraints(data: &DataStructure, target: &mut Map<String, Value>) {
    if let Some(pattern) = &data.pattern {
        target.insert("pattern".to_string(), json!(pattern));
    }

    if !data.allowed_values.is_empty() {
        let values: Vec<Value> = data.allowed_values.iter().map(scalar_value).collect();
        target.insert("enum".to_string(), Value::Array(values));
    }
}

fn scalar_value(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::String(s) => json!(s),
        Scalar::Integer(i) => json!(i),
        Scalar::Boolean(b) => json!(b),
    }
}
