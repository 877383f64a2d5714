//! Serialized debug representations of a compiled schema.

use crate::model::Schema;

impl Schema {
    /// Serializes the schema into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the schema into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{DataStructure, Scalar, Schema, Structure};

    #[test]
    fn json_output_tags_structure_kinds() {
        let mut schema = Schema::new(Some("Test Format".to_string()));
        let mut status = DataStructure::new("status");
        status.allowed_values = vec![Scalar::String("draft".to_string())];
        schema.structures.push(Structure::Data(status));

        let json = schema.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["formatName"], "Test Format");
        assert_eq!(value["structures"][0]["type"], "DataStructure");
        assert_eq!(value["structures"][0]["reference"], "status");
        assert_eq!(value["structures"][0]["allowedValues"][0], "draft");
    }

    #[test]
    fn yaml_output_round_trips_through_serde() {
        let mut schema = Schema::new(None);
        schema
            .structures
            .push(Structure::Data(DataStructure::new("id")));

        let yaml = schema.to_yaml().unwrap();
        assert!(yaml.contains("reference: id"));
    }
}
