//! The public entry points of the crate.
//!
//! `compile_str` and `compile_file` turn schema source text into a fully
//! post-processed [`Schema`]; the `export_*` and `generate_*` functions
//! render a compiled schema into its output formats in a single call.

use std::path::Path;

use crate::error::SchemataError;
use crate::export::{
    ExampleFileGenerator, JsonSchemasExporter, SpecificationGenerator, XsdExporter,
};
use crate::loader::Loader;
use crate::model::Schema;

/// Compiles schema source text into a [`Schema`].
///
/// Import statements are resolved relative to nothing: their paths are
/// taken as given, so a source text with relative imports should be
/// compiled through [`compile_file`] instead. `file_name` is used for
/// error reporting.
///
/// # Errors
///
/// Returns a `SchemataError` if parsing or import loading fails.
pub fn compile_str(source: &str, file_name: &str) -> Result<Schema, SchemataError> {
    Loader::new().load_source(source, file_name, None)
}

/// Compiles the schema file at `path`, resolving imports relative to the
/// file's directory.
///
/// # Errors
///
/// Returns a `SchemataError` if the file cannot be read or if parsing or
/// import loading fails.
pub fn compile_file(path: impl AsRef<Path>) -> Result<Schema, SchemataError> {
    Loader::new().load_file(path.as_ref())
}

/// Exports the given schema as an XSD document.
///
/// # Errors
///
/// Returns a `SchemataError` if the schema references structures that do
/// not exist or cannot be expressed in XSD.
pub fn export_schema_as_xsd(schema: &Schema, version: &str) -> Result<String, SchemataError> {
    let exporter = XsdExporter::new();
    Ok(exporter.export(schema, version)?)
}

/// Exports the given schema as a pretty-printed JSON Schema document.
///
/// `schema_uri` becomes the document's `$id`.
///
/// # Errors
///
/// Returns a `SchemataError` if the schema has no root object structure.
pub fn export_schema_as_json_schema(
    schema: &Schema,
    version: &str,
    schema_uri: &str,
) -> Result<String, SchemataError> {
    let exporter = JsonSchemasExporter::new();
    let document = exporter.export(schema, version, schema_uri)?;

    let text = serde_json::to_string_pretty(&document).map_err(crate::error::ExportError::Json)?;

    Ok(text)
}

/// Generates a Markdown specification document for the given schema. The
/// output is a starting point for hand-written documentation.
#[must_use]
pub fn generate_specification(schema: &Schema) -> String {
    SpecificationGenerator::new().generate(schema)
}

/// Generates one example XML file per root element of the schema into the
/// given directory.
///
/// # Errors
///
/// Returns a `SchemataError` if the directory or a file cannot be written.
pub fn generate_example_files(
    schema: &Schema,
    directory: impl AsRef<Path>,
) -> Result<(), SchemataError> {
    let generator = ExampleFileGenerator::new();
    Ok(generator.generate(schema, directory.as_ref())?)
}
