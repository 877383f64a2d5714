//! Exporters and generators that consume a finished [`crate::model::Schema`].
//!
//! All of them are mechanical tree-walkers: they read the compiled model,
//! skip structures the reachability pass left unmarked, and produce their
//! target artifact without touching the schema.

pub mod example_files;
pub mod json_schema;
pub mod spec_doc;
pub mod xsd;

pub use example_files::ExampleFileGenerator;
pub use json_schema::JsonSchemasExporter;
pub use spec_doc::SpecificationGenerator;
pub use xsd::XsdExporter;
