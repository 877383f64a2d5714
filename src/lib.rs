pub mod api;
pub mod error;
pub mod export;
pub mod loader;
pub mod model;
pub mod parser;
pub mod passes;
pub mod scan;
mod serialization;
mod utils;

pub use api::{
    compile_file, compile_str, export_schema_as_json_schema, export_schema_as_xsd,
    generate_example_files, generate_specification,
};
pub use error::SchemataError;
