use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum SchemataError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),
}

/// Errors raised while parsing a single `.schema` source text. Every variant
/// carries the source and the character offset at which the expectation
/// failed, and the message names that offset, so the error is readable both
/// as a plain string and as a rendered diagnostic.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error("Expected {expected} at position {position}.")]
    #[diagnostic(
        code(parser::expected),
        help("The parser expected a specific token or value that was not found.")
    )]
    Expected {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected} here")]
        span: SourceSpan,
        expected: String,
        position: usize,
    },

    #[error("Expected '*/' at position {position}.")]
    #[diagnostic(
        code(parser::unterminated_comment),
        help("A comment was opened with '/*' but never closed.")
    )]
    UnterminatedComment {
        #[source_code]
        src: NamedSource<String>,
        #[label("Comment opened here is never closed")]
        span: SourceSpan,
        position: usize,
    },

    #[error("Expected {quote} at position {position}.")]
    #[diagnostic(
        code(parser::unterminated_string),
        help("A string must be closed with the same kind of quote mark it was opened with.")
    )]
    UnterminatedString {
        #[source_code]
        src: NamedSource<String>,
        #[label("String opened here is never closed")]
        span: SourceSpan,
        quote: char,
        position: usize,
    },

    #[error("'{name}' is not a valid Schemata property name.")]
    #[diagnostic(
        code(parser::invalid_property_name),
        help("Only the fixed set of Schemata property names may appear in a structure body.")
    )]
    InvalidPropertyName {
        #[source_code]
        src: NamedSource<String>,
        #[label("Not a recognized property name")]
        span: SourceSpan,
        name: String,
    },

    #[error("Expected {expected} for property '{property}'.")]
    #[diagnostic(
        code(parser::invalid_property_value),
        help("Each property name dictates the kind of value that must follow it.")
    )]
    ExpectedPropertyValue {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected} here")]
        span: SourceSpan,
        property: String,
        expected: String,
    },

    #[error("Separators must be the same throughout a list (position {position}).")]
    #[diagnostic(
        code(parser::mixed_separators),
        help("A list must use either ',' or '/' between items, not both.")
    )]
    MixedSeparators {
        #[source_code]
        src: NamedSource<String>,
        #[label("Separator does not match the one used earlier in this list")]
        span: SourceSpan,
        position: usize,
    },

    #[error("A structure with the reference '{reference}' has already been defined.")]
    #[diagnostic(
        code(parser::duplicate_reference),
        help("Structure references must be unique within one file.")
    )]
    DuplicateReference {
        #[source_code]
        src: NamedSource<String>,
        #[label("'{reference}' is already defined in this file")]
        span: SourceSpan,
        reference: String,
    },
}

/// Errors raised while loading schema files and resolving imports.
#[derive(Error, Debug, Diagnostic)]
pub enum LoaderError {
    #[error("Could not read '{path}'.")]
    #[diagnostic(code(loader::read_failed))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' does not exist.")]
    #[diagnostic(
        code(loader::import_not_found),
        help("Import paths are resolved relative to the importing file.")
    )]
    ImportNotFound {
        path: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("Imported here")]
        span: SourceSpan,
    },

    #[error("Circular import: {cycle}.")]
    #[diagnostic(
        code(loader::circular_import),
        help("A schema file cannot import itself, directly or transitively.")
    )]
    CircularImport {
        cycle: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("This import closes the cycle")]
        span: SourceSpan,
    },
}

/// Errors raised by the exporters when walking a finished schema.
#[derive(Error, Debug, Diagnostic)]
pub enum ExportError {
    #[error("The schema has no root object structure.")]
    #[diagnostic(
        code(export::no_root_object),
        help("A JSON Schema export needs exactly one structure declared as 'root object'.")
    )]
    NoRootObject,

    #[error("The reference '{reference}' does not resolve to any structure.")]
    #[diagnostic(code(export::unresolved_reference))]
    UnresolvedReference { reference: String },

    #[error("Cannot create an XSD type name for '{reference}'.")]
    #[diagnostic(code(export::unsupported_structure))]
    UnsupportedStructure { reference: String },

    #[error(transparent)]
    #[diagnostic(code(export::xml))]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    #[diagnostic(code(export::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(export::io))]
    Io(#[from] std::io::Error),
}
