//! Helpers for pulling annotations out of free-text comments.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::StructureMetadata;

static FORMAT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Format Name:[ \t]*([^\n]+)").unwrap());
static DESCRIPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Description:[ \t]*([^\n]+)").unwrap());
static EXAMPLE_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Example Value:[ \t]*([^\n]+)").unwrap());

/// Extracts the `Format Name:` annotation from a file's header comment.
pub fn extract_format_name(comment: &str) -> Option<String> {
    FORMAT_NAME_RE
        .captures(comment)
        .map(|c| c[1].trim().to_string())
}

/// Extracts the `Description:` and `Example Value:` annotations from a
/// structure's body comment. Only the first occurrence of each counts.
pub fn extract_metadata(comment: &str) -> StructureMetadata {
    StructureMetadata {
        description: DESCRIPTION_RE
            .captures(comment)
            .map(|c| c[1].trim().to_string()),
        example_value: EXAMPLE_VALUE_RE
            .captures(comment)
            .map(|c| c[1].trim().to_string()),
    }
}
