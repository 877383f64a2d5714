//! Lexical primitives for the Schemata notation.
//!
//! Each scanner takes the full source text and a [`Marker`], attempts to
//! consume one token class at the marker's offset, advances the marker only
//! on success, and reports absence with `None`. Scanners never partially
//! advance on a failed match; the fallible ones (comments, strings) report
//! a hard error through [`ScanError`] instead.

/// A scan position within a source text, measured in bytes.
///
/// Markers are plain `Copy` values. Speculative parses copy the marker,
/// parse into the copy, and overwrite the original's offset only when the
/// attempt succeeds, so a failed attempt leaves the caller's position
/// untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Marker {
    pub position: usize,
}

impl Marker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: usize) -> Self {
        Self { position }
    }
}

/// A comparison operator as it appears in n-expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Ne,
}

impl ComparisonOp {
    /// The operator that expresses the same comparison after the two sides
    /// have been swapped, as needed when folding a `0 <= n` prefix.
    pub fn negated(self) -> ComparisonOp {
        match self {
            ComparisonOp::Eq => ComparisonOp::Eq,
            ComparisonOp::Gt => ComparisonOp::Lt,
            ComparisonOp::Ge => ComparisonOp::Le,
            ComparisonOp::Lt => ComparisonOp::Gt,
            ComparisonOp::Le => ComparisonOp::Ge,
            ComparisonOp::Ne => ComparisonOp::Ne,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Ne => "/=",
        }
    }
}

/// A hard failure in a scanner that can detect broken input on its own
/// (unterminated comments and strings). The parser lifts this into a full
/// diagnostic with the source attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    UnterminatedComment { position: usize },
    UnterminatedString { quote: char, position: usize },
}

fn is_reference_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'-'
}

/// Consumes a maximal run of spaces, tabs, and newlines. Returns the
/// consumed slice, or `None` when the current character is not whitespace.
/// Absence is not a failure; callers treat both outcomes as success.
pub fn scan_whitespace<'a>(text: &'a str, marker: &mut Marker) -> Option<&'a str> {
    let bytes = text.as_bytes();
    let start = marker.position;
    let mut pos = start;

    while pos < bytes.len() && matches!(bytes[pos], b' ' | b'\t' | b'\n') {
        pos += 1;
    }

    if pos == start {
        return None;
    }

    marker.position = pos;
    Some(&text[start..pos])
}

/// Consumes a `/* ... */` comment and returns the enclosed text verbatim.
/// Reaching end of input before the closing `*/` is a hard error.
pub fn scan_comment(text: &str, marker: &mut Marker) -> Result<Option<String>, ScanError> {
    if !text[marker.position..].starts_with("/*") {
        return Ok(None);
    }

    let body_start = marker.position + 2;

    match text[body_start..].find("*/") {
        Some(offset) => {
            marker.position = body_start + offset + 2;
            Ok(Some(text[body_start..body_start + offset].to_string()))
        }
        None => Err(ScanError::UnterminatedComment {
            position: text.len(),
        }),
    }
}

/// Consumes a maximal run of reference characters (`[A-Za-z0-9_-]`).
pub fn scan_reference<'a>(text: &'a str, marker: &mut Marker) -> Option<&'a str> {
    let bytes = text.as_bytes();
    let start = marker.position;
    let mut pos = start;

    while pos < bytes.len() && is_reference_char(bytes[pos]) {
        pos += 1;
    }

    if pos == start {
        return None;
    }

    marker.position = pos;
    Some(&text[start..pos])
}

/// Consumes a property name. The character class is identical to
/// [`scan_reference`]; validating the name against the fixed set of
/// recognized property names is the parser's job.
pub fn scan_property_name<'a>(text: &'a str, marker: &mut Marker) -> Option<&'a str> {
    scan_reference(text, marker)
}

/// Consumes a single- or double-quoted string and returns its raw contents.
/// No escape sequences are processed; the string ends at the first closing
/// quote of the same kind it was opened with. An unterminated string is a
/// hard error.
pub fn scan_string(text: &str, marker: &mut Marker) -> Result<Option<String>, ScanError> {
    let quote = match text[marker.position..].chars().next() {
        Some(c @ ('\'' | '"')) => c,
        _ => return Ok(None),
    };

    let body_start = marker.position + 1;

    match text[body_start..].find(quote) {
        Some(offset) => {
            marker.position = body_start + offset + 1;
            Ok(Some(text[body_start..body_start + offset].to_string()))
        }
        None => Err(ScanError::UnterminatedString {
            quote,
            position: text.len(),
        }),
    }
}

/// Consumes a maximal run of ASCII digits and converts it to a non-negative
/// integer. Leading zeros are permitted and stripped by the conversion. A
/// leading sign is not part of this token; the scanner is purely
/// digit-class-driven from the current offset.
pub fn scan_integer(text: &str, marker: &mut Marker) -> Option<i64> {
    let bytes = text.as_bytes();
    let start = marker.position;
    let mut pos = start;

    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }

    if pos == start {
        return None;
    }

    let value = text[start..pos].parse::<i64>().ok()?;
    marker.position = pos;
    Some(value)
}

/// Consumes the literal keyword `true` or `false`. Case-sensitive; there is
/// no word-boundary check beyond the length-limited comparison.
pub fn scan_boolean(text: &str, marker: &mut Marker) -> Option<bool> {
    if text[marker.position..].starts_with("true") {
        marker.position += 4;
        return Some(true);
    }

    if text[marker.position..].starts_with("false") {
        marker.position += 5;
        return Some(false);
    }

    None
}

/// Consumes one of the comparison operators, matched longest-first so that
/// `>` does not shadow `>=`.
pub fn scan_operator(text: &str, marker: &mut Marker) -> Option<ComparisonOp> {
    const OPERATORS: [(&str, ComparisonOp); 6] = [
        (">=", ComparisonOp::Ge),
        ("<=", ComparisonOp::Le),
        ("/=", ComparisonOp::Ne),
        ("=", ComparisonOp::Eq),
        (">", ComparisonOp::Gt),
        ("<", ComparisonOp::Lt),
    ];

    let rest = &text[marker.position..];

    for (token, op) in OPERATORS {
        if rest.starts_with(token) {
            marker.position += token.len();
            return Some(op);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_preserves_interior_verbatim() {
        let cases: [(&str, usize, Option<&str>); 4] = [
            ("/* This is a comment. */", 0, Some(" This is a comment. ")),
            (" This is a comment. */", 0, None),
            ("abc /* This is a comment. */", 0, None),
            ("abc /* This is a comment. */", 4, Some(" This is a comment. ")),
        ];

        for (text, position, expected) in cases {
            let mut marker = Marker::at(position);
            let result = scan_comment(text, &mut marker).unwrap();
            assert_eq!(result.as_deref(), expected, "input: {text:?}");
        }
    }

    #[test]
    fn comment_advances_past_closing_token() {
        let mut marker = Marker::new();
        scan_comment("/* a */rest", &mut marker).unwrap();
        assert_eq!(marker.position, 7);
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let mut marker = Marker::new();
        let err = scan_comment("/* This is a comment.", &mut marker).unwrap_err();
        assert!(matches!(err, ScanError::UnterminatedComment { .. }));
    }

    #[test]
    fn integer_is_digit_class_driven() {
        let cases: [(&str, usize, Option<i64>); 13] = [
            ("123", 0, Some(123)),
            ("12345", 0, Some(12345)),
            ("000123", 0, Some(123)),
            ("000000123", 0, Some(123)),
            ("123 a b c", 0, Some(123)),
            ("+123", 0, None),
            ("-123", 0, None),
            (" 123", 0, None),
            (".123", 0, None),
            ("+123", 1, Some(123)),
            ("-123", 1, Some(123)),
            (" 123", 1, Some(123)),
            (".123", 1, Some(123)),
        ];

        for (text, position, expected) in cases {
            let mut marker = Marker::at(position);
            assert_eq!(scan_integer(text, &mut marker), expected, "input: {text:?}");
        }
    }

    #[test]
    fn reference_is_maximal_munch() {
        let cases: [(&str, usize, Option<&str>); 9] = [
            ("ref1", 0, Some("ref1")),
            ("Ref1_a_b_c-d-e-f", 0, Some("Ref1_a_b_c-d-e-f")),
            ("ref1   ", 0, Some("ref1")),
            ("ref1 a b c", 0, Some("ref1")),
            ("ref1 123", 0, Some("ref1")),
            ("   ref1", 0, None),
            ("+ref1", 0, None),
            ("   ref1", 3, Some("ref1")),
            ("+ref1", 1, Some("ref1")),
        ];

        for (text, position, expected) in cases {
            let mut marker = Marker::at(position);
            assert_eq!(
                scan_reference(text, &mut marker),
                expected,
                "input: {text:?}"
            );
        }
    }

    #[test]
    fn reference_failure_does_not_advance() {
        let mut marker = Marker::new();
        assert_eq!(scan_reference("+ref1", &mut marker), None);
        assert_eq!(marker.position, 0);
    }

    #[test]
    fn whitespace_consumes_maximal_run() {
        let mut marker = Marker::new();
        assert_eq!(scan_whitespace(" \t\n x", &mut marker), Some(" \t\n "));
        assert_eq!(marker.position, 4);

        let mut marker = Marker::new();
        assert_eq!(scan_whitespace("x", &mut marker), None);
        assert_eq!(marker.position, 0);
    }

    #[test]
    fn strings_require_matching_quote_kind() {
        let mut marker = Marker::new();
        assert_eq!(
            scan_string("'hello'", &mut marker).unwrap(),
            Some("hello".to_string())
        );

        let mut marker = Marker::new();
        assert_eq!(
            scan_string(r#""it's""#, &mut marker).unwrap(),
            Some("it's".to_string())
        );

        let mut marker = Marker::new();
        assert_eq!(scan_string("hello", &mut marker).unwrap(), None);

        let mut marker = Marker::new();
        let err = scan_string("'hello", &mut marker).unwrap_err();
        assert!(matches!(
            err,
            ScanError::UnterminatedString { quote: '\'', .. }
        ));
    }

    #[test]
    fn strings_take_no_escape_sequences() {
        let mut marker = Marker::new();
        assert_eq!(
            scan_string(r#""a\n""#, &mut marker).unwrap(),
            Some("a\\n".to_string())
        );
    }

    #[test]
    fn booleans_are_exact_keywords() {
        let mut marker = Marker::new();
        assert_eq!(scan_boolean("true", &mut marker), Some(true));

        let mut marker = Marker::new();
        assert_eq!(scan_boolean("false;", &mut marker), Some(false));
        assert_eq!(marker.position, 5);

        let mut marker = Marker::new();
        assert_eq!(scan_boolean("True", &mut marker), None);
    }

    #[test]
    fn operators_match_longest_first() {
        let cases: [(&str, Option<ComparisonOp>); 7] = [
            (">=", Some(ComparisonOp::Ge)),
            ("<=", Some(ComparisonOp::Le)),
            ("/=", Some(ComparisonOp::Ne)),
            (">", Some(ComparisonOp::Gt)),
            ("<", Some(ComparisonOp::Lt)),
            ("=", Some(ComparisonOp::Eq)),
            ("n", None),
        ];

        for (text, expected) in cases {
            let mut marker = Marker::new();
            assert_eq!(scan_operator(text, &mut marker), expected, "input: {text:?}");
        }

        let mut marker = Marker::new();
        assert_eq!(scan_operator(">= 5", &mut marker), Some(ComparisonOp::Ge));
        assert_eq!(marker.position, 2);
    }

    #[test]
    fn operator_negation_swaps_sides() {
        assert_eq!(ComparisonOp::Le.negated(), ComparisonOp::Ge);
        assert_eq!(ComparisonOp::Lt.negated(), ComparisonOp::Gt);
        assert_eq!(ComparisonOp::Eq.negated(), ComparisonOp::Eq);
        assert_eq!(ComparisonOp::Ne.negated(), ComparisonOp::Ne);
    }
}
