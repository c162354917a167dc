//! Literal escaping for generated source.

/// Converts literal template text into a source literal.
///
/// The result must read back as exactly the same string when embedded in
/// generated code.
pub trait Escape: Send + Sync {
    fn escape(&self, literal: &str) -> String;
}

/// Escapes text as a double-quoted JSON string.
///
/// U+2028 and U+2029 are valid inside JSON strings but terminate lines in
/// older JavaScript engines, so they are always written as escapes.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEscaper;

impl Escape for JsonEscaper {
    fn escape(&self, literal: &str) -> String {
        serde_json::Value::String(literal.to_owned())
            .to_string()
            .replace('\u{2028}', "\\u2028")
            .replace('\u{2029}', "\\u2029")
    }
}
