/// Prefix of the credit lines the site injects into chapter text.
pub const TRANSLATOR_MARKER: &str = "Переводчик";

/// Drops every line that starts with [`TRANSLATOR_MARKER`]. Other lines keep
/// their order and line breaks.
#[must_use]
pub fn strip_translator_credits(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.starts_with(TRANSLATOR_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
}
