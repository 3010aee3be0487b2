/// Escapes the five HTML-special characters so arbitrary text can be
/// embedded in a fragment. Ampersand is replaced first so the entities
/// produced by the later replacements survive intact.
pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Inverse of [`escape_html`]. Ampersand is restored last so a literal
/// `&amp;lt;` decodes to `&lt;` rather than `<`.
pub fn unescape_html(input: &str) -> String {
    input
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}

/// Paragraph-body form of a text blob: escaped, with newlines rendered
/// as `<br>`.
pub fn format_for_display(input: &str) -> String {
    escape_html(input).replace('\n', "<br>")
}
