use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::escape::{escape_html, format_for_display};

/// Paragraph body used when the raw translation is empty or whitespace.
pub const NO_TRANSLATION_FALLBACK: &str = "No translation available.";

/// CSS class on the `<ul>` wrapping a multi-option translation.
pub const TRANSLATION_LIST_CLASS: &str = "translation-list";

/// CSS class on the `<span>` wrapping a parenthesized nuance annotation.
pub const NUANCE_CLASS: &str = "translation-nuance";

// A lone surviving line at or above this length is rendered as a list
// rather than a plain paragraph.
const SIMPLE_PHRASE_MAX_CHARS: usize = 80;

// Boilerplate sentences LLM translation responses open with. Anchored at
// the start of the line; matched case-insensitively against the cleaned line.
const DEFAULT_META_PATTERNS: &[&str] = &[
    r"^\s*here are a few options:?",
    r"^\s*the best translation .* depends on the context:?",
    r"^\s*to choose the best option, please provide the sentence.*",
    r"^\s*note:",
    r"^\s*important:",
    r"^\s*also consider:",
    r"^\s*alternatively:",
    r"^\s*possible translations include:?",
];

static DEFAULT_FILTER_SET: Lazy<Vec<Regex>> = Lazy::new(|| {
    DEFAULT_META_PATTERNS
        .iter()
        .map(|pattern| compile_meta_pattern(pattern).expect("default meta pattern compiles"))
        .collect()
});

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[*-]\s+").expect("list marker pattern compiles"));
// Both emphasis spans must open on a non-space character, so stray
// asterisks in ordinary text ("5 * 3 * 2") are left alone.
static BOLD_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(\S.*?)\*\*").expect("bold span pattern compiles"));
static ITALIC_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^\s*][^*]*)\*").expect("italic span pattern compiles"));
static NUANCE_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.*?\)").expect("nuance span pattern compiles"));
static NUANCE_REPLACEMENT: Lazy<String> =
    Lazy::new(|| format!(r#"<span class="{NUANCE_CLASS}">${{0}}</span>"#));

fn compile_meta_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Recognizes meta-commentary lines: sentences that describe a translation
/// response instead of translating ("Here are a few options:", "Note: ...").
///
/// The pattern set is configuration. The default set covers the phrasings
/// observed in LLM output so far; callers can extend it without touching the
/// formatting algorithm.
#[derive(Debug, Clone)]
pub struct MetaCommentaryFilter {
    patterns: Vec<Regex>,
}

impl Default for MetaCommentaryFilter {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_FILTER_SET.clone(),
        }
    }
}

impl MetaCommentaryFilter {
    /// Builds a filter from a custom pattern set, replacing the defaults.
    /// Patterns are compiled case-insensitively.
    pub fn with_patterns(patterns: &[&str]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|pattern| compile_meta_pattern(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Adds one pattern to the set.
    pub fn extend(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.patterns.push(compile_meta_pattern(pattern)?);
        Ok(())
    }

    /// Whether the line is meta-commentary and should be discarded.
    pub fn is_meta(&self, line: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(line))
    }
}

/// Converts a raw multi-line translation response into an HTML fragment:
/// either a single paragraph or a `<ul>` of options with nuance annotations.
#[derive(Debug, Clone, Default)]
pub struct TranslationFormatter {
    filter: MetaCommentaryFilter,
}

impl TranslationFormatter {
    pub fn new(filter: MetaCommentaryFilter) -> Self {
        Self { filter }
    }

    /// The surviving translation lines after cleanup, in input order:
    /// trimmed, list markers stripped, meta-commentary and blanks dropped.
    pub fn clean_lines(&self, raw: &str) -> Vec<String> {
        raw.lines()
            .filter_map(|line| self.clean_line(line))
            .collect()
    }

    /// Renders a raw translation response as an HTML fragment.
    ///
    /// Lines are cleaned first ([`Self::clean_lines`]). A single short line
    /// without `(` or `:` renders as a plain paragraph; anything else
    /// renders as a `<ul class="translation-list">` whose items carry
    /// nuance spans around parentheticals. When nothing survives cleanup
    /// the original text comes back as an escaped paragraph, or the
    /// [`NO_TRANSLATION_FALLBACK`] paragraph when the input itself was
    /// empty. Never fails; every input maps to some renderable fragment.
    ///
    /// All text is escaped before any markup is introduced, so parentheses
    /// or emphasis markers inside hostile input cannot inject tags.
    pub fn format(&self, raw: &str) -> String {
        let lines = self.clean_lines(raw);

        if lines.is_empty() {
            if raw.trim().is_empty() {
                return format!("<p>{NO_TRANSLATION_FALLBACK}</p>");
            }
            return format!("<p>{}</p>", format_for_display(raw));
        }

        if let [line] = lines.as_slice() {
            let simple = line.chars().count() < SIMPLE_PHRASE_MAX_CHARS
                && !line.contains('(')
                && !line.contains(':');
            if simple {
                return format!("<p>{}</p>", render_inline(line));
            }
        }

        let items: String = lines
            .iter()
            .map(|line| format!("<li>{}</li>", render_item(line)))
            .collect();
        format!(r#"<ul class="{TRANSLATION_LIST_CLASS}">{items}</ul>"#)
    }

    fn clean_line(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        let stripped = LIST_MARKER.replace(trimmed, "");
        let stripped = stripped.trim();
        if stripped.is_empty() || self.filter.is_meta(stripped) {
            return None;
        }
        Some(stripped.to_string())
    }
}

// Escapes a cleaned line and converts surviving markdown emphasis. Bold
// runs first so `**` pairs are consumed before the single-star pass.
fn render_inline(line: &str) -> String {
    let escaped = escape_html(line);
    let bolded = BOLD_SPAN.replace_all(&escaped, "<strong>${1}</strong>");
    ITALIC_SPAN.replace_all(&bolded, "<em>${1}</em>").into_owned()
}

// List-item form: inline rendering plus nuance spans. Wrapping happens
// after escaping, so parentheses inside unsafe text cannot inject markup.
fn render_item(line: &str) -> String {
    let inline = render_inline(line);
    NUANCE_SPAN
        .replace_all(&inline, NUANCE_REPLACEMENT.as_str())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::unescape_html;

    fn fragment(raw: &str) -> String {
        TranslationFormatter::default().format(raw)
    }

    #[test]
    fn empty_input_yields_fallback_paragraph() {
        assert_eq!(fragment(""), "<p>No translation available.</p>");
    }

    #[test]
    fn whitespace_input_yields_fallback_paragraph() {
        assert_eq!(fragment("   "), "<p>No translation available.</p>");
    }

    #[test]
    fn single_short_phrase_renders_as_paragraph() {
        assert_eq!(fragment("hola"), "<p>hola</p>");
    }

    #[test]
    fn options_render_as_list_with_nuance_spans() {
        let raw = "* **Hola** - informal greeting\n* **Buenos días** (formal)";
        let html = fragment(raw);
        assert_eq!(
            html,
            concat!(
                r#"<ul class="translation-list">"#,
                "<li><strong>Hola</strong> - informal greeting</li>",
                "<li><strong>Buenos días</strong> ",
                r#"<span class="translation-nuance">(formal)</span></li>"#,
                "</ul>"
            )
        );
        assert!(!html.contains('*'), "list markers must not survive: {html}");
    }

    #[test]
    fn meta_commentary_lines_are_dropped() {
        let raw = "Here are a few options:\nлише (only, simply)\nтільки (only, just)";
        let html = fragment(raw);
        assert!(!html.contains("options"));
        assert!(html.starts_with(r#"<ul class="translation-list">"#));
        assert!(html.contains(r#"<span class="translation-nuance">(only, simply)</span>"#));
    }

    #[test]
    fn meta_matching_is_case_insensitive() {
        let formatter = TranslationFormatter::default();
        assert!(formatter.clean_lines("NOTE: anything").is_empty());
        assert!(formatter.clean_lines("here are a few options").is_empty());
        assert!(formatter.clean_lines("Possible translations include:").is_empty());
    }

    #[test]
    fn meta_only_input_falls_back_to_original_text() {
        assert_eq!(
            fragment("Note: context matters"),
            "<p>Note: context matters</p>"
        );
    }

    #[test]
    fn fallback_paragraph_keeps_line_breaks() {
        assert_eq!(
            fragment("Note: first\nImportant: second"),
            "<p>Note: first<br>Important: second</p>"
        );
    }

    #[test]
    fn colon_forces_list_rendering() {
        let html = fragment("hola: an informal greeting");
        assert!(html.starts_with(r#"<ul class="translation-list">"#), "{html}");
    }

    #[test]
    fn long_single_line_forces_list_rendering() {
        let line = "a".repeat(SIMPLE_PHRASE_MAX_CHARS);
        let html = fragment(&line);
        assert!(html.starts_with(r#"<ul class="translation-list">"#), "{html}");
    }

    #[test]
    fn html_in_list_items_is_escaped() {
        let html = fragment("<script>alert('x')</script>");
        assert!(!html.contains("<script>"), "{html}");
        assert!(html.contains("&lt;script&gt;"), "{html}");
    }

    #[test]
    fn html_in_simple_phrase_is_escaped() {
        assert_eq!(fragment("5 < 6"), "<p>5 &lt; 6</p>");
    }

    #[test]
    fn dash_markers_are_stripped() {
        let html = fragment("- tylko (only)\n- jedynie (merely)");
        assert!(!html.contains("- tylko"), "{html}");
        assert!(html.contains("<li>tylko"), "{html}");
    }

    #[test]
    fn emphasis_without_marker_is_preserved() {
        assert_eq!(fragment("*hola*"), "<p><em>hola</em></p>");
        assert_eq!(fragment("**hola**"), "<p><strong>hola</strong></p>");
    }

    #[test]
    fn stray_asterisks_are_not_emphasis() {
        assert_eq!(fragment("5 * 3 * 2"), "<p>5 * 3 * 2</p>");
    }

    #[test]
    fn marker_stripping_keeps_leading_bold() {
        let formatter = TranslationFormatter::default();
        assert_eq!(
            formatter.clean_lines("* **Hola** - informal greeting"),
            vec!["**Hola** - informal greeting".to_string()]
        );
    }

    #[test]
    fn custom_pattern_extends_the_filter() {
        let mut filter = MetaCommentaryFilter::default();
        filter
            .extend(r"^\s*translator'?s note:")
            .expect("pattern compiles");
        let formatter = TranslationFormatter::new(filter);
        assert_eq!(
            formatter.format("Translator's note: archaic\nthou"),
            "<p>thou</p>"
        );
    }

    #[test]
    fn replacement_pattern_set_drops_defaults() {
        let filter = MetaCommentaryFilter::with_patterns(&[r"^\s*fyi:"]).expect("set compiles");
        let formatter = TranslationFormatter::new(filter);
        // "Note:" is no longer filtered, "fyi:" is.
        assert!(formatter.clean_lines("Note: kept now").len() == 1);
        assert!(formatter.clean_lines("FYI: dropped").is_empty());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        assert!(MetaCommentaryFilter::with_patterns(&["("]).is_err());
    }

    // Recovers the cleaned text content of a fragment: item/line breaks
    // back to newlines, tags dropped, entities decoded.
    fn fragment_to_text(html: &str) -> String {
        let with_breaks = html.replace("</li>", "\n").replace("<br>", "\n");
        let tags = Regex::new(r"<[^>]+>").expect("tag pattern compiles");
        unescape_html(tags.replace_all(&with_breaks, "").trim())
    }

    #[test]
    fn reformatting_clean_text_is_stable() {
        for raw in [
            "hola",
            "Tom & Jerry",
            "лише (only, simply)\nтільки (only, just)",
        ] {
            let first = fragment(raw);
            let second = fragment(&fragment_to_text(&first));
            assert_eq!(first, second, "rendering drifted for {raw:?}");
        }
    }
}
