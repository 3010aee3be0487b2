use std::fmt;

use tracing::debug;

use crate::client::{DetailRequest, GenerateRequest, SelectionDetails, TutorClient, TutorError};
use crate::escape::{escape_html, format_for_display};
use crate::formatter::TranslationFormatter;

/// Selection display before any text has been picked.
pub const SELECTION_PLACEHOLDER: &str = "-";

const EXPLANATION_PROMPT: &str =
    "<h3>Explanation:</h3><p>Select text from above to get its explanation.</p>";
const TRANSLATION_PROMPT: &str =
    "<h3>Translation:</h3><p>Select text and choose a language to get its translation.</p>";
const EXPLANATION_READY: &str =
    "<h3>Explanation:</h3><p>Click 'Get Explanation &amp; Translation' to see details.</p>";
const TRANSLATION_READY: &str =
    "<h3>Translation:</h3><p>Click 'Get Explanation &amp; Translation' to see details.</p>";
const EMPTY_TOPIC_NOTICE: &str = r#"<p style="color: orange;">Please enter a topic.</p>"#;

/// The four output regions of the study page, as HTML fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPanels {
    pub passage: String,
    pub selection: String,
    pub explanation: String,
    pub translation: String,
}

impl Default for OutputPanels {
    fn default() -> Self {
        Self {
            passage: String::new(),
            selection: SELECTION_PLACEHOLDER.to_string(),
            explanation: EXPLANATION_PROMPT.to_string(),
            translation: TRANSLATION_PROMPT.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum SessionError {
    EmptyTopic,
    NoSelection,
    Client(TutorError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::EmptyTopic => write!(f, "topic must not be empty"),
            SessionError::NoSelection => {
                write!(f, "no text selected from the current passage")
            }
            SessionError::Client(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Client(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TutorError> for SessionError {
    fn from(err: TutorError) -> Self {
        SessionError::Client(err)
    }
}

/// Controller state for one study page: the current passage, the snippet
/// the learner selected from it, and the rendered output panels.
///
/// Every operation rewrites the affected panels, success or failure, so the
/// panels always hold something displayable. Raw backend or user text never
/// reaches a panel without going through the escaper.
#[derive(Debug)]
pub struct StudySession {
    client: TutorClient,
    formatter: TranslationFormatter,
    passage: Option<String>,
    selection: Option<String>,
    panels: OutputPanels,
}

impl StudySession {
    pub fn new(client: TutorClient) -> Self {
        Self::with_formatter(client, TranslationFormatter::default())
    }

    /// A session with a custom formatter, for callers that extend the
    /// meta-commentary filter.
    pub fn with_formatter(client: TutorClient, formatter: TranslationFormatter) -> Self {
        Self {
            client,
            formatter,
            passage: None,
            selection: None,
            panels: OutputPanels::default(),
        }
    }

    pub fn panels(&self) -> &OutputPanels {
        &self.panels
    }

    pub fn passage_text(&self) -> Option<&str> {
        self.passage.as_deref()
    }

    pub fn selected_text(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Requests a fresh passage and renders it into the passage panel.
    ///
    /// Any previous selection is discarded and the detail panels return to
    /// their prompts before the request goes out. A failed request clears
    /// the stored passage so stale text cannot leak into later detail
    /// requests as context.
    pub async fn generate(&mut self, request: &GenerateRequest) -> Result<&str, SessionError> {
        if request.topic.trim().is_empty() {
            self.panels.passage = EMPTY_TOPIC_NOTICE.to_string();
            return Err(SessionError::EmptyTopic);
        }
        self.clear_selection();
        self.panels.explanation = EXPLANATION_PROMPT.to_string();
        self.panels.translation = TRANSLATION_PROMPT.to_string();

        match self.client.generate_text(request).await {
            Ok(generated) => {
                debug!(chars = generated.text.chars().count(), "passage stored");
                self.panels.passage = format!("<p>{}</p>", format_for_display(&generated.text));
                let stored = self.passage.insert(generated.text);
                Ok(stored.as_str())
            }
            Err(err) => {
                self.passage = None;
                self.panels.passage = error_paragraph("Error generating text", &err);
                Err(err.into())
            }
        }
    }

    /// Records a snippet the learner picked from the passage.
    ///
    /// The snippet must be non-empty after trimming and must occur in the
    /// current passage; anything else is rejected and the previous
    /// selection, if any, stays in place.
    pub fn select(&mut self, snippet: &str) -> Result<(), SessionError> {
        let trimmed = snippet.trim();
        let in_passage = self
            .passage
            .as_deref()
            .is_some_and(|passage| passage.contains(trimmed));
        if trimmed.is_empty() || !in_passage {
            return Err(SessionError::NoSelection);
        }
        debug!(chars = trimmed.chars().count(), "selection updated");
        self.selection = Some(trimmed.to_string());
        self.panels.selection = format!("\"{}\"", escape_html(trimmed));
        self.panels.explanation = EXPLANATION_READY.to_string();
        self.panels.translation = TRANSLATION_READY.to_string();
        Ok(())
    }

    /// Drops the current selection and restores the placeholder display.
    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.panels.selection = SELECTION_PLACEHOLDER.to_string();
    }

    /// Fetches explanation and translation for the current selection and
    /// renders them into the detail panels. The full passage rides along as
    /// context for the backend.
    pub async fn request_details(
        &mut self,
        language: &str,
    ) -> Result<SelectionDetails, SessionError> {
        let Some(selection) = self.selection.clone() else {
            return Err(SessionError::NoSelection);
        };
        let request = DetailRequest {
            text: selection,
            language: language.to_string(),
            context: self.passage.clone().unwrap_or_default(),
        };

        match self.client.explain_translate(&request).await {
            Ok(details) => {
                self.panels.explanation = explanation_fragment(&details.explanation);
                self.panels.translation =
                    translation_fragment(language, &details.translation, &self.formatter);
                Ok(details)
            }
            Err(err) => {
                self.panels.explanation = format!(
                    "<h3>Explanation:</h3>{}",
                    error_paragraph("Error fetching explanation", &err)
                );
                self.panels.translation = format!(
                    "<h3>Translation:</h3>{}",
                    error_paragraph("Error fetching translation", &err)
                );
                Err(err.into())
            }
        }
    }
}

/// The explanation panel fragment for a successful detail response.
pub fn explanation_fragment(explanation: &str) -> String {
    format!(
        "<h3>Explanation:</h3><p>{}</p>",
        format_for_display(explanation)
    )
}

/// The translation panel fragment for a successful detail response, labeled
/// with the (escaped) target language.
pub fn translation_fragment(
    language: &str,
    raw_translation: &str,
    formatter: &TranslationFormatter,
) -> String {
    format!(
        "<h3>Translation (to {}):</h3>{}",
        escape_html(language),
        formatter.format(raw_translation)
    )
}

fn error_paragraph(prefix: &str, err: &TutorError) -> String {
    format!(
        r#"<p style="color: red;">{prefix}: {}</p>"#,
        format_for_display(&err.user_message())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TutorConfig;

    fn offline_session() -> StudySession {
        let client = TutorClient::new(TutorConfig::default()).expect("client builds");
        StudySession::new(client)
    }

    #[test]
    fn new_session_shows_prompts() {
        let session = offline_session();
        let panels = session.panels();
        assert_eq!(panels.passage, "");
        assert_eq!(panels.selection, "-");
        assert_eq!(panels.explanation, EXPLANATION_PROMPT);
        assert_eq!(panels.translation, TRANSLATION_PROMPT);
    }

    #[test]
    fn select_without_passage_is_rejected() {
        let mut session = offline_session();
        assert!(matches!(
            session.select("anything"),
            Err(SessionError::NoSelection)
        ));
        assert_eq!(session.panels().selection, "-");
    }

    #[test]
    fn select_requires_snippet_from_passage() {
        let mut session = offline_session();
        session.passage = Some("El cohete despegó hacia la luna.".to_string());
        assert!(matches!(
            session.select("galaxia"),
            Err(SessionError::NoSelection)
        ));
        assert!(session.select("cohete").is_ok());
        assert_eq!(session.panels().selection, "\"cohete\"");
        assert_eq!(session.selected_text(), Some("cohete"));
        assert_eq!(session.panels().explanation, EXPLANATION_READY);
        assert_eq!(session.panels().translation, TRANSLATION_READY);
    }

    #[test]
    fn selection_display_is_escaped() {
        let mut session = offline_session();
        session.passage = Some("beware of <script> tags".to_string());
        session.select("<script>").expect("snippet is in the passage");
        assert_eq!(session.panels().selection, "\"&lt;script&gt;\"");
    }

    #[test]
    fn failed_select_keeps_previous_selection() {
        let mut session = offline_session();
        session.passage = Some("un gato negro".to_string());
        session.select("gato").expect("valid selection");
        assert!(session.select("perro").is_err());
        assert_eq!(session.selected_text(), Some("gato"));
        assert_eq!(session.panels().selection, "\"gato\"");
    }

    #[test]
    fn clear_selection_restores_placeholder() {
        let mut session = offline_session();
        session.passage = Some("un gato negro".to_string());
        session.select("gato").expect("valid selection");
        session.clear_selection();
        assert_eq!(session.selected_text(), None);
        assert_eq!(session.panels().selection, "-");
    }

    #[tokio::test]
    async fn empty_topic_renders_orange_notice() {
        let mut session = offline_session();
        let request = GenerateRequest::new("   ");
        assert!(matches!(
            session.generate(&request).await,
            Err(SessionError::EmptyTopic)
        ));
        assert_eq!(session.panels().passage, EMPTY_TOPIC_NOTICE);
        // The detail panels are untouched by the early rejection.
        assert_eq!(session.panels().explanation, EXPLANATION_PROMPT);
    }

    #[tokio::test]
    async fn details_without_selection_are_rejected() {
        let mut session = offline_session();
        let result = session.request_details("Spanish").await;
        assert!(matches!(result, Err(SessionError::NoSelection)));
        assert_eq!(session.panels().explanation, EXPLANATION_PROMPT);
        assert_eq!(session.panels().translation, TRANSLATION_PROMPT);
    }

    #[test]
    fn translation_fragment_escapes_language_label() {
        let formatter = TranslationFormatter::default();
        let fragment = translation_fragment("<em>Spanish</em>", "hola", &formatter);
        assert_eq!(
            fragment,
            "<h3>Translation (to &lt;em&gt;Spanish&lt;/em&gt;):</h3><p>hola</p>"
        );
    }

    #[test]
    fn explanation_fragment_keeps_line_breaks() {
        assert_eq!(
            explanation_fragment("First.\nSecond."),
            "<h3>Explanation:</h3><p>First.<br>Second.</p>"
        );
    }
}
