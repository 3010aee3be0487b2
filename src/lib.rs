pub mod client;
pub mod escape;
pub mod formatter;
pub mod session;

pub use client::{
    DetailRequest, Difficulty, GenerateRequest, GeneratedText, SelectionDetails, TutorClient,
    TutorConfig, TutorError,
};
pub use escape::{escape_html, format_for_display, unescape_html};
pub use formatter::{MetaCommentaryFilter, TranslationFormatter};
pub use session::{OutputPanels, SessionError, StudySession};
