//! Seam to the third-party editor widget.

use renderer_protocol::{LanguageGrammar, ThemeBase, ThemeDefinition};

/// The editor widget integration the client drives.
///
/// Implementations own the actual tokenizer engine, the read-only editor
/// instances and their layout.
pub trait EditorWidget: Send + Sync {
    /// Hand the tokenizer engine binary to the widget.
    fn load_tokenizer(&self, engine: &[u8]);

    /// Register (or re-register) a language grammar.
    fn register_language(&self, grammar: &LanguageGrammar);

    /// Register or override a named color theme.
    fn define_theme(&self, name: &str, theme: &ThemeDefinition);

    /// Create the (empty) display area for an output so layout is stable
    /// before any content arrives.
    fn reserve_display(&self, output_id: &str, base: ThemeBase);

    /// Show a read-only editor for an output.
    fn show(&self, view: &EditorView);

    /// Tear down one output, or every output when `output_id` is `None`.
    fn dispose(&self, output_id: Option<&str>);
}

/// A read-only editor ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorView {
    pub output_id: String,
    pub language_id: String,
    pub text: String,
    /// Registered theme name to activate.
    pub theme_name: String,
}
