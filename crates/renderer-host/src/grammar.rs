//! Language grammar and language-configuration resolution.

use std::path::{Component, Path, PathBuf};

use log::debug;
use renderer_protocol::LanguageGrammar;
use serde_json::{Map, Value};

use crate::manifest::{GrammarContribution, InstalledExtension};
use crate::resolver::{cached, read_text, ResolveError, Resolver};

impl Resolver {
    /// Grammar bundle for `language_id`.
    ///
    /// Always succeeds: a language nobody contributes a grammar for gets an
    /// empty grammar body and an empty configuration object.
    pub async fn request_tm_language(&self, language_id: &str) -> LanguageGrammar {
        let configuration = self.language_configuration(language_id).await;
        let grammar = self.grammar_text(language_id).await;

        LanguageGrammar {
            language_id: language_id.to_string(),
            scope_name: LanguageGrammar::scope_name_for(language_id),
            language_json: grammar.unwrap_or_default(),
            language_configuration: configuration
                .map(Value::String)
                .unwrap_or_else(|| Value::Object(Map::new())),
            extensions: Vec::new(),
        }
    }

    async fn grammar_text(&self, language_id: &str) -> Option<String> {
        cached(&self.grammars, language_id, "grammar", || async move {
            let Some((extension, grammar)) =
                find_grammar(self.extensions.extensions(), language_id)
            else {
                debug!("[renderer-host] No grammar contributed for {}", language_id);
                return Ok(None);
            };
            let relative = grammar.path.as_deref().ok_or_else(|| {
                ResolveError::MissingPath(format!(
                    "{} grammar in extension {}",
                    language_id, extension.id
                ))
            })?;
            let path = extension.root.join(relative);
            debug!("[renderer-host] Reading {} grammar from {:?}", language_id, path);
            read_text(&path).await.map(Some)
        })
        .await
    }

    async fn language_configuration(&self, language_id: &str) -> Option<String> {
        cached(
            &self.configurations,
            language_id,
            "language configuration",
            || async move {
                match find_language_configuration(&self.builtin_extensions_dir, language_id) {
                    Some(path) => read_text(&path).await.map(Some),
                    None => Ok(None),
                }
            },
        )
        .await
    }
}

/// First grammar contribution for `language_id`, in extension order.
pub fn find_grammar<'a>(
    extensions: &'a [InstalledExtension],
    language_id: &str,
) -> Option<(&'a InstalledExtension, &'a GrammarContribution)> {
    extensions.iter().find_map(|extension| {
        let contributions = extension.manifest.contributions()?;
        contributions
            .grammars
            .iter()
            .find(|g| g.language.as_deref() == Some(language_id))
            .map(|grammar| (extension, grammar))
    })
}

/// `<extensions>/<lang>/language-configuration.json`, or failing that
/// `<extensions>/<lang>/<lang>-language-configuration.json`.
pub fn find_language_configuration(extensions_dir: &Path, language_id: &str) -> Option<PathBuf> {
    if !is_plain_name(language_id) {
        return None;
    }
    let dir = extensions_dir.join(language_id);
    [
        dir.join("language-configuration.json"),
        dir.join(format!("{}-language-configuration.json", language_id)),
    ]
    .into_iter()
    .find(|candidate| candidate.is_file())
}

/// A single normal path component, so it cannot escape the extensions root.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
