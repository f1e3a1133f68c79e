//! Client model hints
//!
//! Clients may send `"ollama"`, `"gemini:gemini-2.5-pro"` and the like to pin
//! a provider. Anything unrecognized falls back to the normal chain.

use crate::util::is_valid_model_name;
use std::fmt;
use tracing::debug;

/// Names of the providers chatgate knows how to build
pub const KNOWN_PROVIDERS: &[&str] = &["ollama", "gemini", "huggingface"];

/// Provider selection requested by the client
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModelHint {
    /// Walk the fallback chain
    #[default]
    Auto,
    /// Call exactly one provider, no fallback
    Explicit {
        /// Provider name
        provider: String,
        /// Model override, if one was given
        model: Option<String>,
    },
}

impl ModelHint {
    /// Parse a raw hint against a set of provider names.
    ///
    /// `None`, empty and `"auto"` select the chain. `"<provider>"` and
    /// `"<provider>:<model>"` select one provider when the name is known and
    /// the model name passes [`is_valid_model_name`].
    #[must_use]
    pub fn parse(raw: Option<&str>, known: &[&str]) -> Self {
        let raw = match raw.map(str::trim) {
            None | Some("") => return Self::Auto,
            Some(r) if r.eq_ignore_ascii_case("auto") => return Self::Auto,
            Some(r) => r,
        };

        let (name, model) = match raw.split_once(':') {
            Some((name, model)) => (name.trim(), Some(model.trim())),
            None => (raw, None),
        };

        let model = model.filter(|m| !m.is_empty());
        if let Some(m) = model {
            if !is_valid_model_name(m) {
                debug!(hint = %raw, "Model hint has an unusable model name, using fallback chain");
                return Self::Auto;
            }
        }

        match known.iter().find(|k| k.eq_ignore_ascii_case(name)) {
            Some(provider) => Self::Explicit {
                provider: (*provider).to_string(),
                model: model.map(str::to_string),
            },
            None => {
                debug!(hint = %raw, "Unrecognized model hint, using fallback chain");
                Self::Auto
            }
        }
    }
}

impl fmt::Display for ModelHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Explicit {
                provider,
                model: Some(model),
            } => write!(f, "{}:{}", provider, model),
            Self::Explicit {
                provider,
                model: None,
            } => write!(f, "{}", provider),
        }
    }
}
