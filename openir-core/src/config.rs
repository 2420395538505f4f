use serde::Deserialize;
use unicase::UniCase;

use crate::error::ConfigError;

/// Options that tune how a document is normalized.
///
/// Every field has a default, so an empty configuration file
/// is equivalent to [`ParserConfig::default()`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ParserConfig {
    /// Content types in order of preference, used to pick one
    /// entry from a request or response `content` map.
    ///
    /// Entries can be exact (`application/json`), structured-suffix
    /// wildcards (`*+json`), subtype wildcards (`text/*`), or `*/*`.
    pub media_types: Vec<String>,
    /// Keywords that mark a `default` response as a success.
    pub success_keywords: Vec<String>,
    /// Keywords that mark a `default` response as an error.
    pub error_keywords: Vec<String>,
    /// Fail the parse on a repeated `operationId`, instead of
    /// recording a diagnostic and renaming the repeat.
    pub strict_operation_ids: bool,
}

impl ParserConfig {
    /// Parses a configuration from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Returns the preference rank of a media type, where lower is
    /// better, or `None` if no preference matches it.
    pub(crate) fn media_type_rank(&self, media_type: &str) -> Option<usize> {
        let essence = media_type.split(';').next().unwrap_or(media_type).trim();
        self.media_types
            .iter()
            .position(|pattern| media_type_matches(pattern, essence))
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            media_types: [
                "application/json",
                "*+json",
                "multipart/form-data",
                "application/x-www-form-urlencoded",
                "text/*",
                "application/octet-stream",
                "*/*",
            ]
            .map(String::from)
            .into(),
            success_keywords: vec!["success".to_owned()],
            error_keywords: vec!["error".to_owned(), "problem".to_owned()],
            strict_operation_ids: false,
        }
    }
}

fn media_type_matches(pattern: &str, essence: &str) -> bool {
    if pattern == "*/*" {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        // Structured syntax suffix, like `application/problem+json`.
        return essence.len() > suffix.len()
            && essence
                .get(essence.len() - suffix.len()..)
                .is_some_and(|tail| UniCase::new(tail) == UniCase::new(suffix));
    }
    if let Some(ty) = pattern.strip_suffix("/*") {
        return essence
            .split_once('/')
            .is_some_and(|(head, _)| UniCase::new(head) == UniCase::new(ty));
    }
    UniCase::new(pattern) == UniCase::new(essence)
}
