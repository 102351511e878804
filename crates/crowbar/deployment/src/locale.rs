//! Localization of user-facing defaults

use crate::config::LocaleConfig;
use std::collections::HashMap;

/// Key of the default proposal name
pub const DEFAULT_DEPLOYMENT_KEY: &str = "default";

/// Translates string keys for the configured language
pub trait Localizer: Send + Sync {
    /// Translate `key`, echoing the key when no translation exists
    fn translate(&self, key: &str) -> String;

    fn language(&self) -> &str;
}

/// Built-in string tables plus configured overrides
#[derive(Debug, Clone)]
pub struct StaticLocalizer {
    language: String,
    strings: HashMap<String, String>,
}

impl StaticLocalizer {
    pub fn new(language: impl Into<String>) -> Self {
        let language = language.into();
        let strings = builtin_table(&language);
        Self { language, strings }
    }

    pub fn from_config(config: &LocaleConfig) -> Self {
        let mut localizer = Self::new(config.language.clone());
        localizer.strings.extend(
            config
                .strings
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        localizer
    }

    pub fn with_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.strings.insert(key.into(), value.into());
        self
    }
}

impl Default for StaticLocalizer {
    fn default() -> Self {
        Self::new("en")
    }
}

impl Localizer for StaticLocalizer {
    fn translate(&self, key: &str) -> String {
        self.strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    fn language(&self) -> &str {
        &self.language
    }
}

// Only English ships; other languages start from it.
fn builtin_table(_language: &str) -> HashMap<String, String> {
    [(DEFAULT_DEPLOYMENT_KEY, "default")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_in_english() {
        let localizer = StaticLocalizer::default();
        assert_eq!(localizer.translate(DEFAULT_DEPLOYMENT_KEY), "default");
        assert_eq!(localizer.language(), "en");
    }

    #[test]
    fn test_unknown_key_echoes() {
        assert_eq!(StaticLocalizer::default().translate("nope"), "nope");
    }

    #[test]
    fn test_config_overrides() {
        let mut config = LocaleConfig {
            language: "de".into(),
            ..Default::default()
        };
        config
            .strings
            .insert(DEFAULT_DEPLOYMENT_KEY.into(), "standard".into());

        let localizer = StaticLocalizer::from_config(&config);
        assert_eq!(localizer.language(), "de");
        assert_eq!(localizer.translate(DEFAULT_DEPLOYMENT_KEY), "standard");
    }
}
