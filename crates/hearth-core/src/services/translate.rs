use std::collections::HashMap;

/// Locale-aware text lookup.
pub trait Translator: Send + Sync {
    /// Locale used when the caller does not specify one.
    fn default_locale(&self) -> &str;

    /// Looks up `key` for `locale`.
    ///
    /// Falls back to the default locale, then to the key itself.
    fn translate(&self, locale: &str, key: &str) -> String;

    /// Looks up `key` and substitutes `{name}` placeholders.
    fn translate_with(&self, locale: &str, key: &str, vars: &[(&str, &str)]) -> String {
        vars.iter()
            .fold(self.translate(locale, key), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}

/// [`Translator`] backed by an in-memory `locale → key → text` catalog.
#[derive(Debug, Clone)]
pub struct CatalogTranslator {
    default_locale: String,
    catalog: HashMap<String, HashMap<String, String>>,
}

impl CatalogTranslator {
    /// Creates a translator over `catalog`.
    pub fn new(
        default_locale: impl Into<String>,
        catalog: HashMap<String, HashMap<String, String>>,
    ) -> Self {
        Self {
            default_locale: default_locale.into(),
            catalog,
        }
    }

    fn lookup(&self, locale: &str, key: &str) -> Option<&String> {
        self.catalog.get(locale).and_then(|texts| texts.get(key))
    }
}

impl Default for CatalogTranslator {
    fn default() -> Self {
        Self::new("en", HashMap::new())
    }
}

impl Translator for CatalogTranslator {
    fn default_locale(&self) -> &str {
        &self.default_locale
    }

    fn translate(&self, locale: &str, key: &str) -> String {
        self.lookup(locale, key)
            .or_else(|| self.lookup(&self.default_locale, key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator() -> CatalogTranslator {
        let mut en = HashMap::new();
        en.insert("greet".to_string(), "Hello, {user}!".to_string());
        en.insert("bye".to_string(), "Bye".to_string());
        let mut de = HashMap::new();
        de.insert("greet".to_string(), "Hallo, {user}!".to_string());
        CatalogTranslator::new("en", HashMap::from([("en".into(), en), ("de".into(), de)]))
    }

    #[test]
    fn test_fallback_chain() {
        let t = translator();
        assert_eq!(t.translate("de", "greet"), "Hallo, {user}!");
        assert_eq!(t.translate("de", "bye"), "Bye");
        assert_eq!(t.translate("fr", "missing.key"), "missing.key");
    }

    #[test]
    fn test_placeholder_substitution() {
        let t = translator();
        assert_eq!(t.translate_with("en", "greet", &[("user", "ana")]), "Hello, ana!");
    }
}
