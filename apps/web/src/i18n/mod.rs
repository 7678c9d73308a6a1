//! Dictionary-based translations for the two site languages.
//!
//! Catalogs are nested JSON objects whose leaves are strings or lists of
//! strings. Keys are dotted paths (`pricing.importers.features`).

pub mod extract;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::warn;

pub use extract::Lang;

const EN_CATALOG: &str = include_str!("../../locales/en.json");
const ES_CATALOG: &str = include_str!("../../locales/es.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Es];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }

    /// Accepts `en`, `ES`, `es-CO`, `en_US`...
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.split(['-', '_']).next().unwrap_or("") {
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            _ => None,
        }
    }

    /// The language the toggle switches to.
    pub fn other(self) -> Self {
        match self {
            Language::En => Language::Es,
            Language::Es => Language::En,
        }
    }
}

/// A catalog leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationValue {
    Text(String),
    List(Vec<String>),
}

/// Both language dictionaries, parsed once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    en: Value,
    es: Value,
}

impl Catalog {
    /// Catalogs compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EN_CATALOG, ES_CATALOG)
    }

    pub fn from_json(en: &str, es: &str) -> Result<Self> {
        Ok(Catalog {
            en: serde_json::from_str(en).context("English catalog is not valid JSON")?,
            es: serde_json::from_str(es).context("Spanish catalog is not valid JSON")?,
        })
    }

    pub fn translator(&self, language: Language) -> Translator<'_> {
        let root = match language {
            Language::En => &self.en,
            Language::Es => &self.es,
        };
        Translator { root, language }
    }

    /// Every leaf key defined for a language, sorted.
    pub fn keys(&self, language: Language) -> Vec<String> {
        let mut keys = Vec::new();
        collect_keys(self.translator(language).root, "", &mut keys);
        keys.sort();
        keys
    }
}

fn collect_keys(value: &Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                collect_keys(v, &key, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

/// Lookup handle bound to one language.
#[derive(Debug, Clone, Copy)]
pub struct Translator<'a> {
    root: &'a Value,
    language: Language,
}

impl<'a> Translator<'a> {
    pub fn language(&self) -> Language {
        self.language
    }

    /// Walks the dotted key. `None` when any segment is missing or the
    /// leaf is not a string / list of strings.
    pub fn lookup(&self, key: &str) -> Option<TranslationValue> {
        let mut node = self.root;
        for segment in key.split('.') {
            node = node.as_object()?.get(segment)?;
        }
        match node {
            Value::String(s) => Some(TranslationValue::Text(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
                .map(TranslationValue::List),
            _ => None,
        }
    }

    /// Text for `key`; falls back to the key itself.
    pub fn t(&self, key: &str) -> String {
        match self.lookup(key) {
            Some(TranslationValue::Text(s)) => s,
            Some(TranslationValue::List(items)) => items.join(", "),
            None => {
                self.missing(key);
                key.to_string()
            }
        }
    }

    /// Text for `key` with every `{{name}}` replaced by its value.
    pub fn t_with(&self, key: &str, vars: &[(&str, &str)]) -> String {
        interpolate(self.t(key), vars)
    }

    /// List for `key`. A plain string becomes a one-item list; a missing
    /// key yields an empty list.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.lookup(key) {
            Some(TranslationValue::List(items)) => items,
            Some(TranslationValue::Text(s)) => vec![s],
            None => {
                self.missing(key);
                Vec::new()
            }
        }
    }

    fn missing(&self, key: &str) {
        warn!(
            "Translation key \"{key}\" not found for language \"{}\"",
            self.language.as_str()
        );
    }
}

fn interpolate(template: String, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template, |acc, (name, value)| {
        acc.replace(&format!("{{{{{name}}}}}"), value)
    })
}
