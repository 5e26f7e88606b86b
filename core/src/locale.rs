//! Localized user-facing messages.
//!
//! Messages are looked up by key in the section named after the configured
//! language (upper-cased). The embedded `locale.toml` is consulted first, a
//! `locale.toml` next to the config file overrides it, and missing keys fall
//! back to the built-in English texts.

use std::{collections::HashMap, path::Path};

use maplit::hashmap;
use once_cell::sync::Lazy;

use crate::config::Asset;

pub const LOCALE_FILENAME: &str = "locale.toml";

static DEFAULTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    hashmap! {
        "TestingComplete" => "Testing completed:",
        "CompilerNotFound" => "Compiler not found:",
        "NotExists" => "Doesn't exist:",
        "Compiling" => "Compiling",
        "Test" => "Test",
        "Testing" => "Testing...",
        "NoAccess" => "No access to",
        "ConfigCreated" => "Configuration file was created. Edit it and run olympcheck again.",
        "Error" => "ERROR",
        "LookingForTests" => "Looking for tests...",
        "RemovingTemp" => "Removing temporary files...",
        "MaxTime" => "Maximum time (w/o TL):",
        "AllFound" => "All specified files found.",
        "NewVersionAvailable" => "A new version is available. Download it?",
        "Downloaded" => "Download complete.",
    }
});

#[derive(Debug, Clone, Default)]
pub struct Messages {
    table: HashMap<String, String>,
}

impl Messages {
    /// Loads messages for `lang`. Unreadable or malformed locale files are skipped.
    pub fn load(lang: &str, override_dir: Option<&Path>) -> Self {
        let section = lang.trim().to_uppercase();
        let mut table = HashMap::new();

        if let Ok(embedded) = Asset::get_str(LOCALE_FILENAME) {
            Self::merge_section(&mut table, &embedded, &section);
        }
        if let Some(dir) = override_dir {
            let path = dir.join(LOCALE_FILENAME);
            if path.is_file() {
                match fsutil::read_to_string(&path) {
                    Ok(s) => Self::merge_section(&mut table, &s, &section),
                    Err(e) => log::warn!("Ignoring locale file: {:#}", e),
                }
            }
        }
        Self { table }
    }

    fn merge_section(table: &mut HashMap<String, String>, toml_str: &str, section: &str) {
        let doc: toml::Table = match toml::from_str(toml_str) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("Malformed locale file: {}", e);
                return;
            }
        };
        let Some(toml::Value::Table(entries)) = doc.get(section) else {
            return
        };
        for (key, value) in entries {
            if let toml::Value::String(s) = value {
                table.insert(key.to_owned(), s.to_owned());
            }
        }
    }

    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.table
            .get(key)
            .map(String::as_str)
            .or_else(|| DEFAULTS.get(key).copied())
            .unwrap_or(key)
    }

    pub fn testing_complete(&self) -> &str {
        self.get("TestingComplete")
    }

    pub fn compiler_not_found(&self) -> &str {
        self.get("CompilerNotFound")
    }

    pub fn not_exists(&self) -> &str {
        self.get("NotExists")
    }

    pub fn compiling(&self) -> &str {
        self.get("Compiling")
    }

    pub fn test(&self) -> &str {
        self.get("Test")
    }

    pub fn testing(&self) -> &str {
        self.get("Testing")
    }

    pub fn no_access(&self) -> &str {
        self.get("NoAccess")
    }

    pub fn config_created(&self) -> &str {
        self.get("ConfigCreated")
    }

    pub fn error(&self) -> &str {
        self.get("Error")
    }

    pub fn looking_for_tests(&self) -> &str {
        self.get("LookingForTests")
    }

    pub fn removing_temp(&self) -> &str {
        self.get("RemovingTemp")
    }

    pub fn max_time(&self) -> &str {
        self.get("MaxTime")
    }

    pub fn all_found(&self) -> &str {
        self.get("AllFound")
    }

    pub fn new_version_available(&self) -> &str {
        self.get("NewVersionAvailable")
    }

    pub fn downloaded(&self) -> &str {
        self.get("Downloaded")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn embedded_languages_are_available() {
        let en = Messages::load("en", None);
        assert_eq!(en.testing_complete(), "Testing completed:");

        let ru = Messages::load("ru", None);
        assert_eq!(ru.error(), "ОШИБКА");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let m = Messages::load("xx", None);
        assert_eq!(m.max_time(), "Maximum time (w/o TL):");
        assert_eq!(m.get("NoSuchKey"), "NoSuchKey");
    }

    #[test]
    fn override_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LOCALE_FILENAME),
            "[EN]\nTest = \"Case\"\n",
        )
        .unwrap();

        let m = Messages::load("en", Some(dir.path()));
        assert_eq!(m.test(), "Case");
        assert_eq!(m.testing(), "Testing...");
    }
}
