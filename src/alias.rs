//! Alias lookup for target override files
//!
//! A target's `build-settings.json` may declare overrides under a canonical
//! name (`"win"`, `"msvc"`) that covers several concrete axis values
//! (`"win32"`, `"win64"`, `"msvc141"`, ...).

use serde_json::{Map, Value};

/// Built-in aliases: concrete axis value -> canonical key
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("win32", "win"),
    ("win64", "win"),
    ("msvc141", "msvc"),
    ("msvc142", "msvc"),
];

/// Static mapping from axis values to a fallback key
#[derive(Debug, Clone, Copy)]
pub struct AliasTable {
    entries: &'static [(&'static str, &'static str)],
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new(DEFAULT_ALIASES)
    }
}

impl AliasTable {
    pub const fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { entries }
    }

    /// Canonical key registered for `key`, if any
    pub fn alias(&self, key: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(from, _)| *from == key)
            .map(|(_, to)| *to)
    }

    /// Look up `key` in `tree`, falling back to its alias, then to `default`.
    ///
    /// Aliases are followed a single hop only.
    pub fn resolve<'a>(&self, tree: &'a Map<String, Value>, key: &str, default: &'a Value) -> &'a Value {
        self.lookup(tree, key).map(|(_, value)| value).unwrap_or(default)
    }

    /// Entry of `tree` matched by `key` or its alias, with the key actually present
    pub fn lookup<'a>(&self, tree: &'a Map<String, Value>, key: &str) -> Option<(&'a str, &'a Value)> {
        tree.get_key_value(key)
            .or_else(|| self.alias(key).and_then(|alias| tree.get_key_value(alias)))
            .map(|(found, value)| (found.as_str(), value))
    }
}
