//! `%TOKEN%` expansion for directory paths.
//!
//! Installer paths reference well-known device folders through symbolic tokens such as
//! `%CE2%` (`\Windows`). Expansion is a single left-to-right pass:
//! - `%%` is an escaped literal `%` and never starts or ends a token,
//! - `%word%` (`word` made of letters, digits or `_`) is replaced when `word` is in the table,
//! - unknown tokens are left as-is, percent signs included,
//! - replacement text is never re-scanned.
//!
//! Because `%%` is resolved before any token is recognised, an escaped percent can never be
//! glued into a token name: `%CE2%%%CE1%` reads as `%CE2`, an escaped `%`, then `%CE1%`, and
//! becomes `%CE2%\Program Files`. Tools that swap `%%` for a word character before matching
//! see a single unknown token there instead and produce `%CE2%%CE1%`.

use indexmap::IndexMap;
use serde::Serialize;

/// Symbolic token → path fragment lookup.
///
/// Passed explicitly to every expansion so callers can override entries (for example the
/// install directory behind `%CE0%`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct PlaceholderTable(IndexMap<String, String>);

const CE_DIRECTORIES: [(&str, &str); 18] = [
    ("CE0", "InstallDir"),
    ("CE1", "\\Program Files"),
    ("CE2", "\\Windows"),
    ("CE3", "\\Windows\\Desktop"),
    ("CE4", "\\Windows\\StartUp"),
    ("CE5", "\\My Documents"),
    ("CE6", "\\Program Files\\Accessories"),
    ("CE7", "\\Program Files\\Communications"),
    ("CE8", "\\Program Files\\Games"),
    ("CE9", "\\Program Files\\Pocket Outlook"),
    ("CE10", "\\Program Files\\Office"),
    ("CE11", "\\Windows\\Programs"),
    ("CE12", "\\Windows\\Programs\\Accessories"),
    ("CE13", "\\Windows\\Programs\\Communications"),
    ("CE14", "\\Windows\\Programs\\Games"),
    ("CE15", "\\Windows\\Fonts"),
    ("CE16", "\\Windows\\Recent"),
    ("CE17", "\\Windows\\Favorites"),
];

impl PlaceholderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The 18 built-in `%CE0%`..`%CE17%` device folders.
    pub fn ce_directories() -> Self {
        CE_DIRECTORIES
            .iter()
            .map(|&(token, path)| (token.to_owned(), path.to_owned()))
            .collect()
    }

    /// Override the value behind `%CE0%`.
    pub fn with_install_dir(mut self, install_dir: impl Into<String>) -> Self {
        self.insert("CE0", install_dir);
        self
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.0.insert(token.into(), value.into());
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.0.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PlaceholderTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        PlaceholderTable(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Expand tokens inside a run of text that contains no `%%` escapes.
fn substitute_run(run: &str, table: &PlaceholderTable, out: &mut String) {
    let mut rest = run;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let word_len = after
            .char_indices()
            .find(|&(_, c)| !is_word_char(c))
            .map_or(after.len(), |(idx, _)| idx);

        if word_len > 0 && after[word_len..].starts_with('%') {
            let word = &after[..word_len];
            match table.get(word) {
                Some(value) => out.push_str(value),
                None => {
                    out.push('%');
                    out.push_str(word);
                    out.push('%');
                }
            }
            rest = &after[word_len + 1..];
        } else {
            out.push('%');
            rest = after;
        }
    }
    out.push_str(rest);
}

/// Expand every `%TOKEN%` of `text` found in `table`. See the module docs for the rules.
pub fn substitute(text: &str, table: &PlaceholderTable) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, run) in text.split("%%").enumerate() {
        if i > 0 {
            out.push('%');
        }
        substitute_run(run, table, &mut out);
    }
    out
}
