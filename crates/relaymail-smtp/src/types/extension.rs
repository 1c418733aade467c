//! Extension table advertised in the EHLO response.

use std::collections::HashMap;

/// Extensions discovered from an EHLO response.
///
/// Maps the upper-cased keyword to its parameter string (empty when the
/// server sent none). Lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    table: HashMap<String, String>,
}

impl Extensions {
    /// Creates an empty table, as assumed after a HELO greeting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the lines of an EHLO reply.
    ///
    /// The first line is the server's descriptive text and is skipped. Each
    /// remaining line is `KEYWORD[ PARAMETER]`; a later duplicate keyword
    /// replaces an earlier one.
    #[must_use]
    pub fn from_ehlo<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut table = HashMap::new();
        for line in lines.iter().skip(1) {
            let line = line.as_ref();
            let (keyword, param) = line.split_once(' ').unwrap_or((line, ""));
            if keyword.is_empty() {
                continue;
            }
            table.insert(keyword.to_ascii_uppercase(), param.to_string());
        }
        Self { table }
    }

    /// Looks up an extension, returning its parameter string.
    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.table
            .get(&keyword.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Returns true if the extension was advertised.
    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Returns the mechanism names from the `AUTH` parameter, in order.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<String> {
        self.get("AUTH")
            .map(|param| param.split(' ').map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    /// Returns the maximum message size from `SIZE`, if advertised.
    ///
    /// `SIZE 0` means the server declares no fixed limit.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.get("SIZE")
            .and_then(|param| param.trim().parse().ok())
            .filter(|&size: &usize| size > 0)
    }

    /// Number of advertised extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if no extensions are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Iterates over `(keyword, parameter)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.table.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
