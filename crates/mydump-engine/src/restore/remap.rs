//! Database renaming during restore
//!
//! Only two statement shapes are rewritten: the `CREATE DATABASE` and
//! `USE` lines of a dump preamble. Both patterns are anchored to the whole
//! statement, so identifiers appearing anywhere else are never touched.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use mydump_core::RestoreOptions;
use regex::bytes::Regex;

static CREATE_DATABASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(CREATE\s+DATABASE\s*(/\*.*\*/\s*)?`)(?P<name>[^\s]+)(`\s*(\s*/\*.*\*/\s*)?\s*;)$")
        .expect("CREATE DATABASE pattern is valid")
});

static USE_DATABASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(USE\s*`)(?P<name>[^\s]+)(`\s*;)$").expect("USE pattern is valid")
});

/// Source database name to destination database name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseMapping {
    names: HashMap<String, String>,
}

impl DatabaseMapping {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    pub fn from_options(options: &RestoreOptions) -> Self {
        Self::new(options.database_mapping.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.names.get(source).map(String::as_str)
    }

    /// Rewrite the database identifier of a `CREATE DATABASE` or `USE`
    /// statement. Anything else is returned unchanged.
    pub fn remap<'a>(&self, statement: &'a [u8]) -> Cow<'a, [u8]> {
        if self.names.is_empty() {
            return Cow::Borrowed(statement);
        }

        let (body, newline): (&[u8], &[u8]) = match statement.strip_suffix(b"\n") {
            Some(body) => (body, b"\n"),
            None => (statement, b""),
        };

        for pattern in [&*CREATE_DATABASE, &*USE_DATABASE] {
            let Some(caps) = pattern.captures(body) else {
                continue;
            };
            let Some(name) = caps.name("name") else {
                continue;
            };
            let Some(destination) = std::str::from_utf8(name.as_bytes())
                .ok()
                .and_then(|source| self.get(source))
            else {
                return Cow::Borrowed(statement);
            };

            let mut rewritten = Vec::with_capacity(statement.len() + destination.len());
            rewritten.extend_from_slice(&body[..name.start()]);
            rewritten.extend_from_slice(destination.as_bytes());
            rewritten.extend_from_slice(&body[name.end()..]);
            rewritten.extend_from_slice(newline);
            tracing::debug!(
                from = %String::from_utf8_lossy(name.as_bytes()),
                to = %destination,
                "remapped database identifier"
            );
            return Cow::Owned(rewritten);
        }

        Cow::Borrowed(statement)
    }
}

impl From<HashMap<String, String>> for DatabaseMapping {
    fn from(names: HashMap<String, String>) -> Self {
        Self::new(names)
    }
}
