//! SQL dialect rules used when rendering dump text

use serde::{Deserialize, Serialize};
use std::fmt;

/// The SQL flavour a dump is written for.
///
/// A dialect decides how identifiers are quoted and how string literals are
/// escaped. Identifiers are wrapped but never escaped: they come from the
/// database catalog, not from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[serde(alias = "mariadb")]
    MySql,
    Sqlite,
}

impl SqlDialect {
    /// Wrap a catalog identifier in backticks.
    ///
    /// SQLite accepts backtick-quoted identifiers for MySQL compatibility, so
    /// both dialects share the same syntax.
    pub fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name)
    }

    /// Escape the body of a string literal (without the surrounding quotes).
    ///
    /// MySQL follows `mysql_real_escape_string`. SQLite has no backslash
    /// escapes, so doubling the single quote is the only rule.
    pub fn escape_string(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len() + 2);
        match self {
            SqlDialect::MySql => {
                for ch in raw.chars() {
                    match ch {
                        '\0' => out.push_str("\\0"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '"' => out.push_str("\\\""),
                        '\u{1a}' => out.push_str("\\Z"),
                        other => out.push(other),
                    }
                }
            }
            SqlDialect::Sqlite => {
                for ch in raw.chars() {
                    if ch == '\'' {
                        out.push_str("''");
                    } else {
                        out.push(ch);
                    }
                }
            }
        }
        out
    }

    pub fn name(&self) -> &'static str {
        match self {
            SqlDialect::MySql => "mysql",
            SqlDialect::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
