//! SQL identifier quoting.
//!
//! Table and column names are quoted per dialect. With
//! [`IdentifierQuoting::WhenNeeded`] plain identifiers are emitted as-is and
//! only names that are reserved words or contain special characters are
//! quoted.

use crate::dialect::Dialect;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// When identifiers are wrapped in dialect quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierQuoting {
    /// Always quote.
    Always,
    /// Never quote.
    #[default]
    Never,
    /// Quote only reserved words and names that are not plain identifiers.
    WhenNeeded,
}

const RESERVED: &[&str] = &[
    "all", "and", "as", "asc", "between", "by", "case", "check", "column", "constraint",
    "create", "delete", "desc", "distinct", "drop", "else", "end", "exists", "from", "group",
    "having", "in", "insert", "into", "is", "join", "key", "like", "limit", "not", "null",
    "offset", "on", "or", "order", "primary", "references", "select", "set", "table", "then",
    "to", "top", "union", "unique", "update", "user", "values", "when", "where",
];

fn plain_identifier() -> Option<&'static Regex> {
    static PLAIN: OnceLock<Option<Regex>> = OnceLock::new();
    PLAIN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
}

/// Check whether a name can be emitted without quotes.
pub fn is_plain_identifier(name: &str) -> bool {
    let plain = match plain_identifier() {
        Some(re) => re.is_match(name),
        None => false,
    };
    plain && !RESERVED.contains(&name.to_ascii_lowercase().as_str())
}

/// Quote a SQL identifier with the dialect's quote characters.
///
/// Embedded closing quote characters are escaped by doubling them.
pub fn quote_ident(name: &str, dialect: Dialect) -> String {
    let (open, close) = dialect.quote_chars();
    let escaped = name.replace(close, &format!("{close}{close}"));
    format!("{open}{escaped}{close}")
}

impl IdentifierQuoting {
    /// Render a (possibly dotted) identifier according to this strategy.
    pub fn render(self, name: &str, dialect: Dialect) -> String {
        match self {
            IdentifierQuoting::Never => name.to_string(),
            IdentifierQuoting::Always => quote_ident(name, dialect),
            IdentifierQuoting::WhenNeeded => {
                if is_plain_identifier(name) {
                    name.to_string()
                } else {
                    quote_ident(name, dialect)
                }
            }
        }
    }
}
