//! Supported database dialects and their capabilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL dialect a statement is translated for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL (uses $1, $2 placeholders)
    #[default]
    Postgres,
    /// MySQL (uses ? placeholders)
    Mysql,
    /// MariaDB, MySQL-compatible
    Mariadb,
    /// SQLite (uses ?1, ?2 placeholders)
    Sqlite,
    /// Microsoft SQL Server
    SqlServer,
    /// Sybase ASE
    Sybase,
    /// Oracle 12c and later
    Oracle,
    /// IBM DB2
    Db2,
    /// Apache Derby
    Derby,
    /// H2
    H2,
    /// HSQLDB
    Hsqldb,
}

/// Placeholder syntax used by a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ...
    Dollar,
    /// `?1`, `?2`, ...
    NumberedQuestion,
    /// `?`
    Question,
}

impl Dialect {
    /// All dialects, in declaration order.
    pub const ALL: [Dialect; 11] = [
        Dialect::Postgres,
        Dialect::Mysql,
        Dialect::Mariadb,
        Dialect::Sqlite,
        Dialect::SqlServer,
        Dialect::Sybase,
        Dialect::Oracle,
        Dialect::Db2,
        Dialect::Derby,
        Dialect::H2,
        Dialect::Hsqldb,
    ];

    /// Lowercase dialect name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::Mariadb => "mariadb",
            Dialect::Sqlite => "sqlite",
            Dialect::SqlServer => "sqlserver",
            Dialect::Sybase => "sybase",
            Dialect::Oracle => "oracle",
            Dialect::Db2 => "db2",
            Dialect::Derby => "derby",
            Dialect::H2 => "h2",
            Dialect::Hsqldb => "hsqldb",
        }
    }

    /// Placeholder syntax for bound parameters.
    pub const fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Dialect::Postgres => PlaceholderStyle::Dollar,
            Dialect::Sqlite => PlaceholderStyle::NumberedQuestion,
            _ => PlaceholderStyle::Question,
        }
    }

    /// Generate a placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self.placeholder_style() {
            PlaceholderStyle::Dollar => format!("${index}"),
            PlaceholderStyle::NumberedQuestion => format!("?{index}"),
            PlaceholderStyle::Question => "?".to_string(),
        }
    }

    /// Opening and closing identifier quote characters.
    pub const fn quote_chars(self) -> (char, char) {
        match self {
            Dialect::Mysql | Dialect::Mariadb => ('`', '`'),
            Dialect::SqlServer | Dialect::Sybase => ('[', ']'),
            _ => ('"', '"'),
        }
    }

    /// Whether the driver can hand back database-generated keys after INSERT.
    pub const fn supports_generated_keys(self) -> bool {
        !matches!(self, Dialect::Oracle | Dialect::Db2 | Dialect::Derby)
    }

    /// Whether BOOLEAN values can be bound natively.
    pub const fn supports_native_booleans(self) -> bool {
        !matches!(
            self,
            Dialect::SqlServer | Dialect::Sybase | Dialect::Oracle | Dialect::Db2
        )
    }

    /// Whether the dialect has a native row offset clause.
    pub const fn supports_offset(self) -> bool {
        !matches!(self, Dialect::SqlServer | Dialect::Sybase)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
