//! Statement classification.
//!
//! Decides how a submitted statement is executed by looking at the leading
//! keyword of the first statement. The text is tokenized with sqlparser so
//! that comments, string literals and quoted identifiers never masquerade
//! as keywords, but it is not parsed: anything the tokenizer accepts gets a
//! classification.

use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer, Word};
use std::fmt;

/// Leading keywords that are executed through the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Create,
    Drop,
    Insert,
    Update,
    Select,
}

impl StatementKind {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "CREATE" => Some(Self::Create),
            "DROP" => Some(Self::Drop),
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "SELECT" => Some(Self::Select),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Drop => "DROP",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Select => "SELECT",
        }
    }

    /// Returns true for statements run through `Connector::execute`.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Select)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a statement should be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Nothing but whitespace, comments or semicolons.
    Empty,
    /// CREATE, DROP, INSERT or UPDATE.
    Mutation(StatementKind),
    /// SELECT.
    Query,
    /// A statement keyword the dispatcher does not run (DELETE, ALTER, ...).
    Unhandled(String),
    /// Text that does not start with any statement keyword.
    Unknown,
}

/// Statement keywords recognized but not dispatched.
///
/// The union of statement-leading keywords in the SQLite and PostgreSQL
/// grammars, so `EXPLAIN` or `BEGIN` is reported by name instead of as
/// unknown text.
const OTHER_STATEMENTS: &[&str] = &[
    "ALTER", "ANALYZE", "ATTACH", "BEGIN", "CALL", "COMMENT", "COMMIT", "COPY", "DEALLOCATE",
    "DECLARE", "DELETE", "DESCRIBE", "DETACH", "DO", "END", "EXECUTE", "EXPLAIN", "GRANT",
    "LISTEN", "LOCK", "MERGE", "NOTIFY", "PRAGMA", "PREPARE", "REFRESH", "REINDEX", "RELEASE",
    "REPLACE", "RESET", "REVOKE", "ROLLBACK", "SAVEPOINT", "SET", "SHOW", "START", "TABLE",
    "TRUNCATE", "UPSERT", "USE", "VACUUM", "VALUES",
];

/// Keywords a WITH clause can lead into.
const CTE_BODIES: &[&str] = &["SELECT", "INSERT", "UPDATE", "DELETE", "MERGE"];

/// Classifies `sql` by the leading keyword of its first statement.
pub fn classify(sql: &str) -> Classification {
    let dialect = GenericDialect {};
    let tokens = match Tokenizer::new(&dialect, sql).tokenize() {
        Ok(tokens) => tokens,
        Err(_) => return Classification::Unknown,
    };

    let mut significant = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .skip_while(|t| matches!(t, Token::SemiColon));

    let Some(first) = significant.next() else {
        return Classification::Empty;
    };

    let Some(keyword) = keyword_of(first) else {
        return Classification::Unknown;
    };

    if keyword == "WITH" {
        return classify_with(significant);
    }

    classify_keyword(&keyword)
}

fn classify_keyword(keyword: &str) -> Classification {
    match StatementKind::from_keyword(keyword) {
        Some(StatementKind::Select) => Classification::Query,
        Some(kind) => Classification::Mutation(kind),
        None if OTHER_STATEMENTS.contains(&keyword) => {
            Classification::Unhandled(keyword.to_string())
        }
        None => Classification::Unknown,
    }
}

/// Finds the statement that follows the common table expressions.
fn classify_with<'a>(tokens: impl Iterator<Item = &'a Token>) -> Classification {
    let mut depth = 0usize;
    for token in tokens {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::SemiColon if depth == 0 => break,
            _ if depth == 0 => {
                if let Some(keyword) = keyword_of(token) {
                    if CTE_BODIES.contains(&keyword.as_str()) {
                        return classify_keyword(&keyword);
                    }
                }
            }
            _ => {}
        }
    }
    Classification::Unknown
}

/// Upper-cased text of an unquoted word token.
fn keyword_of(token: &Token) -> Option<String> {
    match token {
        Token::Word(Word {
            value,
            quote_style: None,
            ..
        }) => Some(value.to_uppercase()),
        _ => None,
    }
}
