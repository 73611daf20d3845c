//! Query text validation run before free-form SQL reaches an engine.

use composedb_shared::errors::{ComposeDbError, ComposeDbResult};

/// Decides whether query text may be executed.
///
/// A rejection is returned as `ValidationRejected` and propagated unchanged
/// by the adapters.
pub trait QueryValidator: Send + Sync {
    fn validate(&self, query: &str) -> ComposeDbResult<()>;
}

/// Keywords that may not start a statement stacked after the first one.
const STACKED_DENYLIST: &[&str] = &["DROP", "TRUNCATE", "ALTER", "GRANT", "REVOKE"];

/// Default validator.
///
/// Rejects empty text, NUL bytes, destructive statements stacked behind `;`,
/// and `COPY ... PROGRAM` (server-side shell execution). A single
/// destructive statement on its own is the caller's explicit intent and
/// passes.
#[derive(Debug, Clone, Default)]
pub struct SqlGuard;

impl QueryValidator for SqlGuard {
    fn validate(&self, query: &str) -> ComposeDbResult<()> {
        if query.trim().is_empty() {
            return Err(rejected("query is empty"));
        }
        if query.contains('\0') {
            return Err(rejected("query contains a NUL byte"));
        }

        for (index, statement) in split_statements(query).iter().enumerate() {
            let words: Vec<String> = statement
                .split_whitespace()
                .map(|w| w.to_ascii_uppercase())
                .collect();
            let Some(first) = words.first() else {
                continue;
            };

            if index > 0 && STACKED_DENYLIST.contains(&first.as_str()) {
                return Err(rejected(format!(
                    "stacked {} statement is not allowed",
                    first
                )));
            }
            if first == "COPY" && words.iter().any(|w| w == "PROGRAM") {
                return Err(rejected("COPY ... PROGRAM is not allowed"));
            }
        }

        Ok(())
    }
}

/// Split on `;` outside of quoted strings and identifiers.
fn split_statements(query: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in query.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ';') => {
                statements.push(&query[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    statements.push(&query[start..]);

    statements
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}

fn rejected(reason: impl Into<String>) -> ComposeDbError {
    ComposeDbError::ValidationRejected(reason.into())
}
