//! # Domain Services
//!
//! Pure naming helpers shared by the registry and the access evaluator.
//! These functions are deterministic and have no side effects.

// =============================================================================
// CONTRACT NAMES
// =============================================================================

/// Qualifies a contract name with its ecosystem: `Name` → `@{eco}Name`.
///
/// Already-qualified names are returned unchanged, except that a bare `@Name`
/// (no ecosystem digits) resolves to ecosystem 1.
#[must_use]
pub fn state_name(ecosystem_id: i64, name: &str) -> String {
    match name.strip_prefix('@') {
        None => format!("@{ecosystem_id}{name}"),
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => name.to_string(),
        Some(rest) => format!("@1{rest}"),
    }
}

/// Splits a qualified name into `(ecosystem, bare name)`.
///
/// Returns `None` for names without an `@{digits}` prefix.
#[must_use]
pub fn parse_name(qualified: &str) -> Option<(i64, &str)> {
    let rest = qualified.strip_prefix('@')?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let ecosystem = rest[..digits].parse().ok()?;
    Some((ecosystem, &rest[digits..]))
}

// =============================================================================
// TABLE NAMES
// =============================================================================

/// Splits `"{prefix}_{name}"` when the prefix is numeric.
///
/// Tables without a numeric prefix return `None` and the lowercased name.
#[must_use]
pub fn prefix_name(table: &str) -> (Option<&str>, String) {
    if let Some((prefix, name)) = table.split_once('_') {
        if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
            return (Some(prefix), name.to_lowercase());
        }
    }
    (None, table.to_lowercase())
}

/// Qualifies a table name with its ecosystem: `Name` → `{eco}_name`.
#[must_use]
pub fn qualify_table(table: &str, ecosystem_id: i64) -> String {
    match prefix_name(table) {
        (Some(prefix), name) => format!("{prefix}_{name}"),
        (None, name) => format!("{ecosystem_id}_{name}"),
    }
}

/// Keys table of an ecosystem.
#[must_use]
pub fn keys_table(ecosystem_id: i64) -> String {
    format!("{ecosystem_id}_keys")
}

/// Payment history table of an ecosystem.
#[must_use]
pub fn history_table(ecosystem_id: i64) -> String {
    format!("{ecosystem_id}_history")
}

// =============================================================================
// COLUMN NAMES
// =============================================================================

/// Normalizes a column reference for permission matching.
///
/// Lowercases, keeps ASCII alphanumerics, `_`, `*` and the `->` JSON path
/// accessor, then cuts the accessor suffix.
#[must_use]
pub fn sanitize_column(column: &str) -> String {
    let cleaned: String = column
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '*' | '-' | '>'))
        .collect::<String>()
        .to_lowercase();
    let base = match cleaned.find("->") {
        Some(pos) => &cleaned[..pos],
        None => cleaned.as_str(),
    };
    base.chars().filter(|c| !matches!(c, '-' | '>')).collect()
}

/// Splits a comma-separated column list. An empty list means all columns.
#[must_use]
pub fn parse_columns(columns: &str) -> Vec<String> {
    let parsed: Vec<String> = columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if parsed.is_empty() {
        vec!["*".to_string()]
    } else {
        parsed
    }
}

// =============================================================================
// TESTS
// =============================================================================
