//! SQL quoting helpers for generated DDL and ledger statements.

/// Quote a SQL identifier, doubling any embedded double quotes.
///
/// # Examples
/// ```
/// use sm_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("Configuracoes"), r#""Configuracoes""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a potentially schema-qualified name (e.g. `schema.table`).
///
/// # Examples
/// ```
/// use sm_core::sql_utils::quote_qualified;
/// assert_eq!(quote_qualified("public.Chapas"), r#""public"."Chapas""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a potentially schema-qualified table name into (schema, table).
///
/// Defaults the schema to `main` when no `.` is present.
pub fn split_qualified_name(name: &str) -> (&str, &str) {
    if let Some(pos) = name.rfind('.') {
        (&name[..pos], &name[pos + 1..])
    } else {
        ("main", name)
    }
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a value as a single-quoted SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_sql_string(value))
}

/// True when `name` is a bare identifier: ASCII letter or `_` followed by
/// ASCII alphanumerics or `_`.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "sql_utils_test.rs"]
mod tests;
