use crate::QueryError;

/// `SELECT * FROM [keyspace.]table`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Select {
    pub(crate) keyspace: Option<String>,
    pub(crate) table: String,
}

/// Keywords are case-insensitive, identifiers are kept as written. A single
/// trailing `;` is accepted.
pub(crate) fn parse_select(query: &str) -> std::result::Result<Select, QueryError> {
    let trimmed = query.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();

    let target = match tokens.as_slice() {
        [select, star, from, target]
            if select.eq_ignore_ascii_case("select") && *star == "*" && from.eq_ignore_ascii_case("from") =>
        {
            *target
        }
        _ => return Err(QueryError::Syntax(query.to_string())),
    };

    let mut parts = target.split('.');
    let select = match (parts.next(), parts.next(), parts.next()) {
        (Some(table), None, None) if !table.is_empty() => Select {
            keyspace: None,
            table: table.to_string(),
        },
        (Some(keyspace), Some(table), None) if !keyspace.is_empty() && !table.is_empty() => Select {
            keyspace: Some(keyspace.to_string()),
            table: table.to_string(),
        },
        _ => return Err(QueryError::Syntax(query.to_string())),
    };
    Ok(select)
}
