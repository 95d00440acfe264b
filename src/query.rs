use crate::error::SqlGatewayError;
use crate::types::RowValues;

/// Positional placeholder understood by MySQL prepared statements.
pub const PLACEHOLDER: &str = "?";

/// A SQL string and its bound parameters bundled together.
///
/// This is the only shape the gateway executes. Raw text goes through
/// [`QueryAndParams::new`]; interpolated text goes through
/// [`QueryAndParams::compose`] or the [`sql!`](crate::sql) macro, so parameter
/// values never end up inside the query text:
/// ```rust
/// use ev_sql_gateway::prelude::*;
///
/// let qp = QueryAndParams::new(
///     "SELECT * FROM Users WHERE UserId = ?",
///     vec![RowValues::Text("abc-123".into())],
/// );
/// # let _ = qp;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAndParams {
    /// The SQL query string
    pub query: String,
    /// The parameters to be bound to the query
    pub params: Vec<RowValues>,
}

impl QueryAndParams {
    /// Create a new `QueryAndParams` with the given query string and parameters
    pub fn new(query: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    /// Create a new `QueryAndParams` with no parameters
    pub fn new_without_params(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }

    /// Join literal fragments with one `?` between each pair and bind `values` in order.
    ///
    /// There must be exactly one more fragment than there are values, the same
    /// split a template literal produces (leading and trailing fragments may be empty).
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ParameterError` when the fragment and value counts disagree.
    pub fn compose<S: AsRef<str>>(
        fragments: &[S],
        values: Vec<RowValues>,
    ) -> Result<Self, SqlGatewayError> {
        if fragments.len() != values.len() + 1 {
            return Err(SqlGatewayError::ParameterError(format!(
                "{} text fragments cannot surround {} values",
                fragments.len(),
                values.len()
            )));
        }

        let capacity = fragments.iter().map(|f| f.as_ref().len()).sum::<usize>() + values.len();
        let mut query = String::with_capacity(capacity);
        for (i, fragment) in fragments.iter().enumerate() {
            if i > 0 {
                query.push_str(PLACEHOLDER);
            }
            query.push_str(fragment.as_ref());
        }

        Ok(Self {
            query,
            params: values,
        })
    }

    /// Compose from a template where each `{}` marks an interpolated value.
    ///
    /// `{{` and `}}` stand for literal braces. This backs the [`sql!`](crate::sql) macro.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ParameterError` if the template is malformed or the
    /// number of `{}` markers differs from the number of values.
    pub fn from_template(template: &str, values: Vec<RowValues>) -> Result<Self, SqlGatewayError> {
        let fragments = split_template(template)?;
        Self::compose(&fragments, values)
    }

    /// Number of `?` markers outside quoted strings and comments.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.query)
    }
}

impl From<&str> for QueryAndParams {
    fn from(query: &str) -> Self {
        Self::new_without_params(query)
    }
}

impl From<String> for QueryAndParams {
    fn from(query: String) -> Self {
        Self::new_without_params(query)
    }
}

impl<S: Into<String>> From<(S, Vec<RowValues>)> for QueryAndParams {
    fn from((query, params): (S, Vec<RowValues>)) -> Self {
        Self::new(query, params)
    }
}

fn split_template(template: &str) -> Result<Vec<String>, SqlGatewayError> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        match (c, next) {
            ('{', Some('{')) | ('}', Some('}')) => {
                current.push(c);
                chars.next();
            }
            ('{', Some('}')) => {
                chars.next();
                fragments.push(std::mem::take(&mut current));
            }
            ('{' | '}', _) => {
                return Err(SqlGatewayError::ParameterError(format!(
                    "unmatched `{c}` in query template; use `{c}{c}` for a literal brace"
                )));
            }
            _ => current.push(c),
        }
    }
    fragments.push(current);

    Ok(fragments)
}

/// Count `?` placeholders, skipping quoted literals, backtick identifiers and comments.
fn count_placeholders(sql: &str) -> usize {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Normal,
        Quoted(char),
        LineComment,
        BlockComment,
    }

    let mut state = State::Normal;
    let mut count = 0;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        state = match state {
            State::Normal => match c {
                '?' => {
                    count += 1;
                    State::Normal
                }
                '\'' | '"' | '`' => State::Quoted(c),
                '#' => State::LineComment,
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    State::LineComment
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    State::BlockComment
                }
                _ => State::Normal,
            },
            State::Quoted(q) => {
                if c == '\\' && q != '`' {
                    chars.next();
                    State::Quoted(q)
                } else if c == q {
                    if chars.peek() == Some(&q) {
                        chars.next();
                        State::Quoted(q)
                    } else {
                        State::Normal
                    }
                } else {
                    State::Quoted(q)
                }
            }
            State::LineComment => {
                if c == '\n' {
                    State::Normal
                } else {
                    State::LineComment
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    State::Normal
                } else {
                    State::BlockComment
                }
            }
        };
    }

    count
}

/// Build a [`QueryAndParams`] from a template with `{}` markers and trailing values.
///
/// Each value is converted with `Into<RowValues>` and bound as a parameter; the
/// template only ever receives `?`.
/// ```rust
/// use ev_sql_gateway::prelude::*;
///
/// let station_id = 42;
/// let q = sql!("SELECT * FROM Stations WHERE StationId = {} AND Name = {}", station_id, "Depot")?;
/// assert_eq!(q.query, "SELECT * FROM Stations WHERE StationId = ? AND Name = ?");
/// assert_eq!(q.params, vec![RowValues::Int(42), RowValues::Text("Depot".into())]);
/// # Ok::<(), SqlGatewayError>(())
/// ```
#[macro_export]
macro_rules! sql {
    ($template:literal $(,)?) => {
        $crate::QueryAndParams::from_template($template, ::std::vec::Vec::new())
    };
    ($template:literal, $($value:expr),+ $(,)?) => {
        $crate::QueryAndParams::from_template(
            $template,
            ::std::vec![$($crate::RowValues::from($value)),+],
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_joins_fragments_with_placeholders() {
        let q = QueryAndParams::compose(
            &["SELECT * FROM T WHERE a = ", " AND b = ", ""],
            vec![RowValues::Int(5), RowValues::Text("x".into())],
        )
        .unwrap();
        assert_eq!(q.query, "SELECT * FROM T WHERE a = ? AND b = ?");
        assert_eq!(q.params, vec![RowValues::Int(5), RowValues::Text("x".into())]);
    }

    #[test]
    fn compose_keeps_values_out_of_text() {
        let hostile = "'; DROP TABLE Users; --";
        let q = QueryAndParams::compose(
            &["SELECT * FROM Users WHERE Name = ", ""],
            vec![hostile.into()],
        )
        .unwrap();
        assert!(!q.query.contains("DROP"));
        assert_eq!(q.params, vec![RowValues::Text(hostile.into())]);
    }

    #[test]
    fn compose_without_values_is_plain_text() {
        let q = QueryAndParams::compose(&["SELECT 1"], Vec::new()).unwrap();
        assert_eq!(q.query, "SELECT 1");
        assert!(q.params.is_empty());
    }

    #[test]
    fn compose_rejects_mismatched_counts() {
        let err = QueryAndParams::compose(&["a = ", ""], Vec::new()).unwrap_err();
        assert!(matches!(err, SqlGatewayError::ParameterError(_)));
        let err = QueryAndParams::compose::<&str>(&[], Vec::new()).unwrap_err();
        assert!(matches!(err, SqlGatewayError::ParameterError(_)));
    }

    #[test]
    fn placeholder_count_matches_value_count() {
        for n in 0..6usize {
            let fragments: Vec<String> = (0..=n).map(|i| format!(" col{i} = ")).collect();
            let values: Vec<RowValues> = (0..n).map(|i| RowValues::Int(i as i64)).collect();
            let q = QueryAndParams::compose(&fragments, values.clone()).unwrap();
            assert_eq!(q.placeholder_count(), n);
            assert_eq!(q.params, values);
        }
    }

    #[test]
    fn placeholder_count_ignores_quotes_and_comments() {
        let q = QueryAndParams::new_without_params(
            "SELECT '?', \"it''s?\", `a?` FROM t -- why?\nWHERE x = ? /* ? */ # ?",
        );
        assert_eq!(q.placeholder_count(), 1);
    }

    #[test]
    fn template_handles_escaped_braces() {
        let q = QueryAndParams::from_template(
            "SELECT JSON_EXTRACT('{{\"a\": 1}}', '$.a') = {}",
            vec![RowValues::Int(1)],
        )
        .unwrap();
        assert_eq!(q.query, "SELECT JSON_EXTRACT('{\"a\": 1}', '$.a') = ?");
    }

    #[test]
    fn template_rejects_stray_brace() {
        let err = QueryAndParams::from_template("SELECT { FROM t", Vec::new()).unwrap_err();
        assert!(matches!(err, SqlGatewayError::ParameterError(_)));
    }

    #[test]
    fn sql_macro_binds_values_in_order() {
        let user = String::from("abc-123");
        let q = crate::sql!("UPDATE Users SET Active = {} WHERE UserId = {}", true, &user).unwrap();
        assert_eq!(q.query, "UPDATE Users SET Active = ? WHERE UserId = ?");
        assert_eq!(
            q.params,
            vec![RowValues::Bool(true), RowValues::Text("abc-123".into())]
        );
    }

    #[test]
    fn sql_macro_counts_must_agree() {
        let err = crate::sql!("SELECT {} + {}", 1).unwrap_err();
        assert!(matches!(err, SqlGatewayError::ParameterError(_)));
    }
}
