use super::{Operator, ValidatedQuery, Value};

/// SQL fragment plus its positional parameters, in placeholder order.
///
/// `clause` is meant to follow `WHERE`: a predicate (`1=1` when there are no
/// filters), then `ORDER BY` and `LIMIT`/`OFFSET` when requested.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub clause: String,
    pub params: Vec<Value>,
}

impl BuiltQuery {
    /// Parameters ready for `rusqlite` binding.
    pub fn bind(&self) -> rusqlite::ParamsFromIter<std::slice::Iter<'_, Value>> {
        rusqlite::params_from_iter(self.params.iter())
    }
}

/// Assemble WHERE / ORDER BY / LIMIT text from a validated query.
///
/// Column names and canonical operator/direction keywords are the only text
/// interpolated; every operand goes into `params`.
pub fn build_filters(query: &ValidatedQuery) -> BuiltQuery {
    let mut params = Vec::new();

    let clauses: Vec<String> = query
        .filters()
        .iter()
        .map(|f| {
            let column = f.column();
            match (f.operator(), f.value()) {
                (Operator::IsNull | Operator::IsNotNull, _) => {
                    format!("{column} {}", f.operator())
                }
                (Operator::In, Value::List(items)) => {
                    params.extend(items.iter().cloned());
                    format!("{column} IN ({})", placeholders(items.len()))
                }
                (Operator::Between, Value::List(bounds)) => {
                    params.extend(bounds.iter().cloned());
                    format!("{column} BETWEEN ? AND ?")
                }
                (op, value) => {
                    params.push(value.clone());
                    format!("{column} {op} ?")
                }
            }
        })
        .collect();

    let mut clause = if clauses.is_empty() {
        "1=1".to_string()
    } else {
        clauses.join(" AND ")
    };

    if !query.sort().is_empty() {
        let terms: Vec<String> = query
            .sort()
            .iter()
            .map(|s| format!("{} {}", s.column(), s.direction().as_str()))
            .collect();
        clause.push_str(" ORDER BY ");
        clause.push_str(&terms.join(", "));
    }

    if let Some(page) = query.page() {
        clause.push_str(" LIMIT ? OFFSET ?");
        params.push(Value::Integer(page.limit.into()));
        params.push(Value::Integer(page.offset.into()));
    }

    BuiltQuery { clause, params }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
