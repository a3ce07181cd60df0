use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{QueryError, Value};

// ═══════════════════════════════════════════
// Operators & directions
// ═══════════════════════════════════════════

/// The fixed set of comparison operators a filter may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Like,
    In,
    Between,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Lt,
        Operator::Ge,
        Operator::Le,
        Operator::Like,
        Operator::In,
        Operator::Between,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    /// Canonical SQL spelling. This is the only operator text that ever
    /// reaches a statement.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::Between => "BETWEEN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    /// Operators that take no operand.
    pub fn is_nullary(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    /// Keywords match case-insensitively and tolerate extra inner whitespace
    /// (`is  not null`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| QueryError::UnsupportedOperator {
                operator: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ => Err(QueryError::InvalidDirection {
                direction: s.to_string(),
            }),
        }
    }
}

// ═══════════════════════════════════════════
// Descriptors (unvalidated caller input)
// ═══════════════════════════════════════════

/// One WHERE condition as supplied by a caller: `{column, operator, value}`.
///
/// Nothing here is trusted until it has passed
/// [`validate_filters_and_sorting`](super::validate_filters_and_sorting).
///
/// Deserializing goes through [`FilterDescriptor::from_json`], so a missing
/// key is a shape error on every path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct FilterDescriptor {
    pub column: String,
    pub operator: String,
    pub value: Value,
}

impl TryFrom<serde_json::Value> for FilterDescriptor {
    type Error = QueryError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        Self::from_json(&json)
    }
}

impl FilterDescriptor {
    pub fn new(column: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Shorthand for `{column} = value`.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, "=", value)
    }

    /// Parse one descriptor from untyped JSON.
    ///
    /// `column`, `operator` and `value` are all required, except that `value`
    /// may be left out for `IS NULL` / `IS NOT NULL`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, QueryError> {
        let obj = json.as_object().ok_or_else(|| QueryError::InvalidFilterShape {
            reason: format!("expected an object, got {json}"),
        })?;

        let column = required_str(obj, "column").map_err(|reason| QueryError::InvalidFilterShape { reason })?;
        let operator =
            required_str(obj, "operator").map_err(|reason| QueryError::InvalidFilterShape { reason })?;

        let value = match obj.get("value") {
            Some(raw) => serde_json::from_value::<Value>(raw.clone()).map_err(|e| {
                QueryError::InvalidFilterShape {
                    reason: format!("unreadable value: {e}"),
                }
            })?,
            None if operator.parse::<Operator>().is_ok_and(|op| op.is_nullary()) => Value::Null,
            None => {
                return Err(QueryError::InvalidFilterShape {
                    reason: "missing key 'value'".into(),
                })
            }
        };

        Ok(Self { column, operator, value })
    }

    /// Parse a JSON array of descriptors. `null` means "no filter".
    pub fn list_from_json(json: &serde_json::Value) -> Result<Vec<Self>, QueryError> {
        match json {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(items) => items.iter().map(Self::from_json).collect(),
            other => Err(QueryError::InvalidFilterShape {
                reason: format!("expected an array of filters, got {other}"),
            }),
        }
    }
}

/// One ORDER BY term as supplied by a caller: `{column, direction}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct SortDescriptor {
    pub column: String,
    pub direction: String,
}

impl TryFrom<serde_json::Value> for SortDescriptor {
    type Error = QueryError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        Self::from_json(&json)
    }
}

impl SortDescriptor {
    pub fn new(column: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: direction.into(),
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, "ASC")
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, "DESC")
    }

    /// Parse one sort term from JSON. Both `{"column": .., "direction": ..}`
    /// and `["column", "direction"]` are accepted and normalized.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, QueryError> {
        match json {
            serde_json::Value::Object(obj) => {
                let column =
                    required_str(obj, "column").map_err(|reason| QueryError::InvalidSortShape { reason })?;
                let direction = required_str(obj, "direction")
                    .map_err(|reason| QueryError::InvalidSortShape { reason })?;
                Ok(Self { column, direction })
            }
            serde_json::Value::Array(pair) => match pair.as_slice() {
                [serde_json::Value::String(column), serde_json::Value::String(direction)] => {
                    Ok(Self::new(column.as_str(), direction.as_str()))
                }
                _ => Err(QueryError::InvalidSortShape {
                    reason: "expected [column, direction]".into(),
                }),
            },
            other => Err(QueryError::InvalidSortShape {
                reason: format!("expected an object or pair, got {other}"),
            }),
        }
    }

    pub fn list_from_json(json: &serde_json::Value) -> Result<Vec<Self>, QueryError> {
        match json {
            serde_json::Value::Null => Ok(Vec::new()),
            serde_json::Value::Array(items) => items.iter().map(Self::from_json).collect(),
            other => Err(QueryError::InvalidSortShape {
                reason: format!("expected an array of sort terms, got {other}"),
            }),
        }
    }
}

impl<C: Into<String>, D: Into<String>> From<(C, D)> for SortDescriptor {
    fn from((column, direction): (C, D)) -> Self {
        Self::new(column, direction)
    }
}

fn required_str(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<String, String> {
    match obj.get(key) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!("key '{key}' must be a string, got {other}")),
        None => Err(format!("missing key '{key}'")),
    }
}
