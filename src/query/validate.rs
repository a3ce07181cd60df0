use super::{
    Direction, FilterDescriptor, Operator, Page, QueryError, SortDescriptor, Value,
};

/// A filter whose column passed the whitelist and whose operand matches its
/// operator.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFilter {
    column: String,
    operator: Operator,
    value: Value,
}

impl ValidatedFilter {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSort {
    column: String,
    direction: Direction,
}

impl ValidatedSort {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Output of [`validate_filters_and_sorting`], the only input the query
/// builder accepts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedQuery {
    filters: Vec<ValidatedFilter>,
    sort: Vec<ValidatedSort>,
    page: Option<Page>,
}

impl ValidatedQuery {
    /// No filters, no ordering.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn filters(&self) -> &[ValidatedFilter] {
        &self.filters
    }

    pub fn sort(&self) -> &[ValidatedSort] {
        &self.sort
    }

    pub fn page(&self) -> Option<Page> {
        self.page
    }

    /// Merge another validated query's conditions into this one (both sides
    /// already passed their own whitelists).
    pub fn and(mut self, other: ValidatedQuery) -> Self {
        self.filters.extend(other.filters);
        self.sort.extend(other.sort);
        self.page = self.page.or(other.page);
        self
    }
}

/// Check every filter and sort term against `valid_columns` and the fixed
/// operator set.
///
/// `None` and empty slices both mean "no filter" / "no ordering". Fails on the
/// first offending descriptor; nothing is partially accepted.
pub fn validate_filters_and_sorting(
    filters: Option<&[FilterDescriptor]>,
    sort_by: Option<&[SortDescriptor]>,
    valid_columns: &[&str],
) -> Result<ValidatedQuery, QueryError> {
    let filters = filters
        .unwrap_or_default()
        .iter()
        .map(|f| {
            if f.column.is_empty() {
                return Err(QueryError::InvalidFilterShape {
                    reason: "empty column".into(),
                });
            }
            check_column(&f.column, valid_columns)?;
            let operator = validate_operator_and_value(&f.operator, &f.value)?;
            Ok(ValidatedFilter {
                column: f.column.clone(),
                operator,
                value: f.value.clone(),
            })
        })
        .collect::<Result<Vec<_>, QueryError>>()?;

    let sort = sort_by
        .unwrap_or_default()
        .iter()
        .map(|s| {
            if s.column.is_empty() {
                return Err(QueryError::InvalidSortShape {
                    reason: "empty column".into(),
                });
            }
            check_column(&s.column, valid_columns)?;
            Ok(ValidatedSort {
                column: s.column.clone(),
                direction: s.direction.parse()?,
            })
        })
        .collect::<Result<Vec<_>, QueryError>>()?;

    Ok(ValidatedQuery {
        filters,
        sort,
        page: None,
    })
}

/// Check that `value` has the shape `operator` needs.
///
/// - `LIKE`: non-empty text
/// - `IN`: non-empty list of scalars
/// - `BETWEEN`: exactly two scalars
/// - `IS NULL` / `IS NOT NULL`: no value
/// - comparisons: one non-null scalar
pub fn validate_operator_and_value(operator: &str, value: &Value) -> Result<Operator, QueryError> {
    let op: Operator = operator.parse()?;
    let invalid = |reason: &str| QueryError::InvalidValueForOperator {
        operator: op.as_str().to_string(),
        reason: reason.to_string(),
    };

    match op {
        Operator::Like => match value {
            Value::Text(s) if !s.is_empty() => {}
            _ => return Err(invalid("expected a non-empty string")),
        },
        Operator::In => match value {
            Value::List(items) if items.is_empty() => return Err(invalid("expected a non-empty list")),
            Value::List(items) if !items.iter().all(Value::is_scalar) => {
                return Err(invalid("list items must be scalars"))
            }
            Value::List(_) => {}
            _ => return Err(invalid("expected a non-empty list")),
        },
        Operator::Between => match value {
            Value::List(items) if items.len() == 2 && items.iter().all(Value::is_scalar) => {}
            _ => return Err(invalid("expected exactly two bounds")),
        },
        Operator::IsNull | Operator::IsNotNull => {
            if !value.is_null() {
                return Err(invalid("operator takes no value"));
            }
        }
        Operator::Eq | Operator::Ne | Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le => {
            match value {
                Value::Null => return Err(invalid("null operand, use IS NULL / IS NOT NULL")),
                Value::List(_) => return Err(invalid("expected a single value")),
                _ => {}
            }
        }
    }

    Ok(op)
}

fn check_column(column: &str, valid_columns: &[&str]) -> Result<(), QueryError> {
    if valid_columns.contains(&column) {
        Ok(())
    } else {
        Err(QueryError::UnknownColumn {
            column: column.to_string(),
        })
    }
}
