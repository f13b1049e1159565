use std::fmt;
use std::sync::Arc;

use crate::table::models::Value;

/// Test applied to a single variable's cell.
#[derive(Clone)]
pub enum Predicate {
    Equals(Value),
    OneOf(Vec<Value>),
    Test(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl Predicate {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::Equals(expected) => value == expected,
            Predicate::OneOf(candidates) => candidates.iter().any(|c| c == value),
            Predicate::Test(test) => test(value),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals(v) => write!(f, "Equals({})", v),
            Predicate::OneOf(vs) => f.debug_tuple("OneOf").field(vs).finish(),
            Predicate::Test(_) => write!(f, "Test(<fn>)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub variable: String,
    pub predicate: Predicate,
}

/// Ordered conjunction of per-variable predicates.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<Filter>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equals(mut self, variable: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            variable: variable.to_string(),
            predicate: Predicate::Equals(value.into()),
        });
        self
    }

    pub fn one_of<V: Into<Value>>(
        mut self,
        variable: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter {
            variable: variable.to_string(),
            predicate: Predicate::OneOf(values.into_iter().map(Into::into).collect()),
        });
        self
    }

    pub fn matching<F>(mut self, variable: &str, test: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Filter {
            variable: variable.to_string(),
            predicate: Predicate::Test(Arc::new(test)),
        });
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
