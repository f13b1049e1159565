//! Error type shared by the table, factor and network layers.

use thiserror::Error;

use crate::table::models::ValueKind;

/// Every failure the core can report. Nothing is retried or recovered locally; each variant
/// reaches the immediate caller.
#[derive(Debug, Error)]
pub enum FactorError {
    /// The reserved weight column is absent.
    #[error("the column 'value' must exist")]
    MissingValueColumn,

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("row has {found} cells but the table has {expected} columns")]
    RowArity { expected: usize, found: usize },

    /// Declared givens/outcomes without a backing column.
    #[error("mismatch between table columns {columns:?} and givens/outcomes; missing {missing:?}")]
    ColumnMismatch {
        columns: Vec<String>,
        missing: Vec<String>,
    },

    #[error("a conditional probability table needs at least one outcome")]
    EmptyOutcomes,

    #[error("a Bayesian network CPT must have exactly one outcome, found {0}")]
    OutcomeArity(usize),

    #[error("prior for '{outcome}' must not have givens, found {givens:?}")]
    PriorHasGivens { outcome: String, givens: Vec<String> },

    #[error("factor must be supplied with only one of a table, a CPT, or a log factor")]
    AmbiguousOrigin,

    #[error(
        "factor must be supplied with a table, a conditional probability table, or a log factor"
    )]
    MissingOrigin,

    #[error("row {row}: weight is not numeric ({value})")]
    NonNumericWeight { row: usize, value: String },

    #[error("row {row}: weight {weight} is negative")]
    NegativeWeight { row: usize, weight: f64 },

    #[error("join on '{variable}' compares {left} values with {right} values")]
    JoinTypeMismatch {
        variable: String,
        left: ValueKind,
        right: ValueKind,
    },

    #[error("edge {from} -> {to} would create a cycle")]
    CycleDetected { from: String, to: String },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("no conditional probability table for node '{0}'")]
    UnknownNode(String),

    #[error("invalid network document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("table backend failure: {0:#}")]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FactorError>;
