pub mod collider;
pub mod factory;
pub mod independent_priors;
pub mod random_chain;

pub use factory::ScenarioMakerFactory;

use crate::common::errors::Result;
use crate::network::ConditionalProbabilityTable;
use crate::table::backend::Storage;
use crate::table::models::{Row, Table, VALUE_COLUMN, Value};

/// CPT over binary variables. `p_true[i]` is P(outcome = 1) for the i-th assignment of the
/// givens, counting in binary with the first given as the most significant bit.
pub(crate) fn binary_cpt(
    storage: &Storage,
    outcome: &str,
    givens: &[&str],
    p_true: &[f64],
) -> Result<ConditionalProbabilityTable> {
    let mut columns: Vec<&str> = givens.to_vec();
    columns.push(outcome);
    columns.push(VALUE_COLUMN);

    let mut table = Table::new(columns.as_slice())?;
    for (assignment, p) in p_true.iter().enumerate() {
        for outcome_value in [0, 1] {
            let mut row: Row = (0..givens.len())
                .map(|bit| Value::Integer(((assignment >> (givens.len() - 1 - bit)) & 1) as i64))
                .collect();
            row.push(Value::Integer(outcome_value));
            row.push(Value::Float(if outcome_value == 1 { *p } else { 1.0 - *p }));
            table.push(row)?;
        }
    }
    ConditionalProbabilityTable::new(storage.create(table)?, &[outcome], givens)
}
