//! Companion text files: per-step quantities that live next to the binary
//! templates rather than inside them.

mod resolver;
mod table;

pub use resolver::{CompanionPattern, CompanionResolver, metallicity_token};
pub use table::{HeaderLine, TextTable};

use crate::config::AdditionalQuantitySpec;
use crate::domain::{ConvertError, ConvertResult};
use std::path::Path;

/// One named scalar per time step of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantitySeries {
    pub name: String,
    pub values: Vec<f32>,
}

/// Aligns a companion column to `n_steps` time steps.
///
/// The trailing `n_steps` rows are used. Tables that stop one row short lack
/// the zero-age entry; the first available row is repeated in its place.
pub fn align_to_steps(values: Vec<f32>, n_steps: usize, column: &str) -> ConvertResult<Vec<f32>> {
    let available = values.len();
    if available >= n_steps {
        return Ok(values[available - n_steps..].to_vec());
    }

    if available + 1 == n_steps {
        if let Some(&first) = values.first() {
            let mut aligned = Vec::with_capacity(n_steps);
            aligned.push(first);
            aligned.extend(values);
            return Ok(aligned);
        }
    }

    Err(ConvertError::length_mismatch(column, n_steps, available))
}

/// Reads every declared quantity group for one template.
pub fn load_additional_quantities(
    template: &Path,
    n_steps: usize,
    groups: &[AdditionalQuantitySpec],
) -> ConvertResult<Vec<QuantitySeries>> {
    let mut series = Vec::new();

    for group in groups {
        let companion = CompanionResolver::for_quantity(group).resolve(template)?;
        let table = TextTable::load(&companion)?;
        if table.row_count() + 1 == n_steps {
            tracing::debug!(
                companion = %companion.display(),
                "companion table lacks the zero-age row; repeating the first row"
            );
        }

        for name in &group.quantities {
            let values = align_to_steps(table.column_f32(name)?, n_steps, name)?;
            series.push(QuantitySeries {
                name: name.clone(),
                values,
            });
        }
    }

    Ok(series)
}
