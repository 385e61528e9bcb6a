//! Constraint-only ticket enumeration.
//!
//! Lists the valid tickets of a pool in lexicographic order, with no coverage
//! optimization, stopping at the caller's limit or at `max_candidates`.

use std::ops::ControlFlow;
use std::time::Instant;
use tracing::info;

use crate::candidates::TicketLattice;
use crate::config::OptimizerConfig;
use crate::constraints::{ConstraintViolation, Constraints, Validator};
use crate::error::OptimizerError;
use crate::pool::{Combination, NumberPool};

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOutcome {
    pub combinations: Vec<Combination>,
    pub numbers_used: Vec<u32>,
    /// Output stopped at `max_candidates` before the space was exhausted.
    pub truncated: bool,
    pub warnings: Vec<String>,
}

/// Enumerate valid tickets. `limit` of `None` (or zero) means "all", still
/// bounded by `max_candidates`.
pub fn generate(
    pool: &NumberPool,
    constraints: &Constraints,
    limit: Option<usize>,
    limits: &OptimizerConfig,
) -> Result<GenerateOutcome, OptimizerError> {
    let started = Instant::now();
    let width = limits.draw_width;
    let (validator, rule_warnings) = Validator::new(constraints, pool, width)?;
    let mut warnings: Vec<String> = rule_warnings.iter().map(ToString::to_string).collect();

    let ceiling = usize::try_from(limits.max_candidates).unwrap_or(usize::MAX);
    let wanted = match limit {
        Some(n) if n > 0 => n.min(ceiling),
        _ => ceiling,
    };

    let lattice = TicketLattice::new(pool, &validator);
    let mut combinations = Vec::new();
    let mut sequential_excluded = 0u64;
    let mut truncated = false;
    lattice.for_each(|ticket| {
        let values = pool.values_of(ticket);
        match validator.check(&values) {
            Ok(()) => {}
            Err(ConstraintViolation::Sequential { .. }) => {
                sequential_excluded += 1;
                return ControlFlow::Continue(());
            }
            Err(_) => return ControlFlow::Continue(()),
        }
        if combinations.len() == wanted {
            // Another valid ticket exists beyond the ceiling.
            truncated = wanted == ceiling;
            return ControlFlow::Break(());
        }
        combinations.push(Combination::new(values));
        ControlFlow::Continue(())
    });

    if sequential_excluded > 0 {
        warnings.push(format!(
            "{} highly sequential combinations were excluded",
            sequential_excluded
        ));
    }
    if truncated {
        warnings.push(format!(
            "output truncated at {} combinations",
            combinations.len()
        ));
    }

    info!(
        pool = pool.len(),
        count = combinations.len(),
        truncated,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generation finished"
    );
    Ok(GenerateOutcome {
        combinations,
        numbers_used: pool.numbers().to_vec(),
        truncated,
        warnings,
    })
}
