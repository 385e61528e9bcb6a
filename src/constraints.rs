//! # Constraints — Ticket Validation Rules
//!
//! A `Constraints` value is the caller-facing description of which tickets are
//! acceptable; a `Validator` is the same rules prepared against one pool and
//! draw width. Preparation strips inert input (group members outside the
//! pool), produces soft warnings, and rejects rule sets that provably admit no
//! ticket. Checking a ticket then short-circuits in this order:
//!
//! 1. size matches the draw width and every number is in the pool
//! 2. every forced number is present
//! 3. each fixed position holds an allowed value
//! 4. global or per-ball value ranges hold
//! 5. per-group counts stay within the group limits
//! 6. the sequential rule (only under `SequentialPolicy::Reject`)
//!
//! Tickets are ascending, so "position p" means the p-th smallest number.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::error::OptimizerError;
use crate::pool::{longest_run, Combination, NumberPool};

/// Named number groups used for per-ticket quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupLabel {
    A,
    B,
    C,
}

impl GroupLabel {
    pub const ALL: [GroupLabel; 3] = [GroupLabel::A, GroupLabel::B, GroupLabel::C];

    pub(crate) fn slot(self) -> usize {
        match self {
            GroupLabel::A => 0,
            GroupLabel::B => 1,
            GroupLabel::C => 2,
        }
    }
}

impl std::fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupLabel::A => write!(f, "A"),
            GroupLabel::B => write!(f, "B"),
            GroupLabel::C => write!(f, "C"),
        }
    }
}

/// Inclusive bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl ValueRange {
    pub fn contains(&self, v: u32) -> bool {
        self.min.is_none_or(|m| v >= m) && self.max.is_none_or(|m| v <= m)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeMode {
    #[default]
    #[serde(rename = "global")]
    Global,
    #[serde(rename = "perball")]
    PerBall,
}

/// What to do with tickets containing a long run of consecutive numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequentialPolicy {
    /// Sequential tickets fail validation.
    Reject,
    /// Sequential tickets are kept and counted in the result warnings.
    #[default]
    Warn,
    /// The rule is ignored.
    Allow,
}

/// Caller-supplied ticket constraints. All parts are optional; the default
/// value accepts every ticket of the right size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub fixed_positions: BTreeMap<usize, BTreeSet<u32>>,
    pub forced_numbers: BTreeSet<u32>,
    pub groups: BTreeMap<GroupLabel, BTreeSet<u32>>,
    pub group_limits: BTreeMap<GroupLabel, usize>,
    pub range_mode: RangeMode,
    pub global_range: ValueRange,
    pub per_ball_ranges: BTreeMap<usize, ValueRange>,
    pub sequential: SequentialPolicy,
    /// Run length that counts as sequential; defaults to the draw width.
    pub sequential_run: Option<usize>,
}

/// First rule a ticket breaks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    #[error("ticket has {actual} numbers, expected {expected}")]
    WrongSize { expected: usize, actual: usize },
    #[error("{0} is not in the pool")]
    NotInPool(u32),
    #[error("forced number {0} is missing")]
    MissingForced(u32),
    #[error("position {position} holds {value}, which is not an allowed value")]
    FixedPosition { position: usize, value: u32 },
    #[error("position {position} holds {value}, outside the allowed range")]
    OutOfRange { position: usize, value: u32 },
    #[error("group {group} has {count} numbers, limit is {limit}")]
    GroupLimit {
        group: GroupLabel,
        count: usize,
        limit: usize,
    },
    #[error("contains a run of {run} consecutive numbers")]
    Sequential { run: usize },
}

/// Soft findings from preparing constraints against a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintWarning {
    GroupNumbersOutsidePool { group: GroupLabel, numbers: Vec<u32> },
    GroupLimitSumMismatch { sum: usize, draw_width: usize },
}

impl std::fmt::Display for ConstraintWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintWarning::GroupNumbersOutsidePool { group, numbers } => write!(
                f,
                "group {} numbers not in the pool were ignored: {:?}",
                group, numbers
            ),
            ConstraintWarning::GroupLimitSumMismatch { sum, draw_width } => write!(
                f,
                "group limits sum to {} but tickets have {} numbers",
                sum, draw_width
            ),
        }
    }
}

/// Constraints prepared against one pool and draw width.
#[derive(Debug, Clone)]
pub struct Validator {
    draw_width: usize,
    /// Pool membership by value.
    in_pool: Vec<bool>,
    forced: Vec<u32>,
    fixed: Vec<(usize, BTreeSet<u32>)>,
    range_mode: RangeMode,
    global_range: ValueRange,
    per_ball: Vec<(usize, ValueRange)>,
    /// Group membership by value; later labels win when a number is listed twice.
    group_of: Vec<Option<GroupLabel>>,
    limits: [Option<usize>; 3],
    sequential: SequentialPolicy,
    run: usize,
}

fn unsatisfiable(msg: String) -> OptimizerError {
    OptimizerError::ConstraintUnsatisfiable(msg)
}

impl Validator {
    pub fn new(
        constraints: &Constraints,
        pool: &NumberPool,
        draw_width: usize,
    ) -> Result<(Self, Vec<ConstraintWarning>), OptimizerError> {
        if pool.len() < draw_width {
            return Err(OptimizerError::InsufficientPool {
                pool: pool.len(),
                draw_width,
            });
        }
        let mut warnings = Vec::new();
        let top = pool.numbers().last().copied().unwrap_or(0) as usize;
        let mut in_pool = vec![false; top + 1];
        for &v in pool.numbers() {
            in_pool[v as usize] = true;
        }

        let forced: Vec<u32> = constraints.forced_numbers.iter().copied().collect();
        if let Some(&missing) = forced.iter().find(|&&v| !pool.contains(v)) {
            return Err(unsatisfiable(format!(
                "forced number {} is not in the pool",
                missing
            )));
        }
        if forced.len() > draw_width {
            return Err(unsatisfiable(format!(
                "{} forced numbers do not fit a {}-number ticket",
                forced.len(),
                draw_width
            )));
        }

        let mut fixed = Vec::new();
        for (&position, allowed) in &constraints.fixed_positions {
            if position >= draw_width {
                return Err(unsatisfiable(format!(
                    "fixed position {} is outside a {}-number ticket",
                    position, draw_width
                )));
            }
            let usable: BTreeSet<u32> = allowed.iter().copied().filter(|&v| pool.contains(v)).collect();
            if usable.is_empty() {
                return Err(unsatisfiable(format!(
                    "no allowed value for position {} is in the pool",
                    position
                )));
            }
            // Forced numbers below (above) the fixed value must fit on its left (right).
            let fits = usable.iter().any(|&v| {
                let below = forced.iter().filter(|&&f| f < v).count();
                let above = forced.iter().filter(|&&f| f > v).count();
                below <= position && above < draw_width - position
            });
            if !fits {
                return Err(unsatisfiable(format!(
                    "fixed position {} is incompatible with the forced numbers",
                    position
                )));
            }
            fixed.push((position, usable));
        }

        let mut group_of: Vec<Option<GroupLabel>> = vec![None; top + 1];
        let mut group_sizes = [0usize; 3];
        for (&label, members) in &constraints.groups {
            let outside: Vec<u32> = members.iter().copied().filter(|&v| !pool.contains(v)).collect();
            if !outside.is_empty() {
                warnings.push(ConstraintWarning::GroupNumbersOutsidePool {
                    group: label,
                    numbers: outside,
                });
            }
            for &v in members.iter().filter(|&&v| pool.contains(v)) {
                group_of[v as usize] = Some(label);
            }
        }
        for label in group_of.iter().flatten() {
            group_sizes[label.slot()] += 1;
        }

        let mut limits = [None; 3];
        for (&label, &limit) in &constraints.group_limits {
            limits[label.slot()] = Some(limit);
        }
        if !constraints.group_limits.is_empty() {
            let sum: usize = constraints.group_limits.values().sum();
            if sum != draw_width {
                warnings.push(ConstraintWarning::GroupLimitSumMismatch { sum, draw_width });
            }
        }
        for label in GroupLabel::ALL {
            if let Some(limit) = limits[label.slot()] {
                let forced_in = forced
                    .iter()
                    .filter(|&&f| group_of[f as usize] == Some(label))
                    .count();
                if forced_in > limit {
                    return Err(unsatisfiable(format!(
                        "{} forced numbers belong to group {} whose limit is {}",
                        forced_in, label, limit
                    )));
                }
            }
        }
        let ungrouped = pool
            .numbers()
            .iter()
            .filter(|&&v| group_of[v as usize].is_none())
            .count();
        let capacity: usize = ungrouped
            + GroupLabel::ALL
                .iter()
                .map(|g| {
                    let size = group_sizes[g.slot()];
                    limits[g.slot()].map_or(size, |l| l.min(size))
                })
                .sum::<usize>();
        if capacity < draw_width {
            return Err(unsatisfiable(format!(
                "group limits allow at most {} numbers per ticket, {} needed",
                capacity, draw_width
            )));
        }

        if constraints.range_mode == RangeMode::Global {
            let r = constraints.global_range;
            if let Some(&f) = forced.iter().find(|&&f| !r.contains(f)) {
                return Err(unsatisfiable(format!(
                    "forced number {} is outside the allowed range",
                    f
                )));
            }
            let inside = pool.numbers().iter().filter(|&&v| r.contains(v)).count();
            if inside < draw_width {
                return Err(unsatisfiable(format!(
                    "only {} pool numbers fall inside the allowed range",
                    inside
                )));
            }
        }

        let per_ball = constraints
            .per_ball_ranges
            .iter()
            .filter(|(&i, _)| i < draw_width)
            .map(|(&i, &r)| (i, r))
            .collect();

        let run = constraints.sequential_run.unwrap_or(draw_width).max(2);

        Ok((
            Validator {
                draw_width,
                in_pool,
                forced,
                fixed,
                range_mode: constraints.range_mode,
                global_range: constraints.global_range,
                per_ball,
                group_of,
                limits,
                sequential: constraints.sequential,
                run,
            },
            warnings,
        ))
    }

    pub fn draw_width(&self) -> usize {
        self.draw_width
    }

    pub fn forced(&self) -> &[u32] {
        &self.forced
    }

    pub fn sequential_policy(&self) -> SequentialPolicy {
        self.sequential
    }

    /// Can `value` sit at ascending position `position` under the
    /// fixed-position and range rules?
    pub fn allows_at(&self, position: usize, value: u32) -> bool {
        if let Some((_, allowed)) = self.fixed.iter().find(|(p, _)| *p == position) {
            if !allowed.contains(&value) {
                return false;
            }
        }
        match self.range_mode {
            RangeMode::Global => self.global_range.contains(value),
            RangeMode::PerBall => self
                .per_ball
                .iter()
                .find(|(p, _)| *p == position)
                .is_none_or(|(_, r)| r.contains(value)),
        }
    }

    /// Group of `value` together with that group's limit, when it has one.
    pub fn limited_group(&self, value: u32) -> Option<(GroupLabel, usize)> {
        let group = self.group_of.get(value as usize).copied().flatten()?;
        self.limits[group.slot()].map(|limit| (group, limit))
    }

    /// Does the ticket contain a run long enough to count as sequential?
    pub fn is_sequential(&self, values: &[u32]) -> bool {
        longest_run(values) >= self.run
    }

    /// Check an ascending ticket, reporting the first rule it breaks.
    pub fn check(&self, values: &[u32]) -> Result<(), ConstraintViolation> {
        if values.len() != self.draw_width {
            return Err(ConstraintViolation::WrongSize {
                expected: self.draw_width,
                actual: values.len(),
            });
        }
        if let Some(&v) = values
            .iter()
            .find(|&&v| !self.in_pool.get(v as usize).copied().unwrap_or(false))
        {
            return Err(ConstraintViolation::NotInPool(v));
        }

        if let Some(&f) = self.forced.iter().find(|&&f| values.binary_search(&f).is_err()) {
            return Err(ConstraintViolation::MissingForced(f));
        }

        for (position, allowed) in &self.fixed {
            let value = values[*position];
            if !allowed.contains(&value) {
                return Err(ConstraintViolation::FixedPosition {
                    position: *position,
                    value,
                });
            }
        }

        match self.range_mode {
            RangeMode::Global => {
                if let Some((position, &value)) = values
                    .iter()
                    .enumerate()
                    .find(|(_, &v)| !self.global_range.contains(v))
                {
                    return Err(ConstraintViolation::OutOfRange { position, value });
                }
            }
            RangeMode::PerBall => {
                for &(position, range) in &self.per_ball {
                    let value = values[position];
                    if !range.contains(value) {
                        return Err(ConstraintViolation::OutOfRange { position, value });
                    }
                }
            }
        }

        if self.limits.iter().any(Option::is_some) {
            let mut counts = [0usize; 3];
            for &v in values {
                if let Some(g) = self.group_of.get(v as usize).copied().flatten() {
                    counts[g.slot()] += 1;
                }
            }
            for group in GroupLabel::ALL {
                if let Some(limit) = self.limits[group.slot()] {
                    let count = counts[group.slot()];
                    if count > limit {
                        return Err(ConstraintViolation::GroupLimit {
                            group,
                            count,
                            limit,
                        });
                    }
                }
            }
        }

        if self.sequential == SequentialPolicy::Reject {
            let run = longest_run(values);
            if run >= self.run {
                return Err(ConstraintViolation::Sequential { run });
            }
        }
        Ok(())
    }

    pub fn is_valid(&self, candidate: &Combination) -> bool {
        self.check(candidate.numbers()).is_ok()
    }

    pub fn explain_rejection(&self, candidate: &Combination) -> Option<ConstraintViolation> {
        self.check(candidate.numbers()).err()
    }
}

/// One-shot check: prepares the rules against `pool` and validates `candidate`.
/// Rule sets that admit no ticket at all reject everything.
pub fn is_valid(
    candidate: &Combination,
    constraints: &Constraints,
    pool: &NumberPool,
    draw_width: usize,
) -> bool {
    Validator::new(constraints, pool, draw_width)
        .map(|(v, _)| v.is_valid(candidate))
        .unwrap_or(false)
}

/// One-shot diagnostic counterpart of [`is_valid`].
pub fn explain_rejection(
    candidate: &Combination,
    constraints: &Constraints,
    pool: &NumberPool,
    draw_width: usize,
) -> Result<Option<ConstraintViolation>, OptimizerError> {
    let (validator, _) = Validator::new(constraints, pool, draw_width)?;
    Ok(validator.explain_rejection(candidate))
}
