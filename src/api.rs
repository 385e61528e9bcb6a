//! # API — JSON Request/Response Shapes and Handlers
//!
//! Wire types for `POST /greedy`, `POST /budget` and `POST /generate`, and the
//! synchronous handlers that turn a request into a response. The HTTP server
//! runs these on the blocking pool; the CLI calls them directly.
//!
//! Constraint fields sit at the top level of every request body. Position
//! maps (`fixed_positions`, `per_ball_ranges`) are keyed by the position as a
//! string, `{"0": [1, 2]}`, because JSON object keys are strings.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::budget::{run_budget, BudgetMode, BudgetPlan};
use crate::config::OptimizerConfig;
use crate::constraints::{Constraints, GroupLabel, RangeMode, SequentialPolicy, ValueRange};
use crate::error::OptimizerError;
use crate::generator::generate;
use crate::greedy::{default_strategy, run_greedy, CoverageResult, GreedyParams, StopReason, Strategy};
use crate::pool::{Combination, NumberPool};
use crate::round2;

/// Pool used by `/generate` when the request names too few numbers to fill a ticket.
pub const DEFAULT_GENERATE_POOL: u32 = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeInput {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// Constraint fields shared by every request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintsInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_positions: Option<BTreeMap<String, Vec<i64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_numbers: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<BTreeMap<GroupLabel, Vec<i64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_limits: Option<BTreeMap<GroupLabel, Option<i64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_mode: Option<RangeMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_num: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_num: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_ball_ranges: Option<BTreeMap<String, RangeInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential: Option<SequentialPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential_run: Option<usize>,
}

fn parse_position(key: &str, field: &str) -> Result<usize, OptimizerError> {
    key.trim().parse::<usize>().map_err(|_| {
        OptimizerError::ConstraintUnsatisfiable(format!(
            "{} key '{}' is not a position index",
            field, key
        ))
    })
}

fn bound(v: Option<i64>) -> Option<u32> {
    v.map(|x| x.clamp(0, u32::MAX as i64) as u32)
}

fn ball_values(values: &[i64]) -> BTreeSet<u32> {
    values.iter().filter_map(|&v| u32::try_from(v).ok()).collect()
}

impl ConstraintsInput {
    /// Convert to validator input. `default_policy` applies when the request
    /// names no sequential policy.
    pub fn to_constraints(&self, default_policy: SequentialPolicy) -> Result<Constraints, OptimizerError> {
        let mut c = Constraints {
            range_mode: self.range_mode.unwrap_or_default(),
            global_range: ValueRange {
                min: bound(self.min_num),
                max: bound(self.max_num),
            },
            sequential: self.sequential.unwrap_or(default_policy),
            sequential_run: self.sequential_run,
            ..Default::default()
        };

        for (key, allowed) in self.fixed_positions.iter().flatten() {
            c.fixed_positions
                .insert(parse_position(key, "fixed_positions")?, ball_values(allowed));
        }

        for &v in self.forced_numbers.iter().flatten() {
            let value = u32::try_from(v).map_err(|_| {
                OptimizerError::ConstraintUnsatisfiable(format!(
                    "forced number {} is not in the pool",
                    v
                ))
            })?;
            c.forced_numbers.insert(value);
        }

        for (&label, members) in self.groups.iter().flatten() {
            c.groups.insert(label, ball_values(members));
        }

        for (&label, &limit) in self.group_limits.iter().flatten() {
            let Some(limit) = limit else { continue };
            if limit < 0 {
                return Err(OptimizerError::ConstraintUnsatisfiable(format!(
                    "group {} limit must not be negative, got {}",
                    label, limit
                )));
            }
            c.group_limits.insert(label, limit as usize);
        }

        for (key, range) in self.per_ball_ranges.iter().flatten() {
            c.per_ball_ranges.insert(
                parse_position(key, "per_ball_ranges")?,
                ValueRange {
                    min: bound(range.min),
                    max: bound(range.max),
                },
            );
        }
        Ok(c)
    }
}

fn history_rows(rows: &Option<Vec<Vec<i64>>>) -> Vec<Vec<u32>> {
    rows.iter()
        .flatten()
        .map(|row| row.iter().filter_map(|&v| u32::try_from(v).ok()).collect())
        .collect()
}

fn non_negative(v: Option<i64>, default: usize) -> usize {
    v.map_or(default, |x| x.max(0) as usize)
}

// ── POST /greedy ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GreedyRequest {
    pub numbers: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Optional cap on system size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tickets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Vec<i64>>>,
    #[serde(flatten)]
    pub constraints: ConstraintsInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GreedyResponse {
    pub system: Vec<Combination>,
    pub system_size: usize,
    /// Covered share of the universe as a percentage, two decimals.
    pub coverage: f64,
    pub coverage_ratio: f64,
    pub triplets_total: usize,
    pub triplets_covered: usize,
    pub uncovered_triplets: Vec<Combination>,
    pub mode: Strategy,
    pub attempts: usize,
    pub sample_size: usize,
    pub seed: u64,
    pub stop_reason: StopReason,
    pub candidate_space: &'static str,
    pub pruned: usize,
    pub warnings: Vec<String>,
}

impl From<CoverageResult> for GreedyResponse {
    fn from(r: CoverageResult) -> Self {
        GreedyResponse {
            system_size: r.system.len(),
            coverage: round2(r.coverage * 100.0),
            coverage_ratio: r.coverage,
            triplets_total: r.total,
            triplets_covered: r.covered,
            uncovered_triplets: r.uncovered,
            mode: r.strategy,
            attempts: r.attempts,
            sample_size: r.sample_size,
            seed: r.seed,
            stop_reason: r.stop_reason,
            candidate_space: r.candidate_space,
            pruned: r.pruned,
            warnings: r.warnings,
            system: r.system,
        }
    }
}

pub fn handle_greedy(req: &GreedyRequest, limits: &OptimizerConfig) -> Result<GreedyResponse, OptimizerError> {
    let pool = NumberPool::new(&req.numbers, limits.max_number)?;
    let constraints = req.constraints.to_constraints(limits.sequential)?;
    let strategy = req
        .mode
        .unwrap_or_else(|| default_strategy(&pool, &constraints, limits));
    let max_tickets = match req.max_tickets {
        Some(n) if n <= 0 => {
            return Err(OptimizerError::InvalidTicketCount(format!(
                "max_tickets must be at least 1, got {}",
                n
            )))
        }
        Some(n) => Some(n as usize),
        None => None,
    };
    let params = GreedyParams {
        strategy,
        attempts: non_negative(req.attempts, limits.default_attempts),
        sample_size: non_negative(req.sample_size, limits.default_sample_size),
        seed: req.seed,
        max_tickets,
        fill: false,
        history: history_rows(&req.history),
    };
    run_greedy(&pool, &constraints, &params, limits).map(GreedyResponse::from)
}

// ── POST /budget ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetRequest {
    pub numbers: Vec<i64>,
    #[serde(default)]
    pub mode: BudgetMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_cost: Option<f64>,
    /// Greedy strategy inside the cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Vec<i64>>>,
    #[serde(flatten)]
    pub constraints: ConstraintsInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetResponse {
    pub system: Vec<Combination>,
    pub system_size: usize,
    pub coverage: f64,
    pub coverage_ratio: f64,
    pub triplets_total: usize,
    pub triplets_covered: usize,
    pub uncovered_triplets: Vec<Combination>,
    pub mode: BudgetMode,
    pub strategy: Strategy,
    pub ticket_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
    pub attempts: usize,
    pub sample_size: usize,
    pub seed: u64,
    pub stop_reason: StopReason,
    pub filled: usize,
    pub warnings: Vec<String>,
}

pub fn handle_budget(req: &BudgetRequest, limits: &OptimizerConfig) -> Result<BudgetResponse, OptimizerError> {
    let pool = NumberPool::new(&req.numbers, limits.max_number)?;
    let constraints = req.constraints.to_constraints(limits.sequential)?;
    let plan = BudgetPlan {
        mode: req.mode,
        ticket_count: req.ticket_count,
        budget: req.budget,
        ticket_cost: req.ticket_cost,
    };
    let strategy = req
        .strategy
        .unwrap_or_else(|| default_strategy(&pool, &constraints, limits));
    let params = GreedyParams {
        strategy,
        attempts: non_negative(req.attempts, limits.default_attempts),
        sample_size: non_negative(req.sample_size, limits.default_sample_size),
        seed: req.seed,
        max_tickets: None,
        fill: limits.budget_fill,
        history: history_rows(&req.history),
    };
    let out = run_budget(&pool, &constraints, &plan, &params, limits)?;
    let r = out.result;
    Ok(BudgetResponse {
        system_size: r.system.len(),
        coverage: round2(r.coverage * 100.0),
        coverage_ratio: r.coverage,
        triplets_total: r.total,
        triplets_covered: r.covered,
        uncovered_triplets: r.uncovered,
        mode: out.mode,
        strategy: r.strategy,
        ticket_count: out.ticket_count,
        budget: out.money.map(|m| m.budget),
        ticket_cost: out.money.map(|m| m.ticket_cost),
        spent: out.money.map(|m| m.spent),
        remaining: out.money.map(|m| m.remaining),
        attempts: r.attempts,
        sample_size: r.sample_size,
        seed: r.seed,
        stop_reason: r.stop_reason,
        filled: r.filled,
        warnings: r.warnings,
        system: r.system,
    })
}

// ── POST /generate ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numbers: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(flatten)]
    pub constraints: ConstraintsInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateResponse {
    pub combinations: Vec<Combination>,
    pub count: usize,
    pub numbers_used: Vec<u32>,
    pub truncated: bool,
    pub warnings: Vec<String>,
}

pub fn handle_generate(req: &GenerateRequest, limits: &OptimizerConfig) -> Result<GenerateResponse, OptimizerError> {
    let mut warnings = Vec::new();
    let pool = match req.numbers.as_deref() {
        None | Some([]) => NumberPool::range(DEFAULT_GENERATE_POOL),
        Some(numbers) => {
            let given = NumberPool::new(numbers, limits.max_number)?;
            if given.len() < limits.draw_width {
                warnings.push(format!(
                    "{} distinct numbers cannot fill a {}-number ticket; the default pool 1-{} was used",
                    given.len(),
                    limits.draw_width,
                    DEFAULT_GENERATE_POOL
                ));
                NumberPool::range(DEFAULT_GENERATE_POOL)
            } else {
                given
            }
        }
    };
    let constraints = req.constraints.to_constraints(limits.sequential)?;
    let limit = req.limit.filter(|&n| n > 0).map(|n| n as usize);
    let out = generate(&pool, &constraints, limit, limits)?;
    warnings.extend(out.warnings);
    Ok(GenerateResponse {
        count: out.combinations.len(),
        combinations: out.combinations,
        numbers_used: out.numbers_used,
        truncated: out.truncated,
        warnings,
    })
}
