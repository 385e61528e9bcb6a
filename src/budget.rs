//! # Budget — Size-Capped Optimization
//!
//! A budget run fixes the number of tickets up front, either directly
//! (`count`) or as `floor(budget / ticket_cost)` (`money`), and hands the cap
//! to the greedy core. Coverage is reported but secondary: the system never
//! grows past the cap to chase more of it, and with `budget_fill` on it is
//! topped up to exactly the cap when greedy selection stops early.

use serde::{Deserialize, Serialize};

use crate::config::OptimizerConfig;
use crate::constraints::Constraints;
use crate::error::OptimizerError;
use crate::greedy::{run_greedy, CoverageResult, GreedyParams};
use crate::pool::NumberPool;
use crate::round2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetMode {
    #[default]
    Count,
    Money,
}

impl BudgetMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetMode::Count => "count",
            BudgetMode::Money => "money",
        }
    }
}

/// How the ticket cap is specified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetPlan {
    pub mode: BudgetMode,
    pub ticket_count: Option<i64>,
    pub budget: Option<f64>,
    pub ticket_cost: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoneySummary {
    pub budget: f64,
    pub ticket_cost: f64,
    pub spent: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetResult {
    pub mode: BudgetMode,
    /// Ticket cap the run was given.
    pub ticket_count: usize,
    pub money: Option<MoneySummary>,
    pub result: CoverageResult,
}

/// Tickets a budget buys: `floor(budget / ticket_cost)`, at least one.
pub fn derive_ticket_count(budget: f64, ticket_cost: f64) -> Result<usize, OptimizerError> {
    if !budget.is_finite() || budget <= 0.0 {
        return Err(OptimizerError::InvalidBudget(format!(
            "budget must be a positive amount, got {}",
            budget
        )));
    }
    if !ticket_cost.is_finite() || ticket_cost <= 0.0 {
        return Err(OptimizerError::InvalidBudget(format!(
            "ticket cost must be a positive amount, got {}",
            ticket_cost
        )));
    }
    let count = (budget / ticket_cost).floor();
    if count < 1.0 {
        return Err(OptimizerError::InvalidBudget(format!(
            "a budget of {} does not cover one ticket at {}",
            budget, ticket_cost
        )));
    }
    Ok(count as usize)
}

/// Turn a plan into a ticket cap, checking it against `max_system_size`.
pub fn resolve_ticket_count(
    plan: &BudgetPlan,
    max_system_size: usize,
) -> Result<(usize, Option<MoneySummary>), OptimizerError> {
    match plan.mode {
        BudgetMode::Count => {
            let requested = plan.ticket_count.ok_or_else(|| {
                OptimizerError::InvalidTicketCount("ticket_count is required in count mode".into())
            })?;
            if requested <= 0 {
                return Err(OptimizerError::InvalidTicketCount(format!(
                    "ticket_count must be at least 1, got {}",
                    requested
                )));
            }
            let count = requested as u64;
            if count > max_system_size as u64 {
                return Err(OptimizerError::InvalidTicketCount(format!(
                    "ticket_count {} exceeds the limit of {}",
                    count, max_system_size
                )));
            }
            Ok((count as usize, None))
        }
        BudgetMode::Money => {
            let budget = plan.budget.ok_or_else(|| {
                OptimizerError::InvalidBudget("budget is required in money mode".into())
            })?;
            let ticket_cost = plan.ticket_cost.ok_or_else(|| {
                OptimizerError::InvalidBudget("ticket_cost is required in money mode".into())
            })?;
            let count = derive_ticket_count(budget, ticket_cost)?;
            if count > max_system_size {
                return Err(OptimizerError::InvalidBudget(format!(
                    "budget buys {} tickets, more than the limit of {}",
                    count, max_system_size
                )));
            }
            let spent = round2(count as f64 * ticket_cost);
            Ok((
                count,
                Some(MoneySummary {
                    budget,
                    ticket_cost,
                    spent,
                    remaining: round2(budget - spent),
                }),
            ))
        }
    }
}

/// Run the optimizer with the plan's ticket count as a hard cap.
pub fn run_budget(
    pool: &NumberPool,
    constraints: &Constraints,
    plan: &BudgetPlan,
    params: &GreedyParams,
    limits: &OptimizerConfig,
) -> Result<BudgetResult, OptimizerError> {
    let (ticket_count, money) = resolve_ticket_count(plan, limits.max_system_size)?;
    let capped = GreedyParams {
        max_tickets: Some(ticket_count),
        fill: limits.budget_fill,
        ..params.clone()
    };
    let result = run_greedy(pool, constraints, &capped, limits)?;
    Ok(BudgetResult {
        mode: plan.mode,
        ticket_count,
        money,
        result,
    })
}
