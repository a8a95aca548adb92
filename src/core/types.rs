use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The engine is pure and dependency-free, so the only failure mode is a
/// caller-side contract violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }
}

/// Fractional split of a contribution across the three CPF accounts.
/// Components must sum to 1.0.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSplit {
    pub ordinary: f64,
    pub special: f64,
    pub medisave: f64,
}

impl AllocationSplit {
    pub fn sum(self) -> f64 {
        self.ordinary + self.special + self.medisave
    }
}

/// One age bracket's contribution profile. `age_max` is exclusive;
/// `None` marks the open-ended top bracket.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateBand {
    pub age_min: u32,
    pub age_max: Option<u32>,
    pub employee_rate: f64,
    pub employer_rate: f64,
    pub allocation: AllocationSplit,
}

impl RateBand {
    pub fn contains(&self, age: u32) -> bool {
        age >= self.age_min && self.age_max.is_none_or(|max| age < max)
    }

    pub fn total_rate(&self) -> f64 {
        self.employee_rate + self.employer_rate
    }
}

/// Ordinary-wage (monthly) and total annual wage ceilings for one
/// calendar year. The year schedule is the caller's concern.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WageCeilings {
    pub ordinary_monthly: f64,
    pub annual_total: f64,
}

impl WageCeilings {
    pub fn singapore_2025() -> Self {
        Self {
            ordinary_monthly: 7_400.0,
            annual_total: 102_000.0,
        }
    }
}

/// Result of applying the wage ceilings to one year of salary plus bonus.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WageContribution {
    pub ordinary_wage_subject: f64,
    pub additional_wage_ceiling: f64,
    pub additional_wage_subject: f64,
    pub total_subject_wage: f64,
    pub employee_contribution: f64,
    pub employer_contribution: f64,
}

/// Three-way account balance. Never mutated by the engine; projections
/// return fresh values.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundBalances {
    pub ordinary: f64,
    pub special: f64,
    pub medisave: f64,
}

impl FundBalances {
    pub fn total(self) -> f64 {
        self.ordinary + self.special + self.medisave
    }
}

/// Fixed annual growth rate per account, as fractions.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthRates {
    pub ordinary: f64,
    pub special: f64,
    pub medisave: f64,
}

/// One year of a forward projection. `year_index` is 1-based.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRow {
    pub year_index: u32,
    pub age: u32,
    pub balances: FundBalances,
    pub total: f64,
}
