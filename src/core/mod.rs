mod cpf;
mod emergency;
mod tax;
mod types;

pub use cpf::{RateSchedule, compute_wage_contribution, project};
pub use emergency::{
    EmergencyPlan, EmergencyStatus, StatusLabel, classify, evaluate_plan, months_covered,
};
pub use tax::{TaxAssessment, TaxBracket, TaxSchedule, compute_tax};
pub use types::{
    AllocationSplit, EngineError, FundBalances, GrowthRates, ProjectionRow, RateBand, WageCeilings,
    WageContribution,
};
