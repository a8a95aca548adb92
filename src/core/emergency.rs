use serde::Serialize;

use super::types::EngineError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusLabel {
    CriticalRisk,
    BuildingFoundation,
    GainingStability,
    FullyProtected,
}

/// Classification result, produced fresh on every evaluation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyStatus {
    pub label: StatusLabel,
    pub severity_rank: u8,
    pub advice: &'static str,
}

/// Derived plan around the classification: how far along the fund is and
/// how long the remaining gap takes to close at a given monthly saving.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyPlan {
    pub months_covered: f64,
    pub coverage_ratio: f64,
    pub target_amount: f64,
    pub shortfall: f64,
    pub months_to_target: Option<u32>,
    pub status: EmergencyStatus,
}

fn status(label: StatusLabel) -> EmergencyStatus {
    let (severity_rank, advice) = match label {
        StatusLabel::CriticalRisk => (
            0,
            "Less than one month of expenses saved. Build a starter buffer before any other goal.",
        ),
        StatusLabel::BuildingFoundation => (
            1,
            "A foundation is forming. Keep automatic transfers going until you pass half of your target.",
        ),
        StatusLabel::GainingStability => (
            2,
            "More than halfway to your target runway. Stay the course.",
        ),
        StatusLabel::FullyProtected => (
            3,
            "Target runway fully funded. Redirect surplus savings toward longer-term goals.",
        ),
    };
    EmergencyStatus {
        label,
        severity_rank,
        advice,
    }
}

/// Maps a runway to a status tier. The first rule is a hard floor: under
/// one month covered is always critical, whatever the target, so the
/// classification can jump a tier at the one-month boundary when the
/// target is large. That discontinuity is intentional.
pub fn classify(months_covered: f64, target_months: f64) -> Result<EmergencyStatus, EngineError> {
    if !months_covered.is_finite() || months_covered < 0.0 {
        return Err(EngineError::invalid("months covered must be >= 0"));
    }
    if !target_months.is_finite() || target_months <= 0.0 {
        return Err(EngineError::invalid("target months must be > 0"));
    }

    let label = if months_covered < 1.0 {
        StatusLabel::CriticalRisk
    } else {
        let ratio = months_covered / target_months;
        if ratio < 0.5 {
            StatusLabel::BuildingFoundation
        } else if ratio < 1.0 {
            StatusLabel::GainingStability
        } else {
            StatusLabel::FullyProtected
        }
    };
    Ok(status(label))
}

/// Runway in months from raw balances.
pub fn months_covered(liquid_savings: f64, monthly_expenses: f64) -> Result<f64, EngineError> {
    if !liquid_savings.is_finite() || liquid_savings < 0.0 {
        return Err(EngineError::invalid("liquid savings must be >= 0"));
    }
    if !monthly_expenses.is_finite() || monthly_expenses <= 0.0 {
        return Err(EngineError::invalid("monthly expenses must be > 0"));
    }
    Ok(liquid_savings / monthly_expenses)
}

pub fn evaluate_plan(
    liquid_savings: f64,
    monthly_expenses: f64,
    target_months: f64,
    monthly_contribution: f64,
) -> Result<EmergencyPlan, EngineError> {
    if !monthly_contribution.is_finite() || monthly_contribution < 0.0 {
        return Err(EngineError::invalid("monthly contribution must be >= 0"));
    }

    let covered = months_covered(liquid_savings, monthly_expenses)?;
    let status = classify(covered, target_months)?;

    let target_amount = monthly_expenses * target_months;
    let shortfall = (target_amount - liquid_savings).max(0.0);
    let months_to_target = if shortfall <= 0.0 {
        Some(0)
    } else if monthly_contribution > 0.0 {
        Some((shortfall / monthly_contribution).ceil() as u32)
    } else {
        None
    };

    Ok(EmergencyPlan {
        months_covered: covered,
        coverage_ratio: covered / target_months,
        target_amount,
        shortfall,
        months_to_target,
        status,
    })
}
