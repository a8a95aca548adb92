use serde::Serialize;

use super::types::EngineError;

/// One band of a progressive schedule. `upper_limit` is `None` for the
/// open-ended top bracket; `base_tax` is the tax owed on income up to the
/// previous bracket's limit.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBracket {
    pub upper_limit: Option<f64>,
    pub marginal_rate: f64,
    pub base_tax: f64,
}

/// An ordered bracket table, validated at construction: limits strictly
/// increasing, a single open-ended tail, and every `base_tax` consistent
/// with the rate list.
#[derive(Clone, Debug, PartialEq)]
pub struct TaxSchedule {
    brackets: Vec<TaxBracket>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxAssessment {
    pub tax: f64,
    pub marginal_rate_percent: f64,
    pub effective_rate_percent: f64,
}

impl TaxSchedule {
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, EngineError> {
        if brackets.is_empty() {
            return Err(EngineError::invalid(
                "tax schedule must have at least one bracket",
            ));
        }

        let mut prev_limit = 0.0;
        let mut expected_base = 0.0;
        for (idx, bracket) in brackets.iter().enumerate() {
            let is_last = idx == brackets.len() - 1;

            if !bracket.marginal_rate.is_finite()
                || !(0.0..=1.0).contains(&bracket.marginal_rate)
            {
                return Err(EngineError::invalid(format!(
                    "marginal rate of bracket {idx} must be between 0 and 1"
                )));
            }
            if !bracket.base_tax.is_finite() || bracket.base_tax < 0.0 {
                return Err(EngineError::invalid(format!(
                    "base tax of bracket {idx} must be >= 0"
                )));
            }
            if (bracket.base_tax - expected_base).abs() > 1e-6 {
                return Err(EngineError::invalid(format!(
                    "base tax of bracket {idx} is {}, expected {expected_base} from the rate list",
                    bracket.base_tax
                )));
            }

            match bracket.upper_limit {
                None if !is_last => {
                    return Err(EngineError::invalid(
                        "only the last tax bracket may be open-ended",
                    ));
                }
                Some(_) if is_last => {
                    return Err(EngineError::invalid("last tax bracket must be open-ended"));
                }
                Some(limit) => {
                    if !limit.is_finite() || limit <= prev_limit {
                        return Err(EngineError::invalid(format!(
                            "bracket limits must be strictly increasing (bracket {idx})"
                        )));
                    }
                    expected_base += (limit - prev_limit) * bracket.marginal_rate;
                    prev_limit = limit;
                }
                None => {}
            }
        }

        Ok(Self { brackets })
    }

    /// The published resident schedule (YA 2024 onwards). Base-tax values
    /// are the published literals; construction re-derives and checks them.
    pub fn singapore_resident() -> Self {
        fn bracket(upper_limit: Option<f64>, marginal_rate: f64, base_tax: f64) -> TaxBracket {
            TaxBracket {
                upper_limit,
                marginal_rate,
                base_tax,
            }
        }

        Self::new(vec![
            bracket(Some(20_000.0), 0.0, 0.0),
            bracket(Some(30_000.0), 0.02, 0.0),
            bracket(Some(40_000.0), 0.035, 200.0),
            bracket(Some(80_000.0), 0.07, 550.0),
            bracket(Some(120_000.0), 0.115, 3_350.0),
            bracket(Some(160_000.0), 0.15, 7_950.0),
            bracket(Some(200_000.0), 0.18, 13_950.0),
            bracket(Some(240_000.0), 0.19, 21_150.0),
            bracket(Some(280_000.0), 0.195, 28_750.0),
            bracket(Some(320_000.0), 0.20, 36_550.0),
            bracket(Some(500_000.0), 0.22, 44_550.0),
            bracket(Some(1_000_000.0), 0.23, 84_150.0),
            bracket(None, 0.24, 199_150.0),
        ])
        .expect("built-in resident schedule is valid")
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }
}

/// Computes payable tax on chargeable income plus marginal and effective
/// rates. Gross income is supplied separately because reliefs are deducted
/// by the caller; the effective rate is 0 when gross is 0.
pub fn compute_tax(
    chargeable_income: f64,
    gross_income: f64,
    schedule: &TaxSchedule,
) -> Result<TaxAssessment, EngineError> {
    for (name, value) in [
        ("chargeable income", chargeable_income),
        ("gross income", gross_income),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::invalid(format!("{name} must be >= 0")));
        }
    }

    let mut prev_limit = 0.0;
    let mut matched = None;
    for bracket in schedule.brackets() {
        match bracket.upper_limit {
            Some(limit) if chargeable_income > limit => prev_limit = limit,
            _ => {
                matched = Some(bracket);
                break;
            }
        }
    }
    let Some(bracket) = matched else {
        return Err(EngineError::invalid("tax schedule has no open-ended tail"));
    };

    let tax = bracket.base_tax + (chargeable_income - prev_limit) * bracket.marginal_rate;
    let effective_rate_percent = if gross_income > 0.0 {
        tax / gross_income * 100.0
    } else {
        0.0
    };

    Ok(TaxAssessment {
        tax,
        marginal_rate_percent: bracket.marginal_rate * 100.0,
        effective_rate_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn zero_income_owes_no_tax() {
        let result =
            compute_tax(0.0, 0.0, &TaxSchedule::singapore_resident()).expect("valid inputs");
        assert_approx(result.tax, 0.0);
        assert_approx(result.marginal_rate_percent, 0.0);
        assert_approx(result.effective_rate_percent, 0.0);
    }

    #[test]
    fn income_inside_zero_rate_floor_owes_no_tax() {
        let result =
            compute_tax(20_000.0, 20_000.0, &TaxSchedule::singapore_resident()).expect("valid");
        assert_approx(result.tax, 0.0);
        assert_approx(result.marginal_rate_percent, 0.0);
    }

    #[test]
    fn worked_example_at_50_000_chargeable() {
        // 550 base at the 80k bracket plus 7% of the 10k above 40k.
        let result =
            compute_tax(50_000.0, 60_000.0, &TaxSchedule::singapore_resident()).expect("valid");
        assert_approx(result.tax, 1_250.0);
        assert_approx(result.marginal_rate_percent, 7.0);
        assert_approx(result.effective_rate_percent, 1_250.0 / 60_000.0 * 100.0);
    }

    #[test]
    fn bracket_boundary_income_uses_the_bracket_it_closes() {
        let result =
            compute_tax(40_000.0, 40_000.0, &TaxSchedule::singapore_resident()).expect("valid");
        assert_approx(result.tax, 550.0);
        assert_approx(result.marginal_rate_percent, 3.5);
    }

    #[test]
    fn income_above_last_finite_limit_uses_open_top_bracket() {
        let result =
            compute_tax(2_000_000.0, 2_000_000.0, &TaxSchedule::singapore_resident())
                .expect("valid");
        assert_approx(result.tax, 199_150.0 + 1_000_000.0 * 0.24);
        assert_approx(result.marginal_rate_percent, 24.0);
    }

    #[test]
    fn published_base_tax_literals_are_pinned() {
        let schedule = TaxSchedule::singapore_resident();
        let bases: Vec<f64> = schedule.brackets().iter().map(|b| b.base_tax).collect();
        assert_eq!(
            bases,
            vec![
                0.0, 0.0, 200.0, 550.0, 3_350.0, 7_950.0, 13_950.0, 21_150.0, 28_750.0, 36_550.0,
                44_550.0, 84_150.0, 199_150.0
            ]
        );
    }

    #[test]
    fn negative_income_is_rejected() {
        let err = compute_tax(-100.0, 0.0, &TaxSchedule::singapore_resident())
            .expect_err("negative income must be rejected");
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    fn bracket(upper_limit: Option<f64>, marginal_rate: f64, base_tax: f64) -> TaxBracket {
        TaxBracket {
            upper_limit,
            marginal_rate,
            base_tax,
        }
    }

    #[test]
    fn schedule_rejects_non_increasing_limits() {
        let err = TaxSchedule::new(vec![
            bracket(Some(20_000.0), 0.0, 0.0),
            bracket(Some(20_000.0), 0.02, 0.0),
            bracket(None, 0.07, 0.0),
        ])
        .expect_err("equal limits must be rejected");
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn schedule_rejects_missing_open_tail() {
        let err = TaxSchedule::new(vec![
            bracket(Some(20_000.0), 0.0, 0.0),
            bracket(Some(30_000.0), 0.02, 0.0),
        ])
        .expect_err("closed tail must be rejected");
        assert!(err.to_string().contains("open-ended"));
    }

    #[test]
    fn schedule_rejects_drifted_base_tax_literal() {
        let err = TaxSchedule::new(vec![
            bracket(Some(20_000.0), 0.0, 0.0),
            bracket(Some(30_000.0), 0.02, 0.0),
            bracket(None, 0.035, 250.0),
        ])
        .expect_err("drifted base must be rejected");
        assert!(err.to_string().contains("expected 200"));
    }

    #[test]
    fn schedule_rejects_rate_above_one() {
        let err = TaxSchedule::new(vec![bracket(None, 1.5, 0.0)])
            .expect_err("rate above 1 must be rejected");
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_tax_is_monotone_in_chargeable_income(
            income_lo in 0u32..1_500_000,
            income_step in 0u32..200_000
        ) {
            let schedule = TaxSchedule::singapore_resident();
            let lo = compute_tax(income_lo as f64, income_lo as f64, &schedule).expect("valid");
            let hi = compute_tax(
                (income_lo + income_step) as f64,
                (income_lo + income_step) as f64,
                &schedule,
            ).expect("valid");

            prop_assert!(hi.tax + 1e-6 >= lo.tax);
        }

        #[test]
        fn prop_effective_rate_never_exceeds_marginal_rate(
            income in 1u32..1_500_000
        ) {
            let schedule = TaxSchedule::singapore_resident();
            let result = compute_tax(income as f64, income as f64, &schedule).expect("valid");

            prop_assert!(result.tax >= 0.0);
            prop_assert!(result.effective_rate_percent <= result.marginal_rate_percent + 1e-9);
        }
    }
}
