use super::types::{
    AllocationSplit, EngineError, FundBalances, GrowthRates, ProjectionRow, RateBand, WageCeilings,
    WageContribution,
};

/// Age-banded contribution schedule. Bands are validated at construction to
/// be contiguous from age 0 and exhaustive, so every age matches exactly one
/// band.
#[derive(Clone, Debug, PartialEq)]
pub struct RateSchedule {
    bands: Vec<RateBand>,
}

impl RateSchedule {
    pub fn new(bands: Vec<RateBand>) -> Result<Self, EngineError> {
        if bands.is_empty() {
            return Err(EngineError::invalid("rate schedule must have at least one band"));
        }
        if bands[0].age_min != 0 {
            return Err(EngineError::invalid("first rate band must start at age 0"));
        }

        for (idx, band) in bands.iter().enumerate() {
            let is_last = idx == bands.len() - 1;
            match band.age_max {
                None if !is_last => {
                    return Err(EngineError::invalid(
                        "only the last rate band may be open-ended",
                    ));
                }
                Some(_) if is_last => {
                    return Err(EngineError::invalid("last rate band must be open-ended"));
                }
                Some(max) if max <= band.age_min => {
                    return Err(EngineError::invalid(format!(
                        "rate band [{}, {max}) is empty",
                        band.age_min
                    )));
                }
                _ => {}
            }

            if let Some(max) = band.age_max {
                if bands[idx + 1].age_min != max {
                    return Err(EngineError::invalid(format!(
                        "rate bands must be contiguous: band ending at {max} is followed by one starting at {}",
                        bands[idx + 1].age_min
                    )));
                }
            }

            for (name, rate) in [
                ("employee rate", band.employee_rate),
                ("employer rate", band.employer_rate),
            ] {
                if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
                    return Err(EngineError::invalid(format!(
                        "{name} for band starting at {} must be between 0 and 1",
                        band.age_min
                    )));
                }
            }

            let split = band.allocation;
            for (name, share) in [
                ("ordinary", split.ordinary),
                ("special", split.special),
                ("medisave", split.medisave),
            ] {
                if !share.is_finite() || share < 0.0 {
                    return Err(EngineError::invalid(format!(
                        "{name} allocation share for band starting at {} must be >= 0",
                        band.age_min
                    )));
                }
            }
            if (split.sum() - 1.0).abs() > 1e-6 {
                return Err(EngineError::invalid(format!(
                    "allocation split for band starting at {} must sum to 1.0",
                    band.age_min
                )));
            }
        }

        Ok(Self { bands })
    }

    /// The published 2025 schedule for members below the wage ceiling.
    pub fn singapore_2025() -> Self {
        Self::new(vec![
            RateBand {
                age_min: 0,
                age_max: Some(55),
                employee_rate: 0.20,
                employer_rate: 0.17,
                allocation: AllocationSplit {
                    ordinary: 0.6217,
                    special: 0.1621,
                    medisave: 0.2162,
                },
            },
            RateBand {
                age_min: 55,
                age_max: Some(60),
                employee_rate: 0.15,
                employer_rate: 0.145,
                allocation: AllocationSplit {
                    ordinary: 0.4069,
                    special: 0.3171,
                    medisave: 0.2760,
                },
            },
            RateBand {
                age_min: 60,
                age_max: Some(65),
                employee_rate: 0.095,
                employer_rate: 0.11,
                allocation: AllocationSplit {
                    ordinary: 0.1709,
                    special: 0.4326,
                    medisave: 0.3965,
                },
            },
            RateBand {
                age_min: 65,
                age_max: Some(70),
                employee_rate: 0.07,
                employer_rate: 0.085,
                allocation: AllocationSplit {
                    ordinary: 0.0645,
                    special: 0.2581,
                    medisave: 0.6774,
                },
            },
            RateBand {
                age_min: 70,
                age_max: None,
                employee_rate: 0.05,
                employer_rate: 0.075,
                allocation: AllocationSplit {
                    ordinary: 0.08,
                    special: 0.08,
                    medisave: 0.84,
                },
            },
        ])
        .expect("built-in rate schedule is valid")
    }

    pub fn band_for(&self, age: u32) -> &RateBand {
        self.bands
            .iter()
            .find(|band| band.contains(age))
            .unwrap_or_else(|| &self.bands[self.bands.len() - 1])
    }

    pub fn bands(&self) -> &[RateBand] {
        &self.bands
    }
}

/// Applies the OW/AW ceilings to one year of salary plus bonus, then the
/// age band's rates to the total subject wage.
pub fn compute_wage_contribution(
    monthly_salary: f64,
    annual_bonus: f64,
    age: u32,
    ceilings: &WageCeilings,
    schedule: &RateSchedule,
) -> Result<WageContribution, EngineError> {
    for (name, value) in [
        ("monthly salary", monthly_salary),
        ("annual bonus", annual_bonus),
        ("ordinary wage ceiling", ceilings.ordinary_monthly),
        ("annual wage ceiling", ceilings.annual_total),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::invalid(format!("{name} must be >= 0")));
        }
    }

    let ordinary_wage_subject = monthly_salary.min(ceilings.ordinary_monthly);
    let additional_wage_ceiling = (ceilings.annual_total - ordinary_wage_subject * 12.0).max(0.0);
    let additional_wage_subject = annual_bonus.min(additional_wage_ceiling);
    let total_subject_wage = ordinary_wage_subject * 12.0 + additional_wage_subject;

    let band = schedule.band_for(age);
    Ok(WageContribution {
        ordinary_wage_subject,
        additional_wage_ceiling,
        additional_wage_subject,
        total_subject_wage,
        employee_contribution: total_subject_wage * band.employee_rate,
        employer_contribution: total_subject_wage * band.employer_rate,
    })
}

/// Projects the three balances forward under fixed annual rates. Each year
/// adds a full year of contributions first and compounds the sum once;
/// contributions earn no partial-year interest.
pub fn project(
    start: &FundBalances,
    start_age: u32,
    monthly_inflow: &FundBalances,
    annual_rates: &GrowthRates,
    years: u32,
) -> Result<Vec<ProjectionRow>, EngineError> {
    if years == 0 {
        return Err(EngineError::invalid("projection years must be > 0"));
    }
    for (name, value) in [
        ("ordinary balance", start.ordinary),
        ("special balance", start.special),
        ("medisave balance", start.medisave),
        ("ordinary inflow", monthly_inflow.ordinary),
        ("special inflow", monthly_inflow.special),
        ("medisave inflow", monthly_inflow.medisave),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::invalid(format!("{name} must be >= 0")));
        }
    }
    for (name, rate) in [
        ("ordinary growth rate", annual_rates.ordinary),
        ("special growth rate", annual_rates.special),
        ("medisave growth rate", annual_rates.medisave),
    ] {
        if !rate.is_finite() || rate <= -1.0 {
            return Err(EngineError::invalid(format!("{name} must be > -1")));
        }
    }

    let mut balances = *start;
    let mut rows = Vec::with_capacity(years as usize);
    for year_index in 1..=years {
        balances = FundBalances {
            ordinary: (balances.ordinary + monthly_inflow.ordinary * 12.0)
                * (1.0 + annual_rates.ordinary),
            special: (balances.special + monthly_inflow.special * 12.0)
                * (1.0 + annual_rates.special),
            medisave: (balances.medisave + monthly_inflow.medisave * 12.0)
                * (1.0 + annual_rates.medisave),
        };
        rows.push(ProjectionRow {
            year_index,
            age: start_age + year_index,
            balances,
            total: balances.total(),
        });
    }
    Ok(rows)
}
