use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    AllocationSplit, FundBalances, GrowthRates, ProjectionRow, RateSchedule, TaxSchedule,
    WageCeilings, WageContribution, compute_tax, compute_wage_contribution, evaluate_plan, project,
};

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Personal finance planning engine (CPF contributions, progressive tax, emergency fund)"
)]
struct Cli {
    #[arg(long, default_value_t = 30, help = "Member age in whole years")]
    age: u32,
    #[arg(long, default_value_t = 0.0, help = "Gross monthly salary (ordinary wage)")]
    monthly_salary: f64,
    #[arg(long, default_value_t = 0.0, help = "Annual bonus (additional wage)")]
    annual_bonus: f64,
    #[arg(
        long,
        default_value_t = 7400.0,
        help = "Monthly ordinary wage ceiling for the contribution year"
    )]
    ordinary_wage_ceiling: f64,
    #[arg(long, default_value_t = 102000.0, help = "Annual total wage ceiling")]
    annual_wage_ceiling: f64,

    #[arg(long, default_value_t = 0.0, help = "Ordinary account starting balance")]
    ordinary_start: f64,
    #[arg(long, default_value_t = 0.0, help = "Special account starting balance")]
    special_start: f64,
    #[arg(long, default_value_t = 0.0, help = "Medisave account starting balance")]
    medisave_start: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly inflow into the ordinary account")]
    ordinary_inflow: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly inflow into the special account")]
    special_inflow: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly inflow into the medisave account")]
    medisave_inflow: f64,
    #[arg(
        long,
        default_value_t = 2.5,
        help = "Ordinary account growth in percent per year"
    )]
    ordinary_growth_rate: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Special account growth in percent per year"
    )]
    special_growth_rate: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Medisave account growth in percent per year"
    )]
    medisave_growth_rate: f64,
    #[arg(long, default_value_t = 10, help = "Projection horizon in years")]
    projection_years: u32,

    #[arg(
        long,
        default_value_t = 0.0,
        help = "Chargeable income after reliefs"
    )]
    chargeable_income: f64,
    #[arg(long, help = "Gross income before reliefs; defaults to chargeable income")]
    gross_income: Option<f64>,

    #[arg(long, default_value_t = 0.0, help = "Liquid savings earmarked for emergencies")]
    liquid_savings: f64,
    #[arg(long, default_value_t = 0.0, help = "Average monthly expenses")]
    monthly_expenses: f64,
    #[arg(long, default_value_t = 6.0, help = "Target emergency runway in months")]
    target_months: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Planned monthly saving toward the emergency fund"
    )]
    monthly_contribution: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContributionPayload {
    age: Option<u32>,
    monthly_salary: Option<f64>,
    annual_bonus: Option<f64>,
    ordinary_wage_ceiling: Option<f64>,
    annual_wage_ceiling: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionPayload {
    start_age: Option<u32>,
    years: Option<u32>,
    ordinary_start: Option<f64>,
    special_start: Option<f64>,
    medisave_start: Option<f64>,
    ordinary_inflow: Option<f64>,
    special_inflow: Option<f64>,
    medisave_inflow: Option<f64>,
    ordinary_growth_rate: Option<f64>,
    special_growth_rate: Option<f64>,
    medisave_growth_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaxPayload {
    chargeable_income: Option<f64>,
    gross_income: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EmergencyPayload {
    liquid_savings: Option<f64>,
    monthly_expenses: Option<f64>,
    target_months: Option<f64>,
    monthly_contribution: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct ContributionRequest {
    age: u32,
    monthly_salary: f64,
    annual_bonus: f64,
    ceilings: WageCeilings,
}

#[derive(Debug, Clone, Copy)]
struct ProjectionRequest {
    start_age: u32,
    years: u32,
    start: FundBalances,
    monthly_inflow: FundBalances,
    annual_rates: GrowthRates,
}

#[derive(Debug, Clone, Copy)]
struct TaxRequest {
    chargeable_income: f64,
    gross_income: f64,
}

#[derive(Debug, Clone, Copy)]
struct EmergencyRequest {
    liquid_savings: f64,
    monthly_expenses: f64,
    target_months: f64,
    monthly_contribution: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContributionResponse {
    age: u32,
    employee_rate: f64,
    employer_rate: f64,
    allocation: AllocationSplit,
    contribution: WageContribution,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    start_age: u32,
    years: u32,
    rows: Vec<ProjectionRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaxResponse {
    chargeable_income: f64,
    gross_income: f64,
    tax: f64,
    marginal_rate_percent: f64,
    effective_rate_percent: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn contribution_request(payload: ContributionPayload) -> ContributionRequest {
    let cli = default_cli_for_api();
    ContributionRequest {
        age: payload.age.unwrap_or(cli.age),
        monthly_salary: payload.monthly_salary.unwrap_or(cli.monthly_salary),
        annual_bonus: payload.annual_bonus.unwrap_or(cli.annual_bonus),
        ceilings: WageCeilings {
            ordinary_monthly: payload
                .ordinary_wage_ceiling
                .unwrap_or(cli.ordinary_wage_ceiling),
            annual_total: payload.annual_wage_ceiling.unwrap_or(cli.annual_wage_ceiling),
        },
    }
}

fn projection_request(payload: ProjectionPayload) -> ProjectionRequest {
    let cli = default_cli_for_api();
    ProjectionRequest {
        start_age: payload.start_age.unwrap_or(cli.age),
        years: payload.years.unwrap_or(cli.projection_years),
        start: FundBalances {
            ordinary: payload.ordinary_start.unwrap_or(cli.ordinary_start),
            special: payload.special_start.unwrap_or(cli.special_start),
            medisave: payload.medisave_start.unwrap_or(cli.medisave_start),
        },
        monthly_inflow: FundBalances {
            ordinary: payload.ordinary_inflow.unwrap_or(cli.ordinary_inflow),
            special: payload.special_inflow.unwrap_or(cli.special_inflow),
            medisave: payload.medisave_inflow.unwrap_or(cli.medisave_inflow),
        },
        annual_rates: GrowthRates {
            ordinary: payload
                .ordinary_growth_rate
                .unwrap_or(cli.ordinary_growth_rate)
                / 100.0,
            special: payload.special_growth_rate.unwrap_or(cli.special_growth_rate) / 100.0,
            medisave: payload
                .medisave_growth_rate
                .unwrap_or(cli.medisave_growth_rate)
                / 100.0,
        },
    }
}

fn tax_request(payload: TaxPayload) -> TaxRequest {
    let cli = default_cli_for_api();
    let chargeable_income = payload.chargeable_income.unwrap_or(cli.chargeable_income);
    let gross_income = payload
        .gross_income
        .or(cli.gross_income)
        .unwrap_or(chargeable_income);
    TaxRequest {
        chargeable_income,
        gross_income,
    }
}

fn emergency_request(payload: EmergencyPayload) -> EmergencyRequest {
    let cli = default_cli_for_api();
    EmergencyRequest {
        liquid_savings: payload.liquid_savings.unwrap_or(cli.liquid_savings),
        monthly_expenses: payload.monthly_expenses.unwrap_or(cli.monthly_expenses),
        target_months: payload.target_months.unwrap_or(cli.target_months),
        monthly_contribution: payload
            .monthly_contribution
            .unwrap_or(cli.monthly_contribution),
    }
}

fn default_cli_for_api() -> Cli {
    Cli {
        age: 30,
        monthly_salary: 0.0,
        annual_bonus: 0.0,
        ordinary_wage_ceiling: 7_400.0,
        annual_wage_ceiling: 102_000.0,
        ordinary_start: 0.0,
        special_start: 0.0,
        medisave_start: 0.0,
        ordinary_inflow: 0.0,
        special_inflow: 0.0,
        medisave_inflow: 0.0,
        ordinary_growth_rate: 2.5,
        special_growth_rate: 4.0,
        medisave_growth_rate: 4.0,
        projection_years: 10,
        chargeable_income: 0.0,
        gross_income: None,
        liquid_savings: 0.0,
        monthly_expenses: 0.0,
        target_months: 6.0,
        monthly_contribution: 0.0,
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/contribution",
            get(contribution_get_handler).post(contribution_post_handler),
        )
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route("/api/tax", get(tax_get_handler).post(tax_post_handler))
        .route(
            "/api/emergency",
            get(emergency_get_handler).post(emergency_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("nestegg HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/contribution");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn contribution_get_handler(Query(payload): Query<ContributionPayload>) -> Response {
    handle_contribution(payload)
}

async fn contribution_post_handler(Json(payload): Json<ContributionPayload>) -> Response {
    handle_contribution(payload)
}

async fn projection_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    handle_projection(payload)
}

async fn projection_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    handle_projection(payload)
}

async fn tax_get_handler(Query(payload): Query<TaxPayload>) -> Response {
    handle_tax(payload)
}

async fn tax_post_handler(Json(payload): Json<TaxPayload>) -> Response {
    handle_tax(payload)
}

async fn emergency_get_handler(Query(payload): Query<EmergencyPayload>) -> Response {
    handle_emergency(payload)
}

async fn emergency_post_handler(Json(payload): Json<EmergencyPayload>) -> Response {
    handle_emergency(payload)
}

fn handle_contribution(payload: ContributionPayload) -> Response {
    let request = contribution_request(payload);
    let schedule = RateSchedule::singapore_2025();
    match compute_wage_contribution(
        request.monthly_salary,
        request.annual_bonus,
        request.age,
        &request.ceilings,
        &schedule,
    ) {
        Ok(contribution) => {
            let band = schedule.band_for(request.age);
            json_response(
                StatusCode::OK,
                ContributionResponse {
                    age: request.age,
                    employee_rate: band.employee_rate,
                    employer_rate: band.employer_rate,
                    allocation: band.allocation,
                    contribution,
                },
            )
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn handle_projection(payload: ProjectionPayload) -> Response {
    let request = projection_request(payload);
    match project(
        &request.start,
        request.start_age,
        &request.monthly_inflow,
        &request.annual_rates,
        request.years,
    ) {
        Ok(rows) => json_response(
            StatusCode::OK,
            ProjectionResponse {
                start_age: request.start_age,
                years: request.years,
                rows,
            },
        ),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn handle_tax(payload: TaxPayload) -> Response {
    let request = tax_request(payload);
    match compute_tax(
        request.chargeable_income,
        request.gross_income,
        &TaxSchedule::singapore_resident(),
    ) {
        Ok(assessment) => json_response(
            StatusCode::OK,
            TaxResponse {
                chargeable_income: request.chargeable_income,
                gross_income: request.gross_income,
                tax: assessment.tax,
                marginal_rate_percent: assessment.marginal_rate_percent,
                effective_rate_percent: assessment.effective_rate_percent,
            },
        ),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn handle_emergency(payload: EmergencyPayload) -> Response {
    let request = emergency_request(payload);
    match evaluate_plan(
        request.liquid_savings,
        request.monthly_expenses,
        request.target_months,
        request.monthly_contribution,
    ) {
        Ok(plan) => json_response(StatusCode::OK, plan),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn contribution_request_from_json(json: &str) -> Result<ContributionRequest, String> {
    let payload = serde_json::from_str::<ContributionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    Ok(contribution_request(payload))
}

#[cfg(test)]
fn projection_request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<ProjectionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    Ok(projection_request(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn contribution_request_parses_web_keys() {
        let json = r#"{
          "age": 30,
          "monthlySalary": 5000,
          "annualBonus": 15000
        }"#;
        let request = contribution_request_from_json(json).expect("json should parse");

        assert_eq!(request.age, 30);
        assert_approx(request.monthly_salary, 5_000.0);
        assert_approx(request.annual_bonus, 15_000.0);
        assert_approx(request.ceilings.ordinary_monthly, 7_400.0);
        assert_approx(request.ceilings.annual_total, 102_000.0);
    }

    #[test]
    fn contribution_request_accepts_ceiling_overrides() {
        let json = r#"{
          "monthlySalary": 6000,
          "ordinaryWageCeiling": 6800,
          "annualWageCeiling": 102000
        }"#;
        let request = contribution_request_from_json(json).expect("json should parse");
        assert_approx(request.ceilings.ordinary_monthly, 6_800.0);
    }

    #[test]
    fn projection_request_converts_percent_rates_to_fractions() {
        let json = r#"{
          "startAge": 35,
          "years": 5,
          "ordinaryStart": 40000,
          "ordinaryInflow": 900,
          "ordinaryGrowthRate": 2.5,
          "specialGrowthRate": 4.0
        }"#;
        let request = projection_request_from_json(json).expect("json should parse");

        assert_eq!(request.start_age, 35);
        assert_eq!(request.years, 5);
        assert_approx(request.start.ordinary, 40_000.0);
        assert_approx(request.monthly_inflow.ordinary, 900.0);
        assert_approx(request.annual_rates.ordinary, 0.025);
        assert_approx(request.annual_rates.special, 0.04);
        assert_approx(request.annual_rates.medisave, 0.04);
    }

    #[test]
    fn empty_payload_falls_back_to_defaults() {
        let request = contribution_request_from_json("{}").expect("json should parse");
        assert_eq!(request.age, 30);
        assert_approx(request.monthly_salary, 0.0);

        let projection = projection_request_from_json("{}").expect("json should parse");
        assert_eq!(projection.years, 10);
        assert_approx(projection.annual_rates.medisave, 0.04);
    }

    #[test]
    fn tax_request_defaults_gross_to_chargeable() {
        let payload = TaxPayload {
            chargeable_income: Some(50_000.0),
            gross_income: None,
        };
        let request = tax_request(payload);
        assert_approx(request.gross_income, 50_000.0);

        let payload = TaxPayload {
            chargeable_income: Some(50_000.0),
            gross_income: Some(60_000.0),
        };
        assert_approx(tax_request(payload).gross_income, 60_000.0);
    }

    #[test]
    fn contribution_handler_rejects_negative_salary() {
        let payload = ContributionPayload {
            monthly_salary: Some(-1.0),
            ..ContributionPayload::default()
        };
        let response = handle_contribution(payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn projection_handler_rejects_zero_years() {
        let payload = ProjectionPayload {
            years: Some(0),
            ..ProjectionPayload::default()
        };
        let response = handle_projection(payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn emergency_handler_rejects_zero_expenses() {
        let response = handle_emergency(EmergencyPayload::default());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn contribution_handler_accepts_worked_example() {
        let payload = ContributionPayload {
            age: Some(30),
            monthly_salary: Some(5_000.0),
            annual_bonus: Some(15_000.0),
            ..ContributionPayload::default()
        };
        let response = handle_contribution(payload);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn contribution_response_serializes_expected_fields() {
        let schedule = RateSchedule::singapore_2025();
        let contribution = compute_wage_contribution(
            5_000.0,
            15_000.0,
            30,
            &WageCeilings::singapore_2025(),
            &schedule,
        )
        .expect("valid inputs");
        let band = schedule.band_for(30);
        let response = ContributionResponse {
            age: 30,
            employee_rate: band.employee_rate,
            employer_rate: band.employer_rate,
            allocation: band.allocation,
            contribution,
        };

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"employeeRate\""));
        assert!(json.contains("\"employerRate\""));
        assert!(json.contains("\"allocation\""));
        assert!(json.contains("\"ordinaryWageSubject\""));
        assert!(json.contains("\"additionalWageCeiling\""));
        assert!(json.contains("\"employeeContribution\":15000.0"));
    }

    #[test]
    fn projection_response_serializes_expected_fields() {
        let request = projection_request_from_json(
            r#"{"ordinaryStart": 1000, "ordinaryInflow": 100, "years": 2}"#,
        )
        .expect("json should parse");
        let rows = project(
            &request.start,
            request.start_age,
            &request.monthly_inflow,
            &request.annual_rates,
            request.years,
        )
        .expect("valid projection");
        let response = ProjectionResponse {
            start_age: request.start_age,
            years: request.years,
            rows,
        };

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"startAge\""));
        assert!(json.contains("\"rows\""));
        assert!(json.contains("\"yearIndex\""));
        assert!(json.contains("\"balances\""));
        assert!(json.contains("\"medisave\""));
    }

    #[test]
    fn emergency_plan_serializes_expected_fields() {
        let plan = evaluate_plan(6_000.0, 2_000.0, 6.0, 500.0).expect("valid plan");
        let json = serde_json::to_string(&plan).expect("plan should serialize");
        assert!(json.contains("\"monthsCovered\""));
        assert!(json.contains("\"coverageRatio\""));
        assert!(json.contains("\"monthsToTarget\""));
        assert!(json.contains("\"severityRank\""));
        assert!(json.contains("\"gaining-stability\""));
    }
}
