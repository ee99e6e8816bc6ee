use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ScheduleTable;
use crate::core::{JurisdictionComposer, TaxBreakdown, TaxError};

#[derive(Parser, Debug)]
#[command(
    name = "taxbands",
    version,
    about = "Progressive federal + provincial income tax estimator"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "JSON bracket table; defaults to the built-in Canadian 2024 brackets"
    )]
    schedules: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate combined federal and provincial tax for one income.
    Estimate(EstimateArgs),
    /// List provinces available in the bracket table.
    Provinces,
    /// Serve the estimator over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
struct EstimateArgs {
    #[arg(long)]
    province: String,
    #[arg(long, help = "Total taxable income")]
    income: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Share of income that is capital gains, in percent"
    )]
    capital_gain_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct TaxRequest {
    province: String,
    income: f64,
    capital_gain_fraction: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TaxPayload {
    #[serde(alias = "jurisdiction")]
    province: Option<String>,
    income: Option<f64>,
    #[serde(alias = "capital_gain_percent", alias = "cgPercent")]
    capital_gain_percent: Option<f64>,
}

#[derive(Debug, Serialize)]
struct JurisdictionsResponse {
    federal: &'static str,
    jurisdictions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(args: EstimateArgs) -> Result<TaxRequest, String> {
    if args.province.trim().is_empty() {
        return Err("--province must not be empty".to_string());
    }

    if !args.income.is_finite() || args.income < 0.0 {
        return Err("--income must be >= 0".to_string());
    }

    if !(0.0..=100.0).contains(&args.capital_gain_percent) {
        return Err("--capital-gain-percent must be between 0 and 100".to_string());
    }

    Ok(TaxRequest {
        province: args.province.trim().to_string(),
        income: args.income,
        capital_gain_fraction: args.capital_gain_percent / 100.0,
    })
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let table = ScheduleTable::load(cli.schedules.as_deref())?;
    let composer = table
        .build_composer()
        .context("failed to build jurisdiction schedules")?;

    match cli.command {
        Command::Estimate(args) => {
            let request = build_request(args).map_err(anyhow::Error::msg)?;
            let breakdown = evaluate(&composer, &request)?;
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
        }
        Command::Provinces => {
            for name in composer.list_jurisdictions() {
                println!("{name}");
            }
        }
        Command::Serve { port } => {
            run_http_server(port, Arc::new(composer)).await?;
        }
    }
    Ok(())
}

fn evaluate(
    composer: &JurisdictionComposer,
    request: &TaxRequest,
) -> Result<TaxBreakdown, TaxError> {
    composer.breakdown(
        &request.province,
        request.income,
        request.capital_gain_fraction,
    )
}

pub fn router(composer: Arc<JurisdictionComposer>) -> Router {
    Router::new()
        .route("/api/jurisdictions", get(jurisdictions_handler))
        .route("/api/tax", get(tax_get_handler).post(tax_post_handler))
        .fallback(not_found_handler)
        .with_state(composer)
}

pub async fn run_http_server(
    port: u16,
    composer: Arc<JurisdictionComposer>,
) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(composer);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "tax estimator HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/jurisdictions");

    axum::serve(listener, app).await
}

async fn jurisdictions_handler(State(composer): State<Arc<JurisdictionComposer>>) -> Response {
    json_response(
        StatusCode::OK,
        JurisdictionsResponse {
            federal: composer.federal_name(),
            jurisdictions: composer.list_jurisdictions().into_iter().collect(),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn tax_get_handler(
    State(composer): State<Arc<JurisdictionComposer>>,
    Query(payload): Query<TaxPayload>,
) -> Response {
    tax_handler_impl(&composer, payload)
}

async fn tax_post_handler(
    State(composer): State<Arc<JurisdictionComposer>>,
    Json(payload): Json<TaxPayload>,
) -> Response {
    tax_handler_impl(&composer, payload)
}

fn tax_handler_impl(composer: &JurisdictionComposer, payload: TaxPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected tax request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match evaluate(composer, &request) {
        Ok(breakdown) => json_response(StatusCode::OK, breakdown),
        Err(err) => {
            warn!(province = %request.province, error = %err, "tax evaluation failed");
            error_response(status_for(&err), &err.to_string())
        }
    }
}

fn status_for(err: &TaxError) -> StatusCode {
    match err {
        TaxError::Validation(_) => StatusCode::BAD_REQUEST,
        TaxError::NotFound(_) => StatusCode::NOT_FOUND,
        TaxError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
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
fn api_request_from_json(json: &str) -> Result<TaxRequest, String> {
    let payload = serde_json::from_str::<TaxPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: TaxPayload) -> Result<TaxRequest, String> {
    let Some(province) = payload.province else {
        return Err("province is required".to_string());
    };
    let Some(income) = payload.income else {
        return Err("income is required".to_string());
    };

    let args = EstimateArgs {
        province,
        income,
        capital_gain_percent: payload.capital_gain_percent.unwrap_or(0.0),
    };

    build_request(args).map_err(|msg| {
        msg.replace("--capital-gain-percent", "capitalGainPercent")
            .replace("--province", "province")
            .replace("--income", "income")
    })
}
