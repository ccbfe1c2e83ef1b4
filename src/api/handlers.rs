use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

use crate::application::{AppError, ExpenseFilter, ExpenseSummary};
use crate::domain::{Expense, ExpenseInput};

use super::{AppState, REQUEST_ID_HEADER, error::ApiResult};

#[derive(Serialize)]
pub struct HealthStatus {
    status: &'static str,
}

/// Liveness probe. Never touches storage.
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    category: Option<String>,
    sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    category: Option<String>,
}

fn request_id_header(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::MissingRequestId)
}

/// Create an expense. `201` on first write, `200` when the request id was
/// already used.
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ExpenseInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    // Token first: a request without one is rejected whatever its body.
    let request_id = request_id_header(&headers)?;
    let Json(input) = payload?;

    let result = state.ledger.create_expense(request_id, input).await?;
    let status = if result.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(result.expense)))
}

pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Expense>>> {
    let Query(params) = query?;
    let filter = ExpenseFilter::from_params(params.category, params.sort.as_deref());
    let expenses = state.ledger.list_expenses(&filter).await?;
    Ok(Json(expenses))
}

pub async fn summarize_expenses(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SummaryParams>, QueryRejection>,
) -> ApiResult<Json<ExpenseSummary>> {
    let Query(params) = query?;
    let summary = state
        .ledger
        .summarize_expenses(params.category.as_deref())
        .await?;
    Ok(Json(summary))
}
