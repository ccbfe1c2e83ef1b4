// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use expense_ledger::api::{AppState, app_router};
use expense_ledger::application::{ExpenseFilter, LedgerService};
use expense_ledger::domain::{Expense, ExpenseInput};
use expense_ledger::storage::Repository;
use tempfile::TempDir;

/// Helper to open a migrated repository in a temporary directory, for tests
/// that need to write rows validation would not let through
pub async fn test_repository() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_url = format!("sqlite:{}?mode=rwc", temp_dir.path().join("test.db").display());
    let repo = Repository::init(&db_url).await?;
    Ok((repo, temp_dir))
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to build the HTTP router over a temporary database
pub async fn test_router() -> Result<(axum::Router, Arc<AppState>, TempDir)> {
    let (ledger, temp_dir) = test_service().await?;
    let state = Arc::new(AppState { ledger });
    let router = app_router(state.clone(), &["*".to_string()]);
    Ok((router, state, temp_dir))
}

pub fn input(amount: &str, category: &str, description: &str, date: &str) -> ExpenseInput {
    ExpenseInput::new(amount, category, description, date)
}

/// The payload used by the retry scenario
pub fn retry_payload() -> ExpenseInput {
    input("150.00", "Food", "Retry Test", "2026-02-04")
}

/// Record an expense under a fresh request id
pub async fn record(
    service: &LedgerService,
    request_id: &str,
    category: &str,
    date: &str,
) -> Result<Expense> {
    let result = service
        .create_expense(request_id, input("10.00", category, "Fixture", date))
        .await?;
    Ok(result.expense)
}

pub async fn all_expenses(service: &LedgerService) -> Result<Vec<Expense>> {
    Ok(service.list_expenses(&ExpenseFilter::default()).await?)
}

/// Count stored rows carrying the given request id
pub async fn rows_for_request(service: &LedgerService, request_id: &str) -> Result<usize> {
    Ok(all_expenses(service)
        .await?
        .iter()
        .filter(|e| e.request_id == request_id)
        .count())
}
