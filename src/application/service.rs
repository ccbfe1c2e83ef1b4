use tracing::{debug, info, warn};

use crate::domain::{Expense, ExpenseInput, SortMode, normalize_request_id};
use crate::storage::{InsertOutcome, Repository, SumOutcome};

use super::{AppError, ExpenseSummary};

/// Application service providing the expense operations.
/// This is the primary interface for any client (HTTP API, CLI).
pub struct LedgerService {
    repo: Repository,
}

/// Result of creating an expense
#[derive(Debug, Clone)]
pub struct CreateResult {
    pub expense: Expense,
    /// True when the request id had already been used and the stored row was returned
    pub replayed: bool,
}

/// Filter for querying expenses
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Exact, case-sensitive category match
    pub category: Option<String>,
    pub sort: SortMode,
}

impl ExpenseFilter {
    /// Build a filter from raw query values. An empty category means "all".
    pub fn from_params(category: Option<String>, sort: Option<&str>) -> Self {
        Self {
            category: category.filter(|c| !c.is_empty()),
            sort: SortMode::from_param(sort),
        }
    }
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Open (creating if needed) and migrate the database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Release pooled connections.
    pub async fn close(&self) {
        self.repo.close().await;
    }

    /// Record an expense exactly once per request id.
    ///
    /// A repeated request id returns the first committed row unchanged, even if
    /// the replayed payload differs. Concurrent attempts with the same id
    /// collapse onto whichever insert committed first.
    pub async fn create_expense(
        &self,
        request_id: &str,
        input: ExpenseInput,
    ) -> Result<CreateResult, AppError> {
        let request_id = match normalize_request_id(request_id) {
            None => return Err(AppError::MissingRequestId),
            Some(result) => result?,
        };
        let new_expense = input.validate()?;

        if let Some(existing) = self.repo.find_by_request_id(&request_id).await? {
            debug!(
                request_id = %request_id,
                expense_id = %existing.id,
                "Replayed request id, returning stored expense"
            );
            return Ok(CreateResult {
                expense: existing,
                replayed: true,
            });
        }

        let expense = Expense::new(request_id.clone(), new_expense);
        match self.repo.insert_expense(expense).await? {
            InsertOutcome::Created(expense) => {
                info!(
                    request_id = %request_id,
                    expense_id = %expense.id,
                    amount_cents = expense.amount_cents,
                    category = %expense.category,
                    "Recorded expense"
                );
                Ok(CreateResult {
                    expense,
                    replayed: false,
                })
            }
            InsertOutcome::AlreadyExists => {
                warn!(
                    request_id = %request_id,
                    "Concurrent insert for request id lost the race, returning winner"
                );
                let winner = self
                    .repo
                    .find_by_request_id(&request_id)
                    .await?
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "Expense for request id {} rejected as duplicate but not found",
                            request_id
                        )
                    })?;
                Ok(CreateResult {
                    expense: winner,
                    replayed: true,
                })
            }
        }
    }

    /// List expenses matching the filter.
    pub async fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, AppError> {
        Ok(self
            .repo
            .list_expenses(filter.category.as_deref(), filter.sort)
            .await?)
    }

    /// Total and per-category breakdown, optionally restricted to one category.
    pub async fn summarize_expenses(
        &self,
        category: Option<&str>,
    ) -> Result<ExpenseSummary, AppError> {
        let category = category.filter(|c| !c.is_empty());
        let totals = match self.repo.sum_by_category(category).await? {
            SumOutcome::Totals(totals) => totals,
            SumOutcome::Overflow => return Err(AppError::TotalOverflow),
        };
        ExpenseSummary::from_totals(totals).ok_or(AppError::TotalOverflow)
    }
}
