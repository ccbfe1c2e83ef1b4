use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{Cents, Expense, SortMode};

use super::MIGRATION_001_EXPENSES;

const DATE_FORMAT: &str = "%Y-%m-%d";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const EXPENSE_COLUMNS: &str =
    "id, request_id, amount_cents, category, description, date, created_at";

/// Outcome of inserting an expense. A `request_id` collision is an expected
/// result, not an error: it means another attempt already committed.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Expense),
    AlreadyExists,
}

/// Per-category aggregate used by summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category: String,
    pub count: i64,
    pub total: Cents,
}

/// Outcome of summing expenses. SQLite refuses a `SUM` that leaves the i64
/// range; that is a property of the stored data, so it is not an error here.
#[derive(Debug)]
pub enum SumOutcome {
    Totals(Vec<CategoryTotal>),
    Overflow,
}

/// Repository for persisting and querying expenses.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    /// WAL mode and a busy timeout let concurrent writers queue instead of failing.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_EXPENSES)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Insert a new expense. A UNIQUE violation on `request_id` is reported as
    /// `InsertOutcome::AlreadyExists`; every other failure is an error.
    pub async fn insert_expense(&self, expense: Expense) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO expenses (id, request_id, amount_cents, category, description, date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(&expense.request_id)
        .bind(expense.amount_cents)
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(expense.date.format(DATE_FORMAT).to_string())
        .bind(expense.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Created(expense)),
            Err(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation() && db_err.message().contains("request_id") =>
            {
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to insert expense")),
        }
    }

    /// Get an expense by its idempotency key.
    pub async fn find_by_request_id(&self, request_id: &str) -> Result<Option<Expense>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM expenses WHERE request_id = ?",
            EXPENSE_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch expense by request id")?;

        row.as_ref().map(Self::row_to_expense).transpose()
    }

    /// List expenses with an optional exact category match.
    /// `DateDesc` breaks date ties by insertion order (rowid).
    pub async fn list_expenses(
        &self,
        category: Option<&str>,
        sort: SortMode,
    ) -> Result<Vec<Expense>> {
        let mut query = format!("SELECT {} FROM expenses WHERE 1=1", EXPENSE_COLUMNS);

        if category.is_some() {
            query.push_str(" AND category = ?");
        }

        match sort {
            SortMode::DateDesc => query.push_str(" ORDER BY date DESC, rowid ASC"),
            SortMode::Unspecified => query.push_str(" ORDER BY rowid ASC"),
        }

        let mut sql_query = sqlx::query(&query);
        if let Some(cat) = category {
            sql_query = sql_query.bind(cat);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list expenses")?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    /// Sum expenses per category, ordered by category name.
    pub async fn sum_by_category(&self, category: Option<&str>) -> Result<SumOutcome> {
        let mut query = String::from(
            "SELECT category, COUNT(*) as count, COALESCE(SUM(amount_cents), 0) as total FROM expenses",
        );
        if category.is_some() {
            query.push_str(" WHERE category = ?");
        }
        query.push_str(" GROUP BY category ORDER BY category");

        let mut sql_query = sqlx::query(&query);
        if let Some(cat) = category {
            sql_query = sql_query.bind(cat);
        }

        let rows = match sql_query.fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(sqlx::Error::Database(db_err))
                if db_err.message().contains("integer overflow") =>
            {
                return Ok(SumOutcome::Overflow);
            }
            Err(e) => return Err(e).context("Failed to sum expenses by category"),
        };

        Ok(SumOutcome::Totals(
            rows.iter()
                .map(|row| CategoryTotal {
                    category: row.get("category"),
                    count: row.get("count"),
                    total: row.get("total"),
                })
                .collect(),
        ))
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_expense(row: &SqliteRow) -> Result<Expense> {
        let id_str: String = row.get("id");
        let date_str: String = row.get("date");
        let created_at_str: String = row.get("created_at");

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            request_id: row.get("request_id"),
            amount_cents: row.get("amount_cents"),
            category: row.get("category"),
            description: row.get("description"),
            date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
                .with_context(|| format!("Invalid expense date: {}", date_str))?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
