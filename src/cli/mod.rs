use std::net::SocketAddr;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::api;
use crate::application::{ExpenseFilter, LedgerService};
use crate::domain::{ExpenseInput, SortMode, format_cents};
use crate::logging::{LogFormat, init_tracing};

/// Expense Ledger - retry-safe expense tracking
#[derive(Parser)]
#[command(name = "expense-ledger")]
#[command(about = "Records expenses exactly once per request id and serves them over HTTP")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(
        short,
        long,
        env = "EXPENSE_LEDGER_DB",
        default_value = "expenses.db",
        global = true
    )]
    pub database: String,

    /// Log output format
    #[arg(
        long,
        env = "EXPENSE_LEDGER_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text,
        global = true
    )]
    pub log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "EXPENSE_LEDGER_LISTEN", default_value = "127.0.0.1:8000")]
        listen: SocketAddr,

        /// Allowed CORS origins, comma separated ("*" allows any)
        #[arg(
            long,
            env = "EXPENSE_LEDGER_CORS_ORIGINS",
            value_delimiter = ',',
            default_value = "*"
        )]
        cors_origins: Vec<String>,
    },

    /// Record an expense
    Add {
        /// Amount (e.g., "150.00" or "150")
        amount: String,

        /// Category (e.g., "Food", "Travel")
        #[arg(short, long)]
        category: String,

        /// What the expense was for
        #[arg(long)]
        description: String,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Idempotency token; reuse it to retry safely (defaults to a new UUID)
        #[arg(long)]
        request_id: Option<String>,
    },

    /// List expenses
    List {
        /// Filter by exact category
        #[arg(short, long)]
        category: Option<String>,

        /// Newest first by date
        #[arg(long)]
        newest_first: bool,
    },

    /// Show totals per category
    Summary {
        /// Restrict to one category
        #[arg(short, long)]
        category: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let level = if self.verbose { "debug" } else { "info" };
        init_tracing(self.log_format, level);

        match self.command {
            Commands::Init => {
                let service = LedgerService::init(&self.database).await?;
                service.close().await;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve {
                listen,
                cors_origins,
            } => {
                let service = LedgerService::init(&self.database).await?;
                api::serve(service, listen, &cors_origins).await?;
            }

            Commands::Add {
                amount,
                category,
                description,
                date,
                request_id,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let date = date.unwrap_or_else(|| Utc::now().date_naive().to_string());
                let request_id = request_id.unwrap_or_else(|| Uuid::new_v4().to_string());
                let input = ExpenseInput::new(amount.as_str(), category, description, date);

                let result = service.create_expense(&request_id, input).await?;
                let expense = &result.expense;
                if result.replayed {
                    println!("Already recorded for request id {}:", expense.request_id);
                } else {
                    println!("Recorded expense:");
                }
                println!(
                    "  {} {} {} - {} ({})",
                    expense.date,
                    format_cents(expense.amount_cents),
                    expense.category,
                    expense.description,
                    expense.id
                );
                service.close().await;
            }

            Commands::List {
                category,
                newest_first,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let sort = if newest_first {
                    SortMode::DateDesc
                } else {
                    SortMode::Unspecified
                };
                let category = category.filter(|c| !c.is_empty());
                run_list_command(&service, ExpenseFilter { category, sort }).await?;
                service.close().await;
            }

            Commands::Summary { category } => {
                let service = LedgerService::connect(&self.database).await?;
                run_summary_command(&service, category.as_deref()).await?;
                service.close().await;
            }
        }

        Ok(())
    }
}

async fn run_list_command(service: &LedgerService, filter: ExpenseFilter) -> Result<()> {
    let expenses = service.list_expenses(&filter).await?;

    if expenses.is_empty() {
        println!("No expenses found.");
        return Ok(());
    }

    println!(
        "{:<12} {:>12} {:<15} DESCRIPTION",
        "DATE", "AMOUNT", "CATEGORY"
    );
    println!("{}", "-".repeat(70));

    for expense in &expenses {
        println!(
            "{:<12} {:>12} {:<15} {}",
            expense.date.to_string(),
            format_cents(expense.amount_cents),
            truncate(&expense.category, 15),
            truncate(&expense.description, 30)
        );
    }

    let total: i64 = expenses.iter().map(|e| e.amount_cents).sum();
    println!("{}", "-".repeat(70));
    println!("{:<12} {:>12}", "TOTAL", format_cents(total));
    Ok(())
}

async fn run_summary_command(service: &LedgerService, category: Option<&str>) -> Result<()> {
    let summary = service.summarize_expenses(category).await?;

    if summary.categories.is_empty() {
        println!("No expenses found.");
        return Ok(());
    }

    println!("{:<20} {:>8} {:>12}", "CATEGORY", "COUNT", "TOTAL");
    println!("{}", "-".repeat(42));
    for entry in &summary.categories {
        println!(
            "{:<20} {:>8} {:>12}",
            truncate(&entry.category, 20),
            entry.count,
            format_cents(entry.total)
        );
    }
    println!("{}", "-".repeat(42));
    println!(
        "{:<20} {:>8} {:>12}",
        "TOTAL",
        summary.count,
        format_cents(summary.total)
    );
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
