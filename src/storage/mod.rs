mod repository;

pub use repository::*;

/// SQL migration for the expenses table
pub const MIGRATION_001_EXPENSES: &str = include_str!("migrations/001_expenses.sql");
