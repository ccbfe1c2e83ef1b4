use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Cents, MAX_AMOUNT_CENTS, cents_as_decimal, parse_cents};

pub type ExpenseId = Uuid;

pub const MAX_REQUEST_ID_LEN: usize = 128;
pub const MAX_CATEGORY_LEN: usize = 64;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// A recorded expense. Expenses are immutable once persisted; a second create
/// with the same `request_id` yields the stored row instead of a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expense {
    pub id: ExpenseId,
    /// Caller-supplied idempotency key, unique across all expenses
    pub request_id: String,
    /// Amount in cents (always positive)
    #[serde(rename = "amount", with = "cents_as_decimal")]
    pub amount_cents: Cents,
    pub category: String,
    pub description: String,
    /// When the expense occurred
    pub date: NaiveDate,
    /// When the expense was persisted
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Build a fresh expense for a validated payload. Persisting it is the
    /// repository's job.
    pub fn new(request_id: impl Into<String>, input: NewExpense) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: request_id.into(),
            amount_cents: input.amount_cents,
            category: input.category,
            description: input.description,
            date: input.date,
            created_at: Utc::now(),
        }
    }
}

/// Unvalidated create payload. Fields stay raw JSON values so that a missing
/// or wrongly typed field surfaces as a validation error naming the field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseInput {
    /// JSON number or decimal string
    pub amount: Option<Value>,
    pub category: Option<Value>,
    pub description: Option<Value>,
    pub date: Option<Value>,
}

/// Create payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub amount_cents: Cents,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
}

impl ExpenseInput {
    pub fn new(
        amount: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            amount: Some(Value::String(amount.into())),
            category: Some(Value::String(category.into())),
            description: Some(Value::String(description.into())),
            date: Some(Value::String(date.into())),
        }
    }

    /// Check every field and collect all failures, not just the first.
    pub fn validate(&self) -> Result<NewExpense, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let raw_amount = match &self.amount {
            None => {
                errors.push("amount", "amount is required");
                None
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                errors.push("amount", "amount must be a number or a decimal string");
                None
            }
        };
        let amount_cents = raw_amount.and_then(|raw| match parse_cents(&raw) {
            Ok(cents) if cents <= 0 => {
                errors.push("amount", "amount must be greater than 0");
                None
            }
            Ok(cents) if cents > MAX_AMOUNT_CENTS => {
                errors.push("amount", "amount is too large");
                None
            }
            Ok(cents) => Some(cents),
            Err(e) => {
                errors.push("amount", e.to_string());
                None
            }
        });

        let category = required_text(
            &mut errors,
            "category",
            self.category.as_ref(),
            MAX_CATEGORY_LEN,
        );
        let description = required_text(
            &mut errors,
            "description",
            self.description.as_ref(),
            MAX_DESCRIPTION_LEN,
        );

        let date = text_field(&mut errors, "date", self.date.as_ref()).and_then(|raw| {
            if raw.is_empty() {
                errors.push("date", "date is required");
                return None;
            }
            match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.push("date", format!("invalid date '{}', expected YYYY-MM-DD", raw));
                    None
                }
            }
        });

        match (amount_cents, category, description, date) {
            (Some(amount_cents), Some(category), Some(description), Some(date))
                if errors.is_empty() =>
            {
                Ok(NewExpense {
                    amount_cents,
                    category,
                    description,
                    date,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Trimmed string content of a text field. An absent field reads as empty;
/// any non-string JSON value is recorded as an error and yields `None`.
fn text_field<'a>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&'a Value>,
) -> Option<&'a str> {
    match value {
        None => Some(""),
        Some(Value::String(s)) => Some(s.trim()),
        Some(_) => {
            errors.push(field, format!("{} must be a string", field));
            None
        }
    }
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&Value>,
    max_len: usize,
) -> Option<String> {
    let value = text_field(errors, field, value)?;
    if value.is_empty() {
        errors.push(field, format!("{} is required", field));
        return None;
    }
    if value.chars().count() > max_len {
        errors.push(field, format!("{} must be at most {} characters", field, max_len));
        return None;
    }
    Some(value.to_string())
}

/// Trim and check an idempotency token. `None` means the token is absent.
pub fn normalize_request_id(raw: &str) -> Option<Result<String, ValidationErrors>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() > MAX_REQUEST_ID_LEN {
        return Some(Err(ValidationErrors::single(
            "request_id",
            format!("request id must be at most {} characters", MAX_REQUEST_ID_LEN),
        )));
    }
    Some(Ok(trimmed.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|e| e.field)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Ordering applied when listing expenses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortMode {
    /// Storage-natural order; callers must not rely on it
    #[default]
    Unspecified,
    /// Newest first by expense date, ties in insertion order
    DateDesc,
}

impl SortMode {
    /// Unknown values fall back to `Unspecified` rather than failing.
    pub fn from_param(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("date_desc") => SortMode::DateDesc,
            _ => SortMode::Unspecified,
        }
    }
}
