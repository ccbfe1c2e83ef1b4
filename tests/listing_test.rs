mod common;

use anyhow::Result;
use chrono::NaiveDate;
use common::{all_expenses, input, record, test_repository, test_service};
use expense_ledger::application::{AppError, ExpenseFilter, LedgerService};
use expense_ledger::domain::{Cents, Expense, NewExpense, SortMode};
use expense_ledger::storage::InsertOutcome;

#[tokio::test]
async fn test_filter_by_category() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let lunch = record(&service, "a", "Food", "2026-01-01").await?;
    record(&service, "b", "Travel", "2026-01-02").await?;
    let dinner = record(&service, "c", "Food", "2026-01-03").await?;

    let filter = ExpenseFilter::from_params(Some("Food".into()), None);
    let food = service.list_expenses(&filter).await?;

    assert_eq!(food.len(), 2);
    assert!(food.iter().all(|e| e.category == "Food"));
    let ids: Vec<_> = food.iter().map(|e| e.id).collect();
    assert!(ids.contains(&lunch.id));
    assert!(ids.contains(&dinner.id));

    Ok(())
}

#[tokio::test]
async fn test_category_filter_is_exact_and_case_sensitive() -> Result<()> {
    let (service, _temp) = test_service().await?;

    record(&service, "a", "Food", "2026-01-01").await?;

    for category in ["food", "Foo", "Food "] {
        let filter = ExpenseFilter::from_params(Some(category.into()), None);
        assert!(service.list_expenses(&filter).await?.is_empty());
    }

    Ok(())
}

#[tokio::test]
async fn test_unknown_category_yields_empty_list() -> Result<()> {
    let (service, _temp) = test_service().await?;

    record(&service, "a", "Food", "2026-01-01").await?;

    let filter = ExpenseFilter::from_params(Some("Bills".into()), None);
    assert!(service.list_expenses(&filter).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_empty_category_means_no_filter() -> Result<()> {
    let (service, _temp) = test_service().await?;

    record(&service, "a", "Food", "2026-01-01").await?;
    record(&service, "b", "Travel", "2026-01-02").await?;

    let filter = ExpenseFilter::from_params(Some(String::new()), None);
    assert_eq!(service.list_expenses(&filter).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_sort_newest_first_by_date() -> Result<()> {
    let (service, _temp) = test_service().await?;

    record(&service, "a", "Food", "2026-01-01").await?;
    record(&service, "b", "Food", "2026-03-01").await?;
    record(&service, "c", "Food", "2026-02-01").await?;

    let filter = ExpenseFilter::from_params(None, Some("date_desc"));
    assert_eq!(filter.sort, SortMode::DateDesc);
    let dates: Vec<String> = service
        .list_expenses(&filter)
        .await?
        .iter()
        .map(|e| e.date.to_string())
        .collect();

    assert_eq!(dates, vec!["2026-03-01", "2026-02-01", "2026-01-01"]);

    Ok(())
}

#[tokio::test]
async fn test_sort_ties_keep_insertion_order() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let first = record(&service, "a", "Food", "2026-02-01").await?;
    let older = record(&service, "b", "Food", "2026-01-01").await?;
    let second = record(&service, "c", "Food", "2026-02-01").await?;

    let filter = ExpenseFilter::from_params(None, Some("date_desc"));
    let ids: Vec<_> = service
        .list_expenses(&filter)
        .await?
        .iter()
        .map(|e| e.id)
        .collect();

    assert_eq!(ids, vec![first.id, second.id, older.id]);

    Ok(())
}

#[tokio::test]
async fn test_filter_and_sort_combined() -> Result<()> {
    let (service, _temp) = test_service().await?;

    record(&service, "a", "Food", "2026-01-10").await?;
    record(&service, "b", "Travel", "2026-05-01").await?;
    record(&service, "c", "Food", "2026-04-02").await?;

    let filter = ExpenseFilter::from_params(Some("Food".into()), Some("date_desc"));
    let dates: Vec<String> = service
        .list_expenses(&filter)
        .await?
        .iter()
        .map(|e| e.date.to_string())
        .collect();

    assert_eq!(dates, vec!["2026-04-02", "2026-01-10"]);

    Ok(())
}

#[tokio::test]
async fn test_unknown_sort_value_still_lists_everything() -> Result<()> {
    let (service, _temp) = test_service().await?;

    record(&service, "a", "Food", "2026-01-01").await?;
    record(&service, "b", "Travel", "2026-03-01").await?;

    let filter = ExpenseFilter::from_params(None, Some("amount_asc"));
    assert_eq!(filter.sort, SortMode::Unspecified);
    assert_eq!(service.list_expenses(&filter).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_listing_does_not_modify_state() -> Result<()> {
    let (service, _temp) = test_service().await?;

    record(&service, "a", "Food", "2026-01-01").await?;
    let before = all_expenses(&service).await?;

    let filter = ExpenseFilter::from_params(Some("Food".into()), Some("date_desc"));
    service.list_expenses(&filter).await?;
    service.summarize_expenses(None).await?;

    assert_eq!(all_expenses(&service).await?, before);

    Ok(())
}

#[tokio::test]
async fn test_summary_totals_by_category() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service
        .create_expense("a", input("150.00", "Food", "Lunch", "2026-02-04"))
        .await?;
    service
        .create_expense("b", input("200", "Travel", "Bus", "2026-02-04"))
        .await?;
    service
        .create_expense("c", input("24.50", "Food", "Coffee", "2026-02-05"))
        .await?;
    // Replays must not be counted twice.
    service
        .create_expense("c", input("24.50", "Food", "Coffee", "2026-02-05"))
        .await?;

    let summary = service.summarize_expenses(None).await?;
    assert_eq!(summary.total, 37450);
    assert_eq!(summary.count, 3);
    assert_eq!(summary.categories.len(), 2);
    assert_eq!(summary.categories[0].category, "Food");
    assert_eq!(summary.categories[0].total, 17450);
    assert_eq!(summary.categories[0].count, 2);
    assert_eq!(summary.categories[1].category, "Travel");
    assert_eq!(summary.categories[1].total, 20000);

    let travel = service.summarize_expenses(Some("Travel")).await?;
    assert_eq!(travel.total, 20000);
    assert_eq!(travel.categories.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_summary_of_empty_ledger() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let summary = service.summarize_expenses(None).await?;
    assert_eq!(summary.total, 0);
    assert_eq!(summary.count, 0);
    assert!(summary.categories.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_summary_overflow_is_not_retryable() -> Result<()> {
    let (repo, _temp) = test_repository().await?;

    let half = Cents::MAX / 2 + 1;
    for (request_id, category) in [("a", "Food"), ("b", "Food"), ("c", "Travel")] {
        let expense = Expense::new(
            request_id,
            NewExpense {
                amount_cents: half,
                category: category.into(),
                description: "Bulk".into(),
                date: NaiveDate::from_ymd_opt(2026, 2, 4).unwrap(),
            },
        );
        assert!(matches!(
            repo.insert_expense(expense).await?,
            InsertOutcome::Created(_)
        ));
    }
    let service = LedgerService::new(repo);

    for category in [Some("Food"), None] {
        let err = service.summarize_expenses(category).await.unwrap_err();
        assert!(matches!(err, AppError::TotalOverflow));
        assert!(!err.is_retryable());
    }

    // A category whose total fits is still summarized.
    let travel = service.summarize_expenses(Some("Travel")).await?;
    assert_eq!(travel.total, half);
    assert_eq!(travel.count, 1);

    Ok(())
}
