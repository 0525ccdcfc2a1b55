use serde::Serialize;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};
use time::{Date, OffsetDateTime};

use super::dto::{NewTransaction, TransactionUpdate};

/// Status restriction for transaction queries. Mirrors the listing type
/// filter: any unrecognized string parses to `Any`, which applies no
/// restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    Pending,
    Accepted,
    Completed,
    #[default]
    Any,
}

impl StatusFilter {
    pub fn from_param(s: &str) -> Self {
        match s {
            "Pending" => StatusFilter::Pending,
            "Accepted" => StatusFilter::Accepted,
            "Completed" => StatusFilter::Completed,
            _ => StatusFilter::Any,
        }
    }

    fn as_str(self) -> Option<&'static str> {
        match self {
            StatusFilter::Pending => Some("Pending"),
            StatusFilter::Accepted => Some("Accepted"),
            StatusFilter::Completed => Some("Completed"),
            StatusFilter::Any => None,
        }
    }
}

/// A negotiation between the requesting user (`user_offered_id`) and the
/// provider (`user_offering_id`) over one listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransactionRecord {
    pub transaction_id: i64,
    pub user_offered_id: i64,
    pub user_offering_id: i64,
    pub listing_id: i64,
    pub price: f64,
    pub currency_code: String,
    pub date_created: OffsetDateTime,
    pub job_start_date: Date,
    pub job_end_date: Date,
    pub details_from_offered: String,
    pub details_from_offering: String,
    pub status: String,
}

const COLS: &str = "transaction_id, user_offered_id, user_offering_id, listing_id, price, \
                    currency_code, date_created, job_start_date, job_end_date, \
                    details_from_offered, details_from_offering, status";

/// Inserts the transaction and reads the created row back by last-insert-id
/// inside one transaction. Status and the provider's details come from the
/// column defaults, so a fresh row is always `Pending`.
pub async fn create(db: &MySqlPool, new: &NewTransaction) -> anyhow::Result<TransactionRecord> {
    let mut tx = db.begin().await?;
    let result = sqlx::query(
        "INSERT INTO transactions (user_offered_id, user_offering_id, listing_id, price, \
         currency_code, job_start_date, job_end_date, details_from_offered) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(new.user_offered_id)
    .bind(new.user_offering_id)
    .bind(new.listing_id)
    .bind(new.price)
    .bind(&new.currency_code)
    .bind(new.job_start_date)
    .bind(new.job_end_date)
    .bind(&new.details_from_offered)
    .execute(&mut *tx)
    .await?;

    let transaction_id = result.last_insert_id() as i64;
    let created = sqlx::query_as::<_, TransactionRecord>(&format!(
        "SELECT {COLS} FROM transactions WHERE transaction_id = ?"
    ))
    .bind(transaction_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(created)
}

pub async fn get_by_id(
    db: &MySqlPool,
    transaction_id: i64,
) -> anyhow::Result<Option<TransactionRecord>> {
    let row = sqlx::query_as::<_, TransactionRecord>(&format!(
        "SELECT {COLS} FROM transactions WHERE transaction_id = ?"
    ))
    .bind(transaction_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Builds the per-column listing query. `column` is one of the fixed id
/// columns below, never caller input.
fn build_list(column: &str, id: i64, status: StatusFilter) -> QueryBuilder<'static, MySql> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {COLS} FROM transactions WHERE {column} = "
    ));
    qb.push_bind(id);
    if let Some(status) = status.as_str() {
        qb.push(" AND status = ").push_bind(status);
    }
    qb
}

async fn list_by(
    db: &MySqlPool,
    column: &str,
    id: i64,
    status: StatusFilter,
) -> anyhow::Result<Vec<TransactionRecord>> {
    let rows = build_list(column, id, status)
        .build_query_as::<TransactionRecord>()
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// Transactions where the user is the requesting side.
pub async fn by_offered_user(
    db: &MySqlPool,
    user_id: i64,
    status: StatusFilter,
) -> anyhow::Result<Vec<TransactionRecord>> {
    list_by(db, "user_offered_id", user_id, status).await
}

/// Transactions where the user is the provider side.
pub async fn by_offering_user(
    db: &MySqlPool,
    user_id: i64,
    status: StatusFilter,
) -> anyhow::Result<Vec<TransactionRecord>> {
    list_by(db, "user_offering_id", user_id, status).await
}

pub async fn by_listing(
    db: &MySqlPool,
    listing_id: i64,
    status: StatusFilter,
) -> anyhow::Result<Vec<TransactionRecord>> {
    list_by(db, "listing_id", listing_id, status).await
}

/// Overwrites every mutable column wholesale.
pub async fn update(
    db: &MySqlPool,
    transaction_id: i64,
    changes: &TransactionUpdate,
) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE transactions SET user_offered_id = ?, user_offering_id = ?, listing_id = ?, \
         price = ?, currency_code = ?, job_start_date = ?, job_end_date = ?, \
         details_from_offered = ?, details_from_offering = ?, status = ? \
         WHERE transaction_id = ?",
    )
    .bind(changes.user_offered_id)
    .bind(changes.user_offering_id)
    .bind(changes.listing_id)
    .bind(changes.price)
    .bind(&changes.currency_code)
    .bind(changes.job_start_date)
    .bind(changes.job_end_date)
    .bind(&changes.details_from_offered)
    .bind(&changes.details_from_offering)
    .bind(&changes.status)
    .bind(transaction_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete(db: &MySqlPool, transaction_id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM transactions WHERE transaction_id = ?")
        .bind(transaction_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_parses_valid_members_exactly() {
        assert_eq!(StatusFilter::from_param("Pending"), StatusFilter::Pending);
        assert_eq!(StatusFilter::from_param("Accepted"), StatusFilter::Accepted);
        assert_eq!(
            StatusFilter::from_param("Completed"),
            StatusFilter::Completed
        );
    }

    #[test]
    fn status_filter_falls_back_to_any() {
        assert_eq!(StatusFilter::from_param(""), StatusFilter::Any);
        assert_eq!(StatusFilter::from_param("pending"), StatusFilter::Any);
        assert_eq!(StatusFilter::from_param("Cancelled"), StatusFilter::Any);
    }

    #[test]
    fn list_sql_restricts_status_only_when_filtered() {
        let mut qb = build_list("user_offered_id", 3, StatusFilter::Pending);
        assert!(qb.sql().contains("WHERE user_offered_id = ?"));
        assert!(qb.sql().contains("AND status = ?"));

        let mut qb = build_list("listing_id", 3, StatusFilter::Any);
        assert!(qb.sql().contains("WHERE listing_id = ?"));
        assert!(!qb.sql().contains("status"));
    }
}
