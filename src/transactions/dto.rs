use serde::Deserialize;
use time::Date;

/// Create payload. The offered user (service requester) opens the
/// negotiation; `user_offered_id` must match the bearer token's subject.
#[derive(Debug, Deserialize)]
pub struct NewTransaction {
    pub user_offered_id: i64,
    pub user_offering_id: i64,
    pub listing_id: i64,
    pub price: f64,
    pub currency_code: String,
    pub job_start_date: Date,
    pub job_end_date: Date,
    #[serde(default)]
    pub details_from_offered: String,
}

/// Update payload: overwrites all mutable fields wholesale, no partial
/// semantics.
#[derive(Debug, Deserialize)]
pub struct TransactionUpdate {
    pub user_offered_id: i64,
    pub user_offering_id: i64,
    pub listing_id: i64,
    pub price: f64,
    pub currency_code: String,
    pub job_start_date: Date,
    pub job_end_date: Date,
    #[serde(default)]
    pub details_from_offered: String,
    #[serde(default)]
    pub details_from_offering: String,
    pub status: String,
}
