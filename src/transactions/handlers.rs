use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::contract::ContractData;
use super::dto::{NewTransaction, TransactionUpdate};
use super::repo::{self, StatusFilter, TransactionRecord};
use crate::auth::jwt::AuthUser;
use crate::listings;
use crate::state::AppState;
use crate::users;

pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(create_transaction))
        .route(
            "/transactions/:id",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
        .route("/transactions/:id/contract", get(get_contract))
        .route(
            "/transactions/offered/:user_id/:status",
            get(transactions_offered),
        )
        .route(
            "/transactions/offering/:user_id/:status",
            get(transactions_offering),
        )
        .route(
            "/transactions/listing/:listing_id/:status",
            get(transactions_by_listing),
        )
}

#[instrument(skip(state, body))]
pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Json(body): Json<NewTransaction>,
) -> Result<(StatusCode, Json<TransactionRecord>), (StatusCode, String)> {
    // Only the requesting side opens a negotiation.
    if body.user_offered_id != auth_id {
        warn!(auth_id, body.user_offered_id, "transaction for another user");
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot create a transaction for another user".into(),
        ));
    }

    let created = repo::create(&state.db, &body).await.map_err(internal)?;
    info!(
        transaction_id = created.transaction_id,
        listing_id = created.listing_id,
        "transaction created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state))]
pub async fn get_transaction(
    State(state): State<AppState>,
    AuthUser(_auth_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<TransactionRecord>, (StatusCode, String)> {
    let transaction = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Transaction not found".to_string()))?;
    Ok(Json(transaction))
}

#[instrument(skip(state))]
pub async fn transactions_offered(
    State(state): State<AppState>,
    AuthUser(_auth_id): AuthUser,
    Path((user_id, status)): Path<(i64, String)>,
) -> Result<Json<Vec<TransactionRecord>>, (StatusCode, String)> {
    let rows = repo::by_offered_user(&state.db, user_id, StatusFilter::from_param(&status))
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn transactions_offering(
    State(state): State<AppState>,
    AuthUser(_auth_id): AuthUser,
    Path((user_id, status)): Path<(i64, String)>,
) -> Result<Json<Vec<TransactionRecord>>, (StatusCode, String)> {
    let rows = repo::by_offering_user(&state.db, user_id, StatusFilter::from_param(&status))
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn transactions_by_listing(
    State(state): State<AppState>,
    AuthUser(_auth_id): AuthUser,
    Path((listing_id, status)): Path<(i64, String)>,
) -> Result<Json<Vec<TransactionRecord>>, (StatusCode, String)> {
    let rows = repo::by_listing(&state.db, listing_id, StatusFilter::from_param(&status))
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state, body))]
pub async fn update_transaction(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<TransactionUpdate>,
) -> Result<StatusCode, (StatusCode, String)> {
    let existing = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Transaction not found".to_string()))?;

    // Ownership is judged against the stored row, not the request body.
    if existing.user_offered_id != auth_id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot update another user's transaction".into(),
        ));
    }

    repo::update(&state.db, id, &body).await.map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    let existing = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Transaction not found".to_string()))?;

    // Either side may walk away from the negotiation.
    if existing.user_offered_id != auth_id && existing.user_offering_id != auth_id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot delete another user's transaction".into(),
        ));
    }

    repo::delete(&state.db, id).await.map_err(internal)?;
    info!(transaction_id = id, "transaction deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub contract_data: ContractData,
    pub contract_text: String,
}

#[instrument(skip(state))]
pub async fn get_contract(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ContractResponse>, (StatusCode, String)> {
    let transaction = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Transaction not found".to_string()))?;

    if transaction.user_offered_id != auth_id && transaction.user_offering_id != auth_id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Only the transaction's participants may view the contract".into(),
        ));
    }

    let listing = listings::repo::get_by_id(&state.db, transaction.listing_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Listing not found".to_string()))?;
    let client = users::repo::get_by_id(&state.db, transaction.user_offered_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))?;
    let tradesman = users::repo::get_by_id(&state.db, transaction.user_offering_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))?;

    let contract_data = ContractData::assemble(&transaction, &listing, &client, &tradesman);
    let contract_text = contract_data.render().map_err(|e| internal(e.into()))?;

    Ok(Json(ContractResponse {
        contract_data,
        contract_text,
    }))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
