use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument};

use super::dto::{ListingsQuery, NewListing, UpdateListing};
use super::repo::{self, Listing, ListingFilter, TypeFilter, Within};
use crate::auth::jwt::AuthUser;
use crate::state::AppState;

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/listings", get(list_listings).post(create_listing))
        .route(
            "/listings/:id",
            get(get_listing).put(update_listing).delete(delete_listing),
        )
        .route("/listings/user/:user_id", get(listings_by_user))
        .route(
            "/listings/distance/:lat/:lon/:max_km/:type",
            get(listings_by_distance),
        )
}

fn query_filter(q: &ListingsQuery) -> ListingFilter {
    ListingFilter {
        kind: TypeFilter::from_param(q.kind.as_deref().unwrap_or("")),
        search: q.search.clone(),
        newest_first: q.sort.as_deref() == Some("recent"),
        ..Default::default()
    }
}

#[instrument(skip(state))]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(q): Query<ListingsQuery>,
) -> Result<Json<Vec<Listing>>, (StatusCode, String)> {
    let listings = repo::search(&state.db, &query_filter(&q))
        .await
        .map_err(internal)?;
    Ok(Json(listings))
}

#[instrument(skip(state))]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Listing>, (StatusCode, String)> {
    match repo::get_by_id(&state.db, id).await.map_err(internal)? {
        Some(listing) => Ok(Json(listing)),
        None => Err((StatusCode::NOT_FOUND, "Listing not found".into())),
    }
}

#[instrument(skip(state))]
pub async fn listings_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(q): Query<ListingsQuery>,
) -> Result<Json<Vec<Listing>>, (StatusCode, String)> {
    let filter = ListingFilter {
        user_id: Some(user_id),
        ..query_filter(&q)
    };
    let listings = repo::search(&state.db, &filter).await.map_err(internal)?;
    Ok(Json(listings))
}

#[instrument(skip(state))]
pub async fn listings_by_distance(
    State(state): State<AppState>,
    Path((lat, lon, max_km, kind)): Path<(f64, f64, f64, String)>,
    Query(q): Query<ListingsQuery>,
) -> Result<Json<Vec<Listing>>, (StatusCode, String)> {
    if !lat.is_finite() || !lon.is_finite() || !max_km.is_finite() || max_km < 0.0 {
        return Err((StatusCode::BAD_REQUEST, "Invalid coordinates".into()));
    }
    let filter = ListingFilter {
        kind: TypeFilter::from_param(&kind),
        search: q.search.clone(),
        within: Some(Within { lat, lon, max_km }),
        ..Default::default()
    };
    let listings = repo::search(&state.db, &filter).await.map_err(internal)?;
    Ok(Json(listings))
}

#[instrument(skip(state, payload))]
pub async fn create_listing(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Json(payload): Json<NewListing>,
) -> Result<(StatusCode, Json<Listing>), (StatusCode, String)> {
    if payload.user_id != auth_id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot create listing for another user".into(),
        ));
    }

    // Geocoding failure aborts the write; nothing is persisted without a
    // resolved city/country.
    let (city, country) = state
        .geocoder
        .reverse(payload.location.lat, payload.location.lon)
        .await
        .map_err(|e| {
            error!(error = %e, "reverse geocode failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let created = repo::create(
        &state.db,
        repo::NewListing {
            kind: payload.kind.as_str(),
            location: payload.location,
            user_id: payload.user_id,
            title: &payload.title,
            description: &payload.description,
            city: &city,
            country: &country,
        },
    )
    .await
    .map_err(internal)?;

    info!(listing_id = created.listing_id, "listing created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, payload))]
pub async fn update_listing(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateListing>,
) -> Result<Json<Listing>, (StatusCode, String)> {
    let existing = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Listing not found".to_string()))?;

    if existing.user_id != auth_id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot update another user's listing".into(),
        ));
    }

    let (city, country) = state
        .geocoder
        .reverse(payload.location.lat, payload.location.lon)
        .await
        .map_err(|e| {
            error!(error = %e, "reverse geocode failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    repo::update(
        &state.db,
        id,
        repo::ListingChanges {
            kind: payload.kind.as_str(),
            location: payload.location,
            title: &payload.title,
            description: &payload.description,
            city: &city,
            country: &country,
        },
    )
    .await
    .map_err(internal)?;

    let updated = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Listing not found".to_string()))?;
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn delete_listing(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    let existing = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Listing not found".to_string()))?;

    if existing.user_id != auth_id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot delete another user's listing".into(),
        ));
    }

    repo::delete(&state.db, id).await.map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
