use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use super::dto::{AuthRequest, AuthResponse, PublicUser, UserPayload};
use super::repo::{self, NewUser};
use crate::auth::jwt::{AuthUser, JwtKeys};
use crate::auth::password::{hash_password, verify_password};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(get_all_users).post(create_user))
        .route("/users/auth", post(auth_user))
        .route("/users/name/:name", get(get_users_by_name))
        .route(
            "/users/:id",
            get(get_user_by_id).put(update_user).delete(delete_user),
        )
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9][0-9 \-]{5,30}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

#[instrument(skip(state))]
pub async fn get_all_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublicUser>>, (StatusCode, String)> {
    let users = repo::get_all(&state.db).await.map_err(internal)?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    match repo::get_by_id(&state.db, id).await.map_err(internal)? {
        Some(user) => Ok(Json(user.into())),
        None => Err((StatusCode::NOT_FOUND, "User not found".into())),
    }
}

#[instrument(skip(state))]
pub async fn get_users_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<PublicUser>>, (StatusCode, String)> {
    let users = repo::get_by_name(&state.db, &name)
        .await
        .map_err(internal)?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserPayload>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    if !is_valid_phone(&payload.phone_number) {
        warn!(phone = %payload.phone_number, "invalid phone number");
        return Err((StatusCode::BAD_REQUEST, "Invalid phone number".into()));
    }

    if let Ok(Some(_)) = repo::get_by_phone(&state.db, &payload.phone_number).await {
        warn!(phone = %payload.phone_number, "phone number already registered");
        return Err((
            StatusCode::CONFLICT,
            "Phone number already registered".into(),
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

    let hash = hash_password(&payload.password).map_err(internal)?;

    let created = repo::create(
        &state.db,
        NewUser {
            first_name: &payload.first_name,
            last_name: &payload.last_name,
            phone_number: &payload.phone_number,
            date_of_birth: payload.date_of_birth,
            profession: &payload.profession,
            location: payload.location,
            password_hash: &hash,
            city: &city,
            country: &country,
        },
    )
    .await
    .map_err(internal)?;

    info!(user_id = created.user_id, "user registered");
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[instrument(skip(state, payload))]
pub async fn auth_user(
    State(state): State<AppState>,
    Json(payload): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    // Unknown phone and wrong password produce the same message so the
    // endpoint cannot be used to enumerate registered numbers.
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string());

    let user = match repo::get_by_phone(&state.db, &payload.phone_number).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("login with unknown phone number");
            return Err(invalid());
        }
        Err(e) => {
            error!(error = %e, "get_by_phone failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = verify_password(&payload.password, &user.password).map_err(internal)?;
    if !ok {
        warn!(user_id = user.user_id, "login with invalid password");
        return Err(invalid());
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(user.user_id, &user.phone_number)
        .map_err(internal)?;

    info!(user_id = user.user_id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    if auth_id != id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot update another user".into(),
        ));
    }

    if repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Err((StatusCode::NOT_FOUND, "User not found".into()));
    }

    let (city, country) = state
        .geocoder
        .reverse(payload.location.lat, payload.location.lon)
        .await
        .map_err(|e| {
            error!(error = %e, "reverse geocode failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let hash = hash_password(&payload.password).map_err(internal)?;

    repo::update(
        &state.db,
        id,
        NewUser {
            first_name: &payload.first_name,
            last_name: &payload.last_name,
            phone_number: &payload.phone_number,
            date_of_birth: payload.date_of_birth,
            profession: &payload.profession,
            location: payload.location,
            password_hash: &hash,
            city: &city,
            country: &country,
        },
    )
    .await
    .map_err(internal)?;

    let updated = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    if auth_id != id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot delete another user".into(),
        ));
    }

    let removed = repo::delete(&state.db, id).await.map_err(internal)?;
    if !removed {
        return Err((StatusCode::NOT_FOUND, "User not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_validation_accepts_common_shapes() {
        assert!(is_valid_phone("555-0001"));
        assert!(is_valid_phone("+961-12345678"));
        assert!(is_valid_phone("961 1 234 567"));
    }

    #[test]
    fn phone_validation_rejects_garbage() {
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("not-a-phone"));
        assert!(!is_valid_phone("123"));
        assert!(!is_valid_phone("555_0001@example"));
    }
}
