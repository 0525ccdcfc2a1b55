use std::path::Path as FsPath;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::repo::{self, Image};
use crate::auth::jwt::AuthUser;
use crate::listings;
use crate::state::AppState;

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/images/listing/:listing_id",
            get(images_by_listing).post(upload_for_listing),
        )
        .route(
            "/images/profile/:user_id",
            get(profile_gallery).post(upload_profile),
        )
        .route("/images/user/:user_id", get(images_by_user))
        .route(
            "/images/:id",
            get(get_image).put(set_visibility).delete(delete_image),
        )
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}

/// Lowercased extension of an uploaded filename, only if it is one of the
/// accepted image formats.
fn accepted_extension(file_name: &str) -> Option<String> {
    let ext = FsPath::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" => Some(ext),
        _ => None,
    }
}

fn opaque_name(ext: &str) -> String {
    format!("{}.{ext}", Uuid::new_v4())
}

#[instrument(skip(state, mp))]
pub async fn upload_for_listing(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(listing_id): Path<i64>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<Vec<i64>>), (StatusCode, String)> {
    // Listing id 0 means the upload is not listing-scoped.
    let listing_ref = if listing_id != 0 {
        let listing = listings::repo::get_by_id(&state.db, listing_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| (StatusCode::NOT_FOUND, "Listing not found".to_string()))?;
        if listing.user_id != auth_id {
            warn!(listing_id, auth_id, "upload to another user's listing");
            return Err((
                StatusCode::UNAUTHORIZED,
                "Cannot upload image for another user's listing".into(),
            ));
        }
        Some(listing_id)
    } else {
        None
    };

    let mut image_ids = Vec::new();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let ext = accepted_extension(&file_name).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("Invalid file type: {file_name}"),
            )
        })?;

        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

        let stored_name = opaque_name(&ext);
        state
            .storage
            .save(&stored_name, data)
            .await
            .map_err(internal)?;

        match repo::insert(&state.db, &stored_name, auth_id, listing_ref, false).await {
            Ok(id) => image_ids.push(id),
            Err(e) => {
                // Do not leave a file on disk with no metadata row.
                if let Err(rm) = state.storage.remove(&stored_name).await {
                    error!(error = %rm, file = %stored_name, "orphan cleanup failed");
                }
                return Err(internal(e));
            }
        }
    }

    if image_ids.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No image files provided".into()));
    }

    info!(listing_id, count = image_ids.len(), "images uploaded");
    Ok((StatusCode::CREATED, Json(image_ids)))
}

#[instrument(skip(state, mp))]
pub async fn upload_profile(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(user_id): Path<i64>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<i64>), (StatusCode, String)> {
    if user_id != auth_id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot set another user's profile picture".into(),
        ));
    }

    let mut upload: Option<(String, bytes::Bytes)> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let ext = accepted_extension(&file_name).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("Invalid file type: {file_name}"),
            )
        })?;
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        upload = Some((opaque_name(&ext), data));
        break;
    }

    let Some((stored_name, data)) = upload else {
        return Err((StatusCode::BAD_REQUEST, "No image file provided".into()));
    };

    state
        .storage
        .save(&stored_name, data)
        .await
        .map_err(internal)?;

    // Row insert and the profile-picture reference move together.
    let result: anyhow::Result<i64> = async {
        let mut tx = state.db.begin().await?;
        let image_id = repo::insert_tx(&mut tx, &stored_name, user_id, None, true).await?;
        repo::set_profile_image_tx(&mut tx, user_id, image_id).await?;
        tx.commit().await?;
        Ok(image_id)
    }
    .await;

    match result {
        Ok(image_id) => {
            info!(user_id, image_id, "profile picture set");
            Ok((StatusCode::CREATED, Json(image_id)))
        }
        Err(e) => {
            if let Err(rm) = state.storage.remove(&stored_name).await {
                error!(error = %rm, file = %stored_name, "orphan cleanup failed");
            }
            Err(internal(e))
        }
    }
}

#[instrument(skip(state))]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let image = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Image not found".to_string()))?;

    let body = state.storage.read(&image.file_name).await.map_err(|e| {
        error!(error = %e, image_id = id, "image file missing");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let mime = mime_guess::from_path(&image.file_name).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], body))
}

#[instrument(skip(state))]
pub async fn images_by_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<i64>,
) -> Result<Json<Vec<Image>>, (StatusCode, String)> {
    let images = repo::list_by_listing(&state.db, listing_id)
        .await
        .map_err(internal)?;
    Ok(Json(images))
}

#[instrument(skip(state))]
pub async fn images_by_user(
    State(state): State<AppState>,
    AuthUser(_auth_id): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Image>>, (StatusCode, String)> {
    let images = repo::list_by_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(images))
}

#[instrument(skip(state))]
pub async fn profile_gallery(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Image>>, (StatusCode, String)> {
    let images = repo::list_profile(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(images))
}

#[derive(Debug, Deserialize)]
pub struct VisibilityUpdate {
    pub show_on_profile: bool,
}

#[instrument(skip(state))]
pub async fn set_visibility(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<VisibilityUpdate>,
) -> Result<StatusCode, (StatusCode, String)> {
    let image = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Image not found".to_string()))?;

    if image.user_id != auth_id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot update another user's image".into(),
        ));
    }

    repo::set_visibility(&state.db, id, body.show_on_profile)
        .await
        .map_err(internal)?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state))]
pub async fn delete_image(
    State(state): State<AppState>,
    AuthUser(auth_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    let image = repo::get_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Image not found".to_string()))?;

    if image.user_id != auth_id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Cannot delete another user's image".into(),
        ));
    }

    // Row and file go together: the row delete only commits once the file
    // is gone, and a failed file removal rolls the row delete back.
    let mut tx = state.db.begin().await.map_err(|e| internal(e.into()))?;
    repo::delete_tx(&mut tx, id).await.map_err(internal)?;
    if let Err(e) = state.storage.remove(&image.file_name).await {
        error!(error = %e, image_id = id, "file removal failed, keeping row");
        return Err(internal(e));
    }
    tx.commit().await.map_err(|e| internal(e.into()))?;

    info!(image_id = id, "image deleted");
    Ok(StatusCode::OK)
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_image_extensions() {
        assert_eq!(accepted_extension("photo.jpg").as_deref(), Some("jpg"));
        assert_eq!(accepted_extension("photo.JPEG").as_deref(), Some("jpeg"));
        assert_eq!(accepted_extension("pic.png").as_deref(), Some("png"));
        assert_eq!(accepted_extension("anim.gif").as_deref(), Some("gif"));
        assert_eq!(accepted_extension("old.BMP").as_deref(), Some("bmp"));

        assert_eq!(accepted_extension("script.exe"), None);
        assert_eq!(accepted_extension("archive.tar.gz"), None);
        assert_eq!(accepted_extension("noext"), None);
        assert_eq!(accepted_extension("page.html"), None);
    }

    #[test]
    fn opaque_name_keeps_extension_only() {
        let name = opaque_name("png");
        assert!(name.ends_with(".png"));
        let stem = name.strip_suffix(".png").unwrap();
        assert!(Uuid::parse_str(stem).is_ok());
    }
}
