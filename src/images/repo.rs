use serde::Serialize;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Image {
    pub image_id: i64,
    pub file_name: String,
    pub user_id: i64,
    pub listing_id: Option<i64>,
    pub show_on_profile: bool,
    pub date_created: OffsetDateTime,
}

const COLS: &str = "image_id, file_name, user_id, listing_id, show_on_profile, date_created";

pub async fn insert(
    db: &MySqlPool,
    file_name: &str,
    user_id: i64,
    listing_id: Option<i64>,
    show_on_profile: bool,
) -> anyhow::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO images (file_name, user_id, listing_id, show_on_profile) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(file_name)
    .bind(user_id)
    .bind(listing_id)
    .bind(show_on_profile)
    .execute(db)
    .await?;
    Ok(result.last_insert_id() as i64)
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, MySql>,
    file_name: &str,
    user_id: i64,
    listing_id: Option<i64>,
    show_on_profile: bool,
) -> anyhow::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO images (file_name, user_id, listing_id, show_on_profile) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(file_name)
    .bind(user_id)
    .bind(listing_id)
    .bind(show_on_profile)
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_id() as i64)
}

pub async fn get_by_id(db: &MySqlPool, image_id: i64) -> anyhow::Result<Option<Image>> {
    let row = sqlx::query_as::<_, Image>(&format!(
        "SELECT {COLS} FROM images WHERE image_id = ?"
    ))
    .bind(image_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn list_by_listing(db: &MySqlPool, listing_id: i64) -> anyhow::Result<Vec<Image>> {
    let rows = sqlx::query_as::<_, Image>(&format!(
        "SELECT {COLS} FROM images WHERE listing_id = ?"
    ))
    .bind(listing_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_by_user(db: &MySqlPool, user_id: i64) -> anyhow::Result<Vec<Image>> {
    let rows = sqlx::query_as::<_, Image>(&format!(
        "SELECT {COLS} FROM images WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Images the user chose to show in their public profile gallery.
pub async fn list_profile(db: &MySqlPool, user_id: i64) -> anyhow::Result<Vec<Image>> {
    let rows = sqlx::query_as::<_, Image>(&format!(
        "SELECT {COLS} FROM images WHERE user_id = ? AND show_on_profile = TRUE"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn set_visibility(
    db: &MySqlPool,
    image_id: i64,
    show_on_profile: bool,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE images SET show_on_profile = ? WHERE image_id = ?")
        .bind(show_on_profile)
        .bind(image_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete_tx(tx: &mut Transaction<'_, MySql>, image_id: i64) -> anyhow::Result<bool> {
    // A deleted image must not stay referenced as anyone's profile picture.
    sqlx::query("UPDATE users SET profile_image_id = NULL WHERE profile_image_id = ?")
        .bind(image_id)
        .execute(&mut **tx)
        .await?;
    let result = sqlx::query("DELETE FROM images WHERE image_id = ?")
        .bind(image_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Marks the image as the user's active profile picture (last write wins).
pub async fn set_profile_image_tx(
    tx: &mut Transaction<'_, MySql>,
    user_id: i64,
    image_id: i64,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET profile_image_id = ? WHERE user_id = ?")
        .bind(image_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
