use sqlx::{FromRow, MySqlPool};
use time::Date;

use super::dto::PublicUser;
use crate::geo::Point;

/// Full row including the password hash. Never serialized; read paths map
/// into [`PublicUser`] before responding.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub date_of_birth: Date,
    pub profession: String,
    pub lon: f64,
    pub lat: f64,
    pub city: String,
    pub country: String,
    pub password: String,
    pub profile_image_id: Option<i64>,
}

impl From<UserRecord> for PublicUser {
    fn from(r: UserRecord) -> Self {
        PublicUser {
            user_id: r.user_id,
            first_name: r.first_name,
            last_name: r.last_name,
            phone_number: r.phone_number,
            date_of_birth: r.date_of_birth,
            profession: r.profession,
            location: Point::new(r.lat, r.lon),
            city: r.city,
            country: r.country,
            profile_image_id: r.profile_image_id,
        }
    }
}

const COLS: &str = "user_id, first_name, last_name, phone_number, date_of_birth, profession, \
                    ST_X(location) AS lon, ST_Y(location) AS lat, city, country, password, \
                    profile_image_id";

pub async fn get_all(db: &MySqlPool) -> anyhow::Result<Vec<UserRecord>> {
    let rows = sqlx::query_as::<_, UserRecord>(&format!("SELECT {COLS} FROM users"))
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn get_by_id(db: &MySqlPool, user_id: i64) -> anyhow::Result<Option<UserRecord>> {
    let row = sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {COLS} FROM users WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Case-insensitive substring match on first OR last name.
pub async fn get_by_name(db: &MySqlPool, name: &str) -> anyhow::Result<Vec<UserRecord>> {
    let pattern = format!("%{name}%");
    let rows = sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {COLS} FROM users WHERE first_name LIKE ? OR last_name LIKE ?"
    ))
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get_by_phone(db: &MySqlPool, phone: &str) -> anyhow::Result<Option<UserRecord>> {
    let row = sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {COLS} FROM users WHERE phone_number = ?"
    ))
    .bind(phone)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub struct NewUser<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: &'a str,
    pub date_of_birth: Date,
    pub profession: &'a str,
    pub location: Point,
    pub password_hash: &'a str,
    pub city: &'a str,
    pub country: &'a str,
}

/// Inserts the user and reads the created row back by last-insert-id inside
/// one transaction.
pub async fn create(db: &MySqlPool, user: NewUser<'_>) -> anyhow::Result<UserRecord> {
    let mut tx = db.begin().await?;
    let result = sqlx::query(
        "INSERT INTO users (first_name, last_name, phone_number, date_of_birth, profession, \
         location, city, country, password) \
         VALUES (?, ?, ?, ?, ?, ST_GeomFromText(?), ?, ?, ?)",
    )
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.phone_number)
    .bind(user.date_of_birth)
    .bind(user.profession)
    .bind(user.location.to_wkt())
    .bind(user.city)
    .bind(user.country)
    .bind(user.password_hash)
    .execute(&mut *tx)
    .await?;

    let user_id = result.last_insert_id() as i64;
    let created = sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {COLS} FROM users WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(created)
}

pub async fn update(db: &MySqlPool, user_id: i64, user: NewUser<'_>) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE users SET first_name = ?, last_name = ?, phone_number = ?, date_of_birth = ?, \
         profession = ?, location = ST_GeomFromText(?), city = ?, country = ?, password = ? \
         WHERE user_id = ?",
    )
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.phone_number)
    .bind(user.date_of_birth)
    .bind(user.profession)
    .bind(user.location.to_wkt())
    .bind(user.city)
    .bind(user.country)
    .bind(user.password_hash)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

/// Reports whether a row was actually removed.
pub async fn delete(db: &MySqlPool, user_id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn record() -> UserRecord {
        UserRecord {
            user_id: 1,
            first_name: "Adam".into(),
            last_name: "Hassan".into(),
            phone_number: "555-0001".into(),
            date_of_birth: date!(1990 - 04 - 12),
            profession: "Plumber".into(),
            lon: 35.5018,
            lat: 33.8938,
            city: "Beirut".into(),
            country: "Lebanon".into(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".into(),
            profile_image_id: None,
        }
    }

    #[test]
    fn public_user_never_contains_password() {
        let public: PublicUser = record().into();
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"phone_number\":\"555-0001\""));
    }

    #[test]
    fn public_user_maps_point_from_columns() {
        let public: PublicUser = record().into();
        assert_eq!(public.location.lat, 33.8938);
        assert_eq!(public.location.lon, 35.5018);
    }
}
