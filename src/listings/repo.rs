use serde::Serialize;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};
use time::OffsetDateTime;

use crate::geo::Point;

/// Type restriction for listing queries. Any string outside the two valid
/// members parses to `Any`, which applies no restriction; this makes the
/// "no filter" case an explicit variant instead of a string fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    Offer,
    Request,
    #[default]
    Any,
}

impl TypeFilter {
    pub fn from_param(s: &str) -> Self {
        match s {
            "Offer" => TypeFilter::Offer,
            "Request" => TypeFilter::Request,
            _ => TypeFilter::Any,
        }
    }

    fn as_str(self) -> Option<&'static str> {
        match self {
            TypeFilter::Offer => Some("Offer"),
            TypeFilter::Request => Some("Request"),
            TypeFilter::Any => None,
        }
    }
}

/// Radius restriction around a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Within {
    pub lat: f64,
    pub lon: f64,
    pub max_km: f64,
}

impl Within {
    fn meters(self) -> f64 {
        self.max_km * 1000.0
    }
}

/// Optional, AND-composed restrictions for listing searches.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub kind: TypeFilter,
    pub search: Option<String>,
    pub within: Option<Within>,
    pub user_id: Option<i64>,
    pub newest_first: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub listing_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub location: Point,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub date_created: OffsetDateTime,
    pub active: bool,
    pub city: String,
    pub country: String,
}

#[derive(Debug, FromRow)]
struct ListingRow {
    listing_id: i64,
    #[sqlx(rename = "type")]
    kind: String,
    lon: f64,
    lat: f64,
    user_id: i64,
    title: String,
    description: String,
    date_created: OffsetDateTime,
    active: bool,
    city: String,
    country: String,
}

impl From<ListingRow> for Listing {
    fn from(r: ListingRow) -> Self {
        Listing {
            listing_id: r.listing_id,
            kind: r.kind,
            location: Point::new(r.lat, r.lon),
            user_id: r.user_id,
            title: r.title,
            description: r.description,
            date_created: r.date_created,
            active: r.active,
            city: r.city,
            country: r.country,
        }
    }
}

const COLS: &str = "listing_id, type, ST_X(location) AS lon, ST_Y(location) AS lat, user_id, \
                    title, description, date_created, active, city, country";

/// Composes the filter into one parameterized statement. The spatial
/// predicate builds its point as (longitude, latitude) — the order
/// ST_Distance_Sphere expects; swapping the two yields silently wrong
/// distances.
fn build_search(filter: &ListingFilter) -> QueryBuilder<'static, MySql> {
    let mut qb = QueryBuilder::new(format!("SELECT {COLS} FROM listings WHERE 1=1"));

    if let Some(kind) = filter.kind.as_str() {
        qb.push(" AND type = ").push_bind(kind);
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{term}%");
        qb.push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR description LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(w) = filter.within {
        qb.push(" AND ST_Distance_Sphere(location, ST_GeomFromText(CONCAT('POINT(', ")
            .push_bind(w.lon)
            .push(", ' ', ")
            .push_bind(w.lat)
            .push(", ')'))) <= ")
            .push_bind(w.meters());
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if filter.newest_first {
        qb.push(" ORDER BY date_created DESC");
    }
    qb
}

/// Returns every listing matching the filter; `[]` when nothing matches.
pub async fn search(db: &MySqlPool, filter: &ListingFilter) -> anyhow::Result<Vec<Listing>> {
    let rows = build_search(filter)
        .build_query_as::<ListingRow>()
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(Listing::from).collect())
}

pub async fn get_by_id(db: &MySqlPool, listing_id: i64) -> anyhow::Result<Option<Listing>> {
    let row = sqlx::query_as::<_, ListingRow>(&format!(
        "SELECT {COLS} FROM listings WHERE listing_id = ?"
    ))
    .bind(listing_id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(Listing::from))
}

pub struct NewListing<'a> {
    pub kind: &'a str,
    pub location: Point,
    pub user_id: i64,
    pub title: &'a str,
    pub description: &'a str,
    pub city: &'a str,
    pub country: &'a str,
}

/// Inserts the listing and reads the created row back by last-insert-id
/// inside one transaction.
pub async fn create(db: &MySqlPool, listing: NewListing<'_>) -> anyhow::Result<Listing> {
    let mut tx = db.begin().await?;
    let result = sqlx::query(
        "INSERT INTO listings (type, location, user_id, title, description, city, country) \
         VALUES (?, ST_GeomFromText(?), ?, ?, ?, ?, ?)",
    )
    .bind(listing.kind)
    .bind(listing.location.to_wkt())
    .bind(listing.user_id)
    .bind(listing.title)
    .bind(listing.description)
    .bind(listing.city)
    .bind(listing.country)
    .execute(&mut *tx)
    .await?;

    let listing_id = result.last_insert_id() as i64;
    let created = sqlx::query_as::<_, ListingRow>(&format!(
        "SELECT {COLS} FROM listings WHERE listing_id = ?"
    ))
    .bind(listing_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(created.into())
}

pub struct ListingChanges<'a> {
    pub kind: &'a str,
    pub location: Point,
    pub title: &'a str,
    pub description: &'a str,
    pub city: &'a str,
    pub country: &'a str,
}

pub async fn update(
    db: &MySqlPool,
    listing_id: i64,
    changes: ListingChanges<'_>,
) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE listings SET title = ?, description = ?, location = ST_GeomFromText(?), \
         type = ?, city = ?, country = ? WHERE listing_id = ?",
    )
    .bind(changes.title)
    .bind(changes.description)
    .bind(changes.location.to_wkt())
    .bind(changes.kind)
    .bind(changes.city)
    .bind(changes.country)
    .bind(listing_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete(db: &MySqlPool, listing_id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM listings WHERE listing_id = ?")
        .bind(listing_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_filter_parses_valid_members_exactly() {
        assert_eq!(TypeFilter::from_param("Offer"), TypeFilter::Offer);
        assert_eq!(TypeFilter::from_param("Request"), TypeFilter::Request);
    }

    #[test]
    fn type_filter_falls_back_to_any() {
        assert_eq!(TypeFilter::from_param(""), TypeFilter::Any);
        assert_eq!(TypeFilter::from_param("offer"), TypeFilter::Any);
        assert_eq!(TypeFilter::from_param("Banana"), TypeFilter::Any);
    }

    #[test]
    fn within_converts_kilometers_to_meters() {
        let w = Within {
            lat: 34.0,
            lon: -118.0,
            max_km: 1.5,
        };
        assert_eq!(w.meters(), 1500.0);
    }

    #[test]
    fn search_sql_applies_no_conditions_by_default() {
        let mut qb = build_search(&ListingFilter::default());
        let sql = qb.sql();
        assert!(sql.contains("FROM listings WHERE 1=1"));
        assert!(!sql.contains("type ="));
        assert!(!sql.contains("LIKE"));
        assert!(!sql.contains("ST_Distance_Sphere"));
        assert!(!sql.contains("ORDER BY"));
    }

    #[test]
    fn search_sql_composes_all_filters() {
        let filter = ListingFilter {
            kind: TypeFilter::Offer,
            search: Some("plumber".into()),
            within: Some(Within {
                lat: 34.0,
                lon: -118.0,
                max_km: 1.0,
            }),
            user_id: Some(7),
            newest_first: true,
        };
        let mut qb = build_search(&filter);
        let sql = qb.sql();
        assert!(sql.contains("AND type = ?"));
        assert!(sql.contains("title LIKE ? OR description LIKE ?"));
        assert!(sql.contains("ST_Distance_Sphere(location, ST_GeomFromText(CONCAT('POINT(', ?, ' ', ?, ')'))) <= ?"));
        assert!(sql.contains("AND user_id = ?"));
        assert!(sql.ends_with("ORDER BY date_created DESC"));
    }

    #[test]
    fn any_filter_leaves_type_unrestricted() {
        let filter = ListingFilter {
            kind: TypeFilter::from_param("NotAType"),
            ..Default::default()
        };
        let mut qb = build_search(&filter);
        assert!(!qb.sql().contains("type ="));
    }
}
