use serde::{Deserialize, Serialize};

use crate::geo::Point;

/// Valid listing types for writes. Queries go through
/// [`repo::TypeFilter`](super::repo::TypeFilter) instead, which additionally
/// carries the "no filter" case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingKind {
    Offer,
    Request,
}

impl ListingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingKind::Offer => "Offer",
            ListingKind::Request => "Request",
        }
    }
}

/// Create payload. `user_id` must match the bearer token's subject.
#[derive(Debug, Deserialize)]
pub struct NewListing {
    #[serde(rename = "type")]
    pub kind: ListingKind,
    pub location: Point,
    pub user_id: i64,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListing {
    #[serde(rename = "type")]
    pub kind: ListingKind,
    pub location: Point,
    pub title: String,
    pub description: String,
}

/// Query string for `GET /listings`.
#[derive(Debug, Default, Deserialize)]
pub struct ListingsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "query")]
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_deserializes_from_plain_strings() {
        let k: ListingKind = serde_json::from_str("\"Offer\"").unwrap();
        assert_eq!(k, ListingKind::Offer);
        let k: ListingKind = serde_json::from_str("\"Request\"").unwrap();
        assert_eq!(k, ListingKind::Request);
        assert!(serde_json::from_str::<ListingKind>("\"Banana\"").is_err());
    }

    #[test]
    fn new_listing_accepts_documented_shape() {
        let body = r#"{
            "type": "Offer",
            "location": {"lat": 34.0, "lon": -118.0},
            "user_id": 1,
            "title": "Looking for a plumber",
            "description": "Quick job fixing a leaky pipe."
        }"#;
        let listing: NewListing = serde_json::from_str(body).unwrap();
        assert_eq!(listing.kind, ListingKind::Offer);
        assert_eq!(listing.location.lat, 34.0);
        assert_eq!(listing.user_id, 1);
    }
}
