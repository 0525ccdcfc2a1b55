use serde::{Deserialize, Serialize};

/// A geographic point. Stored in MySQL as POINT with X = longitude and
/// Y = latitude; every spatial function in this crate takes coordinates in
/// (longitude, latitude) order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// WKT representation, longitude first.
    pub fn to_wkt(self) -> String {
        format!("POINT({} {})", self.lon, self.lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wkt_puts_longitude_first() {
        let p = Point::new(34.0522, -118.2437);
        assert_eq!(p.to_wkt(), "POINT(-118.2437 34.0522)");
    }

    #[test]
    fn json_roundtrip() {
        let p = Point::new(33.8938, 35.5018);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"lat\":33.8938"));
        assert!(json.contains("\"lon\":35.5018"));
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
