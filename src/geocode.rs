use std::time::Duration;

use axum::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::GeocodeConfig;

/// Minimum spacing between outbound calls. The maps.co free tier allows one
/// request per second; all geocoding in the process is serialized behind
/// this throttle.
const RATE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocode request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocode service returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Resolves a latitude/longitude pair to a (city, country) pair.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<(String, String), GeocodeError>;
}

#[derive(Debug, Deserialize, Default)]
struct ReverseAddress {
    #[serde(default)]
    city: String,
    #[serde(default)]
    village: String,
    #[serde(default)]
    town: String,
    #[serde(default)]
    suburb: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: ReverseAddress,
}

impl ReverseAddress {
    /// The service reports the locality under different keys depending on
    /// the area; fall back through them in order of specificity.
    fn city(&self) -> &str {
        [&self.city, &self.village, &self.town, &self.suburb, &self.state]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Client for the maps.co reverse-geocoding API.
pub struct MapsCoClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    last_call: Mutex<Option<Instant>>,
}

impl MapsCoClient {
    pub fn new(config: &GeocodeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            last_call: Mutex::new(None),
        }
    }

    async fn throttle(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < RATE_INTERVAL {
                tokio::time::sleep(RATE_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl Geocoder for MapsCoClient {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<(String, String), GeocodeError> {
        self.throttle().await;

        let url = format!("{}/reverse", self.base_url);
        let resp = self
            .http
            .get(url)
            .query(&[("lat", lat.to_string()), ("lon", lon.to_string())])
            .query(&[("api_key", &self.api_key)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(GeocodeError::Status(resp.status()));
        }

        let body: ReverseResponse = resp.json().await?;
        let city = body.address.city().to_string();
        let country = body.address.country.clone();
        debug!(lat, lon, %city, %country, "reverse geocoded");
        Ok((city, country))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_city_and_country() {
        let json = r#"{
            "display_name": "Hamra, Beirut, Lebanon",
            "address": {
                "city": "Beirut",
                "state": "Beirut Governorate",
                "country": "Lebanon",
                "country_code": "lb"
            }
        }"#;
        let resp: ReverseResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.address.city(), "Beirut");
        assert_eq!(resp.address.country, "Lebanon");
    }

    #[test]
    fn city_falls_back_through_locality_keys() {
        let resp: ReverseResponse = serde_json::from_str(
            r#"{"address": {"village": "Mina", "country": "Lebanon"}}"#,
        )
        .unwrap();
        assert_eq!(resp.address.city(), "Mina");

        let resp: ReverseResponse = serde_json::from_str(
            r#"{"address": {"state": "California", "country": "USA"}}"#,
        )
        .unwrap();
        assert_eq!(resp.address.city(), "California");
    }

    #[test]
    fn missing_address_yields_empty_fields() {
        let resp: ReverseResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(resp.address.city(), "");
        assert_eq!(resp.address.country, "");
    }
}
