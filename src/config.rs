use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub upload_dir: String,
    pub geocode: GeocodeConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = format!(
            "{}:{}",
            std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
        );
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "tradepost".into()),
            ttl_hours: std::env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./server-images".into());
        let geocode = GeocodeConfig {
            base_url: std::env::var("GEOCODE_BASE_URL")
                .unwrap_or_else(|_| "https://geocode.maps.co".into()),
            api_key: std::env::var("GEOCODE_API_KEY").unwrap_or_default(),
        };
        Ok(Self {
            listen_addr,
            database_url,
            jwt,
            upload_dir,
            geocode,
        })
    }
}
