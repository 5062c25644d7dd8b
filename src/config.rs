use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub database_url: String,
    pub jwt_secret: String,

    /// Public base URL of this service, used to build feed URLs.
    pub public_base_url: String,

    /// Base URL of the collaboration platform (provisioning, notifications,
    /// Talk, CalDAV) plus the service account used against it.
    pub platform_base_url: String,
    pub platform_user: String,
    pub platform_password: String,

    // Rate limiting
    pub rate_feed_per_min: u32,

    /// Host part used in calendar component UIDs, derived from
    /// `public_base_url`.
    pub host: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
        let host = reqwest::Url::parse(&public_base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "conges".to_string());

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            public_base_url,
            platform_base_url: env::var("PLATFORM_BASE_URL")
                .expect("PLATFORM_BASE_URL must be set"),
            platform_user: env::var("PLATFORM_USER").expect("PLATFORM_USER must be set"),
            platform_password: env::var("PLATFORM_PASSWORD")
                .expect("PLATFORM_PASSWORD must be set"),
            rate_feed_per_min: env::var("RATE_FEED_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            host,
        }
    }
}
