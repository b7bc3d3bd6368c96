use axum::http::{header, HeaderValue, Method};
use log::{info, warn};
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub allowed_headers: Vec<header::HeaderName>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allowed_headers: vec![header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT],
            allow_credentials: true,
            max_age_secs: 3600,
        }
    }
}

impl CorsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn with_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    pub fn build(self) -> CorsLayer {
        let wildcard = self.allowed_origins.iter().any(|o| o == "*");

        let mut cors = CorsLayer::new()
            .allow_methods(self.allowed_methods)
            .allow_headers(self.allowed_headers)
            .max_age(std::time::Duration::from_secs(self.max_age_secs));

        if wildcard {
            // Credentials cannot be combined with a literal `*`, so mirror the request origin.
            cors = cors.allow_origin(AllowOrigin::mirror_request());
        } else {
            let origins: Vec<HeaderValue> = self
                .allowed_origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin: {o}");
                        None
                    }
                })
                .collect();
            info!("CORS configured with {} allowed origins", origins.len());
            cors = cors.allow_origin(origins);
        }

        if self.allow_credentials {
            cors = cors.allow_credentials(true);
        }

        cors
    }
}

pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    CorsConfig::new().with_origins(origins.to_vec()).build()
}
