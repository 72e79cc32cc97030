use std::net::{IpAddr, SocketAddr};

use http::{HeaderValue, Method, header};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::ConfigError;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Value of the `Access-Control-Allow-Origin` header on API responses.
    /// Use `"*"` to allow any origin (the dashboard is a static page).
    #[serde(default = "default_cors_allow_origin")]
    pub cors_allow_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allow_origin: default_cors_allow_origin(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// CORS policy for the API: configured origin, GET/POST/OPTIONS, and the
    /// `Content-Type` request header.
    pub fn cors_layer(&self) -> CorsLayer {
        let origin = self.cors_allow_origin.trim();
        let allow_origin = if origin == "*" {
            AllowOrigin::any()
        } else {
            match origin.parse::<HeaderValue>() {
                Ok(value) => AllowOrigin::exact(value),
                Err(_) => {
                    tracing::warn!(
                        origin = %origin,
                        "Invalid CORS origin, rejecting cross-origin requests"
                    );
                    AllowOrigin::list(std::iter::empty::<HeaderValue>())
                }
            }
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be greater than 0".into(),
            ));
        }
        if self.cors_allow_origin.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.cors_allow_origin cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_cors_allow_origin() -> String {
    "*".to_string()
}
