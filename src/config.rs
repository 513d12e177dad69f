//! Configuration loaded from environment variables

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// UDP port the receiver daemons broadcast telemetry to
    pub udp_port: u16,

    /// HTTP/WebSocket listen port for viewers
    pub http_port: u16,

    /// Directory of static console assets
    pub static_dir: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            udp_port: std::env::var("UDP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(55672),

            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5001),

            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "./static".to_string()),
        }
    }
}
