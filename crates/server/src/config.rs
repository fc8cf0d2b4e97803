use std::net::SocketAddr;

use utils::env::{EnvError, parse_or, var_or};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8787;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// `HOST` and `PORT`, with local defaults. The generation API key is not
    /// part of this: it is read per request.
    pub fn from_env() -> Result<Self, EnvError> {
        Ok(Self {
            host: var_or("HOST", DEFAULT_HOST),
            port: parse_or("PORT", DEFAULT_PORT)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, EnvError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| EnvError::Invalid {
                name: "HOST".to_string(),
                reason: e.to_string(),
            })
    }
}
