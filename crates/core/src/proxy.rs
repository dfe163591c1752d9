//! Outbound Proxy Settings
//!
//! Proxy settings applied to the HTTP clients of the LLM providers. The local
//! inference service is reached directly unless `bypass_local` is disabled.

use serde::{Deserialize, Serialize};

/// Proxy protocol type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
}

impl ProxyProtocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
        }
    }
}

/// Proxy configuration as stored in the settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    pub protocol: ProxyProtocol,
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Supplied from the environment at startup; never written back to disk.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    /// Skip the proxy for the local inference endpoint.
    #[serde(default = "default_bypass_local")]
    pub bypass_local: bool,
}

fn default_bypass_local() -> bool {
    true
}

impl ProxyConfig {
    /// Proxy URL without credentials.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("proxy host must not be empty".to_string());
        }
        if self.port == 0 {
            return Err("proxy port must be non-zero".to_string());
        }
        if self.password.is_some() && self.username.is_none() {
            return Err("proxy password given without a username".to_string());
        }
        Ok(())
    }
}
