//! Inbound server request as seen by the HTTP server enhancer.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use opentelemetry::propagation::Extractor;

/// Transport-neutral view of an inbound HTTP request. Header names are
/// stored lowercase.
#[derive(Debug, Clone, Default)]
pub struct ServerRequest {
    method: String,
    target: String,
    scheme: String,
    headers: BTreeMap<String, String>,
    remote_addr: Option<SocketAddr>,
    remote_host: Option<String>,
    user: Option<String>,
}

impl ServerRequest {
    /// `target` is the request target: path plus optional query.
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            scheme: "http".to_string(),
            ..Default::default()
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Resolved peer host name, when known.
    pub fn with_remote_host(mut self, host: impl Into<String>) -> Self {
        self.remote_host = Some(host.into());
        self
    }

    /// Authenticated user, when known.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Path without the query.
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or(&self.target)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Reconstructed request URL (`scheme://host/target`), or just the target
    /// when no `Host` header was sent.
    pub fn url(&self) -> String {
        match self.header("host") {
            Some(host) => format!("{}://{}{}", self.scheme, host, self.path()),
            None => self.path().to_string(),
        }
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Peer host name, falling back to the peer IP.
    pub fn remote_host(&self) -> Option<String> {
        self.remote_host
            .clone()
            .or_else(|| self.remote_addr.map(|a| a.ip().to_string()))
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

impl Extractor for ServerRequest {
    fn get(&self, key: &str) -> Option<&str> {
        self.header(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(String::as_str).collect()
    }
}
