//! Transport and TLS option shapes carried by a [`ProxyNode`](super::ProxyNode).

use serde::Serialize;

/// Stream framing used between client and server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Tcp,
    Ws,
    Grpc,
    H2,
    /// Anything else a link may declare (`httpupgrade`, `kcp`, `quic`, ...).
    Other(String),
}

impl Network {
    /// Maps the `type` / `net` value found in share links. Empty means TCP.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "tcp" => Network::Tcp,
            "ws" | "websocket" => Network::Ws,
            "grpc" => Network::Grpc,
            "h2" => Network::H2,
            other => Network::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Network::Tcp => "tcp",
            Network::Ws => "ws",
            Network::Grpc => "grpc",
            Network::H2 => "h2",
            Network::Other(s) => s,
        }
    }

    pub fn is_tcp(&self) -> bool {
        matches!(self, Network::Tcp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WsOptions {
    pub path: String,
    /// Value for the `Host` header, if the link sets one.
    pub host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GrpcOptions {
    pub service_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct H2Options {
    pub path: String,
    pub hosts: Vec<String>,
}

/// Transport specific options. Only populated when the node's
/// [`Network`] matches the variant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    None,
    Ws(WsOptions),
    Grpc(GrpcOptions),
    H2(H2Options),
}

/// VLESS Reality parameters (`pbk` / `sid` in share links).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RealityOptions {
    pub public_key: String,
    pub short_id: Option<String>,
}

/// TLS settings. A node has TLS enabled iff it carries one of these.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TlsOptions {
    pub sni: Option<String>,
    pub skip_cert_verify: bool,
    pub alpn: Vec<String>,
    pub fingerprint: Option<String>,
    pub reality: Option<RealityOptions>,
    /// XTLS flow control, e.g. `xtls-rprx-vision`.
    pub flow: Option<String>,
}

/// Splits a comma separated `alpn` query value.
pub fn parse_alpn(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parse() {
        assert_eq!(Network::parse(""), Network::Tcp);
        assert_eq!(Network::parse("WS"), Network::Ws);
        assert_eq!(Network::parse("grpc"), Network::Grpc);
        assert_eq!(Network::parse("h2"), Network::H2);
        assert_eq!(
            Network::parse("httpupgrade"),
            Network::Other("httpupgrade".to_string())
        );
        assert_eq!(Network::parse("httpupgrade").as_str(), "httpupgrade");
    }

    #[test]
    fn test_parse_alpn() {
        assert_eq!(parse_alpn(Some("h2, http/1.1,")), vec!["h2", "http/1.1"]);
        assert!(parse_alpn(None).is_empty());
    }
}
