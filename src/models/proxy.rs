//! Proxy model definitions
//!
//! Contains the canonical node descriptor produced by the link parsers.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::transport::{Network, TlsOptions, Transport};

/// Represents the protocol of a proxy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    VMess,
    Vless,
    Trojan,
    Shadowsocks,
    ShadowsocksR,
    Hysteria,
    Hysteria2,
}

impl Protocol {
    pub const ALL: [Protocol; 7] = [
        Protocol::VMess,
        Protocol::Vless,
        Protocol::Trojan,
        Protocol::Shadowsocks,
        Protocol::ShadowsocksR,
        Protocol::Hysteria,
        Protocol::Hysteria2,
    ];

    /// Canonical URI scheme, which is also the Clash `type` value.
    pub fn scheme(self) -> &'static str {
        match self {
            Protocol::VMess => "vmess",
            Protocol::Vless => "vless",
            Protocol::Trojan => "trojan",
            Protocol::Shadowsocks => "ss",
            Protocol::ShadowsocksR => "ssr",
            Protocol::Hysteria => "hysteria",
            Protocol::Hysteria2 => "hysteria2",
        }
    }

    /// Human-readable name, used in fallback node names.
    pub fn display_name(self) -> &'static str {
        match self {
            Protocol::VMess => "VMess",
            Protocol::Vless => "VLESS",
            Protocol::Trojan => "Trojan",
            Protocol::Shadowsocks => "SS",
            Protocol::ShadowsocksR => "SSR",
            Protocol::Hysteria => "Hysteria",
            Protocol::Hysteria2 => "Hysteria2",
        }
    }

    /// Port assumed when a link does not carry one.
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Shadowsocks | Protocol::ShadowsocksR => 8388,
            _ => 443,
        }
    }

    /// Resolves a URI scheme, including the `hy2` alias.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "vmess" => Some(Protocol::VMess),
            "vless" => Some(Protocol::Vless),
            "trojan" => Some(Protocol::Trojan),
            "ss" => Some(Protocol::Shadowsocks),
            "ssr" => Some(Protocol::ShadowsocksR),
            "hysteria" => Some(Protocol::Hysteria),
            "hysteria2" | "hy2" => Some(Protocol::Hysteria2),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Authentication material of a node. At most one form is present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Credential {
    #[default]
    None,
    Uuid(String),
    Password(String),
    /// Shadowsocks family: encryption method plus password.
    Cipher { method: String, password: String },
    /// Hysteria v1 `auth` string.
    Auth(String),
}

impl Credential {
    /// The identifying secret used for deduplication.
    pub fn secret(&self) -> Option<&str> {
        match self {
            Credential::None => None,
            Credential::Uuid(s) | Credential::Password(s) | Credential::Auth(s) => Some(s),
            Credential::Cipher { password, .. } => Some(password),
        }
    }

    pub fn uuid(&self) -> Option<&str> {
        match self {
            Credential::Uuid(s) => Some(s),
            _ => None,
        }
    }

    pub fn password(&self) -> Option<&str> {
        match self {
            Credential::Password(s) | Credential::Cipher { password: s, .. } => Some(s),
            _ => None,
        }
    }

    pub fn cipher(&self) -> Option<&str> {
        match self {
            Credential::Cipher { method, .. } => Some(method),
            _ => None,
        }
    }
}

/// Canonical descriptor of one proxy endpoint.
///
/// Nodes are built once by a link parser and never mutated afterwards; the
/// only sanctioned change is the rename performed while resolving duplicate
/// names (see [`crate::generator::node_manip::resolve_nodes`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyNode {
    name: String,
    protocol: Protocol,
    server: String,
    port: u16,
    credential: Credential,
    network: Network,
    tls: Option<TlsOptions>,
    udp: bool,
    transport: Transport,
    /// Protocol specific keys without a typed home (alterId, obfs, plugin, ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extra: BTreeMap<String, Value>,
}

impl ProxyNode {
    pub fn builder(protocol: Protocol, server: impl Into<String>, port: u16) -> ProxyNodeBuilder {
        ProxyNodeBuilder::new(protocol, server, port)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn tls(&self) -> bool {
        self.tls.is_some()
    }

    pub fn tls_options(&self) -> Option<&TlsOptions> {
        self.tls.as_ref()
    }

    pub fn udp(&self) -> bool {
        self.udp
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    /// Reads a string (or stringified number) from the extension bag.
    pub fn extra_str(&self, key: &str) -> Option<String> {
        match self.extra.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn extra_u64(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(crate::utils::value::value_as_u64)
    }

    /// Name used when a link carries no remark, e.g. `VLESS-example.com:443`.
    pub fn fallback_name(protocol: Protocol, server: &str, port: u16) -> String {
        format!("{}-{}:{}", protocol.display_name(), server, port)
    }

    pub(crate) fn renamed(mut self, name: String) -> Self {
        self.name = name;
        self
    }
}

/// Builder for [`ProxyNode`]
pub struct ProxyNodeBuilder {
    name: Option<String>,
    protocol: Protocol,
    server: String,
    port: u16,
    credential: Credential,
    network: Network,
    tls: Option<TlsOptions>,
    udp: bool,
    transport: Transport,
    extra: BTreeMap<String, Value>,
}

impl ProxyNodeBuilder {
    pub fn new(protocol: Protocol, server: impl Into<String>, port: u16) -> Self {
        Self {
            name: None,
            protocol,
            server: server.into(),
            port,
            credential: Credential::None,
            network: Network::Tcp,
            tls: None,
            udp: false,
            transport: Transport::None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the display name. Blank names fall back to the generated one.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        self.name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn name_opt(self, name: Option<String>) -> Self {
        match name {
            Some(name) => self.name(name),
            None => self,
        }
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn tls(mut self, tls: TlsOptions) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn tls_opt(mut self, tls: Option<TlsOptions>) -> Self {
        self.tls = tls;
        self
    }

    pub fn udp(mut self, udp: bool) -> Self {
        self.udp = udp;
        self
    }

    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Inserts the value only when present and non-empty.
    pub fn extra_opt(self, key: &str, value: Option<String>) -> Self {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => self.extra(key, v),
            None => self,
        }
    }

    pub fn build(self) -> ProxyNode {
        let name = self
            .name
            .unwrap_or_else(|| ProxyNode::fallback_name(self.protocol, &self.server, self.port));
        ProxyNode {
            name,
            protocol: self.protocol,
            server: self.server,
            port: self.port,
            credential: self.credential,
            network: self.network,
            tls: self.tls,
            udp: self.udp,
            transport: self.transport,
            extra: self.extra,
        }
    }
}
