use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn is_empty_option_string(s: &Option<String>) -> bool {
    s.as_deref().map_or(true, str::is_empty)
}

/// Represents a complete Clash configuration output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashYamlOutput {
    // General settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socks_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_lan: Option<bool>,
    #[serde(skip_serializing_if = "is_empty_option_string")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "is_empty_option_string")]
    pub log_level: Option<String>,
    #[serde(skip_serializing_if = "is_empty_option_string")]
    pub external_controller: Option<String>,

    #[serde(default)]
    pub proxies: Vec<ClashProxy>,
    #[serde(default)]
    pub proxy_groups: Vec<ClashProxyGroup>,
    #[serde(default)]
    pub rules: Vec<String>,
}

impl Default for ClashYamlOutput {
    fn default() -> Self {
        Self {
            port: None,
            socks_port: None,
            allow_lan: None,
            mode: Some("rule".to_string()),
            log_level: Some("info".to_string()),
            external_controller: None,
            proxies: Vec::new(),
            proxy_groups: Vec::new(),
            rules: Vec::new(),
        }
    }
}

/// Common proxy options that can be used across different proxy types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommonProxyOptions {
    pub name: String,
    pub server: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "is_empty_option_string")]
    pub sni: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
    #[serde(default, skip_serializing_if = "is_empty_option_string")]
    pub client_fingerprint: Option<String>,
}

impl CommonProxyOptions {
    pub fn new(name: String, server: String, port: u16) -> Self {
        Self {
            name,
            server,
            port,
            udp: None,
            tls: None,
            skip_cert_verify: None,
            sni: None,
            alpn: Vec::new(),
            client_fingerprint: None,
        }
    }

    pub fn builder(name: String, server: String, port: u16) -> CommonProxyOptionsBuilder {
        CommonProxyOptionsBuilder {
            common: Self::new(name, server, port),
        }
    }
}

/// Builder for CommonProxyOptions
pub struct CommonProxyOptionsBuilder {
    common: CommonProxyOptions,
}

impl CommonProxyOptionsBuilder {
    pub fn udp(mut self, value: bool) -> Self {
        self.common.udp = Some(value);
        self
    }

    pub fn tls(mut self, value: bool) -> Self {
        self.common.tls = Some(value);
        self
    }

    pub fn skip_cert_verify(mut self, value: bool) -> Self {
        self.common.skip_cert_verify = Some(value);
        self
    }

    pub fn sni(mut self, value: Option<String>) -> Self {
        self.common.sni = value;
        self
    }

    pub fn alpn(mut self, value: Vec<String>) -> Self {
        self.common.alpn = value;
        self
    }

    pub fn client_fingerprint(mut self, value: Option<String>) -> Self {
        self.common.client_fingerprint = value;
        self
    }

    pub fn build(self) -> CommonProxyOptions {
        self.common
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WsOpts {
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GrpcOpts {
    pub grpc_service_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct H2Opts {
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RealityOpts {
    pub public_key: String,
    #[serde(default, skip_serializing_if = "is_empty_option_string")]
    pub short_id: Option<String>,
}

/// Represents a single proxy in Clash configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClashProxy {
    #[serde(rename = "ss")]
    Shadowsocks {
        #[serde(flatten)]
        common: CommonProxyOptions,
        cipher: String,
        password: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plugin: Option<String>,
        #[serde(
            rename = "plugin-opts",
            default,
            skip_serializing_if = "BTreeMap::is_empty"
        )]
        plugin_opts: BTreeMap<String, String>,
    },
    #[serde(rename = "ssr")]
    ShadowsocksR {
        #[serde(flatten)]
        common: CommonProxyOptions,
        cipher: String,
        password: String,
        protocol: String,
        obfs: String,
        #[serde(
            rename = "protocol-param",
            default,
            skip_serializing_if = "is_empty_option_string"
        )]
        protocol_param: Option<String>,
        #[serde(
            rename = "obfs-param",
            default,
            skip_serializing_if = "is_empty_option_string"
        )]
        obfs_param: Option<String>,
    },
    #[serde(rename = "vmess")]
    VMess {
        #[serde(flatten)]
        common: CommonProxyOptions,
        uuid: String,
        #[serde(rename = "alterId")]
        alter_id: u32,
        cipher: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        network: Option<String>,
        #[serde(default, skip_serializing_if = "is_empty_option_string")]
        servername: Option<String>,
        #[serde(rename = "ws-opts", default, skip_serializing_if = "Option::is_none")]
        ws_opts: Option<WsOpts>,
        #[serde(rename = "h2-opts", default, skip_serializing_if = "Option::is_none")]
        h2_opts: Option<H2Opts>,
        #[serde(rename = "grpc-opts", default, skip_serializing_if = "Option::is_none")]
        grpc_opts: Option<GrpcOpts>,
    },
    #[serde(rename = "vless")]
    Vless {
        #[serde(flatten)]
        common: CommonProxyOptions,
        uuid: String,
        #[serde(default, skip_serializing_if = "is_empty_option_string")]
        flow: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        network: Option<String>,
        #[serde(default, skip_serializing_if = "is_empty_option_string")]
        servername: Option<String>,
        #[serde(
            rename = "reality-opts",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        reality_opts: Option<RealityOpts>,
        #[serde(rename = "ws-opts", default, skip_serializing_if = "Option::is_none")]
        ws_opts: Option<WsOpts>,
        #[serde(rename = "h2-opts", default, skip_serializing_if = "Option::is_none")]
        h2_opts: Option<H2Opts>,
        #[serde(rename = "grpc-opts", default, skip_serializing_if = "Option::is_none")]
        grpc_opts: Option<GrpcOpts>,
    },
    #[serde(rename = "trojan")]
    Trojan {
        #[serde(flatten)]
        common: CommonProxyOptions,
        password: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        network: Option<String>,
        #[serde(rename = "ws-opts", default, skip_serializing_if = "Option::is_none")]
        ws_opts: Option<WsOpts>,
        #[serde(rename = "grpc-opts", default, skip_serializing_if = "Option::is_none")]
        grpc_opts: Option<GrpcOpts>,
    },
    #[serde(rename = "hysteria")]
    Hysteria {
        #[serde(flatten)]
        common: CommonProxyOptions,
        #[serde(rename = "auth-str", default, skip_serializing_if = "Option::is_none")]
        auth_str: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        up: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        down: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        obfs: Option<String>,
    },
    #[serde(rename = "hysteria2")]
    Hysteria2 {
        #[serde(flatten)]
        common: CommonProxyOptions,
        password: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        up: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        down: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        obfs: Option<String>,
        #[serde(
            rename = "obfs-password",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        obfs_password: Option<String>,
    },
}

/// Trait for common operations on all ClashProxy variants
pub trait ClashProxyCommon {
    fn common(&self) -> &CommonProxyOptions;

    fn name(&self) -> &str {
        &self.common().name
    }
}

impl ClashProxyCommon for ClashProxy {
    fn common(&self) -> &CommonProxyOptions {
        match self {
            ClashProxy::Shadowsocks { common, .. } => common,
            ClashProxy::ShadowsocksR { common, .. } => common,
            ClashProxy::VMess { common, .. } => common,
            ClashProxy::Vless { common, .. } => common,
            ClashProxy::Trojan { common, .. } => common,
            ClashProxy::Hysteria { common, .. } => common,
            ClashProxy::Hysteria2 { common, .. } => common,
        }
    }
}

/// Represents a proxy group in Clash configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClashProxyGroup {
    #[serde(rename = "select")]
    Select { name: String, proxies: Vec<String> },
    #[serde(rename = "url-test")]
    UrlTest {
        name: String,
        proxies: Vec<String>,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interval: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tolerance: Option<u32>,
    },
    #[serde(rename = "fallback")]
    Fallback {
        name: String,
        proxies: Vec<String>,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interval: Option<u32>,
    },
}

impl ClashProxyGroup {
    pub fn name(&self) -> &str {
        match self {
            ClashProxyGroup::Select { name, .. }
            | ClashProxyGroup::UrlTest { name, .. }
            | ClashProxyGroup::Fallback { name, .. } => name,
        }
    }

    pub fn proxies(&self) -> &[String] {
        match self {
            ClashProxyGroup::Select { proxies, .. }
            | ClashProxyGroup::UrlTest { proxies, .. }
            | ClashProxyGroup::Fallback { proxies, .. } => proxies,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClashProxyGroup::Select { .. } => "select",
            ClashProxyGroup::UrlTest { .. } => "url-test",
            ClashProxyGroup::Fallback { .. } => "fallback",
        }
    }
}
