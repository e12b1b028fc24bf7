use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::yaml::clash::{
    ClashProxy, ClashProxyGroup, ClashYamlOutput, CommonProxyOptions, GrpcOpts, H2Opts,
    RealityOpts, WsOpts,
};
use crate::models::{Protocol, ProxyNode, Transport};

/// Built-in policies a proxy or group name must not shadow.
const RESERVED_NAMES: [&str; 2] = ["DIRECT", "REJECT"];

/// Destinations always routed around the proxy.
const BYPASS_RULES: [&str; 5] = [
    "DOMAIN-SUFFIX,local,DIRECT",
    "IP-CIDR,127.0.0.0/8,DIRECT",
    "IP-CIDR,172.16.0.0/12,DIRECT",
    "IP-CIDR,192.168.0.0/16,DIRECT",
    "IP-CIDR,10.0.0.0/8,DIRECT",
];

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("cannot synthesize a configuration without nodes")]
    EmptyNodeList,

    #[error("proxy name is not unique: {0}")]
    DuplicateName(String),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

fn default_port() -> u16 {
    7890
}

fn default_socks_port() -> u16 {
    7891
}

fn default_allow_lan() -> bool {
    true
}

fn default_mode() -> String {
    "rule".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_external_controller() -> String {
    "127.0.0.1:9090".to_string()
}

fn default_select_group() -> String {
    "Proxy".to_string()
}

fn default_auto_group() -> String {
    "Auto".to_string()
}

fn default_fallback_group() -> String {
    "Fallback".to_string()
}

fn default_test_url() -> String {
    "http://www.gstatic.com/generate_204".to_string()
}

fn default_interval() -> u32 {
    300
}

fn default_tolerance() -> u32 {
    50
}

fn default_geoip_direct() -> Vec<String> {
    vec!["CN".to_string()]
}

/// Global listener settings and group layout of the generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClashOptions {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_socks_port")]
    pub socks_port: u16,
    #[serde(default = "default_allow_lan")]
    pub allow_lan: bool,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_external_controller")]
    pub external_controller: String,
    #[serde(default = "default_select_group")]
    pub select_group: String,
    #[serde(default = "default_auto_group")]
    pub auto_group: String,
    #[serde(default = "default_fallback_group")]
    pub fallback_group: String,
    #[serde(default = "default_test_url")]
    pub test_url: String,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default = "default_tolerance")]
    pub tolerance: u32,
    /// Country codes sent `DIRECT` via GEOIP before the catch-all.
    #[serde(default = "default_geoip_direct")]
    pub geoip_direct: Vec<String>,
}

impl Default for ClashOptions {
    fn default() -> Self {
        Self {
            port: default_port(),
            socks_port: default_socks_port(),
            allow_lan: default_allow_lan(),
            mode: default_mode(),
            log_level: default_log_level(),
            external_controller: default_external_controller(),
            select_group: default_select_group(),
            auto_group: default_auto_group(),
            fallback_group: default_fallback_group(),
            test_url: default_test_url(),
            interval: default_interval(),
            tolerance: default_tolerance(),
            geoip_direct: default_geoip_direct(),
        }
    }
}

impl ClashOptions {
    fn group_names(&self) -> [&str; 3] {
        [&self.select_group, &self.auto_group, &self.fallback_group]
    }

    /// Names a node must not carry: the built-in policies and the three
    /// group names.
    pub fn reserved_names(&self) -> Vec<&str> {
        RESERVED_NAMES
            .into_iter()
            .chain(self.group_names())
            .collect()
    }
}

/// Render resolved nodes into a Clash document.
///
/// Node names must already be unique and must not collide with a group
/// name or a built-in policy (see
/// [`resolve_nodes_reserving`](crate::generator::node_manip::resolve_nodes_reserving)
/// with [`ClashOptions::reserved_names`]).
pub fn synthesize(
    nodes: &[ProxyNode],
    options: &ClashOptions,
) -> Result<ClashYamlOutput, SynthesisError> {
    if nodes.is_empty() {
        return Err(SynthesisError::EmptyNodeList);
    }

    let mut names: HashSet<&str> = RESERVED_NAMES.into_iter().collect();
    for group in options.group_names() {
        if !names.insert(group) {
            return Err(SynthesisError::DuplicateName(group.to_string()));
        }
    }
    for node in nodes {
        if !names.insert(node.name()) {
            return Err(SynthesisError::DuplicateName(node.name().to_string()));
        }
    }

    let proxies: Vec<ClashProxy> = nodes.iter().map(node_to_clash_proxy).collect();
    let node_names: Vec<String> = nodes.iter().map(|n| n.name().to_string()).collect();

    let mut select = vec![options.auto_group.clone(), "DIRECT".to_string()];
    select.extend(node_names.iter().cloned());

    let proxy_groups = vec![
        ClashProxyGroup::Select {
            name: options.select_group.clone(),
            proxies: select,
        },
        ClashProxyGroup::UrlTest {
            name: options.auto_group.clone(),
            proxies: node_names.clone(),
            url: options.test_url.clone(),
            interval: Some(options.interval),
            tolerance: Some(options.tolerance),
        },
        ClashProxyGroup::Fallback {
            name: options.fallback_group.clone(),
            proxies: node_names,
            url: options.test_url.clone(),
            interval: Some(options.interval),
        },
    ];

    let mut rules: Vec<String> = BYPASS_RULES.iter().map(|r| r.to_string()).collect();
    rules.extend(
        options
            .geoip_direct
            .iter()
            .filter(|c| !c.trim().is_empty())
            .map(|code| format!("GEOIP,{},DIRECT", code.trim())),
    );
    rules.push(format!("MATCH,{}", options.select_group));

    debug!("Synthesized Clash document with {} proxies", proxies.len());

    Ok(ClashYamlOutput {
        port: Some(options.port),
        socks_port: Some(options.socks_port),
        allow_lan: Some(options.allow_lan),
        mode: Some(options.mode.clone()),
        log_level: Some(options.log_level.clone()),
        external_controller: Some(options.external_controller.clone()),
        proxies,
        proxy_groups,
        rules,
    })
}

/// [`synthesize`] followed by YAML serialization.
pub fn proxy_to_clash(nodes: &[ProxyNode], options: &ClashOptions) -> Result<String, SynthesisError> {
    let output = synthesize(nodes, options)?;
    Ok(serde_yaml::to_string(&output)?)
}

/// Maps one node onto its Clash proxy entry, keeping only the fields that
/// matter for its protocol.
pub fn node_to_clash_proxy(node: &ProxyNode) -> ClashProxy {
    let tls = node.tls_options();
    let mut common = CommonProxyOptions::builder(
        node.name().to_string(),
        node.server().to_string(),
        node.port(),
    )
    .udp(node.udp());
    if let Some(tls) = tls {
        common = common
            .skip_cert_verify(tls.skip_cert_verify)
            .alpn(tls.alpn.clone())
            .client_fingerprint(tls.fingerprint.clone());
    }

    let network = Some(node.network())
        .filter(|n| !n.is_tcp())
        .map(|n| n.as_str().to_string());
    let (ws_opts, h2_opts, grpc_opts) = transport_opts(node.transport());
    let sni = tls.and_then(|t| t.sni.clone());
    let credential = node.credential();

    match node.protocol() {
        Protocol::Shadowsocks => {
            let (plugin, plugin_opts) = ss_plugin(node);
            ClashProxy::Shadowsocks {
                common: common.build(),
                cipher: credential.cipher().unwrap_or_default().to_string(),
                password: credential.password().unwrap_or_default().to_string(),
                plugin,
                plugin_opts,
            }
        }
        Protocol::ShadowsocksR => ClashProxy::ShadowsocksR {
            common: common.build(),
            cipher: credential.cipher().unwrap_or_default().to_string(),
            password: credential.password().unwrap_or_default().to_string(),
            protocol: node
                .extra_str("protocol")
                .unwrap_or_else(|| "origin".to_string()),
            obfs: node.extra_str("obfs").unwrap_or_else(|| "plain".to_string()),
            protocol_param: node.extra_str("protocol-param"),
            obfs_param: node.extra_str("obfs-param"),
        },
        Protocol::VMess => ClashProxy::VMess {
            common: common.tls(node.tls()).build(),
            uuid: credential.uuid().unwrap_or_default().to_string(),
            alter_id: node
                .extra_u64("alterId")
                .and_then(|a| u32::try_from(a).ok())
                .unwrap_or(0),
            cipher: node.extra_str("cipher").unwrap_or_else(|| "auto".to_string()),
            network,
            servername: sni,
            ws_opts,
            h2_opts,
            grpc_opts,
        },
        Protocol::Vless => ClashProxy::Vless {
            common: common.tls(node.tls()).build(),
            uuid: credential.uuid().unwrap_or_default().to_string(),
            flow: tls.and_then(|t| t.flow.clone()),
            network,
            servername: sni,
            reality_opts: tls.and_then(|t| t.reality.as_ref()).map(|r| RealityOpts {
                public_key: r.public_key.clone(),
                short_id: r.short_id.clone(),
            }),
            ws_opts,
            h2_opts,
            grpc_opts,
        },
        Protocol::Trojan => ClashProxy::Trojan {
            common: common.sni(sni).build(),
            password: credential.password().unwrap_or_default().to_string(),
            network,
            ws_opts,
            grpc_opts,
        },
        Protocol::Hysteria => ClashProxy::Hysteria {
            common: common.sni(sni).build(),
            auth_str: credential.secret().map(str::to_string),
            protocol: node.extra_str("protocol"),
            up: node.extra_str("up"),
            down: node.extra_str("down"),
            obfs: node.extra_str("obfs"),
        },
        Protocol::Hysteria2 => ClashProxy::Hysteria2 {
            common: common.sni(sni).build(),
            password: credential.password().unwrap_or_default().to_string(),
            up: node.extra_str("up"),
            down: node.extra_str("down"),
            obfs: node.extra_str("obfs"),
            obfs_password: node.extra_str("obfs-password"),
        },
    }
}

fn transport_opts(transport: &Transport) -> (Option<WsOpts>, Option<H2Opts>, Option<GrpcOpts>) {
    match transport {
        Transport::None => (None, None, None),
        Transport::Ws(ws) => {
            let mut headers = BTreeMap::new();
            if let Some(host) = ws.host.as_ref().filter(|h| !h.is_empty()) {
                headers.insert("Host".to_string(), host.clone());
            }
            (
                Some(WsOpts {
                    path: ws.path.clone(),
                    headers,
                }),
                None,
                None,
            )
        }
        Transport::H2(h2) => (
            None,
            Some(H2Opts {
                path: h2.path.clone(),
                host: h2.hosts.clone(),
            }),
            None,
        ),
        Transport::Grpc(grpc) => (
            None,
            None,
            Some(GrpcOpts {
                grpc_service_name: grpc.service_name.clone(),
            }),
        ),
    }
}

/// Translates SIP003 plugin strings into Clash `plugin` / `plugin-opts`.
///
/// `obfs-local` and `simple-obfs` become `obfs` with `obfs=`/`obfs-host=`
/// renamed to `mode`/`host`. Other plugins keep their `key=value` pairs.
fn ss_plugin(node: &ProxyNode) -> (Option<String>, BTreeMap<String, String>) {
    let Some(plugin) = node.extra_str("plugin") else {
        return (None, BTreeMap::new());
    };
    let raw_opts = node.extra_str("plugin-opts").unwrap_or_default();
    let pairs = raw_opts.split(';').filter(|s| !s.is_empty()).map(|kv| {
        match kv.split_once('=') {
            Some((k, v)) => (k.trim().to_string(), v.trim().to_string()),
            None => (kv.trim().to_string(), "true".to_string()),
        }
    });

    match plugin.as_str() {
        "obfs-local" | "simple-obfs" | "obfs" => {
            let opts = pairs
                .filter_map(|(k, v)| match k.as_str() {
                    "obfs" => Some(("mode".to_string(), v)),
                    "obfs-host" => Some(("host".to_string(), v)),
                    _ => None,
                })
                .collect();
            (Some("obfs".to_string()), opts)
        }
        "v2ray-plugin" => (Some(plugin.clone()), pairs.collect()),
        other => {
            warn!("Passing through unrecognized ss plugin '{}'", other);
            (Some(other.to_string()), pairs.collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::yaml::clash::ClashProxyCommon;
    use crate::models::{Credential, Network, TlsOptions, WsOptions};

    fn ss_node(name: &str) -> ProxyNode {
        ProxyNode::builder(Protocol::Shadowsocks, "1.2.3.4", 8388)
            .name(name)
            .credential(Credential::Cipher {
                method: "aes-128-gcm".into(),
                password: "pw".into(),
            })
            .build()
    }

    #[test]
    fn test_empty_node_list_fails() {
        assert!(matches!(
            synthesize(&[], &ClashOptions::default()),
            Err(SynthesisError::EmptyNodeList)
        ));
    }

    #[test]
    fn test_groups_and_rules() {
        let nodes = vec![ss_node("A"), ss_node("B")];
        let output = synthesize(&nodes, &ClashOptions::default()).unwrap();

        assert_eq!(output.proxies.len(), 2);
        assert_eq!(output.proxy_groups.len(), 3);
        for group in &output.proxy_groups {
            assert!(group.proxies().contains(&"A".to_string()));
            assert!(group.proxies().contains(&"B".to_string()));
        }
        assert_eq!(
            output.proxy_groups[0].proxies()[..2],
            ["Auto".to_string(), "DIRECT".to_string()]
        );
        assert_eq!(output.rules.last().map(String::as_str), Some("MATCH,Proxy"));
        assert!(output.rules.contains(&"GEOIP,CN,DIRECT".to_string()));
    }

    #[test]
    fn test_rejects_name_collisions() {
        let nodes = vec![ss_node("A"), ss_node("A")];
        assert!(matches!(
            synthesize(&nodes, &ClashOptions::default()),
            Err(SynthesisError::DuplicateName(n)) if n == "A"
        ));
        assert!(matches!(
            synthesize(&[ss_node("Auto")], &ClashOptions::default()),
            Err(SynthesisError::DuplicateName(_))
        ));
        assert!(matches!(
            synthesize(&[ss_node("DIRECT")], &ClashOptions::default()),
            Err(SynthesisError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_vmess_entry_fields() {
        let node = ProxyNode::builder(Protocol::VMess, "v.example.com", 443)
            .name("V")
            .credential(Credential::Uuid("uuid-1".into()))
            .network(Network::Ws)
            .transport(Transport::Ws(WsOptions {
                path: "/ray".into(),
                host: Some("cdn.example.com".into()),
            }))
            .tls(TlsOptions {
                sni: Some("v.example.com".into()),
                ..Default::default()
            })
            .udp(true)
            .extra("alterId", 1)
            .build();

        let proxy = node_to_clash_proxy(&node);
        assert_eq!(proxy.name(), "V");
        match proxy {
            ClashProxy::VMess {
                common,
                alter_id,
                cipher,
                network,
                servername,
                ws_opts,
                ..
            } => {
                assert_eq!(common.tls, Some(true));
                assert_eq!(alter_id, 1);
                assert_eq!(cipher, "auto");
                assert_eq!(network.as_deref(), Some("ws"));
                assert_eq!(servername.as_deref(), Some("v.example.com"));
                let ws = ws_opts.unwrap();
                assert_eq!(ws.path, "/ray");
                assert_eq!(ws.headers.get("Host").map(String::as_str), Some("cdn.example.com"));
            }
            other => panic!("unexpected proxy: {:?}", other),
        }
    }

    #[test]
    fn test_ss_obfs_plugin_conversion() {
        let node = ProxyNode::builder(Protocol::Shadowsocks, "1.2.3.4", 8388)
            .credential(Credential::Cipher {
                method: "aes-128-gcm".into(),
                password: "pw".into(),
            })
            .extra("plugin", "obfs-local")
            .extra("plugin-opts", "obfs=http;obfs-host=bing.com")
            .build();
        match node_to_clash_proxy(&node) {
            ClashProxy::Shadowsocks {
                plugin,
                plugin_opts,
                ..
            } => {
                assert_eq!(plugin.as_deref(), Some("obfs"));
                assert_eq!(plugin_opts.get("mode").map(String::as_str), Some("http"));
                assert_eq!(plugin_opts.get("host").map(String::as_str), Some("bing.com"));
            }
            other => panic!("unexpected proxy: {:?}", other),
        }
    }

    #[test]
    fn test_yaml_round_trip_parses() {
        let yaml = proxy_to_clash(&[ss_node("A")], &ClashOptions::default()).unwrap();
        assert!(yaml.contains("socks-port: 7891"));
        assert!(yaml.contains("proxy-groups:"));
        let parsed: ClashYamlOutput = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.proxies.len(), 1);
        assert_eq!(parsed.proxies[0].name(), "A");
    }
}
