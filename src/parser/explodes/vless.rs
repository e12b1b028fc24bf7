use crate::models::{Credential, Protocol, ProxyNode, RealityOptions};
use crate::parser::ParseError;

use super::common::{parse_uri, tls_from_query, transport_from_query};

/// Parse a VLESS link into a ProxyNode
///
/// Format: `vless://uuid@host:port?type=ws&security=reality&pbk=...#name`
pub fn explode_vless(vless: &str) -> Result<ProxyNode, ParseError> {
    let parts = parse_uri(vless)?;

    let userinfo = parts.userinfo();
    let uuid = userinfo.trim();
    if uuid.is_empty() {
        return Err(ParseError::missing("vless link has no uuid"));
    }

    let port = parts.port.unwrap_or(Protocol::Vless.default_port());
    let (network, transport) = transport_from_query(&parts);

    let security = parts.param("security").unwrap_or_default().to_ascii_lowercase();
    let tls = matches!(security.as_str(), "tls" | "xtls" | "reality").then(|| {
        let mut tls = tls_from_query(&parts, &["sni", "peer"]);
        if tls.sni.is_none() {
            tls.sni = Some(parts.host.clone());
        }
        tls.reality = parts.param_string("pbk").map(|public_key| RealityOptions {
            public_key,
            short_id: parts.param_string("sid"),
        });
        tls.flow = parts.param_string("flow");
        tls
    });

    Ok(ProxyNode::builder(Protocol::Vless, parts.host.clone(), port)
        .name_opt(parts.name.clone())
        .credential(Credential::Uuid(uuid.to_string()))
        .network(network)
        .transport(transport)
        .tls_opt(tls)
        .udp(true)
        .build())
}
