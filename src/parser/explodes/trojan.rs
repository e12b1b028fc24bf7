use crate::models::{Credential, Protocol, ProxyNode};
use crate::parser::ParseError;

use super::common::{parse_uri, tls_from_query, transport_from_query};

/// Parse a Trojan link into a ProxyNode
///
/// Trojan always runs over TLS. The SNI comes from `sni`, then `peer`, then
/// the server host.
pub fn explode_trojan(trojan: &str) -> Result<ProxyNode, ParseError> {
    let parts = parse_uri(trojan)?;

    let password = parts.userinfo();
    if password.is_empty() {
        return Err(ParseError::missing("trojan link has no password"));
    }

    let port = parts.port.unwrap_or(Protocol::Trojan.default_port());
    let (network, transport) = transport_from_query(&parts);

    let mut tls = tls_from_query(&parts, &["sni", "peer"]);
    if tls.sni.is_none() {
        tls.sni = Some(parts.host.clone());
    }

    Ok(ProxyNode::builder(Protocol::Trojan, parts.host.clone(), port)
        .name_opt(parts.name.clone())
        .credential(Credential::Password(password))
        .network(network)
        .transport(transport)
        .tls(tls)
        .udp(true)
        .build())
}
