use crate::models::{parse_alpn, Credential, Protocol, ProxyNode, TlsOptions};
use crate::parser::ParseError;

use super::common::parse_uri;

/// Parse a Hysteria (v1) link into a ProxyNode
///
/// Format: `hysteria://host:port?auth=..&upmbps=..&downmbps=..&peer=..#name`
pub fn explode_hysteria(hysteria: &str) -> Result<ProxyNode, ParseError> {
    let parts = parse_uri(hysteria)?;
    let port = parts.port.unwrap_or(Protocol::Hysteria.default_port());

    let credential = match parts.param("auth") {
        Some(auth) => Credential::Auth(auth.to_string()),
        None => Credential::None,
    };

    let tls = TlsOptions {
        sni: parts.first_param(&["peer", "sni"]).map(str::to_string),
        skip_cert_verify: parts.flag(&["insecure", "allowInsecure"]),
        alpn: parse_alpn(parts.param("alpn")),
        ..Default::default()
    };

    Ok(ProxyNode::builder(Protocol::Hysteria, parts.host.clone(), port)
        .name_opt(parts.name.clone())
        .credential(credential)
        .tls(tls)
        .udp(true)
        .extra_opt("up", parts.first_param(&["upmbps", "up"]).map(bandwidth))
        .extra_opt("down", parts.first_param(&["downmbps", "down"]).map(bandwidth))
        .extra_opt("protocol", parts.param_string("protocol"))
        .extra_opt("obfs", parts.param_string("obfs"))
        .build())
}

/// Bare numbers are megabits per second; anything else is kept verbatim.
pub(super) fn bandwidth(value: &str) -> String {
    if value.chars().all(|c| c.is_ascii_digit()) {
        format!("{} Mbps", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explode_hysteria() {
        let node = explode_hysteria(
            "hysteria://hy.example.com:36712?protocol=udp&auth=token&peer=sni.example.com&insecure=1&upmbps=50&downmbps=100&alpn=h3&obfs=xplus#HY",
        )
        .unwrap();
        assert_eq!(node.name(), "HY");
        assert_eq!(node.port(), 36712);
        assert_eq!(node.credential(), &Credential::Auth("token".to_string()));
        let tls = node.tls_options().unwrap();
        assert_eq!(tls.sni.as_deref(), Some("sni.example.com"));
        assert!(tls.skip_cert_verify);
        assert_eq!(tls.alpn, vec!["h3"]);
        assert_eq!(node.extra_str("up").as_deref(), Some("50 Mbps"));
        assert_eq!(node.extra_str("down").as_deref(), Some("100 Mbps"));
        assert_eq!(node.extra_str("protocol").as_deref(), Some("udp"));
        assert_eq!(node.extra_str("obfs").as_deref(), Some("xplus"));
    }

    #[test]
    fn test_explode_hysteria_defaults() {
        let node = explode_hysteria("hysteria://1.2.3.4").unwrap();
        assert_eq!(node.port(), 443);
        assert_eq!(node.name(), "Hysteria-1.2.3.4:443");
        assert_eq!(node.credential(), &Credential::None);
    }

    #[test]
    fn test_bandwidth() {
        assert_eq!(bandwidth("20"), "20 Mbps");
        assert_eq!(bandwidth("1 Gbps"), "1 Gbps");
    }
}
