use serde_json::Value;

use crate::models::{
    parse_alpn, Credential, GrpcOptions, H2Options, Network, Protocol, ProxyNode, TlsOptions,
    Transport, WsOptions,
};
use crate::parser::ParseError;
use crate::utils::base64::decode_lenient;
use crate::utils::value::{get_str, value_as_bool, value_as_port, value_as_u64};

/// Parse a VMess link into a ProxyNode
///
/// The payload after `vmess://` is Base64 of a JSON object in the v2rayN
/// layout (`add`, `port`, `id`, `aid`, `net`, `path`, `host`, `tls`, ...).
pub fn explode_vmess(vmess: &str) -> Result<ProxyNode, ParseError> {
    let encoded = vmess
        .strip_prefix("vmess://")
        .ok_or_else(|| ParseError::unsupported(vmess))?;
    // Some generators append a `#remark` after the payload.
    let encoded = encoded.split('#').next().unwrap_or_default();

    let decoded = decode_lenient(encoded)
        .ok_or_else(|| ParseError::malformed("vmess payload is not valid base64"))?;

    let json: Value = serde_json::from_str(decoded.trim())
        .map_err(|e| ParseError::malformed(format!("vmess payload is not valid json: {}", e)))?;
    if !json.is_object() {
        return Err(ParseError::malformed("vmess payload is not a json object"));
    }

    let server = get_str(&json, "add").ok_or_else(|| ParseError::malformed("vmess missing add"))?;
    let port = json
        .get("port")
        .ok_or_else(|| ParseError::malformed("vmess missing port"))
        .and_then(|p| value_as_port(p).ok_or_else(|| ParseError::malformed("vmess invalid port")))?;
    let uuid = get_str(&json, "id").ok_or_else(|| ParseError::malformed("vmess missing id"))?;

    let network = Network::parse(&get_str(&json, "net").unwrap_or_default());
    let host = get_str(&json, "host");
    let path = get_str(&json, "path");

    let transport = match network {
        Network::Ws => Transport::Ws(WsOptions {
            path: path.unwrap_or_else(|| "/".to_string()),
            host: Some(host.unwrap_or_else(|| server.clone())),
        }),
        Network::Grpc => Transport::Grpc(GrpcOptions {
            service_name: path.unwrap_or_default(),
        }),
        Network::H2 => Transport::H2(H2Options {
            path: path.unwrap_or_else(|| "/".to_string()),
            hosts: vec![host.unwrap_or_else(|| server.clone())],
        }),
        _ => Transport::None,
    };

    let tls = (get_str(&json, "tls").as_deref() == Some("tls")).then(|| TlsOptions {
        sni: get_str(&json, "sni"),
        skip_cert_verify: json
            .get("allowInsecure")
            .and_then(value_as_bool)
            .unwrap_or(false),
        alpn: parse_alpn(get_str(&json, "alpn").as_deref()),
        fingerprint: get_str(&json, "fp"),
        ..Default::default()
    });

    let mut builder = ProxyNode::builder(Protocol::VMess, server, port)
        .name_opt(get_str(&json, "ps"))
        .credential(Credential::Uuid(uuid))
        .network(network)
        .transport(transport)
        .tls_opt(tls)
        .udp(true)
        .extra_opt("cipher", get_str(&json, "scy"));

    if let Some(aid) = json.get("aid").and_then(value_as_u64).filter(|a| *a > 0) {
        builder = builder.extra("alterId", aid);
    }

    Ok(builder.build())
}
