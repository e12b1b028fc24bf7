use std::collections::HashMap;

use crate::models::{Credential, Protocol, ProxyNode};
use crate::parser::ParseError;
use crate::utils::base64::decode_lenient;

/// Parse a ShadowsocksR link into a ProxyNode
///
/// The payload is Base64 of
/// `server:port:protocol:method:obfs:password_b64/?obfsparam=..&remarks=..`.
/// Parameter values are themselves URL-safe Base64.
pub fn explode_ssr(ssr: &str) -> Result<ProxyNode, ParseError> {
    let encoded = ssr
        .strip_prefix("ssr://")
        .ok_or_else(|| ParseError::unsupported(ssr))?;

    let decoded = decode_lenient(encoded)
        .ok_or_else(|| ParseError::malformed("ssr payload is not valid base64"))?;
    let decoded = decoded.trim();

    let (main, params) = match decoded.split_once("/?") {
        Some((main, params)) => (main, Some(params)),
        None => (decoded.trim_end_matches('/'), None),
    };

    // Split from the right so IPv6 servers keep their colons.
    let fields: Vec<&str> = main.rsplitn(6, ':').collect();
    if fields.len() < 6 {
        return Err(ParseError::malformed(format!(
            "ssr expects 6 fields, got {}",
            fields.len()
        )));
    }
    let (password_b64, obfs, method, protocol, port, server) =
        (fields[0], fields[1], fields[2], fields[3], fields[4], fields[5]);

    let server = server.trim_start_matches('[').trim_end_matches(']');
    if server.is_empty() {
        return Err(ParseError::malformed("ssr missing server"));
    }
    let port = match port.parse::<u16>() {
        Ok(0) | Err(_) => return Err(ParseError::malformed("ssr invalid port")),
        Ok(p) => p,
    };

    let password = decode_lenient(password_b64)
        .ok_or_else(|| ParseError::malformed("ssr password is not valid base64"))?;
    if method.is_empty() || password.is_empty() {
        return Err(ParseError::missing("ssr method/password"));
    }

    // Values are Base64, so `+` must survive: no form decoding here.
    let query: HashMap<&str, &str> = params
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();
    let decode_param = |key: &str| {
        query
            .get(key)
            .and_then(|v| decode_lenient(v))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(ProxyNode::builder(Protocol::ShadowsocksR, server, port)
        .name_opt(decode_param("remarks"))
        .credential(Credential::Cipher {
            method: method.to_string(),
            password,
        })
        .extra("protocol", protocol)
        .extra("obfs", obfs)
        .extra_opt("protocol-param", decode_param("protoparam"))
        .extra_opt("obfs-param", decode_param("obfsparam"))
        .extra_opt("params", params.map(str::to_string))
        .build())
}
