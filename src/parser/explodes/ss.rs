use crate::models::{Credential, Protocol, ProxyNode};
use crate::parser::ParseError;
use crate::utils::base64::decode_lenient;
use crate::utils::url::{parse_query, split_host_port, url_decode};

/// Parse a Shadowsocks link into a ProxyNode
///
/// Accepts the SIP002 form `ss://userinfo@host:port[/?plugin=...]#name`, where
/// `userinfo` is either `method:password` or Base64 of it, and the legacy
/// form where everything before `#` is Base64 of `method:password@host:port`.
pub fn explode_ss(ss: &str) -> Result<ProxyNode, ParseError> {
    let content = ss
        .strip_prefix("ss://")
        .ok_or_else(|| ParseError::unsupported(ss))?;

    let (content, name) = match content.split_once('#') {
        Some((body, fragment)) => (body, Some(url_decode(fragment))),
        None => (content, None),
    };
    let (content, query) = match content.split_once('?') {
        Some((body, query)) => (body, Some(parse_query(query))),
        None => (content, None),
    };
    let content = content.trim_end_matches('/');

    let (userinfo, authority) = match content.rsplit_once('@') {
        Some((userinfo, authority)) => (url_decode(userinfo), authority.to_string()),
        None => {
            let decoded = decode_lenient(content)
                .ok_or_else(|| ParseError::malformed("ss payload is not valid base64"))?;
            let (userinfo, authority) = decoded
                .trim()
                .rsplit_once('@')
                .ok_or_else(|| ParseError::malformed("ss payload has no server"))?;
            (userinfo.to_string(), authority.to_string())
        }
    };

    let (method, password) =
        split_method_password(&userinfo).ok_or_else(|| ParseError::missing("ss method/password"))?;

    let (server, port) = split_host_port(&authority)
        .filter(|(host, _)| !host.is_empty())
        .ok_or_else(|| ParseError::malformed("ss invalid server address"))?;
    let port = port.unwrap_or(Protocol::Shadowsocks.default_port());

    let mut builder = ProxyNode::builder(Protocol::Shadowsocks, server, port)
        .name_opt(name)
        .credential(Credential::Cipher { method, password });

    if let Some(plugin) = query.as_ref().and_then(|q| q.get("plugin")) {
        let (plugin, opts) = match plugin.split_once(';') {
            Some((plugin, opts)) => (plugin.to_string(), Some(opts.to_string())),
            None => (plugin.to_string(), None),
        };
        builder = builder
            .extra_opt("plugin", Some(plugin))
            .extra_opt("plugin-opts", opts);
    }

    Ok(builder.build())
}

/// Direct `method:password` first, Base64 of it second.
fn split_method_password(userinfo: &str) -> Option<(String, String)> {
    let split = |s: &str| {
        s.split_once(':')
            .map(|(m, p)| (m.trim().to_string(), p.to_string()))
            .filter(|(m, p)| !m.is_empty() && !p.is_empty())
    };
    split(userinfo).or_else(|| decode_lenient(userinfo).and_then(|decoded| split(decoded.trim())))
}
