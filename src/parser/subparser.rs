//! Subscription body handling: Base64 unwrapping and link scanning.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::utils::base64::decode_lenient;

lazy_static! {
    static ref LINK_PATTERN: Regex =
        Regex::new(r#"\b(?:vmess|vless|trojan|ssr|ss|hysteria2|hysteria|hy2)://[^\s"'<>]+"#)
            .expect("link pattern is valid");
}

/// Reverses the Base64 wrapping most subscription endpoints apply.
///
/// The decoded text is used only when it is valid UTF-8 and looks like it
/// carries links; otherwise the raw body is returned unchanged.
pub fn decode_subscription(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match decode_lenient(trimmed) {
        Some(decoded) if decoded.contains("://") => decoded,
        _ => body.to_string(),
    }
}

/// Scans free text for scheme-prefixed share links.
///
/// Exact duplicates are dropped; first appearance order is kept.
pub fn extract_links(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    LINK_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches([',', ';', ')', ']']).to_string())
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// [`decode_subscription`] followed by [`extract_links`].
pub fn extract_from_body(body: &str) -> Vec<String> {
    extract_links(&decode_subscription(body))
}
