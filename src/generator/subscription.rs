//! Plain v2ray-style subscription output.

use crate::utils::base64::base64_encode;

/// Base64 of `links` joined by `\n`, the format v2rayN-family clients
/// import directly.
pub fn encode_links<S: AsRef<str>>(links: &[S]) -> String {
    let joined = links
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("\n");
    base64_encode(&joined)
}
