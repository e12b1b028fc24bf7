use base64::{engine::general_purpose, Engine as _};

/// Encodes a string to Base64 format.
pub fn base64_encode(input: &str) -> String {
    general_purpose::STANDARD.encode(input)
}

/// Reverses a URL-safe Base64 string to standard Base64 format.
pub fn url_safe_base64_reverse(input: &str) -> String {
    input.replace('-', "+").replace('_', "/")
}

/// Converts a Base64 string to URL-safe Base64 format by replacing specific characters.
pub fn url_safe_base64_apply(input: &str) -> String {
    input
        .replace('+', "-")
        .replace('/', "_")
        .replace('=', "") // Remove padding
}

/// Normalizes loosely encoded Base64 before decoding.
///
/// Whitespace anywhere in the input is dropped, the URL-safe alphabet is
/// mapped back to the standard one and the result is padded with `=` up to
/// a multiple of four.
pub fn normalize_base64(input: &str) -> String {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut clean = url_safe_base64_reverse(compact.trim_end_matches('='));
    let rem = clean.len() % 4;
    if rem != 0 {
        clean.push_str(&"=".repeat(4 - rem));
    }
    clean
}

/// Decodes Base64 that may be URL-safe, unpadded or wrapped across lines.
///
/// # Returns
/// The decoded bytes, or `None` if the input is not Base64 even after
/// normalization.
pub fn decode_lenient_bytes(input: &str) -> Option<Vec<u8>> {
    let clean = normalize_base64(input);
    if clean.is_empty() {
        return None;
    }
    general_purpose::STANDARD.decode(clean).ok()
}

/// Same as [`decode_lenient_bytes`] but requires the payload to be UTF-8.
pub fn decode_lenient(input: &str) -> Option<String> {
    decode_lenient_bytes(input).and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Decodes a URL-safe Base64 string to its original form.
///
/// Returns an empty string on invalid input.
pub fn url_safe_base64_decode(input: &str) -> String {
    decode_lenient(input).unwrap_or_default()
}

/// Encodes a string to URL-safe Base64 format.
pub fn url_safe_base64_encode(input: &str) -> String {
    url_safe_base64_apply(&base64_encode(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_safe_unpadded_matches_standard() {
        let plain = "aes-256-gcm:p@ss/wo+rd??>";
        let standard = base64_encode(plain);
        let url_safe = url_safe_base64_encode(plain);
        assert_ne!(standard, url_safe);
        assert_eq!(decode_lenient(&standard).as_deref(), Some(plain));
        assert_eq!(decode_lenient(&url_safe).as_deref(), Some(plain));
    }

    #[test]
    fn test_whitespace_is_ignored() {
        let encoded = base64_encode("line one\nline two\n");
        let (head, tail) = encoded.split_at(7);
        let wrapped = format!(" {}\r\n{} \n", head, tail);
        assert_eq!(
            decode_lenient(&wrapped).as_deref(),
            Some("line one\nline two\n")
        );
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(decode_lenient("not base64 at all!"), None);
        assert_eq!(decode_lenient(""), None);
        assert_eq!(url_safe_base64_decode("@@@@"), "");
    }

    #[test]
    fn test_padding_is_added() {
        assert_eq!(normalize_base64("YQ"), "YQ==");
        assert_eq!(normalize_base64("YWI"), "YWI=");
        assert_eq!(normalize_base64("YWJj"), "YWJj");
    }
}
