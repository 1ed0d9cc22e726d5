//! Checksum and keyed-signature primitives used by HMAC authentication.
//!
//! All values travel as text: the checksum and the signature are lowercase
//! hex strings, and the headers carry the base64 encoding of those strings.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex encoded MD5 checksum of `content`.
pub fn checksum(content: &[u8]) -> String {
    hex::encode(Md5::digest(content))
}

/// Hex encoded HMAC-SHA256 of `message` keyed with `secret`.
pub fn sign(secret: &str, message: &str) -> String {
    // HMAC accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC takes any key size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Standard base64 encoding of `content`.
pub fn encode(content: &str) -> String {
    BASE64.encode(content)
}

/// Concatenates `values`, terminating each one with `\n`.
///
/// Servers rebuild this string byte-for-byte, so the order of `values` is
/// part of the protocol: method, path, checksum, content type, nonce.
pub fn canonical_string(values: &[&str]) -> String {
    let mut out = String::with_capacity(values.iter().map(|v| v.len() + 1).sum());
    for value in values {
        out.push_str(value);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            checksum(b"I am getting thirsty."),
            "1b0f985d0302a0b674c99bc56a0992f5"
        );
    }

    #[test]
    fn test_sign() {
        assert_eq!(
            sign("api-secret", "The brown fox becomes lazy"),
            "2bf0c8ea72d1ebc6e4d38b8724604caf779def6b78c4e7e8f1cbbce75e8968c6"
        );
        assert_eq!(
            sign("api-secret", "The brown fox becomes lazy"),
            sign("api-secret", "The brown fox becomes lazy")
        );
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode(""), "");
        assert_eq!(
            encode("f3e56c602771e9541aef61d502562b89"),
            "ZjNlNTZjNjAyNzcxZTk1NDFhZWY2MWQ1MDI1NjJiODk="
        );
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(canonical_string(&[]), "");
        assert_eq!(
            canonical_string(&["GET", "/api/workspace", "", "1"]),
            "GET\n/api/workspace\n\n1\n"
        );
    }
}
