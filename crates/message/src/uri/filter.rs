//! Component filters applied to every uri component before it is stored.
//!
//! Any byte outside the allowed set of a component is percent-encoded, except for a `%`
//! that already starts a valid `%XX` triplet, so filtering is idempotent.

use std::fmt::Write;

/// Sub-delims: <https://tools.ietf.org/html/rfc3986#section-2.2>
const SUB_DELIMS: &[u8] = b"!$&'()*+,;=";

#[inline]
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

#[inline]
fn is_sub_delim(b: u8) -> bool {
    SUB_DELIMS.contains(&b)
}

fn is_user_info_byte(b: u8) -> bool {
    is_unreserved(b) || is_sub_delim(b)
}

fn is_reg_name_byte(b: u8) -> bool {
    is_unreserved(b) || is_sub_delim(b)
}

/// Bytes of an ip-literal such as `[::1]` or `[v1.fe80::a+en1]`.
fn is_ip_literal_byte(b: u8) -> bool {
    is_unreserved(b) || is_sub_delim(b) || matches!(b, b':' | b'[' | b']')
}

fn is_path_byte(b: u8) -> bool {
    is_unreserved(b) || is_sub_delim(b) || matches!(b, b':' | b'@' | b'/')
}

fn is_query_byte(b: u8) -> bool {
    is_path_byte(b) || b == b'?'
}

/// Percent-encodes every byte rejected by `allowed`, leaving valid `%XX` triplets untouched.
fn encode(component: &str, allowed: fn(u8) -> bool) -> String {
    let bytes = component.as_bytes();
    let mut encoded = String::with_capacity(bytes.len());

    for (index, &b) in bytes.iter().enumerate() {
        if allowed(b) || (b == b'%' && is_pct_triplet(&bytes[index..])) {
            encoded.push(b as char);
        } else {
            // writing into a String never fails
            let _ = write!(encoded, "%{b:02X}");
        }
    }

    encoded
}

fn is_pct_triplet(bytes: &[u8]) -> bool {
    bytes.len() >= 3 && bytes[0] == b'%' && bytes[1].is_ascii_hexdigit() && bytes[2].is_ascii_hexdigit()
}

pub(crate) fn user_info(component: &str) -> String {
    encode(component, is_user_info_byte)
}

pub(crate) fn path(component: &str) -> String {
    encode(component, is_path_byte)
}

pub(crate) fn query_or_fragment(component: &str) -> String {
    encode(component, is_query_byte)
}

/// Lowercases a host and percent-encodes what a reg-name or ip-literal can't hold.
pub(crate) fn host(component: &str) -> String {
    let host = component.to_ascii_lowercase();
    if host.starts_with('[') && host.ends_with(']') {
        encode(&host, is_ip_literal_byte)
    } else {
        encode(&host, is_reg_name_byte)
    }
}

/// Replaces every valid `%XX` triplet with the byte it encodes.
pub(crate) fn decode(component: &str) -> Vec<u8> {
    let bytes = component.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());

    let mut index = 0;
    while index < bytes.len() {
        if is_pct_triplet(&bytes[index..]) {
            decoded.push(hex_value(bytes[index + 1]) << 4 | hex_value(bytes[index + 2]));
            index += 3;
        } else {
            decoded.push(bytes[index]);
            index += 1;
        }
    }

    decoded
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

pub(crate) fn lowercase(component: &str) -> String {
    component.to_ascii_lowercase()
}

/// `scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
pub(crate) fn is_valid_scheme(scheme: &str) -> bool {
    let mut bytes = scheme.bytes();
    match bytes.next() {
        None => true,
        Some(first) => first.is_ascii_alphabetic() && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.')),
    }
}
