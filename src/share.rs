//! Shareable progression links.
//!
//! A progression travels as one query parameter holding the comma-joined
//! chord symbols: `?chords=Imaj7%2Cii7%2CV7%2CImaj7`. Decoding splits on
//! commas and drops empty or whitespace-only tokens.

use log::debug;

pub const PARAM: &str = "chords";

/// `chords=<percent-encoded list>`, without the leading `?`.
pub fn encode_query(chords: &[String]) -> String {
    format!("{}={}", PARAM, encode_component(&chords.join(",")))
}

/// `base` with its query and fragment replaced by the progression.
pub fn share_url(base: &str, chords: &[String]) -> String {
    let end = base.find(['?', '#']).unwrap_or(base.len());
    format!("{}?{}", &base[..end], encode_query(chords))
}

/// Chords from a URL or query string (`?` optional). None when there is no
/// `chords` parameter or it holds no chords.
pub fn decode_query(input: &str) -> Option<Vec<String>> {
    let query = match input.find('?') {
        Some(i) => &input[i + 1..],
        None => input,
    };
    let query = query.split('#').next().unwrap_or("");
    let value = query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (decode_component(key) == PARAM).then_some(value)
    })?;
    let chords = decode_chords(&decode_component(value));
    if chords.is_empty() {
        debug!("share link has an empty chord list");
        return None;
    }
    Some(chords)
}

/// Split a decoded parameter value into chord symbols.
pub fn decode_chords(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .collect()
}

// ─── Percent encoding ───────────────────────────────────────────────────────

/// Percent-encode everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, the
/// same set browsers leave alone for URI components. Multi-byte characters
/// (`°`, `ø`) are encoded byte by byte as UTF-8.
pub fn encode_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if b.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

/// Reverse of `encode_component`. `+` reads as a space, as in form-encoded
/// queries. Malformed escapes pass through literally; invalid UTF-8 is
/// replaced.
pub fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                        continue;
                    }
                    _ => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
