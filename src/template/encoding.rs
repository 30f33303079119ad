//! Percent-encoding rules for template literals and expanded values.
//!
//! Two distinct character classes are in play:
//! - the *literal* class: what may appear verbatim in a stored literal
//!   chunk (controls, space, quotes, unescaped percent, and a fixed set of
//!   reserved delimiters are excluded; text containing them is encoded at
//!   parse time so stored literals always satisfy the class)
//! - the *expansion* sets: what gets encoded when a bound value is
//!   substituted into a path segment or query component

use percent_encoding::{percent_encode_byte, AsciiSet, NON_ALPHANUMERIC};

/// Expansion set for path segments: unreserved characters pass, everything
/// else (including `/`) is encoded. The decode-slash post-pass restores
/// slashes when the method asks for it.
pub(crate) const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Expansion set for query names and values.
pub(crate) const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters excluded from literal chunks besides ASCII controls:
/// space, quotes, percent (the unescaped form), and reserved delimiters.
const LITERAL_EXCLUDED: &[u8] = b" \"'%<>\\^`{|}";

/// Whether `byte` may appear verbatim in a literal chunk.
pub(crate) fn is_literal_safe(byte: u8) -> bool {
    byte.is_ascii_graphic() && !LITERAL_EXCLUDED.contains(&byte)
}

/// Percent-encodes a bound value with the given expansion set.
pub(crate) fn encode_value(value: &str, set: &'static AsciiSet) -> String {
    percent_encoding::utf8_percent_encode(value, set).to_string()
}

/// Normalizes literal text into the safe character class.
///
/// Existing percent triplets are preserved (they count as pre-encoded);
/// a bare `%` and every other excluded byte are encoded.
pub(crate) fn encode_literal(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' && is_pct_triplet(bytes, i) {
            out.push_str(&text[i..i + 3]);
            i += 3;
        } else if is_literal_safe(b) {
            out.push(b as char);
            i += 1;
        } else {
            out.push_str(percent_encode_byte(b));
            i += 1;
        }
    }
    out
}

/// Decodes `%XX` triplets back into bytes.
///
/// Body templates carry reserved characters (braces in particular)
/// percent-encoded so they are not read as expressions; the expanded body
/// is decoded before it is sent.
pub(crate) fn pct_decode(text: &str) -> String {
    percent_encoding::percent_decode_str(text)
        .decode_utf8_lossy()
        .into_owned()
}

/// Whether `bytes[at..]` starts a valid `%XX` triplet.
fn is_pct_triplet(bytes: &[u8], at: usize) -> bool {
    bytes.len() >= at + 3
        && bytes[at] == b'%'
        && bytes[at + 1].is_ascii_hexdigit()
        && bytes[at + 2].is_ascii_hexdigit()
}
