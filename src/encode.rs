use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything outside of `A-Z a-z 0-9 - . _ ~` (RFC 5849 section 3.6).
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes `input` the way OAuth 1.0a requires.
///
/// This is stricter than form or query encoding: a space becomes `%20`
/// (never `+`) and every reserved character is escaped.
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}
