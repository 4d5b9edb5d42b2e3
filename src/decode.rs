//! Value pipeline applied to every extracted text, markup and attribute:
//! HTML-entity decoding, then percent-unescaping, then trimming

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use quick_xml::escape::resolve_html5_entity;

/// Longest entity name considered before giving up on a `&`
const MAX_ENTITY_LEN: usize = 32;

/// Decode, unescape and trim an extracted value
pub fn decode_value(raw: &str) -> String {
    let decoded = decode_entities(raw);
    let unescaped = percent_decode_str(&decoded).decode_utf8_lossy();
    unescaped.trim().to_string()
}

/// Replace HTML character references; unknown or malformed references stay
/// as written
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        match reference(rest) {
            Some((replacement, consumed)) => {
                out.push_str(&replacement);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Resolve the reference at the start of `input` (which begins with `&`),
/// returning the replacement and the number of bytes consumed
fn reference(input: &str) -> Option<(Cow<'static, str>, usize)> {
    let end = input
        .char_indices()
        .skip(1)
        .take(MAX_ENTITY_LEN)
        .find(|(_, c)| *c == ';' || !(c.is_ascii_alphanumeric() || *c == '#'))
        .filter(|(_, c)| *c == ';')
        .map(|(idx, _)| idx)?;
    let name = &input[1..end];

    let replacement = match name.strip_prefix('#') {
        Some(number) => Cow::Owned(numeric(number)?.to_string()),
        None => Cow::Borrowed(resolve_html5_entity(name)?),
    };
    Some((replacement, end + 1))
}

fn numeric(number: &str) -> Option<char> {
    let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse::<u32>().ok()?,
    };
    match code {
        0 => Some(char::REPLACEMENT_CHARACTER),
        _ => char::from_u32(code),
    }
}
