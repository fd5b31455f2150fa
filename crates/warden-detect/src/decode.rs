//! # Payload Decoders
//!
//! Attackers routinely wrap an injection payload in one or more text
//! encodings so that a plain pattern sweep never sees the dangerous
//! string. This module recovers those hidden renderings so the scanner
//! can sweep each of them with the same rule set it applies to the
//! original message.
//!
//! ## Supported encodings
//!
//! | Kind | Trigger | Recovery |
//! |------|---------|----------|
//! | `base64` | runs of 30+ base64 alphabet chars | decode, keep only printable ASCII |
//! | `url` | 3+ consecutive `%HH` groups | percent-decode the run |
//! | `hex` | `\xHH` escapes anywhere | decode escapes over the whole message |
//! | `unicode` | `\uHHHH` escapes anywhere | decode escapes over the whole message |
//! | `invisible` | zero-width characters | strip them |
//!
//! HTML numeric entities have a standalone decoder but are not part of
//! the automatic sweep; callers that ingest HTML-adjacent text can apply
//! it explicitly.
//!
//! Every decoder is total: a malformed payload yields `None`, never a
//! panic, and the corresponding view is simply skipped.

use std::fmt;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The encoding a scanning view was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeKind {
    /// Base64 payload embedded in the message.
    Base64,
    /// Percent-encoded (`%HH`) run.
    Url,
    /// `\xHH` escape sequences.
    Hex,
    /// `\uHHHH` escape sequences.
    Unicode,
    /// Zero-width characters were stripped.
    Invisible,
    /// Confusable/full-width folding produced a new view.
    UnicodeNormalized,
}

impl DecodeKind {
    /// Stable lowercase name used in match traces and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeKind::Base64 => "base64",
            DecodeKind::Url => "url",
            DecodeKind::Hex => "hex",
            DecodeKind::Unicode => "unicode",
            DecodeKind::Invisible => "invisible",
            DecodeKind::UnicodeNormalized => "unicode_normalized",
        }
    }
}

impl fmt::Display for DecodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded rendering of (part of) a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedView {
    /// Which decoder produced this view.
    pub kind: DecodeKind,
    /// The decoded text.
    pub text: String,
}

static BASE64_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9+/]{30,}={0,2}").unwrap());
static URL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:%[0-9A-Fa-f]{2}){3,}").unwrap());
static PERCENT_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([0-9A-Fa-f]{2})").unwrap());
static HEX_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\x([0-9A-Fa-f]{2})").unwrap());
static UNICODE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u([0-9A-Fa-f]{4})").unwrap());
static HTML_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9A-Fa-f]{1,6}|[0-9]{1,7});").unwrap());

/// Characters that render as nothing and are used to split keywords.
fn is_zero_width(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' // zero width space
        | '\u{200C}' // zero width non-joiner
        | '\u{200D}' // zero width joiner
        | '\u{2060}' // word joiner
        | '\u{FEFF}' // BOM / zero width no-break space
    )
}

/// Decode a base64 candidate, keeping only payloads that decode to
/// printable ASCII or whitespace. Binary payloads are of no use to the
/// pattern sweep and are dropped.
pub fn decode_base64(candidate: &str) -> Option<String> {
    let bytes = BASE64.decode(candidate).ok()?;
    if bytes.is_empty()
        || !bytes
            .iter()
            .all(|b| b.is_ascii_graphic() || b.is_ascii_whitespace())
    {
        return None;
    }
    String::from_utf8(bytes).ok()
}

/// Percent-decode a `%HH` run. Returns `None` when the decoded bytes are
/// not valid UTF-8.
pub fn decode_url(run: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(run.len() / 3);
    for cap in PERCENT_GROUP.captures_iter(run) {
        let value = u8::from_str_radix(&cap[1], 16).ok()?;
        bytes.push(value);
    }
    if bytes.is_empty() {
        return None;
    }
    String::from_utf8(bytes).ok()
}

/// Replace `\xHH` escapes with the characters they denote.
///
/// Follows the ECMAScript reading of `\xHH`: the two hex digits name a
/// code point, not a raw byte.
pub fn decode_hex_escapes(text: &str) -> Option<String> {
    if !text.contains("\\x") {
        return None;
    }
    let replaced = HEX_ESCAPE.replace_all(text, |caps: &regex::Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });
    Some(replaced.into_owned())
}

/// Replace `\uHHHH` escapes with the characters they denote. Escapes
/// naming surrogate code points are left untouched.
pub fn decode_unicode_escapes(text: &str) -> Option<String> {
    if !text.contains("\\u") {
        return None;
    }
    let replaced = UNICODE_ESCAPE.replace_all(text, |caps: &regex::Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });
    Some(replaced.into_owned())
}

/// Decode HTML decimal (`&#105;`) and hex (`&#x69;`) entities.
pub fn decode_html_entities(text: &str) -> Option<String> {
    if !text.contains("&#") {
        return None;
    }
    let replaced = HTML_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let body = &caps[1];
        let value = if let Some(hex) = body.strip_prefix('x') {
            u32::from_str_radix(hex, 16).ok()
        } else {
            body.parse::<u32>().ok()
        };
        value
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });
    Some(replaced.into_owned())
}

/// Remove zero-width characters. Returns `None` when the message
/// contains none, so callers can skip the redundant view.
pub fn strip_invisible(text: &str) -> Option<String> {
    if !text.chars().any(is_zero_width) {
        return None;
    }
    Some(text.chars().filter(|c| !is_zero_width(*c)).collect())
}

/// Produce every decoded view of a message worth rescanning.
///
/// A single message can yield several views: each embedded base64 run
/// and each percent-encoded run decodes separately, escape decoding
/// applies to the whole message, and zero-width stripping yields one
/// more view when anything was removed.
pub fn decode_all(message: &str) -> Vec<DecodedView> {
    let mut views = Vec::new();

    for candidate in BASE64_RUN.find_iter(message) {
        if let Some(text) = decode_base64(candidate.as_str()) {
            views.push(DecodedView {
                kind: DecodeKind::Base64,
                text,
            });
        }
    }

    for run in URL_RUN.find_iter(message) {
        if let Some(text) = decode_url(run.as_str()) {
            if text != run.as_str() {
                views.push(DecodedView {
                    kind: DecodeKind::Url,
                    text,
                });
            }
        }
    }

    if let Some(text) = decode_hex_escapes(message) {
        if text != message {
            views.push(DecodedView {
                kind: DecodeKind::Hex,
                text,
            });
        }
    }

    if let Some(text) = decode_unicode_escapes(message) {
        if text != message {
            views.push(DecodedView {
                kind: DecodeKind::Unicode,
                text,
            });
        }
    }

    if let Some(text) = strip_invisible(message) {
        views.push(DecodedView {
            kind: DecodeKind::Invisible,
            text,
        });
    }

    views
}
