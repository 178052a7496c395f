//! Url payloads: the three shapes a url representation arrives in, and
//! rewriting a url while keeping its shape.

use ds_core::ports::UrlPayloadPort;
use plist::{Dictionary, Value};

use super::keyed_archive::{self, ArchivedObject};

/// Text at or above this size is never considered a link.
pub const LINK_TEXT_LIMIT: usize = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlEnvelope {
    /// Archived `NSURL`.
    Keyed,
    /// Plain property list array, url first: `[url, title, {}]`.
    PlainList,
    /// Plain property list string.
    PlainString,
    Utf8,
}

fn has_scheme(text: &str) -> bool {
    url::Url::parse(text)
        .map(|u| !u.scheme().is_empty())
        .unwrap_or(false)
}

pub fn decode_url(bytes: &[u8]) -> Option<(String, UrlEnvelope)> {
    if let Some(ArchivedObject::Url(url)) = keyed_archive::decode(bytes) {
        return Some((url, UrlEnvelope::Keyed));
    }
    match keyed_archive::parse_plist(bytes) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_string)
            .find(|s| has_scheme(s))
            .map(|s| (s.to_string(), UrlEnvelope::PlainList)),
        Some(Value::String(s)) if has_scheme(&s) => Some((s, UrlEnvelope::PlainString)),
        Some(_) => None,
        None => {
            let text = std::str::from_utf8(bytes).ok()?.trim();
            has_scheme(text).then(|| (text.to_string(), UrlEnvelope::Utf8))
        }
    }
}

/// Re-encodes `bytes` with `new_url` in place of the old url.
pub fn replace_url(bytes: &[u8], new_url: &str) -> anyhow::Result<Vec<u8>> {
    let envelope = decode_url(bytes).map(|(_, e)| e).unwrap_or(UrlEnvelope::Utf8);
    match envelope {
        UrlEnvelope::Keyed => keyed_archive::encode_url(new_url),
        UrlEnvelope::PlainList => {
            let Some(Value::Array(items)) = keyed_archive::parse_plist(bytes) else {
                anyhow::bail!("url list vanished while rewriting");
            };
            let rewritten: Vec<Value> = items
                .into_iter()
                .map(|item| match item.as_string() {
                    Some(s) if has_scheme(s) => Value::String(new_url.to_string()),
                    _ => item,
                })
                .collect();
            keyed_archive::write_plain_plist(&Value::Array(rewritten))
        }
        UrlEnvelope::PlainString => keyed_archive::write_plain_plist(&Value::String(new_url.to_string())),
        UrlEnvelope::Utf8 => Ok(new_url.as_bytes().to_vec()),
    }
}

/// Plain list payload for a url found in text: `[url, "", {}]`.
pub fn encode_link_list(url: &str) -> anyhow::Result<Vec<u8>> {
    keyed_archive::write_plain_plist(&Value::Array(vec![
        Value::String(url.to_string()),
        Value::String(String::new()),
        Value::Dictionary(Dictionary::new()),
    ]))
}

/// If short text holds nothing but an http(s) url, returns the url payload.
pub fn link_from_text(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.len() >= LINK_TEXT_LIMIT {
        return None;
    }
    let text = match keyed_archive::decode(bytes) {
        Some(ArchivedObject::String(s)) => s,
        Some(_) => return None,
        None => std::str::from_utf8(bytes).ok()?.trim().to_string(),
    };
    if text.starts_with("http://") || text.starts_with("https://") {
        encode_link_list(&text).ok()
    } else {
        None
    }
}

/// [`UrlPayloadPort`] over the envelope helpers above.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlPayloadCodec;

impl UrlPayloadPort for UrlPayloadCodec {
    fn link_from_text(&self, bytes: &[u8]) -> Option<Vec<u8>> {
        link_from_text(bytes)
    }

    fn replace_url(&self, bytes: &[u8], new_url: &str) -> anyhow::Result<Vec<u8>> {
        if decode_url(bytes).is_none() {
            anyhow::bail!("payload does not hold a url");
        }
        replace_url(bytes, new_url)
    }
}
