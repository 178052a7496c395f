use anyhow::Result;

/// Encodes and rewrites url payloads without changing their envelope.
pub trait UrlPayloadPort: Send + Sync {
    /// Short text whose content is an http(s) link, re-encoded as a url
    /// payload. `None` when the text is not a link.
    fn link_from_text(&self, bytes: &[u8]) -> Option<Vec<u8>>;

    /// Swaps the url inside `bytes`, keeping the envelope it came in
    /// (keyed archive, plain property list or utf-8).
    fn replace_url(&self, bytes: &[u8], new_url: &str) -> Result<Vec<u8>>;
}
