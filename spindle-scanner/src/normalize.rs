use crate::error::{Result, ScanError};
use url::{Url, form_urlencoded};

/// Canonical deduplication key for an address.
///
/// The scheme, credentials, fragment, a leading `www.` label and trailing
/// path separators are dropped; query parameters are sorted by key.
/// Addresses without a host (`data:`, `mailto:`, ...) come back unchanged.
pub fn normalize_url(address: &str) -> Result<String> {
    let url = Url::parse(address)
        .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", address, e)))?;

    let Some(host) = host_key(&url) else {
        return Ok(address.to_string());
    };

    let mut key = host;
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(url.path().trim_end_matches('/'));

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if !pairs.is_empty() {
        // stable: repeated keys keep their relative order
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        key.push('?');
        key.push_str(&query);
    }

    Ok(key)
}

/// Lower-cased host with any leading `www.` removed.
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?.to_ascii_lowercase();
    Some(match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    })
}
