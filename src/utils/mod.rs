//! Small shared helpers: URL resolution and frame timing.

pub mod time;

pub use time::{FpsCounter, Timer};

/// Resolves a (possibly relative) variant URI against the URL of the asset
/// it was declared in.
///
/// Rules, in order:
/// - explicitly `./`-relative URIs are returned untouched (the host decides
///   what they are relative to),
/// - absolute `http(s)` URIs are returned untouched,
/// - otherwise the URI is appended to the directory part of `source`,
///   collapsing any doubled slash at the join point.
#[must_use]
pub fn resolve_url(source: Option<&str>, uri: &str) -> String {
    if uri.starts_with("./") {
        return uri.to_string();
    }
    if uri.starts_with("http") {
        return uri.to_string();
    }
    let Some(source) = source else {
        return uri.to_string();
    };
    match source.rfind('/') {
        Some(path_index) => {
            let base_path = &source[..=path_index];
            let mut uri = uri;
            while base_path.ends_with('/') && uri.starts_with('/') {
                uri = &uri[1..];
            }
            format!("{base_path}{uri}")
        }
        None => uri.to_string(),
    }
}

/// Appends a content hash as a cache-busting query parameter.
#[must_use]
pub fn append_content_hash(url: &str, hash: Option<&str>) -> String {
    match hash {
        Some(hash) if !hash.is_empty() => format!("{url}?v={hash}"),
        _ => url.to_string(),
    }
}
