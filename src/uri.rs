//! URI helpers shared by the extractors.

use url::Url;

/// Host with a leading `www.` or `m.` removed.
pub fn parsed_host(url: &Url) -> Option<&str> {
    let host = url.host_str()?;
    Some(
        host.strip_prefix("www.")
            .or_else(|| host.strip_prefix("m."))
            .unwrap_or(host),
    )
}

/// Returns `true` if the (parsed) host equals any of `hosts`, ignoring case.
pub fn matches_hosts<S: AsRef<str>>(url: &Url, hosts: &[S]) -> bool {
    parsed_host(url).is_some_and(|host| hosts.iter().any(|h| h.as_ref().eq_ignore_ascii_case(host)))
}

/// Value of the first query parameter named `key`.
pub fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Extract an id that follows one of the given path prefixes.
///
/// Every prefix must end with `/`; a `*` segment matches anything. When
/// several prefixes share a start, list the longest first.
///
/// ```
/// use tuber::uri::id_from_paths;
/// let url = url::Url::parse("https://example.org/videos/watch/abc123").unwrap();
/// assert_eq!(id_from_paths(&url, &["/videos/watch/", "/w/"]).as_deref(), Some("abc123"));
/// ```
pub fn id_from_paths(url: &Url, prefixes: &[&str]) -> Option<String> {
    let path_parts: Vec<&str> = url.path().split('/').collect();

    prefixes.iter().find_map(|prefix| {
        let search_parts: Vec<&str> = prefix.split('/').collect();

        for (i, (path, search)) in path_parts.iter().zip(&search_parts).enumerate() {
            if *search == "*" || path == search {
                continue;
            }
            let is_id_slot = i + 1 == search_parts.len();
            return (is_id_slot && !path.is_empty()).then(|| (*path).to_string());
        }
        None
    })
}

/// `scheme://host[:port]/` of the URL.
pub fn source(url: &Url) -> Option<Url> {
    url.join("/").ok()
}

/// Move `uri` onto the scheme, host and port of `source`, keeping its path,
/// query and fragment.
pub fn replace_source(uri: &str, source: &Url) -> Option<String> {
    let mut moved = Url::parse(uri).ok()?;
    moved.set_scheme(source.scheme()).ok()?;
    moved.set_host(source.host_str()).ok()?;
    moved.set_port(source.port()).ok()?;
    Some(moved.to_string())
}

/// Registrable-looking domain: the last two labels of `host`.
pub fn domain(host: &str) -> &str {
    let mut dots = host.rmatch_indices('.');
    match (dots.next(), dots.next()) {
        (Some(_), Some((idx, _))) => &host[idx + 1..],
        _ => host,
    }
}

/// Final non-empty path segment, percent-decoded.
pub fn file_name(url: &Url) -> Option<String> {
    let last = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    Some(
        urlencoding::decode(last)
            .map(std::borrow::Cow::into_owned)
            .unwrap_or_else(|_| last.to_string()),
    )
}
