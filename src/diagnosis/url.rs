// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use reqwest::Url;

/// Returns `url` with `key` set to `value`, replacing any previous value and
/// keeping every other parameter.
pub fn with_query_arg(url: &Url, key: &str, value: &str) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut next = url.clone();
    next.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair(key, value);
    next
}

/// Returns `url` without any `key` parameter.
pub fn without_query_arg(url: &Url, key: &str) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut next = url.clone();
    if pairs.is_empty() {
        next.set_query(None);
    } else {
        next.query_pairs_mut().clear().extend_pairs(pairs);
    }
    next
}

/// The URL the client used, rebuilt from what the request carries.
pub fn current_url(https: bool, host: &str, path_and_query: &str) -> Option<Url> {
    let scheme = if https { "https" } else { "http" };
    Url::parse(&format!("{}://{}{}", scheme, host, path_and_query)).ok()
}
