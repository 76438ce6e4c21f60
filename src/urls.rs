//! URL cleaning, de-duplication, domains and tag URIs.

use std::sync::LazyLock;

use regex::Regex;
use url::{ParseError, Url};

/// TLDs that never resolve on the public internet (RFC 2606, RFC 7686).
pub const RESERVED_TLDS: [&str; 5] = ["example", "invalid", "localhost", "onion", "test"];

/// TLDs conventionally used for private networks.
pub const LOCAL_TLDS: [&str; 8] = [
    "local",
    "lan",
    "home",
    "internal",
    "corp",
    "localdomain",
    "intranet",
    "private",
];

static TAG_URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tag:([^,:]+)(?:,[^:]*)?:(.+)$").expect("tag URI regex is valid"));

/// Whether `url` is an absolute http or https URL.
pub fn is_web(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Parses and normalizes a URL, dropping `utm_*` query parameters.
///
/// Returns `None` if the URL doesn't parse.
pub fn clean_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    if parsed.query().is_some() {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| !key.starts_with("utm_"))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if kept.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(kept);
        }
    }
    Some(parsed.into())
}

/// Normalizes and de-duplicates URLs, preserving order.
///
/// Host names are lower-cased and bare hosts get a trailing slash. http and
/// https variants of the same URL collapse into the https one, in the
/// position of whichever came first. Blank strings are dropped.
pub fn dedupe_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    dedupe_by_url(
        urls.into_iter()
            .map(|url| normalize(url.as_ref()))
            .filter(|url| !url.is_empty()),
        |url| url.clone(),
    )
}

/// De-duplicates arbitrary items by the URL `url_of` returns for them, with
/// the same http/https handling as [`dedupe_urls`].
pub(crate) fn dedupe_by_url<T>(
    items: impl IntoIterator<Item = T>,
    url_of: impl Fn(&T) -> String,
) -> Vec<T> {
    let mut deduped: Vec<(String, T)> = vec![];
    for item in items {
        let url = normalize(&url_of(&item));
        let key = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(&url)
            .to_string();
        match deduped.iter_mut().find(|(seen, _)| *seen == key) {
            Some(slot)
                if url.starts_with("https://") && !url_of(&slot.1).starts_with("https://") =>
            {
                slot.1 = item;
            }
            Some(_) => {}
            None => deduped.push((key, item)),
        }
    }
    deduped.into_iter().map(|(_, item)| item).collect()
}

fn normalize(url: &str) -> String {
    let url = url.trim();
    if !is_web(url) {
        return url.to_string();
    }
    match Url::parse(url) {
        Ok(parsed) => parsed.into(),
        Err(_) => url.to_string(),
    }
}

/// The lower-cased host of a link, without a leading `www.`.
///
/// Links without a scheme are treated as http.
pub fn domain_from_link(link: &str) -> Option<String> {
    let link = link.trim();
    let parsed = match Url::parse(link) {
        Ok(parsed) => parsed,
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{link}")).ok()?,
        Err(_) => return None,
    };
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    Some(host.to_string()).filter(|host| !host.is_empty())
}

/// Whether `domain` is one of `domains` or a subdomain of one of them.
pub fn domain_or_parent_in<S: AsRef<str>>(domain: &str, domains: &[S]) -> bool {
    domains.iter().any(|parent| {
        let parent = parent.as_ref();
        domain == parent
            || domain
                .strip_suffix(parent)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Dotless hosts and hosts on reserved or local TLDs.
pub fn is_reserved_host(domain: &str) -> bool {
    match domain.rsplit_once('.') {
        None => true,
        Some((_, tld)) => RESERVED_TLDS.contains(&tld) || LOCAL_TLDS.contains(&tld),
    }
}

/// Splits `tag:DOMAIN[,DATE]:NAME` into `(DOMAIN, NAME)`.
pub fn parse_tag_uri(uri: &str) -> Option<(&str, &str)> {
    let caps = TAG_URI_RE.captures(uri)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

pub fn tag_uri(domain: &str, name: &str) -> String {
    format!("tag:{domain}:{name}")
}
