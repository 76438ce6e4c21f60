//! Original post discovery.
//!
//! A variation on <http://indiewebcamp.com/original-post-discovery> that
//! finds every candidate link in a post instead of one, and splits them into
//! links to the author's own sites (original posts) and everything else
//! (mentions).

use std::future::Future;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::object::Object;
use crate::text::{extract_links, permashortcitations};
use crate::urls::{
    clean_url, dedupe_urls, domain_from_link, domain_or_parent_in, is_reserved_host, is_web,
};

#[derive(Clone, Debug)]
pub struct DiscoveryOptions {
    /// Domains that count as the author's own. Empty means every domain.
    pub domains: Vec<String>,
    /// Whether to report links that redirect as well as where they end up.
    pub include_redirect_sources: bool,
    /// Whether to keep dotless hosts and reserved or local TLDs.
    pub include_reserved_hosts: bool,
    /// Resolve redirects for at most this many candidates.
    pub max_redirect_fetches: Option<usize>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            domains: vec![],
            include_redirect_sources: true,
            include_reserved_hosts: true,
            max_redirect_fetches: None,
        }
    }
}

/// Where a URL ends up after following redirects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub url: String,
    pub content_type: Option<String>,
}

pub trait FollowRedirects {
    fn follow_redirects(&self, url: &str) -> impl Future<Output = Result<Resolved>> + Send;
}

/// Never fetches; every URL resolves to itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRedirects;

impl FollowRedirects for NoRedirects {
    async fn follow_redirects(&self, url: &str) -> Result<Resolved> {
        Ok(Resolved {
            url: url.to_string(),
            content_type: None,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub originals: Vec<String>,
    pub mentions: Vec<String>,
}

/// Finds original post links and mentions in an activity or object.
///
/// Candidates come from link-like attachments and tags, links and
/// permashortcitations in the content, `upstreamDuplicates` and
/// `targetUrl`. Ellipsized URLs are assumed truncated and dropped.
///
/// Candidates that redirect to an HTML page are replaced by their final URL,
/// which decides whether they are originals or mentions. Fetch failures count
/// as no redirect.
pub async fn original_post_discovery(
    activity: &Object<'_>,
    options: &DiscoveryOptions,
    resolver: &impl FollowRedirects,
) -> Discovery {
    let inner = activity.get_object("object");
    let obj = if inner.is_empty() {
        activity.reborrow()
    } else {
        inner
    };
    let content = obj.get_str("content").unwrap_or_default().trim();

    let linked = obj
        .get_objects("attachments")
        .into_iter()
        .chain(obj.get_objects("tags"))
        .filter(|tag| {
            matches!(
                tag.get_str("objectType"),
                None | Some("article" | "link" | "mention" | "note")
            )
        })
        .map(|tag| tag.url())
        .collect::<Vec<_>>();
    let listed = ["upstreamDuplicates", "targetUrl"]
        .into_iter()
        .flat_map(|field| obj.get_list(field))
        .filter_map(|url| url.as_str())
        .map(str::to_owned)
        .collect::<Vec<_>>();

    let mut candidates = dedupe_urls(
        linked
            .into_iter()
            .chain(extract_links(content))
            .chain(listed)
            .chain(permashortcitations(content))
            .filter(|url| is_web(url) && !url.ends_with("...") && !url.ends_with('…'))
            .filter_map(|url| clean_url(&url)),
    );

    // final URL -> the candidate that redirected to it
    let mut redirects: Vec<(String, String)> = vec![];
    let limit = match options.max_redirect_fetches {
        Some(max) if max > 0 && candidates.len() > max => {
            warn!(
                target: "as1",
                found = candidates.len(),
                max,
                "too many original post candidates, only resolving redirects for the first few"
            );
            max
        }
        Some(max) => max,
        None => candidates.len(),
    };
    for url in candidates.iter().take(limit) {
        match resolver.follow_redirects(url).await {
            Ok(resolved) => {
                let is_html = resolved
                    .content_type
                    .as_deref()
                    .is_some_and(|ty| ty.starts_with("text/html"));
                let Some(final_url) = clean_url(&resolved.url) else {
                    continue;
                };
                if is_html && final_url != *url {
                    debug!(target: "as1", %url, %final_url, "followed redirect");
                    redirects.push((final_url, url.clone()));
                }
            }
            Err(error) => {
                debug!(target: "as1", %url, %error, "couldn't follow redirects");
            }
        }
    }
    candidates.extend(redirects.iter().map(|(final_url, _)| final_url.clone()));

    let mut discovery = Discovery::default();
    for url in dedupe_urls(&candidates) {
        if redirects.iter().any(|(_, source)| *source == url) {
            // handled with its final URL, once we know the final domain
            continue;
        }
        let Some(domain) = domain_from_link(&url) else {
            continue;
        };
        if !options.include_reserved_hosts && is_reserved_host(&domain) {
            continue;
        }

        let which = if options.domains.is_empty() || domain_or_parent_in(&domain, &options.domains)
        {
            &mut discovery.originals
        } else {
            &mut discovery.mentions
        };
        let sources = redirects
            .iter()
            .filter(|(final_url, _)| *final_url == url)
            .map(|(_, source)| source.clone())
            .filter(|_| options.include_redirect_sources);
        for found in std::iter::once(url.clone()).chain(sources) {
            if !which.contains(&found) {
                which.push(found);
            }
        }
    }

    info!(
        target: "as1",
        originals = ?discovery.originals,
        mentions = ?discovery.mentions,
        "original post discovery"
    );
    discovery
}
