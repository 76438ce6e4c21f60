//! Reconciles links in HTML content with an object's tags.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::interval::Occupancy;
use crate::object::{Object, get_url};
use crate::text::{MARKDOWN_LINK_RE, content_is_html, unescape_markdown};
use crate::urls::is_web;

/// Converts HTML to plain text, rendering links as `[text](url)`.
pub trait HtmlToText {
    fn html_to_text(&self, html: &str) -> String;
}

static AMMONIA: LazyLock<ammonia::Builder> = LazyLock::new(|| ammonia::Builder::empty());

/// HTML to markdown with htmd. Falls back to stripping tags if htmd fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownConverter;

impl HtmlToText for MarkdownConverter {
    fn html_to_text(&self, html: &str) -> String {
        let text = match htmd::convert(html) {
            Ok(markdown) => markdown,
            Err(error) => {
                warn!(target: "as1", %error, "html to markdown conversion failed, stripping tags");
                AMMONIA.clean(html).to_string()
            }
        };
        text.lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Adds tags for links in HTML content that don't already have one. Content
/// is left as is.
pub fn add_tags_for_html_content_links(
    obj: Object<'_>,
    converter: &impl HtmlToText,
) -> Object<'static> {
    reconcile_html_content(obj, false, converter)
}

/// Converts HTML content to plain text, indexing every link's text as a tag.
pub fn convert_html_content_to_text(
    obj: Object<'_>,
    converter: &impl HtmlToText,
) -> Object<'static> {
    reconcile_html_content(obj, true, converter)
}

/// Walks the links in HTML content, matching each to an existing tag or
/// adding a new `mention`, `hashtag` or `link` tag.
///
/// A link's text matches tags by display name, case insensitively and
/// ignoring a leading `@` or `#`. `@user@server` also matches a tag named
/// `user`. Links that match no name fall back to matching by URL. Relative
/// links and links to posts in `inReplyTo` are dropped from the text without
/// being tagged.
///
/// With `to_plain_text`, `content` becomes the converted text with markdown
/// escapes removed, existing indices are discarded and every matched or added
/// tag gets the span of its link text. Content that isn't HTML is left alone.
pub fn reconcile_html_content(
    obj: Object<'_>,
    to_plain_text: bool,
    converter: &impl HtmlToText,
) -> Object<'static> {
    let mut obj = obj.into_owned();
    if !content_is_html(&obj) {
        return obj;
    }
    let Some(content) = obj.get_str("content") else {
        return obj;
    };
    let text = converter.html_to_text(content);

    let in_reply_to: Vec<String> = obj
        .get_list("inReplyTo")
        .into_iter()
        .map(get_url)
        .filter(|url| !url.is_empty())
        .collect();

    let mut tags: Vec<Value> = obj.get_list("tags").into_iter().cloned().collect();
    let mut changed = false;
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut by_url: HashMap<String, usize> = HashMap::new();
    for (i, tag) in tags.iter_mut().enumerate() {
        let Value::Object(tag) = tag else {
            continue;
        };
        if to_plain_text {
            let had_start = tag.remove("startIndex").is_some();
            let had_length = tag.remove("length").is_some();
            changed |= had_start || had_length;
        }
        if let Some(name) = tag.get("displayName").and_then(Value::as_str) {
            let name = normalize_name(name);
            if let Some((user, _)) = name.split_once('@') {
                by_name.entry(user.to_string()).or_insert(i);
            }
            by_name.entry(name).or_insert(i);
        }
        if let Some(url) = tag.get("url").and_then(Value::as_str) {
            by_url.entry(url.to_string()).or_insert(i);
        }
    }

    let mut occupied = Occupancy::new();
    let mut plain = String::with_capacity(text.len());
    let mut plain_chars = 0;
    let mut pos = 0;
    while let Some(link) = next_link(&text, pos) {
        let before = unescape_markdown(&text[pos..link.range.start]);
        plain_chars += before.chars().count();
        plain.push_str(&before);
        let start = plain_chars;
        plain_chars += link.text.chars().count();
        plain.push_str(&link.text);
        pos = link.range.end;

        if !is_web(&link.url) || in_reply_to.contains(&link.url) {
            continue;
        }
        let span = start..plain_chars;

        let kind = link_kind(&link.text);
        let name = normalize_name(&link.text);
        let matched = by_name
            .get(&name)
            .or_else(|| {
                name.split_once('@')
                    .and_then(|(user, _)| by_name.get(user))
            })
            .or_else(|| by_url.get(&link.url));

        match matched.copied() {
            Some(i) => {
                if let Some(Value::Object(tag)) = tags.get_mut(i) {
                    if to_plain_text
                        && !tag.contains_key("startIndex")
                        && occupied.claim(span.clone())
                    {
                        place(tag, &span);
                        changed = true;
                    }
                }
            }
            None => {
                debug!(target: "as1", kind, text = %link.text, url = %link.url, "adding tag for link");
                let mut tag = Map::new();
                tag.insert("objectType".into(), json!(kind));
                tag.insert("displayName".into(), json!(link.text));
                tag.insert("url".into(), json!(link.url));
                if to_plain_text && occupied.claim(span.clone()) {
                    place(&mut tag, &span);
                }
                by_name.entry(name).or_insert(tags.len());
                by_url.entry(link.url).or_insert(tags.len());
                tags.push(Value::Object(tag));
                changed = true;
            }
        }
    }
    plain.push_str(&unescape_markdown(&text[pos..]));

    if changed {
        obj.set("tags", Value::Array(tags));
    }
    if to_plain_text {
        obj.set("content", json!(plain));
        obj.set("content_is_html", json!(false));
    }
    obj
}

struct MarkdownLink {
    /// Byte range of the whole `[text](url)`
    range: Range<usize>,
    text: String,
    url: String,
}

fn next_link(text: &str, pos: usize) -> Option<MarkdownLink> {
    let caps = MARKDOWN_LINK_RE.captures_at(text, pos)?;
    Some(MarkdownLink {
        range: caps.get(0)?.range(),
        text: unescape_markdown(caps.name("text")?.as_str()),
        url: caps
            .name("url")?
            .as_str()
            .replace(r"\(", "(")
            .replace(r"\)", ")"),
    })
}

fn link_kind(text: &str) -> &'static str {
    let bare = !text.chars().any(char::is_whitespace);
    if bare && text.starts_with('@') {
        "mention"
    } else if bare && text.starts_with('#') {
        "hashtag"
    } else {
        "link"
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().trim_start_matches(['@', '#']).to_lowercase()
}

fn place(tag: &mut Map<String, Value>, span: &Range<usize>) {
    tag.insert("startIndex".into(), span.start.into());
    tag.insert("length".into(), span.len().into());
}
