//! Indexes tags into plain text content.
//!
//! Tags get `startIndex` and `length`, in chars, pointing at the span of
//! `content` they refer to. Spans never overlap. Earlier tags claim first,
//! and `@handle`s that no tag claims become new mention tags.

use std::ops::Range;

use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::interval::Occupancy;
use crate::object::{Object, get_url};
use crate::text::{MENTION_RE, char_span, content_is_html};

/// Adds indices to the tags in a plain text object, and mention tags for
/// untagged `@handle`s. Posts and updates are indexed on their inner object.
///
/// HTML content, or no content, is left alone. Running this twice gives the
/// same result as running it once.
pub fn expand_tags(obj: Object<'_>) -> Object<'static> {
    let obj = obj.into_owned();
    if matches!(obj.verb(), Some("post" | "update")) {
        if let Some(Value::Object(inner)) = obj.get("object").cloned() {
            let inner = index_tags(Object::from(inner));
            return obj.replace("object", inner.into());
        }
    }
    index_tags(obj)
}

fn index_tags(mut obj: Object<'static>) -> Object<'static> {
    let Some(content) = obj.get_str("content").map(str::to_owned) else {
        return obj;
    };
    if content_is_html(&obj) {
        return obj;
    }

    let mut tags: Vec<Value> = obj.get_list("tags").into_iter().cloned().collect();
    let mut changed = false;

    let mut occupied = Occupancy::new();
    for span in tags.iter().filter_map(indexed_span) {
        occupied.insert(span);
    }

    for tag in tags.iter_mut() {
        if indexed_span(tag).is_some() {
            continue;
        }
        let url = get_url(tag);
        let Value::Object(tag) = tag else {
            continue;
        };
        let ty = tag
            .get("objectType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let span = if ty == "article" || ty == "link" {
            if url.is_empty() {
                continue;
            }
            find_literal(&content, &url, &mut occupied)
        } else {
            let Some(name) = tag
                .get("displayName")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
            else {
                continue;
            };
            if ty.is_empty() {
                tag.insert("objectType".into(), json!("hashtag"));
                changed = true;
            }
            find_name(&content, &name, ty == "mention", &mut occupied)
        };

        match span {
            Some(span) => {
                debug!(target: "as1", ?span, tag = ?tag.get("displayName").or(tag.get("url")), "indexed tag");
                place(tag, span);
                changed = true;
            }
            None => {
                debug!(target: "as1", tag = ?tag.get("displayName").or(tag.get("url")), "tag not found in content");
            }
        }
    }

    for caps in MENTION_RE.captures_iter(&content) {
        let Some(mention) = caps.name("mention") else {
            continue;
        };
        let span = char_span(&content, mention.range());
        if occupied.claim(span.clone()) {
            debug!(target: "as1", ?span, handle = mention.as_str(), "added mention tag");
            tags.push(json!({
                "objectType": "mention",
                "displayName": mention.as_str(),
                "startIndex": span.start,
                "length": span.len(),
            }));
            changed = true;
        }
    }

    if changed {
        obj.set("tags", Value::Array(tags));
    }
    obj
}

/// The span of a tag that already has integer indices.
fn indexed_span(tag: &Value) -> Option<Range<usize>> {
    let start = usize::try_from(tag.get("startIndex")?.as_u64()?).ok()?;
    let length = usize::try_from(tag.get("length")?.as_u64()?).ok()?;
    Some(start..start.checked_add(length)?)
}

fn place(tag: &mut Map<String, Value>, span: Range<usize>) {
    tag.insert("startIndex".into(), span.start.into());
    tag.insert("length".into(), span.len().into());
}

fn find_literal(content: &str, needle: &str, occupied: &mut Occupancy) -> Option<Range<usize>> {
    content
        .match_indices(needle)
        .map(|(at, found)| char_span(content, at..at + found.len()))
        .find(|span| occupied.claim(span.clone()))
}

/// Finds a tag's display name in `content`, ignoring case and a leading `@`
/// or `#`. Mentions may match with a trailing `@server`, and a mention of
/// `user@server` falls back to just `user`.
fn find_name(
    content: &str,
    name: &str,
    mention: bool,
    occupied: &mut Occupancy,
) -> Option<Range<usize>> {
    let name = name.trim_start_matches(['@', '#']);
    if name.is_empty() {
        return None;
    }
    let found = search(content, name, mention, occupied);
    if found.is_some() || !mention {
        return found;
    }
    match name.split_once('@') {
        Some((user, _)) if !user.is_empty() => search(content, user, mention, occupied),
        _ => None,
    }
}

fn search(
    content: &str,
    name: &str,
    mention: bool,
    occupied: &mut Occupancy,
) -> Option<Range<usize>> {
    let server = if mention {
        r"(?:@[\w-]+(?:\.[\w-]+)+)?"
    } else {
        ""
    };
    let pattern = Regex::new(&format!("(?i)[@#]?{}{server}", regex::escape(name))).ok()?;
    pattern
        .find_iter(content)
        .filter(|found| at_word_boundary(content, found.range()))
        .map(|found| char_span(content, found.range()))
        .find(|span| occupied.claim(span.clone()))
}

fn at_word_boundary(content: &str, bytes: Range<usize>) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let before = content[..bytes.start].chars().next_back();
    let after = content[bytes.end..].chars().next();
    before.is_none_or(|c| !is_word(c) && c != '@' && c != '#') && after.is_none_or(|c| !is_word(c))
}
