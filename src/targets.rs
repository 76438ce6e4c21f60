//! What an activity points at: replies, shares, reactions, quotes and tags.

use std::iter;

use serde_json::Value;
use tracing::warn;

use crate::object::{CRUD_VERBS, Object, get_url};
use crate::rsvp::RSVP_VERB_TO_COLLECTION;
use crate::urls::dedupe_urls;

/// Verbs whose `object` is the thing acted upon, besides the RSVP verbs.
pub const VERBS_WITH_OBJECT: [&str; 10] = [
    "accept",
    "block",
    "flag",
    "follow",
    "like",
    "react",
    "reject",
    "share",
    "stop-following",
    "undo",
];

pub fn has_object_target(verb: &str) -> bool {
    VERBS_WITH_OBJECT.contains(&verb) || RSVP_VERB_TO_COLLECTION.iter().any(|(v, _)| *v == verb)
}

/// Ids and URLs an activity or object targets, de-duplicated.
///
/// Covers the activity and its inner objects: posts replied to, tagged actors
/// and objects, quoted posts, and for verbs like `like` or `share` the object
/// acted upon.
pub fn targets(obj: &Object<'_>) -> Vec<String> {
    if obj.is_empty() {
        return vec![];
    }

    let mut targets = vec![];
    for o in iter::once(obj.reborrow()).chain(obj.get_objects("object")) {
        targets.extend(o.get_ids("inReplyTo"));
        targets.extend(o.get_ids("tags"));
        targets.extend(field_urls(&o, "tags"));
        targets.extend(quoted_posts(&o));

        let Some(verb) = o.verb().filter(|verb| has_object_target(verb)) else {
            continue;
        };
        let mut object_targets: Vec<String> = o.get_ids("object").into_iter().collect();
        if object_targets.is_empty() {
            object_targets = field_urls(&o, "object");
        }
        if object_targets.is_empty() {
            warn!(target: "as1", verb, "missing target id or URL");
        }
        targets.extend(object_targets);
    }
    dedupe_urls(targets)
}

fn field_urls(obj: &Object<'_>, field: &str) -> Vec<String> {
    obj.get_list(field)
        .into_iter()
        .map(get_url)
        .filter(|url| !url.is_empty())
        .collect()
}

/// The activity itself, or its inner object for CRUD verbs.
fn unwrap_crud<'o>(obj: &'o Object<'_>) -> Object<'o> {
    match obj.verb() {
        Some(verb) if CRUD_VERBS.contains(&verb) => obj.get_object("object"),
        _ => obj.reborrow(),
    }
}

/// Ids of posts quoted by an object, ie its `note` attachments.
pub fn quoted_posts(obj: &Object<'_>) -> Vec<String> {
    let obj = unwrap_crud(obj);
    obj.get_objects("attachments")
        .into_iter()
        .filter(|attachment| attachment.get_str("objectType") == Some("note"))
        .filter_map(|attachment| attachment.id().filter(|id| !id.is_empty()).map(str::to_owned))
        .collect()
}

/// URLs of an object's `mention` tags.
pub fn mentions(obj: &Object<'_>) -> Vec<String> {
    let obj = unwrap_crud(obj);
    obj.get_objects("tags")
        .into_iter()
        .filter(|tag| tag.get_str("objectType") == Some("mention"))
        .filter_map(|tag| match tag.get("url") {
            Some(Value::String(url)) if !url.is_empty() => Some(url.clone()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{mentions, quoted_posts, targets};
    use crate::object::Object;

    fn obj(value: Value) -> Object<'static> {
        Object::try_from(value).unwrap()
    }

    #[test]
    fn no_targets() {
        for value in [
            Value::Null,
            json!({}),
            json!({"id": "a"}),
            json!({"object": "a"}),
            json!({"object": {"id": "a"}}),
            json!({"objectType": "note", "id": "a"}),
            json!({"verb": "post", "id": "a", "object": "b"}),
            json!({"verb": "post", "id": "a", "object": {"id": "b"}}),
            json!({"verb": "update", "id": "a", "object": "b"}),
            json!({"verb": "delete", "id": "a", "object": "b"}),
            json!({"verb": "like", "id": "a"}),
        ] {
            assert!(targets(&obj(value.clone())).is_empty(), "{value}");
        }
    }

    #[test]
    fn collects_targets() {
        for (expected, value) in [
            (vec!["x"], json!({"verb": "like", "id": "a", "object": "x"})),
            (vec!["x"], json!({"verb": "react", "id": "a", "object": "x"})),
            (vec!["x"], json!({"verb": "react", "id": "a", "object": {"id": "x"}})),
            (vec!["x"], json!({"verb": "react", "id": "a", "object": {"url": "x"}})),
            (vec!["x"], json!({"verb": "rsvp-yes", "object": "x"})),
            (vec!["x"], json!({"id": "a", "inReplyTo": "x"})),
            (vec!["x"], json!({"id": "a", "inReplyTo": {"id": "x"}})),
            (vec!["x"], json!({"id": "a", "inReplyTo": {"url": "x"}})),
            (
                vec!["x"],
                json!({"verb": "post", "id": "a", "object": {"id": "b", "inReplyTo": "x"}}),
            ),
            (
                vec!["x"],
                json!({"verb": "update", "id": "a", "object": {"id": "b", "inReplyTo": "x"}}),
            ),
            (
                vec!["x"],
                json!({"verb": "delete", "id": "a", "object": {"id": "b", "inReplyTo": "x"}}),
            ),
            (vec!["x"], json!({"attachments": [{"objectType": "note", "id": "x"}]})),
            (
                vec!["x"],
                json!({
                    "verb": "post",
                    "id": "a",
                    "object": {"attachments": [{"objectType": "note", "id": "x"}]},
                }),
            ),
            (vec!["x"], json!({"verb": "share", "id": "a", "object": "x"})),
            (
                vec!["x", "y"],
                json!({"verb": "share", "id": "a", "object": {"id": "y", "inReplyTo": "x"}}),
            ),
            (vec!["x", "y"], json!({"tags": ["x", "y"]})),
            (vec!["x", "y"], json!({"tags": [{"id": "x"}, {"url": "y"}]})),
            (vec!["x"], json!({"tags": [{"url": "x", "objectType": "mention"}]})),
        ] {
            let mut actual = targets(&obj(value.clone()));
            actual.sort();
            assert_eq!(expected, actual, "{value}");
        }
    }

    #[test]
    fn quoted_note_attachments() {
        for value in [
            json!({}),
            json!({"attachments": [{"objectType": "note"}]}),
            json!({"attachments": [{"objectType": "image", "id": "x"}]}),
        ] {
            assert!(quoted_posts(&obj(value)).is_empty());
        }

        for value in [
            json!({"attachments": [{"objectType": "note", "id": "x"}]}),
            json!({"verb": "post", "object": {"attachments": [{"objectType": "note", "id": "x"}]}}),
        ] {
            assert_eq!(vec!["x"], quoted_posts(&obj(value)));
        }

        let quoting = obj(json!({"attachments": [
            {"objectType": "note", "id": "x"},
            {"objectType": "article", "id": "y"},
            {"objectType": "note", "id": "z"},
        ]}));
        assert_eq!(vec!["x", "z"], quoted_posts(&quoting));
    }

    #[test]
    fn mention_tag_urls() {
        for value in [
            json!({}),
            json!({"tags": [{"objectType": "mention"}]}),
            json!({"tags": [{"objectType": "image", "url": "x"}]}),
        ] {
            assert!(mentions(&obj(value)).is_empty());
        }

        for value in [
            json!({"tags": [{"objectType": "mention", "url": "x"}]}),
            json!({"verb": "post", "object": {"tags": [{"objectType": "mention", "url": "x"}]}}),
        ] {
            assert_eq!(vec!["x"], mentions(&obj(value)));
        }

        let mentioning = obj(json!({"tags": [
            {"objectType": "mention", "url": "x"},
            {"objectType": "hashtag", "url": "y"},
            {"objectType": "mention", "url": "z"},
        ]}));
        assert_eq!(vec!["x", "z"], mentions(&mentioning));
    }
}
