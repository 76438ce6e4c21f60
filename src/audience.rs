//! Audience targeting: public, unlisted, private and direct messages.
//!
//! Follows the AS1 audience targeting extension, where `to` and `cc` hold
//! groups with an `alias` of `@public`, `@unlisted` or `@private`.

use serde::Serialize;
use serde_json::Value;

use crate::object::{ACTOR_TYPES, CRUD_VERBS, Object};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
    Unknown,
}

/// `Some(true)` if public, `Some(false)` if private, `None` if unknown.
///
/// Objects with no audience at all are public. `unlisted` controls whether
/// `@unlisted` counts as public.
pub fn is_public(obj: Option<&Object<'_>>, unlisted: bool) -> Option<bool> {
    let obj = obj?;
    let inner = obj.get_object("object");

    let to_cc = |o: &Object<'_>| -> Vec<Value> {
        o.get_objects("to")
            .into_iter()
            .chain(o.get_objects("cc"))
            .map(Value::from)
            .collect()
    };
    let audience = if obj.object_type().is_some_and(|ty| CRUD_VERBS.contains(&ty)) {
        to_cc(&inner)
    } else {
        let outer = to_cc(obj);
        if outer.is_empty() { to_cc(&inner) } else { outer }
    };

    let aliases = non_empty_strs(&audience, "alias");
    let object_types = non_empty_strs(&audience, "objectType");

    if aliases.contains(&"@public") || (unlisted && aliases.contains(&"@unlisted")) {
        Some(true)
    } else if object_types.contains(&"unknown") {
        None
    } else if !aliases.is_empty() {
        Some(false)
    } else if !audience.is_empty()
        && !inner
            .object_type()
            .is_some_and(|ty| ACTOR_TYPES.contains(&ty))
    {
        // some audience, none of it public
        Some(false)
    } else {
        Some(true)
    }
}

fn non_empty_strs<'v>(entries: &'v [Value], field: &str) -> Vec<&'v str> {
    entries
        .iter()
        .filter_map(|entry| entry.get(field).and_then(Value::as_str))
        .filter(|value| !value.is_empty())
        .collect()
}

pub fn visibility(obj: &Object<'_>) -> Visibility {
    match is_public(Some(obj), false) {
        Some(true) => Visibility::Public,
        None => Visibility::Unknown,
        Some(false) if is_public(Some(obj), true) == Some(true) => Visibility::Unlisted,
        Some(false) => Visibility::Private,
    }
}

/// Whether `value` is a special AS1 or AS2 audience, eg public or followers.
pub fn is_audience(value: &Value) -> bool {
    value.as_str().is_some_and(is_audience_str)
}

fn is_audience_str(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let value = value.to_lowercase();
    matches!(value.as_str(), "public" | "unlisted" | "private")
        || value.starts_with("https://www.w3.org/")
        || value.starts_with("https://w3.org/")
        || value.starts_with('@')
        || value.starts_with("as:")
        || value.ends_with("#public")
        || value.ends_with("/followers")
        || value.ends_with("/following")
}

/// The recipient's id if `obj` is a direct message, ie a note addressed to
/// exactly one actor and nobody else.
///
/// `actor` is the optional sender; its followers and following collections
/// don't count as recipients, and neither do the object author's.
pub fn recipient_if_dm(obj: &Object<'_>, actor: Option<&Object<'_>>) -> Option<String> {
    if obj.is_empty() || is_public(Some(obj), true) == Some(true) {
        return None;
    }

    let obj = if obj.object_type() == Some("post") {
        obj.get_object("object")
    } else {
        obj.reborrow()
    };
    if obj.is_empty() || !matches!(obj.object_type(), None | Some("note" | "comment")) {
        return None;
    }

    let tos: Vec<&Value> = obj.get_list("to").into_iter().chain(obj.get_list("cc")).collect();
    let others = obj.get_list("bto").len() + obj.get_list("bcc").len();
    let [to] = tos.as_slice() else {
        return None;
    };
    if others > 0 {
        return None;
    }

    let author = obj.get_object("author");
    let follow_collections: Vec<&str> = actor
        .into_iter()
        .chain([&author])
        .flat_map(|a| [a.get_str("followers"), a.get_str("following")])
        .flatten()
        .collect();

    let to = match to {
        Value::String(to) => to.as_str(),
        Value::Object(_) => to.get("id").and_then(Value::as_str).unwrap_or_default(),
        _ => return None,
    };
    if to.is_empty() || is_audience_str(to) || follow_collections.contains(&to) {
        return None;
    }
    Some(to.to_string())
}

pub fn is_dm(obj: &Object<'_>, actor: Option<&Object<'_>>) -> bool {
    recipient_if_dm(obj, actor).is_some()
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{Visibility, is_audience, is_dm, is_public, recipient_if_dm, visibility};
    use crate::object::Object;

    fn obj(value: Value) -> Object<'static> {
        Object::try_from(value).unwrap()
    }

    fn public(value: &Value) -> Option<bool> {
        is_public(Some(&obj(value.clone())), true)
    }

    #[test]
    fn unknown_audience() {
        assert_eq!(None, is_public(None, true));
        for value in [
            json!({"to": [{"objectType": "unknown"}]}),
            json!({"to": [{"objectType": "unknown"}, {"objectType": "unknown"}]}),
            json!({"to": [{"alias": "xyz"}, {"objectType": "unknown"}]}),
        ] {
            assert_eq!(None, public(&value), "{value}");
            assert_eq!(None, public(&json!({"object": value})), "{value}");
        }
    }

    #[test]
    fn public_audience() {
        for value in [
            json!({}),
            json!({"privacy": "xyz"}),
            json!({"to": []}),
            json!({"to": null}),
            json!({"to": [{"objectType": "group", "alias": "@unlisted"}]}),
            json!({"to": [{"objectType": "group", "alias": "@public"}]}),
            json!({"to": [
                {"objectType": "group", "alias": "@private"},
                {"objectType": "group", "alias": "@public"},
            ]}),
            json!({"to": [{"alias": "@public"}, {"alias": "@private"}]}),
        ] {
            assert_eq!(Some(true), public(&value), "{value}");
            assert_eq!(Some(true), public(&json!({"object": value})), "{value}");
        }
        assert_eq!(
            Some(false),
            is_public(
                Some(&obj(json!({"to": [{"objectType": "group", "alias": "@unlisted"}]}))),
                false
            )
        );
    }

    #[test]
    fn private_audience() {
        for value in [
            json!({"to": [{}]}),
            json!({"to": ["someone"]}),
            json!({"to": [{"objectType": "group"}]}),
            json!({"to": [{"objectType": "group", "alias": "@private"}]}),
            json!({"to": [{"objectType": "group", "alias": "xyz"}]}),
            json!({"to": [{"alias": "xyz"}]}),
            json!({"to": [{"alias": "xyz"}, {"alias": "@private"}]}),
            json!({"to": [{"objectType": "group"}, {"alias": "xyz"}, {"alias": "@private"}]}),
        ] {
            assert_eq!(Some(false), public(&value), "{value}");
            assert_eq!(Some(false), public(&json!({"object": value})), "{value}");
        }
    }

    #[test]
    fn crud_verbs_use_inner_audience() {
        for verb in ["post", "update", "delete"] {
            for to in [Value::Null, json!([{"id": "https://www.w3.org/ns/activitystreams#Public"}])] {
                let mut activity = json!({
                    "objectType": "activity",
                    "verb": verb,
                    "to": to,
                    "object": {"to": ["did:bob"]},
                });
                assert_eq!(Some(false), public(&activity), "{activity}");
                activity["object"]["objectType"] = json!("person");
                assert_eq!(Some(true), public(&activity), "{activity}");
            }
        }
    }

    #[test]
    fn visibility_levels() {
        assert_eq!(Visibility::Public, visibility(&obj(json!({}))));
        assert_eq!(
            Visibility::Unlisted,
            visibility(&obj(json!({"to": [{"objectType": "group", "alias": "@unlisted"}]})))
        );
        assert_eq!(
            Visibility::Private,
            visibility(&obj(json!({"to": [{"objectType": "group"}]})))
        );
        assert_eq!(
            Visibility::Unknown,
            visibility(&obj(json!({"to": [{"objectType": "unknown"}]})))
        );
    }

    #[test]
    fn audience_values() {
        for value in [
            Value::Null,
            json!(""),
            json!({}),
            json!("unknown"),
            json!("did:user"),
            json!("user.com"),
            json!("http://user.com/"),
            json!("http://mas.to/@user"),
        ] {
            assert!(!is_audience(&value), "{value}");
        }
        for value in [
            "Public",
            "as:Public",
            "@public",
            "@unlisted",
            "@private",
            "https://www.w3.org/ns/activitystreams#Public",
            "https://www.w3.org/ns/xyz",
            "http://mas.to/@user/followers",
        ] {
            assert!(is_audience(&json!(value)), "{value}");
        }
    }

    #[test]
    fn not_direct_messages() {
        let actor = obj(json!({
            "id": "https://alice",
            "followers": "http://the/follow/ers",
            "following": "http://the/follow/ing",
        }));
        for value in [
            json!({}),
            json!({"to": [{"objectType": "unknown"}]}),
            json!({"to": [{"alias": "@public"}]}),
            json!({"to": [{"alias": "@unlisted"}]}),
            json!({"to": ["did:eve"], "cc": ["did:bob"]}),
            json!({"to": ["did:eve"], "bcc": ["did:bob"]}),
            json!({"to": ["did:eve"], "bto": ["did:bob"]}),
            json!({"to": [{"id": "https://www.w3.org/ns/activitystreams#Public"}]}),
            json!({"to": "https://www.w3.org/ns/activitystreams#Public"}),
            json!({"objectType": "person", "to": "http://recip"}),
            json!({"objectType": "activity", "verb": "update", "object": {"to": ["http://bob"]}}),
            json!({"to": ["http://the/followers"]}),
            json!({"to": [{"id": "http://the/following"}]}),
        ] {
            let value = obj(value);
            assert_eq!(None, recipient_if_dm(&value, None), "{value}");
            assert!(!is_dm(&value, Some(&actor)), "{value}");
        }
    }

    #[test]
    fn follow_collections_are_not_recipients() {
        let actor = json!({
            "id": "https://alice",
            "followers": "http://the/follow/ers",
            "following": "http://the/follow/ing",
        });
        for value in [
            json!({"to": "http://the/follow/ers"}),
            json!({"to": ["http://the/follow/ing"]}),
            json!({"to": [{"id": "http://the/follow/ers"}]}),
        ] {
            assert!(is_dm(&obj(value.clone()), None), "{value}");
            assert!(!is_dm(&obj(value.clone()), Some(&obj(actor.clone()))), "{value}");

            let mut authored = value.clone();
            authored["author"] = actor.clone();
            assert!(!is_dm(&obj(authored.clone()), None), "{authored}");
            let post = json!({"objectType": "activity", "verb": "post", "object": authored});
            assert!(!is_dm(&obj(post), None));
        }
    }

    #[test]
    fn direct_messages() {
        let actor = obj(json!({
            "id": "https://alice",
            "followers": "http://the/follow/ers",
        }));
        let dm = |value: Value, actor: Option<&Object<'_>>| recipient_if_dm(&obj(value), actor);

        assert_eq!(Some("http://bob".into()), dm(json!({"to": ["http://bob"]}), Some(&actor)));
        assert_eq!(
            Some("http://bob".into()),
            dm(json!({"inReplyTo": "http://orig", "cc": ["http://bob"]}), Some(&actor))
        );
        assert_eq!(
            Some("http://bob".into()),
            dm(
                json!({"objectType": "comment", "inReplyTo": "http://orig", "cc": ["http://bob"]}),
                Some(&actor)
            )
        );
        assert_eq!(
            Some("http://bob".into()),
            dm(
                json!({"objectType": "activity", "verb": "post", "object": {"to": ["http://bob"]}}),
                Some(&actor)
            )
        );
        assert_eq!(Some("bob".into()), dm(json!({"to": ["bob"]}), Some(&actor)));
        assert_eq!(
            Some("did:bob".into()),
            dm(json!({"object": {"to": ["did:bob"]}, "to": ["did:bob"]}), None)
        );
        // self DM is still a DM
        assert_eq!(Some("http://alice".into()), dm(json!({"to": ["http://alice"]}), Some(&actor)));
    }
}
