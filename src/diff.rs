//! Meaningful differences between two versions of an activity.

use serde_json::{Map, Value};
use tracing::debug;

use crate::object::{Object, get_url, is_truthy, list_mut};
use crate::urls::dedupe_by_url;

/// Fields compared on both the activity and its inner object. Notably not
/// `author`, `published` or `updated`.
const COMPARED_FIELDS: [&str; 8] = [
    "objectType",
    "verb",
    "to",
    "displayName",
    "content",
    "summary",
    "location",
    "image",
];

#[derive(Clone, Copy, Debug)]
pub struct ChangeOptions {
    /// Also compare `inReplyTo`, ignoring the authors of the posts replied to
    pub in_reply_to: bool,
    /// Log each changed field at debug
    pub log: bool,
}

impl Default for ChangeOptions {
    fn default() -> Self {
        Self {
            in_reply_to: true,
            log: false,
        }
    }
}

/// Whether two versions of an activity or object differ meaningfully.
pub fn activity_changed(before: &Object<'_>, after: &Object<'_>, options: ChangeOptions) -> bool {
    let inner_before = before.get_object("object");
    let inner_after = after.get_object("object");

    let changed = |b: &Object<'_>, a: &Object<'_>, field: &str, label: &str, ignore: &[&str]| {
        let b_val = without(b.get(field), ignore);
        let a_val = without(a.get(field), ignore);
        if b_val != a_val && (is_truthy(&b_val) || is_truthy(&a_val)) {
            if options.log {
                debug!(target: "as1", label, field, before = %b_val, after = %a_val, "changed");
            }
            return true;
        }
        false
    };

    let fields_changed = COMPARED_FIELDS.into_iter().any(|field| {
        changed(before, after, field, "activity", &[])
            || changed(&inner_before, &inner_after, field, "activity[object]", &[])
    });
    if fields_changed {
        return true;
    }

    options.in_reply_to
        && (changed(before, after, "inReplyTo", "inReplyTo", &["author"])
            || changed(
                &inner_before,
                &inner_after,
                "inReplyTo",
                "object.inReplyTo",
                &["author"],
            ))
}

/// A copy of `value` without `ignore` fields in it or in its elements.
fn without(value: Option<&Value>, ignore: &[&str]) -> Value {
    let mut value = value.cloned().unwrap_or_default();
    match &mut value {
        Value::Object(map) => {
            for field in ignore {
                map.remove(*field);
            }
        }
        Value::Array(items) => {
            for map in items.iter_mut().filter_map(Value::as_object_mut) {
                for field in ignore {
                    map.remove(*field);
                }
            }
        }
        _ => {}
    }
    value
}

/// Merges `before`'s `inReplyTo` into `after`'s, de-duplicated by URL.
///
/// Works on the inner objects of activities.
pub fn append_in_reply_to(before: &Object<'_>, after: Object<'_>) -> Object<'static> {
    let inner_before = before.get_object("object");
    let source = if inner_before.is_empty() {
        before.reborrow()
    } else {
        inner_before
    };
    let replies: Vec<Value> = source.get_list("inReplyTo").into_iter().cloned().collect();

    let mut after = after.into_owned();
    let nested = matches!(after.get("object"), Some(Value::Object(inner)) if !inner.is_empty());
    if !nested {
        merge_replies(after.map_mut(), replies);
    } else if let Some(Value::Object(inner)) = after.map_mut().get_mut("object") {
        merge_replies(inner, replies);
    }
    after
}

fn merge_replies(target: &mut Map<String, Value>, replies: Vec<Value>) {
    let mut merged = std::mem::take(list_mut(target, "inReplyTo"));
    merged.extend(replies);
    let merged = dedupe_by_url(merged, reply_url);
    if merged.is_empty() {
        target.remove("inReplyTo");
    } else {
        target.insert("inReplyTo".into(), Value::Array(merged));
    }
}

fn reply_url(value: &Value) -> String {
    let url = get_url(value);
    if !url.is_empty() {
        return url;
    }
    value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| value.to_string())
}
