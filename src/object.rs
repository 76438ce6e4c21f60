//! Accessors over ActivityStreams 1 objects.
//!
//! AS1 data is sparse and loosely typed: any relational field may hold a bare
//! string id, a nested object, or a list of either. [`Object::refs`] is the
//! one place that unwraps those shapes; everything else goes through it.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::str::FromStr;

use serde_json::{Map, Value, json};

use crate::error::{As1Error, json_kind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object<'a>(Cow<'a, Value>);

/// A single element of a relational field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ref<'a> {
    /// String shorthand for `{"id": ...}`
    Id(&'a str),
    Object(Object<'a>),
}

impl<'a> Ref<'a> {
    pub fn into_object(self) -> Object<'a> {
        match self {
            Ref::Id(id) => Object::with_id(id),
            Ref::Object(object) => object,
        }
    }
    /// The shorthand string, or the record's `id`, else its `url`.
    pub fn id_or_url(&self) -> Option<&str> {
        match self {
            Ref::Id(id) => Some(*id).filter(|id| !id.is_empty()),
            Ref::Object(object) => object
                .get_str("id")
                .filter(|id| !id.is_empty())
                .or_else(|| object.get_str("url").filter(|url| !url.is_empty())),
        }
    }
}

impl Object<'_> {
    pub fn empty() -> Object<'static> {
        Object(Cow::Owned(Value::Object(Map::new())))
    }
    pub fn with_id(id: &str) -> Object<'static> {
        Object(Cow::Owned(json!({ "id": id })))
    }
    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }
    pub fn verb(&self) -> Option<&str> {
        self.get_str("verb")
    }
    /// `objectType`, or the verb if this is an activity.
    pub fn object_type(&self) -> Option<&str> {
        match self.get_str("objectType") {
            Some(ty) if !ty.is_empty() && ty != "activity" => Some(ty),
            _ => self.verb(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.as_map().is_empty()
    }
    pub fn get(&self, prop: &str) -> Option<&Value> {
        self.0.get(prop)
    }
    pub fn get_str(&self, prop: &str) -> Option<&str> {
        self.0.get(prop).and_then(Value::as_str)
    }

    /// Values of a field as a list. Falsy values count as absent; a present
    /// list is returned as is, including empty elements.
    pub fn get_list(&self, prop: &str) -> Vec<&Value> {
        match self.0.get(prop) {
            Some(value) if !is_truthy(value) => vec![],
            Some(Value::Array(items)) => items.iter().collect(),
            Some(value) => vec![value],
            None => vec![],
        }
    }
    /// Elements of a relational field. Scalars that are neither strings nor
    /// objects are dropped.
    pub fn refs(&self, prop: &str) -> Vec<Ref<'_>> {
        self.get_list(prop)
            .into_iter()
            .filter_map(|value| match value {
                Value::String(id) => Some(Ref::Id(id)),
                Value::Object(_) => Some(Ref::Object(Object(Cow::Borrowed(value)))),
                _ => None,
            })
            .collect()
    }
    /// The field as a single object. Strings become `{"id": ...}`, lists
    /// yield their first element, absent or empty values yield `{}`.
    pub fn get_object(&self, field: &str) -> Object<'_> {
        let first = match self.0.get(field) {
            Some(Value::Array(items)) => items.first(),
            value => value,
        };
        match first {
            Some(value) if !is_truthy(value) => Object::empty(),
            Some(Value::String(id)) => Object::with_id(id),
            Some(value @ Value::Object(_)) => Object(Cow::Borrowed(value)),
            _ => Object::empty(),
        }
    }
    pub fn get_objects(&self, field: &str) -> Vec<Object<'_>> {
        self.refs(field).into_iter().map(Ref::into_object).collect()
    }
    pub fn get_ids(&self, field: &str) -> BTreeSet<String> {
        self.refs(field)
            .iter()
            .filter_map(Ref::id_or_url)
            .map(str::to_owned)
            .collect()
    }
    pub fn get_id(&self, field: &str) -> Option<String> {
        self.get_object(field).id().map(str::to_owned)
    }
    /// First URL of this object, or `""`.
    pub fn url(&self) -> String {
        self.object_urls().into_iter().next().unwrap_or_default()
    }
    /// Unique, trimmed values of `url` and `urls`, in order.
    pub fn object_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = vec![];
        for value in self
            .get_list("url")
            .into_iter()
            .chain(self.get_list("urls"))
        {
            let url = match value {
                Value::Object(map) => map.get("value").and_then(Value::as_str),
                other => other.as_str(),
            };
            let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) else {
                continue;
            };
            if !urls.iter().any(|seen| seen == url) {
                urls.push(url.to_string());
            }
        }
        urls
    }
    /// The author's or actor's id, preferring author.
    ///
    /// Actors own themselves. Posts, updates and deletes without an actor fall
    /// back to the owner of their inner object.
    pub fn get_owner(&self) -> Option<String> {
        let mut ids = self.get_ids("author");
        if ids.is_empty() {
            ids = self.get_ids("actor");
        }
        if let Some(id) = ids.into_iter().next() {
            return Some(id);
        }
        if self
            .get_str("objectType")
            .is_some_and(|ty| ACTOR_TYPES.contains(&ty))
        {
            if let Some(id) = self.id().filter(|id| !id.is_empty()) {
                return Some(id.to_string());
            }
        }
        if matches!(self.verb(), Some("post" | "update" | "delete")) {
            return self.get_object("object").get_owner();
        }
        None
    }
    pub fn actor_name(&self) -> &str {
        self.get_str("displayName")
            .filter(|name| !name.is_empty())
            .or_else(|| self.get_str("username").filter(|name| !name.is_empty()))
            .unwrap_or("Unknown")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        static EMPTY: std::sync::LazyLock<Map<String, Value>> =
            std::sync::LazyLock::new(Map::new);
        self.0.as_object().unwrap_or(&*EMPTY)
    }
    pub(crate) fn map_mut(&mut self) -> &mut Map<String, Value> {
        let value = self.0.to_mut();
        if !value.is_object() {
            *value = Value::Object(Map::new());
        }
        match value {
            Value::Object(map) => map,
            _ => unreachable!("value was just replaced with an object"),
        }
    }
    /// The field as a mutable list, wrapping a single value into one.
    pub(crate) fn list_mut(&mut self, prop: &str) -> &mut Vec<Value> {
        list_mut(self.map_mut(), prop)
    }
    pub fn set(&mut self, prop: &str, value: Value) {
        self.map_mut().insert(prop.to_string(), value);
    }
    pub fn remove(&mut self, prop: &str) -> Option<Value> {
        self.map_mut().remove(prop)
    }
    /// A cheap borrowed view of this object.
    pub fn reborrow(&self) -> Object<'_> {
        Object(Cow::Borrowed(&*self.0))
    }
    pub fn into_owned(self) -> Object<'static> {
        Object(Cow::Owned(self.0.into_owned()))
    }
    pub fn to_value(&self) -> Value {
        self.0.clone().into_owned()
    }
    pub fn replace(self, prop: &str, value: Value) -> Object<'static> {
        let mut obj = self.into_owned();
        obj.set(prop, value);
        obj
    }
}

/// Merges items by id into a list field, sorted by id. Mutates `obj`.
///
/// Later items replace earlier ones with the same id. Every existing and new
/// item must have an id.
pub fn merge_by_id(
    obj: Object<'_>,
    field: &str,
    new: Vec<Value>,
) -> Result<Object<'static>, As1Error> {
    let mut obj = obj.into_owned();
    let existing = obj.get_list(field).into_iter().cloned().collect::<Vec<_>>();
    let mut merged = BTreeMap::new();
    for item in existing.into_iter().chain(new) {
        let Some(id) = item.get("id").and_then(Value::as_str) else {
            return Err(As1Error::MissingId {
                field: field.to_string(),
            });
        };
        merged.insert(id.to_string(), item);
    }
    obj.set(field, Value::Array(merged.into_values().collect()));
    Ok(obj)
}

/// First URL of a string, object or absent value.
pub fn get_url(value: &Value) -> String {
    match value {
        Value::String(url) => url.clone(),
        Value::Object(_) => Object(Cow::Borrowed(value)).url(),
        _ => String::new(),
    }
}

/// Prepends `prefix` to every `field` URL in an activity, eg to route images
/// through a caching proxy. Mutates `obj`.
///
/// Covers the activity, its `object`, `author` and `actor`, reply items,
/// attachments and tags, recursively. Values may be URL strings or records
/// with a `url`. URLs that already start with `prefix` are left alone, and
/// nothing is URL-encoded.
pub fn prefix_urls(obj: Object<'_>, field: &str, prefix: &str) -> Object<'static> {
    let mut obj = obj.into_owned();
    prefix_record(obj.map_mut(), field, prefix);
    obj
}

fn prefix_record(record: &mut Map<String, Value>, field: &str, prefix: &str) {
    match record.get_mut(field) {
        Some(Value::Array(items)) => items.iter_mut().for_each(|item| prefix_url(item, prefix)),
        Some(value) => prefix_url(value, prefix),
        None => {}
    }

    let mut children: Vec<&mut Map<String, Value>> = vec![];
    for (key, value) in record.iter_mut() {
        match key.as_str() {
            "object" | "author" | "actor" | "attachments" | "tags" => {
                children.extend(records_mut(value));
            }
            "replies" => {
                if let Some(items) = value.get_mut("items") {
                    children.extend(records_mut(items));
                }
            }
            _ => {}
        }
    }
    for child in children {
        prefix_record(child, field, prefix);
    }
}

fn prefix_url(value: &mut Value, prefix: &str) {
    let url = match value {
        Value::Object(record) => record.get_mut("url"),
        other => Some(other),
    };
    if let Some(Value::String(url)) = url {
        if !url.is_empty() && !url.starts_with(prefix) {
            url.insert_str(0, prefix);
        }
    }
}

fn records_mut(value: &mut Value) -> Vec<&mut Map<String, Value>> {
    match value {
        Value::Object(record) => vec![record],
        Value::Array(items) => items.iter_mut().filter_map(Value::as_object_mut).collect(),
        _ => vec![],
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub(crate) fn list_mut<'m>(map: &'m mut Map<String, Value>, prop: &str) -> &'m mut Vec<Value> {
    let slot = map.entry(prop).or_insert_with(|| Value::Array(vec![]));
    match slot.take() {
        Value::Null => *slot = Value::Array(vec![]),
        Value::Array(items) => *slot = Value::Array(items),
        single => *slot = Value::Array(vec![single]),
    }
    match slot {
        Value::Array(items) => items,
        _ => unreachable!("slot was just replaced with an array"),
    }
}

impl TryFrom<Value> for Object<'static> {
    type Error = As1Error;

    fn try_from(value: Value) -> Result<Self, As1Error> {
        match value {
            Value::Null => Ok(Object::empty()),
            Value::Object(_) => Ok(Object(Cow::Owned(value))),
            other => Err(As1Error::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }
}

impl<'a> TryFrom<&'a Value> for Object<'a> {
    type Error = As1Error;

    fn try_from(value: &'a Value) -> Result<Self, As1Error> {
        match value {
            Value::Null => Ok(Object::empty()),
            Value::Object(_) => Ok(Object(Cow::Borrowed(value))),
            other => Err(As1Error::NotAnObject {
                found: json_kind(other),
            }),
        }
    }
}

impl FromStr for Object<'static> {
    type Err = As1Error;

    fn from_str(s: &str) -> Result<Self, As1Error> {
        Object::try_from(serde_json::from_str::<Value>(s)?)
    }
}

impl From<Map<String, Value>> for Object<'static> {
    fn from(map: Map<String, Value>) -> Self {
        Object(Cow::Owned(Value::Object(map)))
    }
}

impl From<Object<'_>> for Value {
    fn from(value: Object) -> Self {
        value.0.into_owned()
    }
}

impl AsRef<Value> for Object<'_> {
    fn as_ref(&self) -> &Value {
        &self.0
    }
}

impl Display for Object<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// objectTypes that can be actors, following AS2 semantics.
pub const ACTOR_TYPES: [&str; 5] = ["application", "group", "organization", "person", "service"];

/// Verbs whose audience lives on the inner object.
pub const CRUD_VERBS: [&str; 4] = ["delete", "post", "update", "undo"];
