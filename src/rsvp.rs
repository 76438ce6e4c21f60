//! Event RSVPs and invites.

use serde_json::{Map, Value, json};

use crate::object::Object;
use crate::urls::{parse_tag_uri, tag_uri};

/// Each RSVP verb and the event collection its participants go into, in
/// priority order.
pub const RSVP_VERB_TO_COLLECTION: [(&str, &str); 5] = [
    ("rsvp-yes", "attending"),
    ("rsvp-no", "notAttending"),
    ("rsvp-maybe", "maybeAttending"),
    ("rsvp-interested", "interested"),
    ("invite", "invited"),
];

pub fn collection_for(verb: &str) -> Option<&'static str> {
    RSVP_VERB_TO_COLLECTION
        .iter()
        .find(|(rsvp_verb, _)| *rsvp_verb == verb)
        .map(|(_, field)| *field)
}

/// Adds each RSVP's actor, or invitee for invites, to the event's matching
/// collection. Activities with other verbs, or no participant, are skipped.
pub fn add_rsvps_to_event(event: Object<'_>, rsvps: &[Object<'_>]) -> Object<'static> {
    let mut event = event.into_owned();
    for rsvp in rsvps {
        let Some(field) = rsvp.verb().and_then(collection_for) else {
            continue;
        };
        let role = if field == "invited" { "object" } else { "actor" };
        let Some(participant) = rsvp.get(role).filter(|value| !value.is_null()) else {
            continue;
        };
        event.list_mut(field).push(participant.clone());
    }
    event
}

/// Synthesizes RSVP and invite activities from an event's collections.
///
/// The event needs a tag URI id. Participants with an id get an activity id
/// of `tag:DOMAIN:EVENT_rsvp_PARTICIPANT` and a url of `EVENT_URL#PARTICIPANT`.
/// Invites are from the event's author.
pub fn get_rsvps_from_event(event: &Object<'_>) -> Vec<Value> {
    let Some((domain, event_id)) = event.id().and_then(parse_tag_uri) else {
        return vec![];
    };
    let url = event.get_str("url").filter(|url| !url.is_empty());
    let author = event.get("author").filter(|author| !author.is_null());

    let mut rsvps = vec![];
    for (verb, field) in RSVP_VERB_TO_COLLECTION {
        for participant in event.get_list(field) {
            let mut rsvp = Map::new();
            rsvp.insert("objectType".into(), json!("activity"));
            rsvp.insert("verb".into(), json!(verb));
            let role = if verb == "invite" { "object" } else { "actor" };
            rsvp.insert(role.into(), participant.clone());
            if let Some(url) = url {
                rsvp.insert("url".into(), json!(url));
            }

            let participant_id = match participant {
                Value::String(id) => Some(id.as_str()),
                other => other.get("id").and_then(Value::as_str),
            };
            if let Some(participant_id) = participant_id.filter(|id| !id.is_empty()) {
                let participant_id = parse_tag_uri(participant_id)
                    .map(|(_, name)| name)
                    .unwrap_or(participant_id);
                rsvp.insert(
                    "id".into(),
                    json!(tag_uri(domain, &format!("{event_id}_rsvp_{participant_id}"))),
                );
                if let Some(url) = url {
                    rsvp.insert("url".into(), json!(format!("{url}#{participant_id}")));
                }
            }

            if verb == "invite" {
                if let Some(author) = author {
                    rsvp.insert("actor".into(), author.clone());
                }
            }
            rsvps.push(Value::Object(rsvp));
        }
    }
    rsvps
}
