//! Source-independent analysis of ActivityStreams 1 activity graphs.
//!
//! Everything here works on AS1 JSON held in an [`Object`], borrowed or owned.
//! Missing fields are never errors.

pub mod audience;
pub mod config;
pub mod content;
pub mod diff;
pub mod discovery;
pub mod error;
mod interval;
pub mod object;
pub mod resolver;
pub mod rsvp;
pub mod tags;
pub mod targets;
pub mod text;
pub mod urls;

pub use audience::{Visibility, is_audience, is_dm, is_public, recipient_if_dm, visibility};
pub use config::Config;
pub use content::{
    HtmlToText, MarkdownConverter, add_tags_for_html_content_links, convert_html_content_to_text,
    reconcile_html_content,
};
pub use diff::{ChangeOptions, activity_changed, append_in_reply_to};
pub use discovery::{
    Discovery, DiscoveryOptions, FollowRedirects, NoRedirects, Resolved, original_post_discovery,
};
pub use error::As1Error;
pub use object::{Object, Ref, get_url, merge_by_id, prefix_urls};
pub use resolver::HttpResolver;
pub use rsvp::{add_rsvps_to_event, get_rsvps_from_event};
pub use tags::expand_tags;
pub use targets::{mentions, quoted_posts, targets};
