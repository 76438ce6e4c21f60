//! Text patterns shared by tag indexing, content reconciliation and original
//! post discovery.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::object::Object;

/// A start or end HTML tag, eg `<p>`, `<a href="...">`, `</div>`, `<br/>`.
pub static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[a-zA-Z][a-zA-Z0-9-]*(?:\s[^<>]*)?/?>").expect("html tag regex is valid")
});

pub static HTML_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#?[a-zA-Z0-9]+;").expect("html entity regex is valid"));

/// Bare `@user`, `@user.domain` or `@user@server` handles. The leading group
/// keeps emails, paths and query strings from matching.
pub static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[^\w@/!?=&])(?P<mention>@[\w-]+(?:\.[\w-]+)*(?:@[\w-]+(?:\.[\w-]+)+)?)",
    )
    .expect("mention regex is valid")
});

/// `(DOMAIN PATH)` or `(DOMAIN/PATH)` at the end of a line.
///
/// See <http://indiewebcamp.com/permashortcitation>.
pub static PERMASHORTCITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)\((?P<domain>[^:\s)]+\.[^\s)]{2,})[ /](?P<path>[^\s)]+)\)$")
        .expect("permashortcitation regex is valid")
});

/// `[text](url)` or `[text](url "title")`, as emitted by HTML to markdown
/// conversion. The text may hold backslash escapes; parens inside the URL are
/// backslash escaped.
pub static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\[(?P<text>(?:\\.|[^\[\]\\])*)\]\((?P<url>(?:\\[()]|[^()\s\\])+)(?:\s+"[^"]*")?\)"#,
    )
    .expect("markdown link regex is valid")
});

/// A backslash escaping markdown syntax, eg `\_`, `\*` or a leading `\#`.
static MARKDOWN_ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\([\\`*_{}\[\]()#+\-.!<>|~])").expect("markdown escape regex is valid")
});

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"\[\]]+"#).expect("link regex is valid"));

/// Whether content should be treated as HTML.
///
/// An explicit `content_is_html` flag wins. Otherwise we sniff the content for
/// tags or entities.
pub fn content_is_html(obj: &Object<'_>) -> bool {
    if let Some(Value::Bool(flag)) = obj.get("content_is_html") {
        return *flag;
    }
    obj.get_str("content").is_some_and(looks_like_html)
}

pub fn looks_like_html(content: &str) -> bool {
    HTML_TAG_RE.is_match(content) || HTML_ENTITY_RE.is_match(content)
}

/// Unique http(s) links in free text, in order of appearance.
///
/// Trailing punctuation is dropped, except for ellipses, which mark a
/// truncated link that callers may want to reject.
pub fn extract_links(text: &str) -> Vec<String> {
    let mut links: Vec<String> = vec![];
    for found in LINK_RE.find_iter(text) {
        let mut link = found.as_str();
        loop {
            if link.ends_with("...") || link.ends_with('…') {
                break;
            }
            let Some(last) = link.chars().next_back() else {
                break;
            };
            let unbalanced_paren =
                last == ')' && link.matches('(').count() < link.matches(')').count();
            if ".,;:!?'".contains(last) || unbalanced_paren {
                link = &link[..link.len() - last.len_utf8()];
            } else {
                break;
            }
        }
        if !links.iter().any(|seen| seen == link) {
            links.push(link.to_string());
        }
    }
    links
}

/// Expands permashortcitations into `http://DOMAIN/PATH` URLs.
pub fn permashortcitations(text: &str) -> Vec<String> {
    PERMASHORTCITATION_RE
        .captures_iter(text)
        .map(|caps| format!("http://{}/{}", &caps["domain"], &caps["path"]))
        .collect()
}

/// Drops the backslashes HTML to markdown conversion puts before markdown
/// syntax, leaving plain text.
pub fn unescape_markdown(text: &str) -> String {
    MARKDOWN_ESCAPE_RE.replace_all(text, "$1").into_owned()
}

/// Converts a byte range in `text` to a char range.
pub(crate) fn char_span(text: &str, bytes: Range<usize>) -> Range<usize> {
    let start = text[..bytes.start].chars().count();
    start..start + text[bytes].chars().count()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        MARKDOWN_LINK_RE, MENTION_RE, char_span, content_is_html, extract_links, looks_like_html,
        permashortcitations, unescape_markdown,
    };
    use crate::object::Object;

    #[test]
    fn sniff_html() {
        assert!(looks_like_html("<p>hi</p>"));
        assert!(looks_like_html("a <a href=\"http://x\">link</a>"));
        assert!(looks_like_html("fish &amp; chips"));
        assert!(looks_like_html("line<br/>break"));
        assert!(!looks_like_html("1 < 2 and 3 > 2"));
        assert!(!looks_like_html("plain @alice #tag"));
    }

    #[test]
    fn explicit_flag_wins_over_sniffing() {
        let html = Object::try_from(json!({"content": "<b>x</b>"})).unwrap();
        assert!(content_is_html(&html));
        let flagged = Object::try_from(json!({"content": "<b>x</b>", "content_is_html": false}))
            .unwrap();
        assert!(!content_is_html(&flagged));
        let plain = Object::try_from(json!({"content": "x", "content_is_html": true})).unwrap();
        assert!(content_is_html(&plain));
        assert!(!content_is_html(&Object::empty()));
    }

    #[test]
    fn mentions() {
        let found: Vec<&str> = MENTION_RE
            .captures_iter("hi @alice, @bob@example.com and @carol.bsky.social. me@x.com /@no")
            .map(|caps| caps.name("mention").unwrap().as_str())
            .collect();
        assert_eq!(
            vec!["@alice", "@bob@example.com", "@carol.bsky.social"],
            found
        );
    }

    #[test]
    fn links() {
        assert_eq!(
            vec!["http://first", "http://second"],
            extract_links("asdf http://first ooooh http://second qwert")
        );
        assert_eq!(
            vec!["http://snarfed.org/xyz"],
            extract_links("Foo (http://snarfed.org/xyz)")
        );
        assert_eq!(
            vec!["https://en.wikipedia.org/wiki/Foo_(bar)"],
            extract_links("see https://en.wikipedia.org/wiki/Foo_(bar).")
        );
        assert_eq!(vec!["http://foo.com/1…"], extract_links("x http://foo.com/1…"));
        assert_eq!(vec!["http://a/"], extract_links("http://a/ http://a/"));
    }

    #[test]
    fn permashortcitation_at_end_of_line() {
        assert_eq!(
            vec!["http://at.the/end"],
            permashortcitations("x (not.at end) y (at.the end)")
        );
        assert_eq!(vec!["http://ttk.me/123"], permashortcitations("x (ttk.me/123)"));
        assert_eq!(
            vec!["http://a.bc/1", "http://d.ef/2"],
            permashortcitations("one (a.bc 1)\ntwo (d.ef 2)")
        );
    }

    #[test]
    fn markdown_links() {
        let caps = MARKDOWN_LINK_RE
            .captures(r#"see [the \(docs\)](http://x/a\(b\) "title") now"#)
            .unwrap();
        assert_eq!(r"the \(docs\)", &caps["text"]);
        assert_eq!(r"http://x/a\(b\)", &caps["url"]);

        let caps = MARKDOWN_LINK_RE.captures("[hi](http://x) there").unwrap();
        assert_eq!("hi", &caps["text"]);
        assert_eq!("http://x", &caps["url"]);

        let caps = MARKDOWN_LINK_RE.captures(r"[a\]b\_c](http://x)").unwrap();
        assert_eq!(r"a\]b\_c", &caps["text"]);
        assert!(MARKDOWN_LINK_RE.captures(r"\[x\](http://y)").is_none());
    }

    #[test]
    fn unescapes_markdown() {
        assert_eq!("my_var is *cool*", unescape_markdown(r"my\_var is \*cool\*"));
        assert_eq!("# not a heading", unescape_markdown(r"\# not a heading"));
        assert_eq!("- 1. [x] a\\b", unescape_markdown(r"\- 1\. \[x\] a\\b"));
        assert_eq!(r"C:\dir", unescape_markdown(r"C:\dir"));
    }

    #[test]
    fn byte_to_char_spans() {
        let text = "ñ @bob";
        assert_eq!(2..6, char_span(text, 3..7));
    }
}
