use std::path::Path;

use anyhow::{Context, Result};
use as1::{
    ChangeOptions, Config, DiscoveryOptions, HttpResolver, MarkdownConverter, NoRedirects, Object,
    activity_changed, add_tags_for_html_content_links, append_in_reply_to,
    convert_html_content_to_text, expand_tags, get_rsvps_from_event, is_public,
    original_post_discovery, recipient_if_dm, targets, visibility,
};
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tracing::debug;

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Analyze ActivityStreams 1 JSON. Every PATH may be - for stdin.
        cmd as1 {
            /// TOML config file
            optional -c, --config config: PathBuf

            /// Print who can see an activity or object
            cmd visibility {
                required path: PathBuf
            }
            /// Index tags into plain text content
            cmd expand-tags {
                required path: PathBuf
            }
            /// Convert HTML content to plain text with indexed link tags
            cmd to-text {
                required path: PathBuf
            }
            /// Add tags for links in HTML content
            cmd html-links {
                required path: PathBuf
            }
            /// Find original post links and mentions
            cmd discover {
                required path: PathBuf
            }
            /// Print the RSVPs and invites of an event
            cmd rsvps {
                required path: PathBuf
            }
            /// Compare two versions of an activity
            cmd changed {
                required before: PathBuf
                required after: PathBuf
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let flags = flags::As1::from_env_or_exit();
    let config = match &flags.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    debug!(target: "as1", ?config, "loaded config");

    let output = match flags.subcommand {
        flags::As1Cmd::Visibility(cmd) => {
            let obj = read_object(&cmd.path).await?;
            json!({
                "visibility": visibility(&obj),
                "public": is_public(Some(&obj), false),
                "dm": recipient_if_dm(&obj, None),
                "targets": targets(&obj),
            })
        }
        flags::As1Cmd::ExpandTags(cmd) => expand_tags(read_object(&cmd.path).await?).to_value(),
        flags::As1Cmd::ToText(cmd) => {
            convert_html_content_to_text(read_object(&cmd.path).await?, &MarkdownConverter)
                .to_value()
        }
        flags::As1Cmd::HtmlLinks(cmd) => {
            add_tags_for_html_content_links(read_object(&cmd.path).await?, &MarkdownConverter)
                .to_value()
        }
        flags::As1Cmd::Discover(cmd) => {
            let obj = read_object(&cmd.path).await?;
            let options = DiscoveryOptions::from(&config.discovery);
            let discovery = if config.discovery.follow_redirects {
                let resolver = HttpResolver::new(&config.fetch)?;
                original_post_discovery(&obj, &options, &resolver).await
            } else {
                original_post_discovery(&obj, &options, &NoRedirects).await
            };
            serde_json::to_value(discovery)?
        }
        flags::As1Cmd::Rsvps(cmd) => {
            Value::Array(get_rsvps_from_event(&read_object(&cmd.path).await?))
        }
        flags::As1Cmd::Changed(cmd) => {
            let before = read_object(&cmd.before).await?;
            let after = read_object(&cmd.after).await?;
            let options = ChangeOptions {
                log: true,
                ..Default::default()
            };
            let changed = activity_changed(&before, &after, options);
            json!({
                "changed": changed,
                "merged": append_in_reply_to(&before, after).to_value(),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn read_object(path: &Path) -> Result<Object<'static>> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read stdin")?;
        text
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    text.parse::<Object>()
        .with_context(|| format!("{} is not an AS1 object", path.display()))
}
