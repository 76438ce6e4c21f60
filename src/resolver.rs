use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, header, redirect};

use crate::config::FetchConfig;
use crate::discovery::{FollowRedirects, Resolved};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Follows redirects with HEAD requests.
#[derive(Clone, Debug)]
pub struct HttpResolver {
    client: Client,
}

impl HttpResolver {
    pub fn new(config: &FetchConfig) -> Result<HttpResolver> {
        let user_agent = config.user_agent.as_deref().unwrap_or(APP_USER_AGENT);
        let client = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .context("failed to build HTTP client")?;
        Ok(HttpResolver { client })
    }
}

impl FollowRedirects for HttpResolver {
    async fn follow_redirects(&self, url: &str) -> Result<Resolved> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .with_context(|| format!("HEAD {url} failed"))?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        Ok(Resolved {
            url: response.url().to_string(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::HttpResolver;
    use crate::config::FetchConfig;

    #[test]
    fn builds_from_config() -> Result<()> {
        HttpResolver::new(&FetchConfig::default())?;
        HttpResolver::new(&FetchConfig {
            timeout_ms: 500,
            max_redirects: 0,
            user_agent: Some("tester/1.0".into()),
        })?;
        Ok(())
    }
}
