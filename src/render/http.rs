use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::table::{has_match, parse_table, validate_selector};
use super::{PageRenderer, RenderSession};
use crate::config::Config;
use crate::error::{Result, ScrapeError};
use crate::shutdown::Cancel;
use crate::types::TableSnapshot;

/// Renders pages by fetching their server-side HTML. The ranking table is
/// present in the initial document, so no script execution is needed.
pub struct HttpRenderer {
    client: reqwest::Client,
    poll_interval: Duration,
}

impl HttpRenderer {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            poll_interval: Duration::from_millis(cfg.wait_poll_ms),
        })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn launch(&self) -> std::result::Result<Box<dyn RenderSession>, ScrapeError> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            poll_interval: self.poll_interval,
            url: None,
            html: None,
        }))
    }
}

struct HttpSession {
    client: reqwest::Client,
    poll_interval: Duration,
    url: Option<String>,
    html: Option<String>,
}

impl HttpSession {
    async fn fetch(&self, url: &str) -> std::result::Result<String, ScrapeError> {
        let nav_err = |e: reqwest::Error| ScrapeError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };
        self.client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(nav_err)?
            .text()
            .await
            .map_err(nav_err)
    }

    fn current_has(&self, selector: &str) -> std::result::Result<bool, ScrapeError> {
        match &self.html {
            Some(html) => has_match(html, selector),
            None => Ok(false),
        }
    }

    async fn poll_until_present(&mut self, selector: &str) -> std::result::Result<(), ScrapeError> {
        loop {
            if self.current_has(selector)? {
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
            let Some(url) = self.url.clone() else {
                continue;
            };
            match self.fetch(&url).await {
                Ok(html) => self.html = Some(html),
                Err(e) => debug!("reload while waiting for `{selector}` failed: {e}"),
            }
        }
    }
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> std::result::Result<(), ScrapeError> {
        let html = self.fetch(url).await?;
        debug!(url, bytes = html.len(), "page loaded");
        self.url = Some(url.to_string());
        self.html = Some(html);
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
        cancel: &Cancel,
    ) -> std::result::Result<(), ScrapeError> {
        validate_selector(selector)?;
        tokio::select! {
            res = tokio::time::timeout(timeout, self.poll_until_present(selector)) => match res {
                Ok(inner) => inner,
                Err(_) => Err(ScrapeError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                }),
            },
            _ = cancel.cancelled() => Err(ScrapeError::Cancelled),
        }
    }

    async fn evaluate_table(
        &mut self,
        table_selector: &str,
    ) -> std::result::Result<TableSnapshot, ScrapeError> {
        let html = self
            .html
            .as_deref()
            .ok_or_else(|| ScrapeError::Evaluation("no page loaded".to_string()))?;
        parse_table(html, table_selector)
    }

    async fn close(self: Box<Self>) {
        debug!(url = self.url.as_deref().unwrap_or("-"), "render session closed");
    }
}
