//! Chrome-backed [`PageFetcher`] speaking CDP through chromiumoxide.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt as _;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

use crate::fetcher::{FetchError, PageFetcher, ReadyPage};
use crate::source::{self, ChapterNumber};

/// Fixed launch flags. Images are switched off for the whole session.
const CHROME_ARGS: &[&str] = &[
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--blink-settings=imagesEnabled=false",
];

const NAVIGATION_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub poll_interval: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_executable: None,
            poll_interval: Duration::from_millis(500),
        }
    }
}

pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    poll_interval: Duration,
    /// URL of the chapter last passed to `open`. Elements only count once the
    /// tab shows this document.
    expected_url: Option<Url>,
}

impl BrowserSession {
    pub async fn launch(options: BrowserOptions) -> anyhow::Result<Self> {
        tracing::info!(headless = options.headless, "launching chrome");

        let mut builder = BrowserConfig::builder();
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        for arg in CHROME_ARGS {
            builder = builder.arg(*arg);
        }
        let config = builder
            .build()
            .map_err(|err| anyhow::anyhow!("build chrome config: {err}"))?;

        let (browser, mut handler) = Browser::launch(config).await.context("launch chrome")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!(%err, "cdp handler event error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("open chapter tab")?;

        Ok(Self {
            browser,
            page,
            handler,
            poll_interval: options.poll_interval,
            expected_url: None,
        })
    }

    async fn poll_for(
        &self,
        selector: &str,
        what: &'static str,
        deadline: Instant,
        waited: Duration,
    ) -> Result<Element, FetchError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(FetchError::Timeout { what, waited });
            }

            match tokio::time::timeout(remaining, self.find_on_expected_document(selector)).await {
                Ok(Ok(Some(element))) => return Ok(element),
                Ok(Ok(None)) => tracing::trace!(selector, "previous document still loaded"),
                Ok(Err(err)) => tracing::trace!(selector, %err, "element not present yet"),
                Err(_) => return Err(FetchError::Timeout { what, waited }),
            }

            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }

    /// `Ok(None)` while the tab still shows some other document.
    async fn find_on_expected_document(
        &self,
        selector: &str,
    ) -> Result<Option<Element>, chromiumoxide::error::CdpError> {
        let current = self.page.url().await?;
        if let Some(expected) = &self.expected_url {
            if !is_expected_document(current.as_deref(), expected) {
                return Ok(None);
            }
        }
        self.page.find_element(selector).await.map(Some)
    }
}

/// Whether the tab's current URL is the chapter that was opened. Query,
/// fragment and a trailing slash are ignored.
fn is_expected_document(current: Option<&str>, expected: &Url) -> bool {
    let Some(current) = current.and_then(|raw| Url::parse(raw).ok()) else {
        return false;
    };
    current.scheme() == expected.scheme()
        && current.host_str() == expected.host_str()
        && current.port_or_known_default() == expected.port_or_known_default()
        && current.path().trim_end_matches('/') == expected.path().trim_end_matches('/')
}

#[async_trait]
impl PageFetcher for BrowserSession {
    type Element = Element;

    async fn open(&mut self, chapter: ChapterNumber) -> Result<(), FetchError> {
        let url = source::chapter_url(chapter).map_err(FetchError::session)?;
        tracing::info!(%url, "opening chapter");
        self.expected_url = Some(url.clone());

        let params = NavigateParams::builder()
            .url(url.as_str())
            .build()
            .map_err(|err| FetchError::Session {
                message: format!("navigate params for {url}: {err}"),
            })?;

        // The readiness wait is the only load gate, so a navigation that is
        // still in flight is not an error here.
        let response =
            match tokio::time::timeout(NAVIGATION_DISPATCH_TIMEOUT, self.page.execute(params)).await
            {
                Ok(response) => response.map_err(FetchError::session)?,
                Err(_) => {
                    tracing::debug!(%url, "navigation still in flight; moving on to readiness wait");
                    return Ok(());
                }
            };
        if let Some(error_text) = response.result.error_text {
            return Err(FetchError::Session {
                message: format!("navigate {url}: {error_text}"),
            });
        }
        Ok(())
    }

    async fn wait_for_ready(&mut self, timeout: Duration) -> Result<ReadyPage<Element>, FetchError> {
        let deadline = Instant::now() + timeout;

        let title = self
            .poll_for(source::HEADING_SELECTOR, "chapter heading", deadline, timeout)
            .await?;
        tracing::info!("chapter heading found");

        let body = self
            .poll_for(source::BODY_SELECTOR, "chapter text", deadline, timeout)
            .await?;
        tracing::info!("chapter text found");

        Ok(ReadyPage { title, body })
    }

    async fn text_of(&mut self, element: &Element) -> Result<String, FetchError> {
        match element.inner_text().await.map_err(FetchError::session)? {
            Some(text) => Ok(text.trim().to_owned()),
            None => Err(FetchError::NoText),
        }
    }

    async fn child_paragraphs(&mut self, container: &Element) -> Result<Vec<String>, FetchError> {
        let paragraphs = container
            .find_elements(source::PARAGRAPH_SELECTOR)
            .await
            .map_err(FetchError::session)?;

        let mut texts = Vec::with_capacity(paragraphs.len());
        for paragraph in paragraphs {
            let Some(text) = paragraph.inner_text().await.map_err(FetchError::session)? else {
                continue;
            };
            let text = text.trim();
            if !text.is_empty() {
                texts.push(text.to_owned());
            }
        }
        Ok(texts)
    }

    async fn close(mut self) -> anyhow::Result<()> {
        tracing::info!("closing chrome");
        let closed = self.browser.close().await.context("close chrome");
        if let Err(err) = self.browser.wait().await {
            tracing::debug!(%err, "wait for chrome exit");
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}
