//! Per-chapter extraction: wait, read title and paragraphs, clean, format.

use std::time::Duration;

use crate::clean::strip_translator_credits;
use crate::fetcher::{FetchError, PageFetcher};
use crate::source::ChapterNumber;

/// One chapter as it is written to the output log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRecord {
    pub title: String,
    pub body: String,
}

impl ChapterRecord {
    /// `\n\n<title>\n\n<body>\n\n`
    #[must_use]
    pub fn to_block(&self) -> String {
        format!("\n\n{}\n\n{}\n\n", self.title, self.body)
    }
}

/// Block written in place of a chapter that could not be retrieved.
#[must_use]
pub fn failure_block(chapter: ChapterNumber) -> String {
    format!("Chapter {chapter} FAILED TO COPY!\n\n")
}

/// Title used when the heading exists but carries no text.
#[must_use]
pub fn placeholder_title(chapter: ChapterNumber) -> String {
    format!("Chapter {chapter}")
}

/// Outcome of reading a single field off the page.
#[derive(Debug)]
pub enum Field<T> {
    Text(T),
    Missing,
    Failed(FetchError),
}

impl<T> From<Result<T, FetchError>> for Field<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => Self::Text(value),
            Err(err) if err.is_missing() => Self::Missing,
            Err(err) => Self::Failed(err),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChapterError {
    #[error("navigation failed: {0}")]
    Navigation(#[source] FetchError),

    #[error("page not ready: {0}")]
    NotReady(#[source] FetchError),

    #[error("title extraction failed: {0}")]
    Title(#[source] FetchError),

    #[error("chapter text missing")]
    BodyMissing,

    #[error("chapter text extraction failed: {0}")]
    Body(#[source] FetchError),
}

/// Retrieves one chapter. Every failure is logged and turned into `None`.
pub async fn fetch_chapter<F>(
    fetcher: &mut F,
    chapter: ChapterNumber,
    ready_timeout: Duration,
) -> Option<ChapterRecord>
where
    F: PageFetcher,
{
    match try_fetch_chapter(fetcher, chapter, ready_timeout).await {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!(%chapter, error = %err, "could not retrieve chapter");
            None
        }
    }
}

async fn try_fetch_chapter<F>(
    fetcher: &mut F,
    chapter: ChapterNumber,
    ready_timeout: Duration,
) -> Result<ChapterRecord, ChapterError>
where
    F: PageFetcher,
{
    fetcher.open(chapter).await.map_err(ChapterError::Navigation)?;

    let page = fetcher
        .wait_for_ready(ready_timeout)
        .await
        .map_err(ChapterError::NotReady)?;

    let title = match Field::from(fetcher.text_of(&page.title).await) {
        Field::Text(title) => title,
        Field::Missing => {
            tracing::debug!(%chapter, "heading has no text; using placeholder title");
            placeholder_title(chapter)
        }
        Field::Failed(err) => return Err(ChapterError::Title(err)),
    };

    let paragraphs = match Field::from(fetcher.child_paragraphs(&page.body).await) {
        Field::Text(paragraphs) => paragraphs,
        Field::Missing => return Err(ChapterError::BodyMissing),
        Field::Failed(err) => return Err(ChapterError::Body(err)),
    };

    let body = paragraphs
        .iter()
        .map(|paragraph| paragraph.trim())
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(ChapterRecord {
        title,
        body: strip_translator_credits(&body),
    })
}
