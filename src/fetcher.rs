//! Contract between the chapter pipeline and whatever renders pages.
//!
//! The pipeline only needs to navigate, wait for the two elements that make a
//! chapter page readable, and read text back out of them. [`crate::browser`]
//! implements this on top of Chrome; tests script it in memory.

use std::time::Duration;

use async_trait::async_trait;

use crate::source::ChapterNumber;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{what} did not appear within {waited:?}")]
    Timeout { what: &'static str, waited: Duration },

    #[error("element not found: {selector}")]
    MissingElement { selector: String },

    #[error("element has no readable text")]
    NoText,

    #[error("browser session: {message}")]
    Session { message: String },
}

impl FetchError {
    pub fn session(err: impl std::fmt::Display) -> Self {
        Self::Session {
            message: err.to_string(),
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingElement { .. } | Self::NoText)
    }
}

/// Handles to the heading and the body container once both are present.
#[derive(Debug)]
pub struct ReadyPage<E> {
    pub title: E,
    pub body: E,
}

#[async_trait]
pub trait PageFetcher: Send {
    type Element: Send + Sync;

    /// Dispatches navigation to the chapter URL without waiting for load.
    async fn open(&mut self, chapter: ChapterNumber) -> Result<(), FetchError>;

    /// Polls until both the heading and the body container exist, or fails
    /// with [`FetchError::Timeout`].
    async fn wait_for_ready(
        &mut self,
        timeout: Duration,
    ) -> Result<ReadyPage<Self::Element>, FetchError>;

    /// Trimmed visible text of `element`.
    async fn text_of(&mut self, element: &Self::Element) -> Result<String, FetchError>;

    /// Trimmed, non-empty text of each paragraph child of `container`, in
    /// document order.
    async fn child_paragraphs(
        &mut self,
        container: &Self::Element,
    ) -> Result<Vec<String>, FetchError>;

    /// Ends the session. Called once, after the pull loop finishes.
    async fn close(self) -> anyhow::Result<()>
    where
        Self: Sized;
}
