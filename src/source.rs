//! The one content source this tool pulls from.
//!
//! Everything here is fixed per build: host, work, selectors and the name of
//! the output file. Only the chapter number varies between requests.

use std::fmt;
use std::path::PathBuf;

use anyhow::Context as _;
use url::Url;

pub const SITE_HOST: &str = "ranobelib.me";
pub const WORK_ID: u32 = 48886;
pub const WORK_SLUG: &str = "alchemy-emperor-of-the-divine-dao";
pub const WORK_TITLE: &str = "Император Алхимии Божественного Пути";

/// Chapter heading.
pub const HEADING_SELECTOR: &str = "h1";
/// Container holding the chapter paragraphs.
pub const BODY_SELECTOR: &str = "main div.text-content";
/// Paragraphs directly under [`BODY_SELECTOR`].
pub const PARAGRAPH_SELECTOR: &str = ":scope > p";

/// Positive chapter index used in the `c<N>` URL segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChapterNumber(u32);

impl ChapterNumber {
    pub const FIRST: Self = Self(1);

    pub fn new(value: u32) -> anyhow::Result<Self> {
        if value == 0 {
            anyhow::bail!("chapter numbers start at 1");
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ChapterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub fn chapter_url(chapter: ChapterNumber) -> anyhow::Result<Url> {
    let raw = format!("https://{SITE_HOST}/ru/{WORK_ID}--{WORK_SLUG}/read/v1/c{chapter}");
    Url::parse(&raw).with_context(|| format!("parse chapter url: {raw}"))
}

/// `<work title>.txt` in the working directory.
#[must_use]
pub fn default_output_path() -> PathBuf {
    PathBuf::from(format!("{WORK_TITLE}.txt"))
}
