use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ranobe_pull::fetcher::{FetchError, PageFetcher, ReadyPage};
use ranobe_pull::source::ChapterNumber;

/// What the next `open` + `wait_for_ready` pair will see.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Attempt {
    Chapter {
        title: Option<&'static str>,
        paragraphs: Vec<&'static str>,
    },
    NotReady,
    NavigationError,
    BodyError,
}

#[allow(dead_code)]
pub fn chapter(title: &'static str, paragraphs: &[&'static str]) -> Attempt {
    Attempt::Chapter {
        title: Some(title),
        paragraphs: paragraphs.to_vec(),
    }
}

#[derive(Debug)]
pub enum FakeElement {
    Heading(Option<String>),
    Paragraphs(Vec<String>),
    BrokenBody,
}

/// Shared view into a fetcher that may already have been consumed by `close`.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    opened: Arc<Mutex<Vec<u32>>>,
    closes: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl Probe {
    pub fn opened(&self) -> Vec<u32> {
        self.opened.lock().expect("lock opened chapters").clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct ScriptedFetcher {
    script: VecDeque<Attempt>,
    current: Option<Attempt>,
    probe: Probe,
    close_error: Option<&'static str>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Attempt>) -> (Self, Probe) {
        let probe = Probe::default();
        let fetcher = Self {
            script: script.into(),
            current: None,
            probe: probe.clone(),
            close_error: None,
        };
        (fetcher, probe)
    }

    /// Makes `close` report `message` after counting the call.
    #[allow(dead_code)]
    pub fn with_close_error(mut self, message: &'static str) -> Self {
        self.close_error = Some(message);
        self
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    type Element = FakeElement;

    async fn open(&mut self, chapter: ChapterNumber) -> Result<(), FetchError> {
        self.probe
            .opened
            .lock()
            .expect("lock opened chapters")
            .push(chapter.get());

        // An exhausted script behaves like a site that stopped answering.
        let attempt = self.script.pop_front().unwrap_or(Attempt::NotReady);
        if matches!(attempt, Attempt::NavigationError) {
            self.current = None;
            return Err(FetchError::session("net::ERR_CONNECTION_RESET"));
        }
        self.current = Some(attempt);
        Ok(())
    }

    async fn wait_for_ready(
        &mut self,
        timeout: Duration,
    ) -> Result<ReadyPage<FakeElement>, FetchError> {
        match self.current.take() {
            Some(Attempt::Chapter { title, paragraphs }) => Ok(ReadyPage {
                title: FakeElement::Heading(title.map(str::to_owned)),
                body: FakeElement::Paragraphs(
                    paragraphs.into_iter().map(str::to_owned).collect(),
                ),
            }),
            Some(Attempt::BodyError) => Ok(ReadyPage {
                title: FakeElement::Heading(Some("Broken".to_owned())),
                body: FakeElement::BrokenBody,
            }),
            _ => Err(FetchError::Timeout {
                what: "chapter heading",
                waited: timeout,
            }),
        }
    }

    async fn text_of(&mut self, element: &FakeElement) -> Result<String, FetchError> {
        match element {
            FakeElement::Heading(Some(text)) => Ok(text.trim().to_owned()),
            FakeElement::Heading(None) => Err(FetchError::MissingElement {
                selector: "h1".to_owned(),
            }),
            _ => Err(FetchError::session("not a heading")),
        }
    }

    async fn child_paragraphs(
        &mut self,
        container: &FakeElement,
    ) -> Result<Vec<String>, FetchError> {
        match container {
            FakeElement::Paragraphs(paragraphs) => Ok(paragraphs.clone()),
            FakeElement::BrokenBody => Err(FetchError::session("node is detached from document")),
            FakeElement::Heading(_) => Err(FetchError::session("not a text container")),
        }
    }

    async fn close(self) -> anyhow::Result<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        match self.close_error {
            Some(message) => Err(anyhow::anyhow!(message)),
            None => Ok(()),
        }
    }
}
