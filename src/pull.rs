//! The pull loop: fetch chapters in order until too many fail in a row.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;

use crate::browser::{BrowserOptions, BrowserSession};
use crate::chapter::{failure_block, fetch_chapter};
use crate::cli::PullArgs;
use crate::fetcher::PageFetcher;
use crate::output_log::OutputLog;
use crate::source::{self, ChapterNumber};

#[derive(Debug, Clone)]
pub struct PullPolicy {
    pub start_chapter: ChapterNumber,
    pub ready_timeout: Duration,
    /// Pause after a chapter was written.
    pub success_delay: Duration,
    /// Pause before attempting again after a failure.
    pub retry_delay: Duration,
    pub max_consecutive_failures: u32,
    /// `true`: a failed chapter is attempted again. `false`: it is skipped.
    pub retry_current_chapter_on_failure: bool,
}

impl Default for PullPolicy {
    fn default() -> Self {
        Self {
            start_chapter: ChapterNumber::FIRST,
            ready_timeout: Duration::from_secs(15),
            success_delay: Duration::from_secs(2),
            retry_delay: Duration::from_secs(5),
            max_consecutive_failures: 3,
            retry_current_chapter_on_failure: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub chapter: ChapterNumber,
    pub consecutive_failures: u32,
}

impl RunState {
    #[must_use]
    pub fn new(start: ChapterNumber) -> Self {
        Self {
            chapter: start,
            consecutive_failures: 0,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.chapter = self.chapter.next();
    }

    pub fn record_failure(&mut self, policy: &PullPolicy) -> LoopState {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= policy.max_consecutive_failures {
            return LoopState::Stopped;
        }
        if !policy.retry_current_chapter_on_failure {
            self.chapter = self.chapter.next();
        }
        LoopState::Running
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullSummary {
    pub stopped_at: ChapterNumber,
    pub chapters_written: u64,
    pub failures_written: u64,
}

/// Runs the loop until it stops. Only output log errors escape.
pub async fn pull_chapters<F>(
    fetcher: &mut F,
    log: &OutputLog,
    policy: &PullPolicy,
) -> anyhow::Result<PullSummary>
where
    F: PageFetcher,
{
    let mut state = RunState::new(policy.start_chapter);
    let mut chapters_written = 0_u64;
    let mut failures_written = 0_u64;

    loop {
        let chapter = state.chapter;
        tracing::info!(%chapter, "loading chapter");

        match fetch_chapter(fetcher, chapter, policy.ready_timeout).await {
            Some(record) => {
                log.append(&record.to_block())
                    .with_context(|| format!("write chapter {chapter}"))?;
                chapters_written += 1;
                tracing::info!(%chapter, title = %record.title, "chapter appended");

                state.record_success();
                tokio::time::sleep(policy.success_delay).await;
            }
            None => {
                log.append(&failure_block(chapter))
                    .with_context(|| format!("write failure marker for chapter {chapter}"))?;
                failures_written += 1;

                match state.record_failure(policy) {
                    LoopState::Running => {
                        tracing::warn!(
                            %chapter,
                            consecutive_failures = state.consecutive_failures,
                            retry_in = ?policy.retry_delay,
                            "chapter failed to copy; trying again"
                        );
                        tokio::time::sleep(policy.retry_delay).await;
                    }
                    LoopState::Stopped => {
                        tracing::warn!(
                            %chapter,
                            consecutive_failures = state.consecutive_failures,
                            "too many consecutive failures; stopping"
                        );
                        break;
                    }
                }
            }
        }
    }

    Ok(PullSummary {
        stopped_at: state.chapter,
        chapters_written,
        failures_written,
    })
}

/// Runs [`pull_chapters`] and closes the fetcher afterwards, whether the loop
/// stopped normally or with an error.
pub async fn pull_and_close<F>(
    mut fetcher: F,
    log: &OutputLog,
    policy: &PullPolicy,
) -> anyhow::Result<PullSummary>
where
    F: PageFetcher,
{
    let outcome = pull_chapters(&mut fetcher, log, policy).await;
    let closed = fetcher.close().await;

    match (outcome, closed) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(_), Err(err)) => Err(err.context("close page fetcher")),
        (Err(err), closed) => {
            if let Err(close_err) = closed {
                tracing::warn!(error = %close_err, "close page fetcher");
            }
            Err(err)
        }
    }
}

pub async fn run(args: PullArgs) -> anyhow::Result<()> {
    let out_path = args
        .out
        .map(PathBuf::from)
        .unwrap_or_else(source::default_output_path);
    let log = OutputLog::create_if_missing(&out_path).context("prepare output log")?;
    tracing::info!(out = %log.path().display(), "output log ready");

    let session = BrowserSession::launch(BrowserOptions {
        headless: args.headless,
        chrome_executable: args.chrome.map(PathBuf::from),
        ..BrowserOptions::default()
    })
    .await
    .context("start browser session")?;

    let summary = pull_and_close(session, &log, &PullPolicy::default()).await?;
    tracing::info!(
        stopped_at = %summary.stopped_at,
        chapters_written = summary.chapters_written,
        failures_written = summary.failures_written,
        "pull finished"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_keeps_chapter_until_threshold() {
        let policy = PullPolicy::default();
        let mut state = RunState::new(ChapterNumber::FIRST);

        assert_eq!(state.record_failure(&policy), LoopState::Running);
        assert_eq!(state.record_failure(&policy), LoopState::Running);
        assert_eq!(state.chapter, ChapterNumber::FIRST);
        assert_eq!(state.record_failure(&policy), LoopState::Stopped);
        assert_eq!(state.chapter, ChapterNumber::FIRST);
        assert_eq!(state.consecutive_failures, 3);
    }

    #[test]
    fn success_resets_failures_and_advances() -> anyhow::Result<()> {
        let policy = PullPolicy::default();
        let mut state = RunState::new(ChapterNumber::new(7)?);

        state.record_failure(&policy);
        state.record_failure(&policy);
        state.record_success();

        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.chapter.get(), 8);
        Ok(())
    }

    #[test]
    fn skip_policy_advances_on_failure() {
        let policy = PullPolicy {
            retry_current_chapter_on_failure: false,
            ..PullPolicy::default()
        };
        let mut state = RunState::new(ChapterNumber::FIRST);

        assert_eq!(state.record_failure(&policy), LoopState::Running);
        assert_eq!(state.chapter.get(), 2);
        assert_eq!(state.record_failure(&policy), LoopState::Running);
        assert_eq!(state.chapter.get(), 3);
        assert_eq!(state.record_failure(&policy), LoopState::Stopped);
        assert_eq!(state.chapter.get(), 3);
    }

    #[test]
    fn default_policy_matches_fixed_contract() {
        let policy = PullPolicy::default();
        assert_eq!(policy.start_chapter, ChapterNumber::FIRST);
        assert_eq!(policy.ready_timeout, Duration::from_secs(15));
        assert_eq!(policy.success_delay, Duration::from_secs(2));
        assert_eq!(policy.retry_delay, Duration::from_secs(5));
        assert_eq!(policy.max_consecutive_failures, 3);
        assert!(policy.retry_current_chapter_on_failure);
    }
}
