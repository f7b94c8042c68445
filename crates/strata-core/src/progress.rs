//! One-way progress messages and cooperative cancellation

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Severity of a progress message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Info,
    Progress,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
    /// Set for [`MessageLevel::Progress`]
    pub percent: Option<u8>,
}

impl Message {
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.into(),
            percent: None,
        }
    }

    #[must_use]
    pub fn progress(text: impl Into<String>, percent: u8) -> Self {
        Self {
            level: MessageLevel::Progress,
            text: text.into(),
            percent: Some(percent.min(100)),
        }
    }

    #[must_use]
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            text: text.into(),
            percent: None,
        }
    }
}

/// Receiver of progress messages; never used to synchronize
pub trait ProgressSink: Send + Sync {
    fn send(&self, message: Message);
}

/// Drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn send(&self, _message: Message) {}
}

/// Forwards messages to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn send(&self, message: Message) {
        match message.level {
            MessageLevel::Info => tracing::info!(target: "strata::progress", "{}", message.text),
            MessageLevel::Progress => tracing::debug!(
                target: "strata::progress",
                percent = message.percent.unwrap_or_default(),
                "{}",
                message.text
            ),
            MessageLevel::Warning => tracing::warn!(target: "strata::progress", "{}", message.text),
        }
    }
}

/// Keeps every message; used by tests and the CLI's JSON output
#[derive(Debug, Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<Message>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    #[must_use]
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl ProgressSink for CollectingSink {
    fn send(&self, message: Message) {
        self.messages.lock().push(message);
    }
}

/// Shared cancellation flag, polled at explicit points
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a filter body may talk to besides the tree
#[derive(Clone)]
pub struct RunContext {
    pub progress: Arc<dyn ProgressSink>,
    pub cancel: CancelToken,
    /// Minimum percent change between two progress messages
    pub progress_step_percent: u8,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            progress: Arc::new(NullSink),
            cancel: CancelToken::new(),
            progress_step_percent: 5,
        }
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress_step_percent", &self.progress_step_percent)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_progress_step(mut self, percent: u8) -> Self {
        self.progress_step_percent = percent;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn info(&self, text: impl Into<String>) {
        self.progress.send(Message::info(text));
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.progress.send(Message::warning(text));
    }

    /// Throttled counter over `total` work items
    #[must_use]
    pub fn counter(&self, label: impl Into<String>, total: usize) -> ProgressCounter<'_> {
        ProgressCounter {
            ctx: self,
            label: label.into(),
            total,
            done: AtomicUsize::new(0),
            last_percent: AtomicUsize::new(0),
        }
    }
}

/// Counts finished work items and emits a message per step; usable from rayon workers
pub struct ProgressCounter<'a> {
    ctx: &'a RunContext,
    label: String,
    total: usize,
    done: AtomicUsize,
    last_percent: AtomicUsize,
}

impl ProgressCounter<'_> {
    /// Record `n` finished items
    pub fn advance(&self, n: usize) {
        if self.total == 0 {
            return;
        }
        let done = self.done.fetch_add(n, Ordering::Relaxed) + n;
        let percent = (done.min(self.total) * 100) / self.total;
        let step = usize::from(self.ctx.progress_step_percent.max(1));
        let last = self.last_percent.load(Ordering::Relaxed);
        if percent >= last + step
            && self
                .last_percent
                .compare_exchange(last, percent, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            let percent = u8::try_from(percent).unwrap_or(100);
            self.ctx
                .progress
                .send(Message::progress(format!("{} {percent}%", self.label), percent));
        }
    }

    #[must_use]
    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn counter_throttles_by_step() {
        let sink = Arc::new(CollectingSink::new());
        let ctx = RunContext::new()
            .with_progress(sink.clone())
            .with_progress_step(25);
        let counter = ctx.counter("Filling", 100);
        for _ in 0..100 {
            counter.advance(1);
        }
        let percents: Vec<_> = sink.messages().iter().filter_map(|m| m.percent).collect();
        assert_eq!(percents, vec![25, 50, 75, 100]);
        assert_eq!(counter.done(), 100);
    }

    #[test]
    fn empty_counter_is_silent() {
        let sink = Arc::new(CollectingSink::new());
        let ctx = RunContext::new().with_progress(sink.clone());
        ctx.counter("Nothing", 0).advance(10);
        assert!(sink.messages().is_empty());
    }
}
