//! Per-run state shared between the coordinator and its workers.

use crate::events::{Event, EventSender, PipelineEvent, PipelinePhase};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cooperative cancellation flag.
///
/// Clones share the flag, so a UI thread can hold one clone and call
/// [`cancel`](Self::cancel) while the pipeline polls another.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop at its next check point
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// State of one pipeline run.
///
/// Owned by the coordinator thread; workers only ever see the token.
pub struct RunContext {
    token: CancellationToken,
    events: EventSender,
    progress: f64,
    errors: Vec<String>,
}

impl RunContext {
    /// Create a context reporting to `events` and stopping on `token`
    pub fn new(events: EventSender, token: CancellationToken) -> Self {
        Self {
            token,
            events,
            progress: 0.0,
            errors: Vec::new(),
        }
    }

    /// The run's cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether a stop was requested
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Sender for the run's events
    pub fn events(&self) -> &EventSender {
        &self.events
    }

    /// Send an event to the listener, if any
    pub fn emit(&self, event: Event) {
        self.events.send(event);
    }

    /// Announce a new phase and move progress to its starting point
    pub fn enter_phase(&mut self, phase: PipelinePhase) {
        debug!(phase = %phase, "Entering phase");
        self.emit(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
        self.advance_to(phase.start_percent());
    }

    /// Move overall progress forward to `percent`.
    ///
    /// Values at or below the current progress are ignored, so listeners
    /// only ever see a non-decreasing sequence capped at 100.
    pub fn advance_to(&mut self, percent: f64) {
        let percent = percent.min(100.0);
        if percent > self.progress {
            self.progress = percent;
            self.emit(Event::Pipeline(PipelineEvent::Progress { percent }));
        }
    }

    /// Move overall progress forward by `delta` percentage points
    pub fn advance_by(&mut self, delta: f64) {
        self.advance_to(self.progress + delta);
    }

    /// Current overall progress in percent
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Record a per-item failure; the run continues
    pub fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "Skipping item");
        self.errors.push(message);
    }

    /// Per-item failures recorded so far
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub(crate) fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventChannel;

    fn progress_values(events: Vec<Event>) -> Vec<f64> {
        events
            .into_iter()
            .filter_map(|e| match e {
                Event::Pipeline(PipelineEvent::Progress { percent }) => Some(percent),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn clones_share_cancellation() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();

        assert!(clone.is_cancelled());
    }

    #[test]
    fn progress_never_decreases() {
        let (sender, receiver) = EventChannel::new();
        let mut ctx = RunContext::new(sender, CancellationToken::new());

        ctx.advance_to(10.0);
        ctx.advance_to(5.0);
        ctx.advance_by(2.5);
        ctx.advance_to(250.0);
        drop(ctx);

        assert_eq!(progress_values(receiver.iter().collect()), vec![10.0, 12.5, 100.0]);
    }

    #[test]
    fn entering_phase_jumps_to_its_start() {
        let (sender, receiver) = EventChannel::new();
        let mut ctx = RunContext::new(sender, CancellationToken::new());

        ctx.enter_phase(PipelinePhase::Hashing);
        assert_eq!(ctx.progress(), 15.0);
        drop(ctx);

        let events: Vec<_> = receiver.iter().collect();
        assert!(matches!(
            events[0],
            Event::Pipeline(PipelineEvent::PhaseChanged {
                phase: PipelinePhase::Hashing
            })
        ));
    }

    #[test]
    fn errors_are_collected() {
        let mut ctx = RunContext::new(crate::events::null_sender(), CancellationToken::new());

        ctx.record_error("bad.png: unreadable");

        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.take_errors(), vec!["bad.png: unreadable".to_string()]);
        assert!(ctx.errors().is_empty());
    }
}
