//! Two-phase pulse signals.
//!
//! A pulse sends `true` immediately and `false` after a hold duration. The
//! deferred half runs on a [`Scheduler`] so the caller never waits for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

use super::client::{OscTransport, OscValue};

/// Default time between the `true` and `false` halves of a pulse.
pub const DEFAULT_PULSE_HOLD: Duration = Duration::from_millis(50);

/// Deferred action accepted by a [`Scheduler`].
pub type DeferredAction = Box<dyn FnOnce() + Send + 'static>;

/// Runs actions after a delay. No cancellation.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, action: DeferredAction);
}

/// Schedules each deferred action as its own tokio task.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler for the runtime the caller is running on.
    #[must_use]
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, action: DeferredAction) {
        // Deadline is fixed here, not when the task first runs.
        let deadline = Instant::now() + delay;
        self.handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            action();
        });
    }
}

/// Sends pulses and plain values over an [`OscTransport`].
pub struct PulseNotifier {
    transport: Arc<dyn OscTransport>,
    scheduler: Arc<dyn Scheduler>,
    hold: Duration,
    open: AtomicBool,
}

impl PulseNotifier {
    #[must_use]
    pub fn new(
        transport: Arc<dyn OscTransport>,
        scheduler: Arc<dyn Scheduler>,
        hold: Duration,
    ) -> Self {
        Self {
            transport,
            scheduler,
            hold,
            open: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Pulse `address` with the configured hold.
    pub fn pulse(&self, address: &str) {
        self.pulse_for(address, self.hold);
    }

    /// Send `true` to `address` now and `false` once `hold` has elapsed.
    ///
    /// Does nothing after [`close`](Self::close).
    pub fn pulse_for(&self, address: &str, hold: Duration) {
        if !self.is_open() {
            return;
        }

        self.transport.send(address, OscValue::Bool(true));

        let transport = Arc::clone(&self.transport);
        let address = address.to_string();
        self.scheduler.schedule(
            hold,
            Box::new(move || transport.send(&address, OscValue::Bool(false))),
        );
    }

    /// Send a single value. Does nothing after [`close`](Self::close).
    pub fn send(&self, address: &str, value: OscValue) {
        if self.is_open() {
            self.transport.send(address, value);
        }
    }

    /// Stop accepting new signals and release the transport.
    ///
    /// Already scheduled `false` emissions are not cancelled; they reach a
    /// closed transport and are dropped.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.transport.close();
            tracing::debug!("Pulse notifier closed");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;

    fn notifier(transport: &Arc<RecordingTransport>) -> PulseNotifier {
        PulseNotifier::new(
            Arc::clone(transport) as Arc<dyn OscTransport>,
            Arc::new(TokioScheduler::current().unwrap()),
            DEFAULT_PULSE_HOLD,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_sends_true_then_false_after_hold() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier(&transport);

        let start = Instant::now();
        notifier.pulse("/join");

        // `true` is sent synchronously.
        assert_eq!(
            transport.messages(),
            vec![("/join".to_string(), OscValue::Bool(true))]
        );

        tokio::time::sleep(Duration::from_millis(200)).await;

        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0, "/join");
        assert_eq!(sent[1].1, OscValue::Bool(false));
        assert!(sent[1].2 - start >= DEFAULT_PULSE_HOLD);
        assert!(sent[1].2 - sent[0].2 >= DEFAULT_PULSE_HOLD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_addresses_pair_independently() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier(&transport);

        notifier.pulse("/join");
        tokio::time::sleep(Duration::from_millis(10)).await;
        notifier.pulse("/leave");
        tokio::time::sleep(Duration::from_millis(200)).await;

        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 4);

        for address in ["/join", "/leave"] {
            let for_address: Vec<_> = sent.iter().filter(|(a, _, _)| a == address).collect();
            assert_eq!(for_address.len(), 2);
            assert_eq!(for_address[0].1, OscValue::Bool(true));
            assert_eq!(for_address[1].1, OscValue::Bool(false));
            assert!(for_address[1].2 - for_address[0].2 >= DEFAULT_PULSE_HOLD);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_does_not_block_caller() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier(&transport);

        let start = Instant::now();
        notifier.pulse_for("/slow", Duration::from_secs(10));
        assert_eq!(Instant::now(), start);
        assert_eq!(transport.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_rejects_new_and_drops_pending() {
        let transport = Arc::new(RecordingTransport::default());
        let notifier = notifier(&transport);

        notifier.pulse("/join");
        notifier.close();
        assert!(!notifier.is_open());

        notifier.pulse("/leave");
        notifier.send("/hours", OscValue::Int(12));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(
            transport.messages(),
            vec![("/join".to_string(), OscValue::Bool(true))]
        );
    }

    #[test]
    fn test_scheduler_outside_runtime() {
        assert!(TokioScheduler::current().is_none());
    }

    #[test]
    fn test_send_value_inside_block_on() {
        let transport = Arc::new(RecordingTransport::default());
        tokio_test::block_on(async {
            let notifier = notifier(&transport);
            notifier.send("/minutes", OscValue::Int(5));
        });
        assert_eq!(
            transport.messages(),
            vec![("/minutes".to_string(), OscValue::Int(5))]
        );
    }
}
