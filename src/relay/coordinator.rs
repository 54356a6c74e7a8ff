//! Wires the watcher, classifier, notifier and clock together.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::clock::{ClockTicker, TimeOfDay};
use crate::config::{OscConfig, RelayConfig, WatchMode};
use crate::osc::{OscTransport, OscValue, PulseNotifier, TokioScheduler};
use crate::watcher::{
    ChangeNotice, EventClassifier, FileSubscriber, LogEvent, LogLocator, NotifySubscriber,
    PollingSubscriber, Rescan, RescanOutcome, RotationWatcher,
};

use super::message::{MessageQueue, RelayMessage};

/// Errors raised while assembling a coordinator.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("The relay must be started inside a tokio runtime")]
    NoRuntime,
}

/// Owns all relay state and drives it from change notices and clock ticks.
pub struct Coordinator {
    watcher: RotationWatcher,
    classifier: EventClassifier,
    notifier: PulseNotifier,
    osc: OscConfig,
    queue: MessageQueue,
    notices: mpsc::UnboundedReceiver<ChangeNotice>,
    ticker: ClockTicker,
}

impl Coordinator {
    /// Assemble a coordinator from already-built parts.
    ///
    /// `notices` must be the receiver paired with the sender `watcher` hands
    /// to its subscriptions.
    #[must_use]
    pub fn new(
        watcher: RotationWatcher,
        classifier: EventClassifier,
        notifier: PulseNotifier,
        osc: OscConfig,
        queue: MessageQueue,
        notices: mpsc::UnboundedReceiver<ChangeNotice>,
    ) -> Self {
        Self {
            watcher,
            classifier,
            notifier,
            osc,
            queue,
            notices,
            ticker: ClockTicker::new(),
        }
    }

    /// Build a coordinator from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NoRuntime`] when called outside a tokio runtime.
    pub fn from_config(
        config: &RelayConfig,
        transport: Arc<dyn OscTransport>,
        queue: MessageQueue,
    ) -> Result<Self, RelayError> {
        let scheduler = TokioScheduler::current().ok_or(RelayError::NoRuntime)?;
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let subscriber: Box<dyn FileSubscriber> = match config.watch.mode {
            WatchMode::Notify => Box::new(NotifySubscriber::new(config.watch.debounce())),
            WatchMode::Poll => Box::new(PollingSubscriber::new(config.watch.poll_interval())),
        };
        let locator = LogLocator::new(
            config.log_dir.clone(),
            config.file_prefix.clone(),
            config.file_suffix.clone(),
        );

        Ok(Self::new(
            RotationWatcher::new(locator, subscriber, notice_tx),
            EventClassifier::new(config.markers.join.clone(), config.markers.leave.clone()),
            PulseNotifier::new(transport, Arc::new(scheduler), config.osc.pulse_hold()),
            config.osc.clone(),
            queue,
            notice_rx,
        ))
    }

    #[must_use]
    pub fn watcher(&self) -> &RotationWatcher {
        &self.watcher
    }

    /// Initial scan followed by an immediate time update.
    pub async fn start(&mut self) {
        let outcome = self.watcher.rescan().await;
        self.publish_rescan(outcome);
        self.emit_time(&Local::now());
    }

    /// Wait for the next change notice.
    pub async fn next_notice(&mut self) -> Option<ChangeNotice> {
        self.notices.recv().await
    }

    /// Read and dispatch whatever the notice's file gained.
    pub async fn handle_notice(&mut self, notice: ChangeNotice) {
        match self.watcher.handle_notice(&notice).await {
            Ok(lines) => self.dispatch_lines(&lines),
            Err(e) => {
                tracing::warn!(path = %notice.path.display(), error = %e, "Log read failed");
                self.queue.push(RelayMessage::ReadFailed(e.to_string()));
            }
        }
    }

    /// Minute tick: re-scan for a newer file and send the time.
    pub async fn on_tick(&mut self, now: DateTime<Local>) {
        let outcome = self.watcher.rescan().await;
        self.publish_rescan(outcome);

        if !self.watcher.is_subscribed() && self.watcher.active_path().is_some() {
            match self.watcher.catch_up().await {
                Ok(lines) => self.dispatch_lines(&lines),
                Err(e) => {
                    tracing::warn!(error = %e, "Log read failed during re-scan");
                    self.queue.push(RelayMessage::ReadFailed(e.to_string()));
                }
            }
        }

        self.emit_time(&now);
    }

    /// Run until `cancel` fires, then shut down.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.start().await;

        let mut deadline = self.ticker.next_deadline();
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                Some(notice) = self.notices.recv() => self.handle_notice(notice).await,
                () = tokio::time::sleep_until(deadline) => {
                    self.on_tick(Local::now()).await;
                    deadline = self.ticker.next_deadline();
                }
            }
        }

        self.shutdown();
    }

    /// Stop watching and close the notifier. Pending pulse halves are dropped.
    pub fn shutdown(&mut self) {
        self.watcher.shutdown();
        self.notifier.close();
        tracing::info!("Relay stopped");
    }

    fn address_for(&self, event: LogEvent) -> &str {
        match event {
            LogEvent::PlayerJoined => &self.osc.join_address,
            LogEvent::PlayerLeft => &self.osc.leave_address,
        }
    }

    fn dispatch_lines(&self, lines: &[String]) {
        for line in lines {
            let Some(event) = self.classifier.classify(line) else {
                continue;
            };
            tracing::info!(?event, "Detected log event");
            self.queue.push(RelayMessage::Event(event));
            self.notifier.pulse(self.address_for(event));
        }
    }

    fn publish_rescan(&self, outcome: RescanOutcome) {
        match outcome.change {
            Rescan::Started(path) => self.queue.push(RelayMessage::MonitoringStarted(path)),
            Rescan::Switched { to, .. } => self.queue.push(RelayMessage::Switched { to }),
            Rescan::Missing { first_report: true } => self.queue.push(RelayMessage::LogNotFound {
                dir: self.watcher.locator().dir().to_path_buf(),
            }),
            Rescan::Missing { first_report: false } | Rescan::Unchanged => {}
        }

        if let Some(e) = outcome.subscription_error {
            self.queue.push(RelayMessage::SubscribeFailed(e.to_string()));
        }
    }

    fn emit_time(&self, now: &DateTime<Local>) {
        let time = TimeOfDay::from_datetime(now);
        self.notifier.send(
            &self.osc.hours_address,
            OscValue::Int(i32::try_from(time.hour).unwrap_or_default()),
        );
        self.notifier.send(
            &self.osc.minutes_address,
            OscValue::Int(i32::try_from(time.minute).unwrap_or_default()),
        );
        self.queue.push(RelayMessage::Clock(time));
    }
}
