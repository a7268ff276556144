use std::{ future::Future, time::Duration };

use tokio::{ sync::{ mpsc, watch }, task::JoinHandle, time::{ sleep, Instant } };
use tracing::{ debug, error, info, warn };

use super::{ LogStore, SinkState };
use crate::logger::{ AppLogger, LogRecord };

/// Connection policy of the sink worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Connection attempts at startup before the sink is given up on.
    pub max_attempts: u32,
    /// Fixed delay between two startup attempts.
    pub backoff: Duration,
    /// Minimum time between two reconnect attempts after an established connection was lost.
    pub reconnect_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Duration::from_secs(5),
            reconnect_interval: Duration::from_secs(30),
        }
    }
}

/// Owns the store and everything that can go wrong with it.
///
/// The worker connects with bounded retries, then drains the log buffer one record at a
/// time, so records sent from one request reach the store in the order they were sent.
/// Records that arrive while the sink is not connected, startup included, are reported
/// and dropped rather than held for later.
/// Failures are reported on the operational console and never travel back to the code
/// that logged.
pub struct SinkWorker {
    store: Box<dyn LogStore>,
    policy: RetryPolicy,
    receiver: mpsc::Receiver<LogRecord>,
    state: watch::Sender<SinkState>,
    last_reconnect: Option<Instant>,
}

impl SinkWorker {
    pub fn new(
        store: Box<dyn LogStore>,
        policy: RetryPolicy,
        receiver: mpsc::Receiver<LogRecord>,
        state: watch::Sender<SinkState>
    ) -> Self {
        Self {
            store,
            policy,
            receiver,
            state,
            last_reconnect: None,
        }
    }

    pub async fn run(mut self) {
        self.connect_with_retry().await;

        while let Some(record) = self.receiver.recv().await {
            self.write(record).await;
        }

        debug!(sink = self.store.name(), "Log buffer closed, sink worker stopping");
    }

    async fn connect_with_retry(&mut self) -> bool {
        let sink = self.store.name();
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            self.set_state(SinkState::Connecting);

            let connected = drop_until(
                &mut self.receiver,
                sink,
                SinkState::Connecting,
                self.store.connect()
            ).await;

            match connected {
                Ok(()) => {
                    self.set_state(SinkState::Connected);
                    info!(sink, attempt, "Connected to log sink");
                    return true;
                }
                Err(e) => {
                    self.set_state(SinkState::Disconnected);

                    if attempt == max_attempts {
                        warn!(sink, attempt, max_attempts, error = %e, "Log sink connection attempt failed");
                        break;
                    }

                    warn!(
                        sink,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Log sink connection attempt failed, retrying in {}ms",
                        self.policy.backoff.as_millis()
                    );
                    drop_until(
                        &mut self.receiver,
                        sink,
                        SinkState::Disconnected,
                        sleep(self.policy.backoff)
                    ).await;
                }
            }
        }

        self.set_state(SinkState::Failed);
        error!(
            sink,
            attempts = max_attempts,
            "Failed to connect to log sink, durable logging is disabled for this process"
        );
        false
    }

    async fn write(&mut self, record: LogRecord) {
        let sink = self.store.name();
        let state = *self.state.borrow();

        match state {
            SinkState::Connected => {}
            SinkState::Disconnected if self.reconnect_due() => {
                if !self.reconnect().await {
                    report_drop(sink, &record, SinkState::Disconnected);
                    return;
                }
            }
            other => {
                report_drop(sink, &record, other);
                return;
            }
        }

        if let Err(e) = self.store.insert(&record).await {
            error!(
                sink,
                record_id = %record.id(),
                level = %record.level(),
                error = %e,
                "Failed to insert log record"
            );

            if e.is_connection() {
                self.set_state(SinkState::Disconnected);
                self.last_reconnect = Some(Instant::now());
                warn!(sink, "Log sink connection lost, reconnecting on a later record");
            }
        }
    }

    async fn reconnect(&mut self) -> bool {
        let sink = self.store.name();
        self.last_reconnect = Some(Instant::now());
        self.set_state(SinkState::Connecting);

        match self.store.connect().await {
            Ok(()) => {
                self.set_state(SinkState::Connected);
                info!(sink, "Reconnected to log sink");
                true
            }
            Err(e) => {
                self.set_state(SinkState::Disconnected);
                warn!(sink, error = %e, "Log sink reconnect attempt failed");
                false
            }
        }
    }

    fn reconnect_due(&self) -> bool {
        match self.last_reconnect {
            Some(at) => at.elapsed() >= self.policy.reconnect_interval,
            None => true,
        }
    }

    fn set_state(&self, state: SinkState) {
        self.state.send_replace(state);
    }
}

/// Drives `until` to completion while reporting every record that arrives in the meantime
/// as dropped. Records are never held back for a connection that does not exist yet.
async fn drop_until<F: Future>(
    receiver: &mut mpsc::Receiver<LogRecord>,
    sink: &str,
    state: SinkState,
    until: F
) -> F::Output {
    tokio::pin!(until);
    let mut open = true;

    loop {
        tokio::select! {
            biased;

            record = receiver.recv(), if open => match record {
                Some(record) => report_drop(sink, &record, state),
                None => {
                    open = false;
                }
            },
            output = &mut until => {
                return output;
            }
        }
    }
}

fn report_drop(sink: &str, record: &LogRecord, state: SinkState) {
    error!(
        sink,
        record_id = %record.id(),
        level = %record.level(),
        state = ?state,
        "Cannot insert log: sink is not connected"
    );
}

/// Starts the sink worker for `store` and returns the logger that feeds it.
///
/// The worker stops once every clone of the returned logger has been dropped and the
/// buffer has been drained.
pub fn spawn_logger(
    store: Box<dyn LogStore>,
    policy: RetryPolicy,
    capacity: usize
) -> (AppLogger, JoinHandle<()>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let (state_tx, state_rx) = watch::channel(SinkState::Disconnected);

    let worker = SinkWorker::new(store, policy, receiver, state_tx);
    let handle = tokio::spawn(worker.run());

    (AppLogger::new(sender, state_rx), handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryLogStore;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(10),
            reconnect_interval: Duration::from_millis(50),
        }
    }

    async fn wait_for_state(logger: &AppLogger, expected: SinkState) {
        let mut state = logger.subscribe_state();
        tokio::time::timeout(Duration::from_secs(60), state.wait_for(|s| *s == expected))
            .await
            .expect("sink state did not change in time")
            .expect("sink worker stopped");
    }

    #[tokio::test]
    async fn test_records_are_written_in_call_order() {
        let store = MemoryLogStore::new();
        let (logger, _worker) = spawn_logger(Box::new(store.clone()), fast_policy(3), 64);
        wait_for_state(&logger, SinkState::Connected).await;

        for i in 0..20 {
            logger.log(format!("step {}", i), Some("OrderTest"), None);
        }

        let records = store.wait_for_records(20, Duration::from_secs(2)).await;
        let messages: Vec<&str> = records.iter().map(LogRecord::message).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("step {}", i)).collect();
        assert_eq!(messages, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_retries_are_spaced_by_backoff() {
        let store = MemoryLogStore::failing_connects(2);
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff: Duration::from_secs(5),
            reconnect_interval: Duration::from_secs(30),
        };
        let (logger, _worker) = spawn_logger(Box::new(store.clone()), policy, 16);

        wait_for_state(&logger, SinkState::Connected).await;

        let attempts = store.connect_attempts();
        assert_eq!(attempts.len(), 3);
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(5));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_logged_before_connecting_are_not_kept() {
        let store = MemoryLogStore::failing_connects(2);
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff: Duration::from_secs(5),
            reconnect_interval: Duration::from_secs(30),
        };
        let (logger, _worker) = spawn_logger(Box::new(store.clone()), policy, 4);

        for i in 0..3 {
            logger.log(format!("startup {}", i), None, None);
        }
        // inside the first backoff window
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(logger.state(), SinkState::Disconnected);
        for i in 3..6 {
            logger.log(format!("startup {}", i), None, None);
        }

        wait_for_state(&logger, SinkState::Connected).await;
        logger.log("connected", None, None);

        let records = store.wait_for_records(1, Duration::from_secs(2)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(records.len(), 1);
        assert_eq!(store.records().len(), 1);
        assert_eq!(records[0].message(), "connected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_leave_sink_failed() {
        let store = MemoryLogStore::failing_connects(u32::MAX);
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff: Duration::from_secs(5),
            reconnect_interval: Duration::from_secs(30),
        };
        let (logger, worker) = spawn_logger(Box::new(store.clone()), policy, 16);

        wait_for_state(&logger, SinkState::Failed).await;
        assert_eq!(store.connect_attempts().len(), 10);

        // logging keeps working as a no-op and the worker keeps draining
        logger.error("after failure", Some("RetryTest"), Some(500), Some("stack"));
        logger.warn("after failure", None, None);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(store.records().is_empty());
        assert_eq!(store.connect_attempts().len(), 10);
        assert_eq!(logger.state(), SinkState::Failed);
        assert!(!worker.is_finished());
    }

    #[tokio::test]
    async fn test_write_failure_loses_only_that_record() {
        let store = MemoryLogStore::new();
        let (logger, _worker) = spawn_logger(Box::new(store.clone()), fast_policy(3), 16);
        wait_for_state(&logger, SinkState::Connected).await;

        store.fail_next_writes(1, false);
        logger.log("lost", None, None);
        logger.log("kept", None, None);

        let records = store.wait_for_records(1, Duration::from_secs(2)).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message(), "kept");
        assert_eq!(logger.state(), SinkState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_connection_is_reestablished_lazily() {
        let store = MemoryLogStore::new();
        let (logger, _worker) = spawn_logger(Box::new(store.clone()), fast_policy(3), 16);
        wait_for_state(&logger, SinkState::Connected).await;

        store.fail_next_writes(1, true);
        logger.log("dropped with the connection", None, None);
        wait_for_state(&logger, SinkState::Disconnected).await;

        // inside the reconnect interval: dropped without a new attempt
        logger.log("too early", None, None);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.connect_attempts().len(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        logger.log("after reconnect", None, None);

        let records = store.wait_for_records(1, Duration::from_secs(2)).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message(), "after reconnect");
        assert_eq!(store.connect_attempts().len(), 2);
        assert_eq!(logger.state(), SinkState::Connected);
    }

    #[tokio::test]
    async fn test_worker_drains_buffer_and_stops_when_logger_dropped() {
        let store = MemoryLogStore::new();
        let (logger, worker) = spawn_logger(Box::new(store.clone()), fast_policy(3), 16);
        wait_for_state(&logger, SinkState::Connected).await;

        logger.log("one", None, None);
        logger.log("two", None, None);
        drop(logger);

        tokio::time::timeout(Duration::from_secs(2), worker).await.unwrap().unwrap();
        assert_eq!(store.records().len(), 2);
    }
}
