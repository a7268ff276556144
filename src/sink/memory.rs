// In-process stores: a memory store for local runs and tests, and a store that discards
// everything

use std::{ sync::{ Arc, Mutex, MutexGuard, PoisonError }, time::Duration };

use async_trait::async_trait;
use tokio::time::Instant;

use super::{ LogStore, SinkError };
use crate::logger::LogRecord;

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<LogRecord>,
    connected: bool,
    connect_attempts: Vec<Instant>,
    connect_failures: u32,
    write_failures: u32,
    drop_connection_on_failure: bool,
}

/// Keeps records in memory. Clones share the same storage, so a test can hand one clone
/// to the sink worker and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose first `failures` connection attempts are refused.
    pub fn failing_connects(failures: u32) -> Self {
        let store = Self::new();
        store.lock().connect_failures = failures;
        store
    }

    /// Makes the next `failures` inserts fail. With `drop_connection` the failure is
    /// reported as a lost connection rather than a rejected write.
    pub fn fail_next_writes(&self, failures: u32, drop_connection: bool) {
        let mut state = self.lock();
        state.write_failures = failures;
        state.drop_connection_on_failure = drop_connection;
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().records.clone()
    }

    pub fn connect_attempts(&self) -> Vec<Instant> {
        self.lock().connect_attempts.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Polls until at least `count` records were stored or `timeout` passes.
    pub async fn wait_for_records(&self, count: usize, timeout: Duration) -> Vec<LogRecord> {
        let deadline = Instant::now() + timeout;
        loop {
            let records = self.records();
            if records.len() >= count || Instant::now() >= deadline {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&mut self) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.connect_attempts.push(Instant::now());

        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            state.connected = false;
            return Err(SinkError::Connection("memory store refused the connection".into()));
        }

        state.connected = true;
        Ok(())
    }

    async fn insert(&self, record: &LogRecord) -> Result<(), SinkError> {
        let mut state = self.lock();

        if !state.connected {
            return Err(SinkError::NotConnected);
        }

        if state.write_failures > 0 {
            state.write_failures -= 1;
            if state.drop_connection_on_failure {
                state.connected = false;
                return Err(SinkError::Connection("memory store connection dropped".into()));
            }
            return Err(SinkError::Write("memory store rejected the record".into()));
        }

        state.records.push(record.clone());
        Ok(())
    }
}

/// Accepts every record and keeps none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogStore;

#[async_trait]
impl LogStore for NoopLogStore {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn connect(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn insert(&self, _record: &LogRecord) -> Result<(), SinkError> {
        Ok(())
    }
}
