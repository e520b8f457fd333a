//! Debug panel log
//!
//! Timestamped, human-readable lifecycle log. Lines are kept in a
//! bounded panel buffer (latest last, like an auto-scrolled panel) and
//! broadcast to live subscribers.

use chrono::Local;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::broadcast;

/// Panel buffer capacity, in lines
const PANEL_CAPACITY: usize = 500;

pub struct DebugLog {
    lines: Mutex<VecDeque<String>>,
    tx: broadcast::Sender<String>,
}

impl DebugLog {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            lines: Mutex::new(VecDeque::new()),
            tx,
        }
    }

    /// Append a timestamped line and notify subscribers
    pub fn push(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        let line = format!("{}: {}", Local::now().format("%H:%M:%S"), message);
        tracing::debug!("{message}");

        let mut lines = self.lines.lock();
        lines.push_back(line.clone());
        while lines.len() > PANEL_CAPACITY {
            lines.pop_front();
        }
        drop(lines);

        let _ = self.tx.send(line);
    }

    /// Subscribe to new log lines
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Snapshot of the panel, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_timestamped_and_ordered() {
        let log = DebugLog::new();
        log.push("first");
        log.push("second");

        let lines = log.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(": first"));
        assert!(lines[1].ends_with(": second"));
    }

    #[test]
    fn test_panel_buffer_is_bounded() {
        let log = DebugLog::new();
        for i in 0..PANEL_CAPACITY + 10 {
            log.push(format!("line {i}"));
        }
        assert_eq!(log.len(), PANEL_CAPACITY);
        // Oldest lines were dropped
        assert!(log.lines()[0].ends_with(": line 10"));
    }

    #[tokio::test]
    async fn test_subscribers_see_new_lines() {
        let log = DebugLog::new();
        let mut rx = log.subscribe();
        log.push("hello");
        let line = rx.recv().await.unwrap();
        assert!(line.ends_with(": hello"));
    }
}
