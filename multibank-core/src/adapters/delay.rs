//! Delay adapters

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::Delay;

/// Real wall-clock sleeping on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records every requested wait and returns immediately
///
/// Used by tests and dry runs to inspect the backoff schedule without
/// spending it.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// All waits requested so far, in order
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Requested waits in whole seconds
    pub fn waits_secs(&self) -> Vec<u64> {
        self.waits().iter().map(|d| d.as_secs()).collect()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_delay_keeps_order() {
        let delay = RecordingDelay::new();
        delay.sleep(Duration::from_secs(1)).await;
        delay.sleep(Duration::from_secs(2)).await;
        assert_eq!(delay.waits_secs(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_delay_waits() {
        let start = tokio::time::Instant::now();
        TokioDelay.sleep(Duration::from_secs(10)).await;
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
