//! Delay port - every wait a bank client performs
//!
//! Backoff sleeps and settle delays go through this trait so the schedule
//! can be observed (and skipped) in tests.

use std::time::Duration;

use async_trait::async_trait;

/// Something that can suspend the current task for a while
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
