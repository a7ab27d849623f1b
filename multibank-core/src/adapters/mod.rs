//! Adapter implementations
//!
//! Adapters implement the ports and talk to the outside world:
//! - Open Banking HTTP client, one per connected bank
//! - JSON consent files, one pair per bank
//! - Tokio timer (and a recording stand-in) for the Delay port

pub mod consent_store;
pub mod delay;
pub mod openbanking;

#[cfg(test)]
pub mod openbanking_mock;
