//! Service layer - business logic orchestration
//!
//! Services coordinate the bank clients on behalf of callers (CLI, tests).

mod aggregation;

pub use aggregation::AggregationService;
