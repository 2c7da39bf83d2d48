//! Pub/sub bridge: sensor messages are queued by topic and persisted by a
//! single background worker.

pub mod message;
pub mod worker;

pub use message::{SensorMessage, Topic};
pub use worker::{publish, queue, run_ingest_worker, IngestSender};
