//! HTTP API for the study assistant
//!
//! Exposes the task graph, progress store, and orchestrators over REST:
//! material ingestion, agent runs, progress queries, quiz answers, and the
//! guided learn cycle.

pub mod server;

pub use server::{ApiServer, ApiServerConfig};
