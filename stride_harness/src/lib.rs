//! Stride Channel Experiment Harness
//!
//! Drives a page-cache covert channel across an evaluation matrix and logs
//! every transmission for offline analysis.
//!
//! A sender agent primes every S-th page of a shared file to encode bits; a
//! receiver agent in a separate environment times reads of the same pages to
//! recover them. This crate owns everything around that exchange:
//!
//! - **Patterns**: seeded, reproducible random bit strings
//! - **Transport**: send/receive round trips over the agents' stdout protocol
//! - **Eviction**: start-of-scenario plus every-R-th-repetition cache drops
//! - **Scoring**: bit errors between sent and received patterns
//! - **Result log**: durable CSV, one row flushed per transmission
//! - **Driver**: scenario → pattern → repetition loops with guaranteed teardown
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ExperimentDriver                        │
//! │   ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌─────────┐   │
//! │   │ patterns │   │ eviction  │   │ scoring │   │ResultLog│   │
//! │   └──────────┘   └─────┬─────┘   └─────────┘   └─────────┘   │
//! │                        │                                     │
//! │        ┌───────────────▼──┐        ┌──────────────┐          │
//! │        │   CacheEvictor   │        │  Transport   │          │
//! │        └──────────────────┘        └──────┬───────┘          │
//! │                  ┌────────────────────────▼─────────┐        │
//! │                  │ EnvironmentBackend (sender|recv) │        │
//! │                  └──────────────────────────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use stride_env::{DockerBackend, DropCachesEvictor};
//! use stride_harness::{CommandTransport, ExperimentDriver, HarnessConfig};
//!
//! let config = HarnessConfig::default();
//! let backend = Arc::new(DockerBackend::new(&config.image));
//! let transport = Arc::new(CommandTransport::new(backend.clone(), &config));
//! let evictor = Arc::new(DropCachesEvictor::default());
//! let mut driver = ExperimentDriver::new(config, backend, transport, evictor)?;
//! let summary = driver.run().await?;
//! ```

mod config;
mod context;
mod driver;
mod error;
mod interrupt;
pub mod eviction;
pub mod patterns;
pub mod protocol;
pub mod result_log;
pub mod scoring;
mod transport;

pub use config::{HarnessConfig, ScenarioPoint};
pub use context::SimClock;
pub use driver::{ExperimentDriver, RunSummary};
pub use error::HarnessError;
pub use interrupt::{Interrupt, InterruptTrigger};
pub use patterns::{generate_patterns, Pattern};
pub use protocol::{ReceiveReport, SendReport};
pub use result_log::{ResultLog, TransmissionRecord, HEADER};
pub use transport::{CommandTransport, Transport};
