//! Stride Channel Environment Abstraction Layer
//!
//! This crate isolates every capability the experiment driver treats as
//! opaque, so the driver can run against real containers in production and
//! against in-memory stubs in tests.
//!
//! # Capabilities
//!
//! - **Lifecycle**: provision / tear down one isolated environment per agent role
//! - **Exec**: run an agent command inside a provisioned environment
//! - **Eviction**: force the system page cache back to a cold baseline
//! - **Time**: monotonic clock, wall clock, and sleep for settle delays
//!
//! # Example
//!
//! ```ignore
//! use stride_env::{DockerBackend, EnvironmentBackend};
//!
//! let backend = DockerBackend::new("union-buster:latest");
//! let sender = backend.provision("sender_container", "runc").await?;
//! let command = "/workspace/sender_stride /workspace/rand0.bin 0101 32";
//! let line = backend.exec(&sender, command).await?;
//! backend.teardown(&sender).await?;
//! ```

mod backend;
mod clock;
mod docker;
mod error;
mod tokio_impl;
mod types;

pub use backend::{CacheEvictor, EnvironmentBackend};
pub use clock::HarnessClock;
pub use docker::{run_shell, DockerBackend, DropCachesEvictor};
pub use error::EnvError;
pub use tokio_impl::TokioClock;
pub use types::{validate_name, EnvironmentHandle};
