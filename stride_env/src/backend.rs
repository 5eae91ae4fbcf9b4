//! Capability traits for the isolated environments and the page cache.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::EnvironmentHandle;

/// Lifecycle and command execution for isolated agent environments.
///
/// # Implementations
///
/// - **Production**: `DockerBackend` - one container per agent role
/// - **Tests**: in-memory stubs that record calls
///
/// # Lifecycle
///
/// ```text
/// Driver                       Backend
///   |-- provision(name, rt) ----->|  (replaces any stale env of that name)
///   |-- exec(handle, cmd) ------->|-- stdout (trimmed)
///   |-- teardown(handle) -------->|
/// ```
#[async_trait]
pub trait EnvironmentBackend: Send + Sync {
    /// Creates a fresh environment under the given runtime variant.
    ///
    /// Any environment left over under the same name is destroyed first.
    async fn provision(&self, name: &str, runtime: &str) -> Result<EnvironmentHandle, EnvError>;

    /// Destroys an environment. Must be safe to call on an already-gone one.
    async fn teardown(&self, handle: &EnvironmentHandle) -> Result<(), EnvError>;

    /// Runs a command inside the environment and returns its trimmed stdout.
    ///
    /// Blocks until the command exits; no timeout is applied here.
    async fn exec(&self, handle: &EnvironmentHandle, command: &str) -> Result<String, EnvError>;
}

/// System-wide page cache eviction.
#[async_trait]
pub trait CacheEvictor: Send + Sync {
    /// Drops cached state to a cold baseline. Idempotent.
    async fn evict(&self) -> Result<(), EnvError>;
}
