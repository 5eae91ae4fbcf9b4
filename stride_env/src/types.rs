//! Common types for the environment abstraction.

use crate::error::EnvError;

/// Opaque reference to one provisioned isolated environment.
///
/// Handles are created per scenario and never reused across scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentHandle {
    /// Name the environment is addressed by
    pub name: String,

    /// Runtime variant it was started under
    pub runtime: String,

    /// Backend-assigned identifier (container id); empty for stubs
    pub id: String,
}

impl EnvironmentHandle {
    /// Creates a handle.
    pub fn new(name: impl Into<String>, runtime: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runtime: runtime.into(),
            id: id.into(),
        }
    }

    /// Short identifier for log lines.
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(12)]
    }
}

impl std::fmt::Display for EnvironmentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.runtime)
    }
}

/// Checks that a name can be interpolated into a shell command unquoted.
///
/// Accepts ASCII alphanumerics plus `_`, `-`, `.`, `:` and `/`.
pub fn validate_name(name: &str) -> Result<(), EnvError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/'));
    if ok {
        Ok(())
    } else {
        Err(EnvError::InvalidName(name.to_string()))
    }
}
