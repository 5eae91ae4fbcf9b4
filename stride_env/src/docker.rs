//! Production adapters: shell actions, Docker containers, `drop_caches`.

use async_trait::async_trait;
use crate::backend::{CacheEvictor, EnvironmentBackend};
use crate::error::EnvError;
use crate::types::{validate_name, EnvironmentHandle};
use tokio::process::Command;
use tracing::debug;

/// Runs `command` through `sh -c` and returns its trimmed stdout.
///
/// A non-zero exit is an `EnvError::CommandFailed`. The child is killed if
/// the returned future is dropped before it exits.
pub async fn run_shell(command: &str) -> Result<String, EnvError> {
    debug!("$ {}", command);
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).kill_on_drop(true);
    // Own process group, so a terminal Ctrl-C reaches the harness only.
    #[cfg(unix)]
    cmd.process_group(0);
    let output = cmd
        .output()
        .await
        .map_err(|source| EnvError::Spawn {
            command: command.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(EnvError::command_failed(
            command,
            output.status.code(),
            &output.stderr,
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn privileged(use_sudo: bool, command: &str) -> String {
    if use_sudo {
        format!("sudo {}", command)
    } else {
        command.to_string()
    }
}

/// One Docker container per agent role, driven through the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerBackend {
    /// Image both agent containers are started from
    image: String,

    /// Prefix docker invocations with `sudo`
    use_sudo: bool,
}

impl DockerBackend {
    /// Creates a backend for the given image, using `sudo`.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            use_sudo: true,
        }
    }

    /// Sets whether docker is invoked through `sudo`.
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    fn remove_command(&self, name: &str) -> String {
        privileged(self.use_sudo, &format!("docker rm --force {}", name))
    }

    fn run_command(&self, name: &str, runtime: &str) -> String {
        privileged(
            self.use_sudo,
            &format!("docker run --runtime={} -d --name {} {}", runtime, name, self.image),
        )
    }

    fn exec_command(&self, name: &str, command: &str) -> String {
        privileged(self.use_sudo, &format!("docker exec {} {}", name, command))
    }
}

#[async_trait]
impl EnvironmentBackend for DockerBackend {
    async fn provision(&self, name: &str, runtime: &str) -> Result<EnvironmentHandle, EnvError> {
        validate_name(name)?;
        validate_name(runtime)?;

        // A leftover container from an earlier scenario or crashed run.
        if let Err(e) = run_shell(&self.remove_command(name)).await {
            debug!("No stale container {} to remove: {}", name, e);
        }

        let id = run_shell(&self.run_command(name, runtime)).await?;
        Ok(EnvironmentHandle::new(name, runtime, id))
    }

    async fn teardown(&self, handle: &EnvironmentHandle) -> Result<(), EnvError> {
        validate_name(&handle.name)?;
        run_shell(&self.remove_command(&handle.name)).await.map(|_| ())
    }

    async fn exec(
        &self,
        handle: &EnvironmentHandle,
        command: &str,
    ) -> Result<String, EnvError> {
        run_shell(&self.exec_command(&handle.name, command)).await
    }
}

/// Evicts the page cache with `sync` + `/proc/sys/vm/drop_caches`.
#[derive(Debug, Clone)]
pub struct DropCachesEvictor {
    use_sudo: bool,
    sync_command: &'static str,
}

impl DropCachesEvictor {
    /// Creates an evictor; `use_sudo` wraps the privileged write in `sudo tee`.
    pub fn new(use_sudo: bool) -> Self {
        Self {
            use_sudo,
            sync_command: "sync",
        }
    }

    fn drop_command(&self) -> &'static str {
        if self.use_sudo {
            "echo 1 | sudo tee /proc/sys/vm/drop_caches > /dev/null 2>&1"
        } else {
            "echo 1 > /proc/sys/vm/drop_caches"
        }
    }
}

impl Default for DropCachesEvictor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl CacheEvictor for DropCachesEvictor {
    async fn evict(&self) -> Result<(), EnvError> {
        run_shell(self.sync_command).await?;
        run_shell(self.drop_command()).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_shell_trims_stdout() {
        let out = run_shell("printf '  1,2,3 \\n\\n'").await.unwrap();
        assert_eq!(out, "1,2,3");
    }

    #[tokio::test]
    async fn test_run_shell_reports_failure() {
        let err = run_shell("echo boom >&2; exit 3").await.unwrap_err();
        match err {
            EnvError::CommandFailed { status, stderr, .. } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_docker_command_lines() {
        let backend = DockerBackend::new("union-buster:latest");
        assert_eq!(
            backend.run_command("sender_container", "runsc"),
            "sudo docker run --runtime=runsc -d --name sender_container union-buster:latest"
        );
        assert_eq!(
            backend.remove_command("receiver_container"),
            "sudo docker rm --force receiver_container"
        );

        let plain = backend.with_sudo(false);
        assert_eq!(
            plain.exec_command("sender_container", "/workspace/sender_stride f 01 32"),
            "docker exec sender_container /workspace/sender_stride f 01 32"
        );
    }

    #[tokio::test]
    async fn test_provision_rejects_unsafe_runtime() {
        let backend = DockerBackend::new("img").with_sudo(false);
        let err = backend.provision("sender_container", "runc; rm -rf /").await.unwrap_err();
        assert!(matches!(err, EnvError::InvalidName(_)));
    }

    #[test]
    fn test_drop_command_sudo() {
        assert!(DropCachesEvictor::default().drop_command().contains("sudo tee"));
        assert!(!DropCachesEvictor::new(false).drop_command().contains("sudo"));
    }

    #[tokio::test]
    async fn test_evict_fails_when_sync_fails() {
        let evictor = DropCachesEvictor {
            use_sudo: false,
            sync_command: "exit 1",
        };
        let err = evictor.evict().await.unwrap_err();
        match err {
            EnvError::CommandFailed { command, status, .. } => {
                assert_eq!(command, "exit 1");
                assert_eq!(status, Some(1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
