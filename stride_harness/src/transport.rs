//! Transport client: one blocking round trip per agent call.

use crate::config::{HarnessConfig, ScenarioPoint};
use crate::patterns::Pattern;
use crate::protocol::{parse_receive_response, parse_send_response, ReceiveReport, SendReport};
use async_trait::async_trait;
use std::sync::Arc;
use stride_env::{EnvironmentBackend, EnvironmentHandle};
use tracing::{debug, warn};

/// Send/receive exchanges with the two isolated agents.
///
/// Calls never fail: an unusable response degrades to sentinel values so
/// that one bad reading does not abort the matrix. There are no retries.
///
/// # Implementations
///
/// - **Production**: `CommandTransport` - runs the agent binaries through an
///   `EnvironmentBackend`
/// - **Tests**: in-memory stubs
#[async_trait]
pub trait Transport: Send + Sync {
    /// Primes `pattern` through the sender agent.
    async fn send(
        &self,
        sender: &EnvironmentHandle,
        pattern: &Pattern,
        point: &ScenarioPoint,
    ) -> SendReport;

    /// Recovers a pattern through the receiver agent.
    async fn receive(&self, receiver: &EnvironmentHandle, point: &ScenarioPoint) -> ReceiveReport;
}

/// Runs the sender/receiver binaries inside their environments.
pub struct CommandTransport {
    backend: Arc<dyn EnvironmentBackend>,
    sender_binary: String,
    receiver_binary: String,
    target_file: String,
    message_length: usize,
    cycle_threshold: u64,
    pass_stride: bool,
}

impl CommandTransport {
    /// Creates a transport over `backend` using the agent settings in `config`.
    pub fn new(backend: Arc<dyn EnvironmentBackend>, config: &HarnessConfig) -> Self {
        Self {
            backend,
            sender_binary: config.sender_binary.clone(),
            receiver_binary: config.receiver_binary.clone(),
            target_file: config.target_file.clone(),
            message_length: config.message_length,
            cycle_threshold: config.cycle_threshold,
            pass_stride: config.pass_stride,
        }
    }

    /// `<sender> <file> <pattern> [<stride>]`
    pub fn sender_command(&self, pattern: &Pattern, point: &ScenarioPoint) -> String {
        let mut cmd = format!("{} {} {}", self.sender_binary, self.target_file, pattern);
        if self.pass_stride {
            cmd.push_str(&format!(" {}", point.stride));
        }
        cmd
    }

    /// `<receiver> <file> <bits> <threshold> [<stride>]`
    pub fn receiver_command(&self, point: &ScenarioPoint) -> String {
        let mut cmd = format!(
            "{} {} {} {}",
            self.receiver_binary, self.target_file, self.message_length, self.cycle_threshold
        );
        if self.pass_stride {
            cmd.push_str(&format!(" {}", point.stride));
        }
        cmd
    }

    async fn exec_degrading(&self, handle: &EnvironmentHandle, command: &str) -> String {
        match self.backend.exec(handle, command).await {
            Ok(output) => {
                debug!("{} -> {}", handle.name, output);
                output
            }
            Err(e) => {
                warn!("Agent command in {} failed, degrading: {}", handle, e);
                String::new()
            }
        }
    }
}

#[async_trait]
impl Transport for CommandTransport {
    async fn send(
        &self,
        sender: &EnvironmentHandle,
        pattern: &Pattern,
        point: &ScenarioPoint,
    ) -> SendReport {
        let output = self.exec_degrading(sender, &self.sender_command(pattern, point)).await;
        let report = parse_send_response(&output);
        if report.degraded {
            warn!("Malformed sender response: {:?}", output);
        }
        report
    }

    async fn receive(&self, receiver: &EnvironmentHandle, point: &ScenarioPoint) -> ReceiveReport {
        let output = self.exec_degrading(receiver, &self.receiver_command(point)).await;
        let report = parse_receive_response(&output, self.message_length);
        if report.degraded {
            warn!("Malformed receiver response: {:?}", output);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use stride_env::EnvError;

    /// Backend that replays canned stdout and records exec'd commands.
    struct ScriptedBackend {
        reply: Result<String, ()>,
        commands: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedBackend {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                commands: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                commands: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EnvironmentBackend for ScriptedBackend {
        async fn provision(
            &self,
            name: &str,
            runtime: &str,
        ) -> Result<EnvironmentHandle, EnvError> {
            Ok(EnvironmentHandle::new(name, runtime, ""))
        }

        async fn teardown(&self, _handle: &EnvironmentHandle) -> Result<(), EnvError> {
            Ok(())
        }

        async fn exec(
            &self,
            handle: &EnvironmentHandle,
            command: &str,
        ) -> Result<String, EnvError> {
            self.commands
                .lock()
                .unwrap()
                .push((handle.name.clone(), command.to_string()));
            match &self.reply {
                Ok(out) => Ok(out.clone()),
                Err(()) => Err(EnvError::CommandFailed {
                    command: command.to_string(),
                    status: Some(1),
                    stderr: "no such container".to_string(),
                }),
            }
        }
    }

    fn config(pass_stride: bool) -> HarnessConfig {
        HarnessConfig {
            message_length: 4,
            pass_stride,
            ..Default::default()
        }
    }

    #[test]
    fn test_command_lines_with_stride() {
        let backend = Arc::new(ScriptedBackend::replying(""));
        let transport = CommandTransport::new(backend, &config(true));
        let point = ScenarioPoint::new(0, "runc", 64);
        let pattern = Pattern::parse("0110").unwrap();

        assert_eq!(
            transport.sender_command(&pattern, &point),
            "/workspace/sender_stride /workspace/rand0.bin 0110 64"
        );
        assert_eq!(
            transport.receiver_command(&point),
            "/workspace/receiver_stride /workspace/rand0.bin 4 100000 64"
        );
    }

    #[test]
    fn test_command_lines_without_stride() {
        let backend = Arc::new(ScriptedBackend::replying(""));
        let transport = CommandTransport::new(backend, &config(false));
        let point = ScenarioPoint::new(0, "runc", 64);
        let pattern = Pattern::parse("0110").unwrap();

        assert_eq!(
            transport.sender_command(&pattern, &point),
            "/workspace/sender_stride /workspace/rand0.bin 0110"
        );
        assert_eq!(
            transport.receiver_command(&point),
            "/workspace/receiver_stride /workspace/rand0.bin 4 100000"
        );
    }

    #[tokio::test]
    async fn test_send_routes_to_sender_environment() {
        let backend = Arc::new(ScriptedBackend::replying(
            "4096,f,0110,4,2,64,1,2,3,4,9000,3000",
        ));
        let transport = CommandTransport::new(backend.clone(), &config(true));
        let sender = EnvironmentHandle::new("sender_container", "runc", "abc");
        let point = ScenarioPoint::new(0, "runc", 64);

        let report = transport
            .send(&sender, &Pattern::parse("0110").unwrap(), &point)
            .await;

        assert_eq!(report.cycles, "9000");
        assert_eq!(report.nanos, "3000");
        let commands = backend.commands.lock().unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].0, "sender_container");
    }

    #[tokio::test]
    async fn test_exec_failure_degrades() {
        let transport = CommandTransport::new(Arc::new(ScriptedBackend::failing()), &config(true));
        let receiver = EnvironmentHandle::new("receiver_container", "runc", "");
        let point = ScenarioPoint::new(0, "runc", 32);

        let report = transport.receive(&receiver, &point).await;
        assert_eq!(report, ReceiveReport::degraded(4));

        let sender = EnvironmentHandle::new("sender_container", "runc", "");
        let sent = transport
            .send(&sender, &Pattern::parse("0000").unwrap(), &point)
            .await;
        assert_eq!(sent, SendReport::degraded());
    }
}
