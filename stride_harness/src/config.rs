//! Harness configuration and the evaluation matrix.

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stride_env::validate_name;

/// One point in the evaluation matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioPoint {
    /// R: evict every Rth repetition (0 = only at scenario start)
    pub evict_interval: u32,

    /// C: runtime variant both environments are started under
    pub runtime: String,

    /// S: page stride used by both agents
    pub stride: u32,
}

impl ScenarioPoint {
    /// Creates a scenario point.
    pub fn new(evict_interval: u32, runtime: impl Into<String>, stride: u32) -> Self {
        Self {
            evict_interval,
            runtime: runtime.into(),
            stride,
        }
    }

    /// Human-readable eviction cadence.
    pub fn evict_description(&self) -> String {
        if self.evict_interval == 0 {
            "start only".to_string()
        } else {
            self.evict_interval.to_string()
        }
    }
}

impl std::fmt::Display for ScenarioPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R={} C={} S={}", self.evict_interval, self.runtime, self.stride)
    }
}

/// Immutable configuration for one experiment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// R dimension of the matrix
    pub evict_intervals: Vec<u32>,

    /// C dimension of the matrix
    pub runtimes: Vec<String>,

    /// S dimension of the matrix
    pub stride_sizes: Vec<u32>,

    /// Bits per message
    pub message_length: usize,

    /// Repetitions of each pattern per scenario
    pub repetitions: u32,

    /// Number of random patterns
    pub pattern_count: usize,

    /// Pattern seed; `None` for non-reproducible patterns
    pub seed: Option<u64>,

    /// Receiver threshold separating cached from uncached reads (cycles)
    pub cycle_threshold: u64,

    /// Shared file both agents map, path inside the environments
    pub target_file: String,

    /// Sender agent binary inside its environment
    pub sender_binary: String,

    /// Receiver agent binary inside its environment
    pub receiver_binary: String,

    /// Image both environments are started from
    pub image: String,

    /// Name of the sender environment
    pub sender_environment: String,

    /// Name of the receiver environment
    pub receiver_environment: String,

    /// CSV result log
    pub output_path: PathBuf,

    /// Delay between send and receive, and between repetitions
    pub settle_delay_ms: u64,

    /// Pass the stride to the agents (false for fixed-stride agents)
    pub pass_stride: bool,

    /// Run privileged shell actions through sudo
    pub use_sudo: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            evict_intervals: vec![0, 1, 5],
            runtimes: vec!["runc".to_string()],
            stride_sizes: vec![32, 64, 128],
            message_length: 1024,
            repetitions: 3,
            pattern_count: 5,
            seed: Some(42),
            cycle_threshold: 100_000,
            target_file: "/workspace/rand0.bin".to_string(),
            sender_binary: "/workspace/sender_stride".to_string(),
            receiver_binary: "/workspace/receiver_stride".to_string(),
            image: "union-buster:latest".to_string(),
            sender_environment: "sender_container".to_string(),
            receiver_environment: "receiver_container".to_string(),
            output_path: PathBuf::from("stride_channel_results.csv"),
            settle_delay_ms: 50,
            pass_stride: true,
            use_sudo: true,
        }
    }
}

impl HarnessConfig {
    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| HarnessError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| HarnessError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Rejects configurations the driver cannot run.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.evict_intervals.is_empty() {
            return Err(HarnessError::invalid("evict_intervals is empty"));
        }
        if self.runtimes.is_empty() {
            return Err(HarnessError::invalid("runtimes is empty"));
        }
        if self.stride_sizes.is_empty() {
            return Err(HarnessError::invalid("stride_sizes is empty"));
        }
        if self.stride_sizes.contains(&0) {
            return Err(HarnessError::invalid("stride sizes must be positive"));
        }
        if self.message_length == 0 {
            return Err(HarnessError::invalid("message_length must be positive"));
        }
        if self.repetitions == 0 {
            return Err(HarnessError::invalid("repetitions must be positive"));
        }
        if self.pattern_count == 0 {
            return Err(HarnessError::invalid("pattern_count must be positive"));
        }

        let names = self
            .runtimes
            .iter()
            .chain([&self.sender_environment, &self.receiver_environment])
            .map(String::as_str)
            .chain([
                self.image.as_str(),
                self.target_file.as_str(),
                self.sender_binary.as_str(),
                self.receiver_binary.as_str(),
            ]);
        for name in names {
            validate_name(name).map_err(|e| HarnessError::invalid(e.to_string()))?;
        }

        if self.sender_environment == self.receiver_environment {
            return Err(HarnessError::invalid(format!(
                "sender and receiver share the environment name {:?}",
                self.sender_environment
            )));
        }
        Ok(())
    }

    /// Full cross product, ordered R, then C, then S.
    pub fn scenario_points(&self) -> Vec<ScenarioPoint> {
        let capacity = self.evict_intervals.len() * self.runtimes.len() * self.stride_sizes.len();
        let mut points = Vec::with_capacity(capacity);
        for &evict_interval in &self.evict_intervals {
            for runtime in &self.runtimes {
                for &stride in &self.stride_sizes {
                    points.push(ScenarioPoint::new(evict_interval, runtime.clone(), stride));
                }
            }
        }
        points
    }

    /// Number of transmissions a full run over `patterns` patterns performs.
    pub fn total_transmissions(&self, patterns: usize) -> u64 {
        let scenarios = self.evict_intervals.len() * self.runtimes.len() * self.stride_sizes.len();
        (scenarios * patterns) as u64 * u64::from(self.repetitions)
    }

    /// Settle delay as a `Duration`.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scenario_points().len(), 9);
        assert_eq!(config.total_transmissions(config.pattern_count), 9 * 5 * 3);
        assert_eq!(config.total_transmissions(1), 9 * 3);
    }

    #[test]
    fn test_scenario_points_nested_order() {
        let config = HarnessConfig {
            evict_intervals: vec![0, 5],
            runtimes: vec!["runc".into(), "runsc".into()],
            stride_sizes: vec![32, 64],
            ..Default::default()
        };
        let points = config.scenario_points();

        assert_eq!(points.len(), 8);
        assert_eq!(points[0], ScenarioPoint::new(0, "runc", 32));
        assert_eq!(points[1], ScenarioPoint::new(0, "runc", 64));
        assert_eq!(points[2], ScenarioPoint::new(0, "runsc", 32));
        assert_eq!(points[4], ScenarioPoint::new(5, "runc", 32));
        assert_eq!(points[7], ScenarioPoint::new(5, "runsc", 64));
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let cases = [
            HarnessConfig {
                evict_intervals: vec![],
                ..Default::default()
            },
            HarnessConfig {
                runtimes: vec![],
                ..Default::default()
            },
            HarnessConfig {
                stride_sizes: vec![32, 0],
                ..Default::default()
            },
            HarnessConfig {
                message_length: 0,
                ..Default::default()
            },
            HarnessConfig {
                repetitions: 0,
                ..Default::default()
            },
            HarnessConfig {
                pattern_count: 0,
                ..Default::default()
            },
            HarnessConfig {
                runtimes: vec!["run c".into()],
                ..Default::default()
            },
            HarnessConfig {
                runtimes: vec!["runc,runsc".into()],
                ..Default::default()
            },
            HarnessConfig {
                receiver_environment: "sender_container".into(),
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(HarnessError::InvalidConfiguration(_))),
                "accepted {config:?}"
            );
        }
    }

    #[test]
    fn test_json_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.json");
        std::fs::write(
            &path,
            r#"{"runtimes": ["runc", "runsc"], "seed": null, "stride_sizes": [64]}"#,
        )
        .unwrap();

        let config = HarnessConfig::from_json_file(&path).unwrap();
        assert_eq!(config.runtimes, vec!["runc", "runsc"]);
        assert_eq!(config.stride_sizes, vec![64]);
        assert_eq!(config.seed, None);
        assert_eq!(config.message_length, 1024);
    }

    #[test]
    fn test_json_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            HarnessConfig::from_json_file(&path),
            Err(HarnessError::ConfigFile { .. })
        ));
    }

    #[test]
    fn test_evict_description() {
        assert_eq!(ScenarioPoint::new(0, "runc", 32).evict_description(), "start only");
        assert_eq!(ScenarioPoint::new(5, "runc", 32).evict_description(), "5");
        assert_eq!(ScenarioPoint::new(5, "runc", 32).to_string(), "R=5 C=runc S=32");
    }
}
