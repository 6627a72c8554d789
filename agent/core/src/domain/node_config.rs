// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Agent Configuration Types
//
// Defines the configuration schema for a swarm agent node, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Consensus tunables (thresholds, swarm size, memory, decay model)
// - Transport, supervisor and sensing settings
// - Observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "swarm-agent/v1";
pub const KIND: &str = "AgentConfig";

/// Top-level Kubernetes-style agent configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfigManifest {
    /// API version (must be "swarm-agent/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "AgentConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: AgentConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable node name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Agent configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfigSpec {
    #[serde(default)]
    pub node: NodeIdentity,

    /// Belief consensus and action coordination tunables
    #[serde(default)]
    pub consensus: SwarmParameters,

    #[serde(default)]
    pub transport: TransportConfig,

    /// Supervisor notification channel (optional; agents run fine without one)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<SupervisorConfig>,

    #[serde(default)]
    pub sensing: SensingConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Explicit agent identifier. When absent it is derived from the
    /// transport's local address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
}

/// The consensus engine's constants, passed into the agent at construction.
///
/// `neutral_belief` and `target_threshold` default to the midpoint of the two
/// thresholds when omitted from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SwarmParametersDocument")]
pub struct SwarmParameters {
    /// Swarm belief above which the action starts
    pub phi_threshold: f64,
    /// Swarm belief below which the action stops
    pub not_phi_threshold: f64,
    /// Belief assumed for agents never heard from, and for our own belief
    /// before the observation memory is full
    pub neutral_belief: f64,
    /// Number of agents deployed
    pub swarm_size: usize,
    /// Ticks to keep broadcasting an action state change
    pub action_broadcast_duration: u64,
    /// Number of observations remembered
    pub memory_size: usize,
    /// Ratio of agents expected to be acting
    pub activation_rate: f64,
    /// Ratio of agents per world cell
    pub swarm_density: f64,
    /// Prevalence that should remain once the action is over
    pub target_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct SwarmParametersDocument {
    #[serde(default = "default_phi_threshold")]
    phi_threshold: f64,
    #[serde(default = "default_not_phi_threshold")]
    not_phi_threshold: f64,
    #[serde(default)]
    neutral_belief: Option<f64>,
    #[serde(default = "default_swarm_size")]
    swarm_size: usize,
    #[serde(default = "default_action_broadcast_duration")]
    action_broadcast_duration: u64,
    #[serde(default = "default_memory_size")]
    memory_size: usize,
    #[serde(default = "default_activation_rate")]
    activation_rate: f64,
    #[serde(default = "default_swarm_density")]
    swarm_density: f64,
    #[serde(default)]
    target_threshold: Option<f64>,
}

impl From<SwarmParametersDocument> for SwarmParameters {
    fn from(doc: SwarmParametersDocument) -> Self {
        let midpoint = (doc.phi_threshold + doc.not_phi_threshold) / 2.0;
        let neutral_belief = doc.neutral_belief.unwrap_or(midpoint);
        Self {
            phi_threshold: doc.phi_threshold,
            not_phi_threshold: doc.not_phi_threshold,
            neutral_belief,
            swarm_size: doc.swarm_size,
            action_broadcast_duration: doc.action_broadcast_duration,
            memory_size: doc.memory_size,
            activation_rate: doc.activation_rate,
            swarm_density: doc.swarm_density,
            target_threshold: doc.target_threshold.unwrap_or(neutral_belief),
        }
    }
}

impl Default for SwarmParameters {
    fn default() -> Self {
        let neutral_belief = (default_phi_threshold() + default_not_phi_threshold()) / 2.0;
        Self {
            phi_threshold: default_phi_threshold(),
            not_phi_threshold: default_not_phi_threshold(),
            neutral_belief,
            swarm_size: default_swarm_size(),
            action_broadcast_duration: default_action_broadcast_duration(),
            memory_size: default_memory_size(),
            activation_rate: default_activation_rate(),
            swarm_density: default_swarm_density(),
            target_threshold: neutral_belief,
        }
    }
}

impl SwarmParameters {
    /// Check the invariants the consensus engine relies on.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("phi_threshold", self.phi_threshold),
            ("not_phi_threshold", self.not_phi_threshold),
            ("neutral_belief", self.neutral_belief),
            ("target_threshold", self.target_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("consensus.{} must be within [0, 1], got {}", name, value);
            }
        }

        if self.phi_threshold <= self.not_phi_threshold {
            anyhow::bail!(
                "consensus.phi_threshold ({}) must be greater than consensus.not_phi_threshold ({})",
                self.phi_threshold,
                self.not_phi_threshold
            );
        }

        if self.swarm_size == 0 {
            anyhow::bail!("consensus.swarm_size must be positive");
        }

        if self.memory_size == 0 {
            anyhow::bail!("consensus.memory_size must be positive");
        }

        if !(self.activation_rate > 0.0 && self.activation_rate <= 1.0) {
            anyhow::bail!("consensus.activation_rate must be within (0, 1], got {}", self.activation_rate);
        }

        if !(self.swarm_density > 0.0 && self.swarm_density <= 1.0) {
            anyhow::bail!("consensus.swarm_density must be within (0, 1], got {}", self.swarm_density);
        }

        Ok(())
    }

    /// Number of world cells implied by the swarm size and density.
    pub fn world_cells(&self) -> usize {
        (self.swarm_size as f64 / self.swarm_density).round().max(1.0) as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Local address the datagram socket binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port shared by every agent in the swarm
    #[serde(default = "default_transport_port")]
    pub port: u16,

    /// Destination of broadcasts (limited broadcast or subnet broadcast)
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: String,

    /// Pause between consecutive broadcasts; 0 only yields to the scheduler
    #[serde(default = "default_broadcast_interval")]
    pub broadcast_interval_ms: u64,

    /// Give up on a single send after this long
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,

    /// Also rebroadcast peers' beliefs while in mode ZERO
    #[serde(default)]
    pub relay_peer_beliefs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_transport_port(),
            broadcast_address: default_broadcast_address(),
            broadcast_interval_ms: default_broadcast_interval(),
            send_timeout_ms: default_send_timeout(),
            relay_peer_beliefs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// host:port of the action monitor
    pub address: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensingConfig {
    /// Interval between two observations of the environment
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,

    /// Observations taken on one forward leg, before the action is performed
    #[serde(default = "default_samples_per_cycle")]
    pub samples_per_cycle: u32,

    /// Initial ratio of cells holding the property in the simulated field
    #[serde(default = "default_simulated_prevalence")]
    pub simulated_prevalence: f64,
}

impl Default for SensingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval(),
            samples_per_cycle: default_samples_per_cycle(),
            simulated_prevalence: default_simulated_prevalence(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_phi_threshold() -> f64 {
    0.75
}

fn default_not_phi_threshold() -> f64 {
    0.55
}

fn default_swarm_size() -> usize {
    5
}

fn default_action_broadcast_duration() -> u64 {
    15
}

fn default_memory_size() -> usize {
    10
}

fn default_activation_rate() -> f64 {
    1.0
}

fn default_swarm_density() -> f64 {
    0.05
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_transport_port() -> u16 {
    47000
}

fn default_broadcast_address() -> String {
    "255.255.255.255".to_string()
}

fn default_broadcast_interval() -> u64 {
    50
}

fn default_send_timeout() -> u64 {
    500
}

fn default_connect_timeout() -> u64 {
    2000
}

fn default_sample_interval() -> u64 {
    1000
}

fn default_samples_per_cycle() -> u32 {
    3
}

fn default_simulated_prevalence() -> f64 {
    0.8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for AgentConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "swarm-agent".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                labels: None,
            },
            spec: AgentConfigSpec::default(),
        }
    }
}

impl AgentConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. SWARM_AGENT_CONFIG environment variable
    /// 2. ./swarm-agent.yaml (working directory)
    /// 3. ~/.swarm-agent/config.yaml (user home)
    /// 4. /etc/swarm-agent/config.yaml (Unix only)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SWARM_AGENT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./swarm-agent.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".swarm-agent").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/swarm-agent/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SWARM_AGENT_ID") {
            match val.parse::<u32>() {
                Ok(id) => {
                    tracing::info!("Environment override: SWARM_AGENT_ID={}", id);
                    self.spec.node.id = Some(id);
                }
                Err(_) => {
                    tracing::warn!("Invalid value for SWARM_AGENT_ID: '{}'. Expected an integer. Ignoring.", val);
                }
            }
        }

        if let Ok(address) = std::env::var("SWARM_SUPERVISOR_ADDR") {
            tracing::info!("Environment override: SWARM_SUPERVISOR_ADDR={}", address);
            match self.spec.supervisor.as_mut() {
                Some(supervisor) => supervisor.address = address,
                None => {
                    self.spec.supervisor = Some(SupervisorConfig {
                        address,
                        connect_timeout_ms: default_connect_timeout(),
                    })
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        self.spec.consensus.validate()?;

        if self.spec.sensing.samples_per_cycle == 0 {
            anyhow::bail!("sensing.samples_per_cycle must be positive");
        }

        if self.spec.sensing.sample_interval_ms == 0 {
            anyhow::bail!("sensing.sample_interval_ms must be positive");
        }

        if !(0.0..=1.0).contains(&self.spec.sensing.simulated_prevalence) {
            anyhow::bail!("sensing.simulated_prevalence must be within [0, 1]");
        }

        if let Some(supervisor) = &self.spec.supervisor {
            if supervisor.address.is_empty() {
                anyhow::bail!("supervisor.address cannot be empty");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = AgentConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert!(!manifest.metadata.name.is_empty());
        assert!(manifest.spec.node.id.is_none());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_default_parameters_match_deployment() {
        let params = SwarmParameters::default();
        assert_eq!(params.phi_threshold, 0.75);
        assert_eq!(params.not_phi_threshold, 0.55);
        assert!((params.neutral_belief - 0.65).abs() < 1e-12);
        assert_eq!(params.target_threshold, params.neutral_belief);
        assert_eq!(params.swarm_size, 5);
        assert_eq!(params.action_broadcast_duration, 15);
        assert_eq!(params.memory_size, 10);
        assert_eq!(params.world_cells(), 100);
    }

    #[test]
    fn test_partial_consensus_section_derives_midpoint() {
        let yaml = r#"
apiVersion: swarm-agent/v1
kind: AgentConfig
metadata:
  name: robot-1
spec:
  node:
    id: 7
  consensus:
    phi_threshold: 0.8
    not_phi_threshold: 0.4
    swarm_size: 12
"#;
        let manifest = AgentConfigManifest::from_yaml_str(yaml).unwrap();
        let params = &manifest.spec.consensus;
        assert_eq!(manifest.spec.node.id, Some(7));
        assert!((params.neutral_belief - 0.6).abs() < 1e-12);
        assert!((params.target_threshold - 0.6).abs() < 1e-12);
        assert_eq!(params.swarm_size, 12);
        assert_eq!(params.memory_size, 10);
        assert!(manifest.spec.supervisor.is_none());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_explicit_target_threshold_kept() {
        let yaml = r#"
apiVersion: swarm-agent/v1
kind: AgentConfig
metadata:
  name: robot-1
spec:
  consensus:
    target_threshold: 0.3
"#;
        let manifest = AgentConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.consensus.target_threshold, 0.3);
        assert!((manifest.spec.consensus.neutral_belief - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_yaml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swarm-agent.yaml");

        let mut manifest = AgentConfigManifest::default();
        manifest.metadata.name = "robot-3".to_string();
        manifest.spec.node.id = Some(3);
        manifest.spec.supervisor = Some(SupervisorConfig {
            address: "10.0.0.1:1025".to_string(),
            connect_timeout_ms: 100,
        });
        manifest.to_yaml_file(&path).unwrap();

        let parsed = AgentConfigManifest::from_yaml_file(&path).unwrap();
        assert_eq!(parsed.metadata.name, "robot-3");
        assert_eq!(parsed.spec.node.id, Some(3));
        assert_eq!(parsed.spec.consensus, SwarmParameters::default());
        assert_eq!(parsed.spec.supervisor.unwrap().address, "10.0.0.1:1025");
    }

    #[test]
    fn test_validation() {
        let mut manifest = AgentConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "WrongKind".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        // Inverted hysteresis band
        manifest.spec.consensus.phi_threshold = 0.5;
        manifest.spec.consensus.not_phi_threshold = 0.6;
        assert!(manifest.validate().is_err());
        manifest.spec.consensus = SwarmParameters::default();

        manifest.spec.consensus.swarm_size = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.consensus = SwarmParameters::default();

        manifest.spec.consensus.memory_size = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.consensus = SwarmParameters::default();

        manifest.spec.consensus.neutral_belief = 1.5;
        assert!(manifest.validate().is_err());
        manifest.spec.consensus = SwarmParameters::default();

        manifest.spec.sensing.samples_per_cycle = 0;
        assert!(manifest.validate().is_err());
    }
}
