// vigil-config/src/config.rs
// ============================================================================
// Module: Vigil Configuration
// Description: Configuration loading and validation for Vigil.
// Purpose: Strict, fail-closed TOML config layered with env-var credential
//          overrides (§6, SPEC_FULL §11).
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with a hard size limit; missing
//! or invalid configuration fails closed. Integration credentials are never
//! stored in the TOML file itself — they are read from the environment at
//! load time and resolved per-integration into a [`CredentialState`], so
//! mock mode is decided per integration rather than behind one global flag
//! (§4.4's "mock mode is a per-call branch" design note).

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable used to override the config file path.
pub const CONFIG_ENV_VAR: &str = "VIGIL_CONFIG";
/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "vigil.toml";
/// Maximum configuration file size in bytes; larger files fail closed.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Errors raised loading or validating [`VigilConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading the configuration file.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Configuration was well-formed TOML but failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Whether an integration has real credentials or falls back to mock mode
/// (§4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState<C> {
    /// Credentials were present and parsed; calls go out for real.
    Configured(C),
    /// Credentials were absent; the integration harness substitutes a no-op.
    Mock,
}

impl<C> CredentialState<C> {
    /// True when this integration has real credentials.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }
}

/// Chat notification credentials (bot token, signing secret, channels).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCredentials {
    /// Bot token used to authenticate outbound posts.
    pub bot_token: String,
    /// Signing secret used to verify inbound webhook signatures.
    pub signing_secret: String,
    /// Comma-separated channel list from the environment, split into entries.
    pub channels: Vec<String>,
}

/// Ticketing system credentials (base URL, auth, project key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketingCredentials {
    /// Base URL of the ticketing API.
    pub base_url: String,
    /// Bearer token or API key used to authenticate.
    pub auth: String,
    /// Project key new tickets are filed under.
    pub project_key: String,
}

/// Paging credentials (routing key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingCredentials {
    /// Routing key used to trigger/resolve pages.
    pub routing_key: String,
}

/// Firewall credentials (API token, zone, ruleset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallCredentials {
    /// API token used to authenticate.
    pub api_token: String,
    /// Zone identifier the ruleset applies to.
    pub zone: String,
    /// Ruleset identifier new block rules are added to.
    pub ruleset: String,
}

/// Identity provider credentials (domain, token).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCredentials {
    /// Identity provider domain.
    pub domain: String,
    /// API token used to authenticate.
    pub token: String,
}

/// Container orchestrator credentials (context name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerCredentials {
    /// Orchestrator context to target (cluster/namespace selector).
    pub context: String,
}

/// Resolved integration credential state for every adapter Vigil drives (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationCredentials {
    /// Chat notify integration.
    pub chat: CredentialState<ChatCredentials>,
    /// Ticketing integration.
    pub ticketing: CredentialState<TicketingCredentials>,
    /// Paging integration.
    pub paging: CredentialState<PagingCredentials>,
    /// Firewall integration.
    pub firewall: CredentialState<FirewallCredentials>,
    /// Identity integration.
    pub identity: CredentialState<IdentityCredentials>,
    /// Container orchestrator integration.
    pub container: CredentialState<ContainerCredentials>,
}

impl IntegrationCredentials {
    /// Resolves every integration's credential state from the process
    /// environment (§6). Absence of any credential in a group puts that one
    /// integration in mock mode; the groups are independent.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            chat: chat_from_env(),
            ticketing: ticketing_from_env(),
            paging: paging_from_env(),
            firewall: firewall_from_env(),
            identity: identity_from_env(),
            container: container_from_env(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn chat_from_env() -> CredentialState<ChatCredentials> {
    resolve_chat(
        env_var("VIGIL_CHAT_BOT_TOKEN"),
        env_var("VIGIL_CHAT_SIGNING_SECRET"),
        env_var("VIGIL_CHAT_CHANNELS"),
    )
}

fn resolve_chat(
    bot_token: Option<String>,
    signing_secret: Option<String>,
    channels: Option<String>,
) -> CredentialState<ChatCredentials> {
    match (bot_token, signing_secret, channels) {
        (Some(bot_token), Some(signing_secret), Some(channels)) => {
            CredentialState::Configured(ChatCredentials {
                bot_token,
                signing_secret,
                channels: channels.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect(),
            })
        }
        _ => CredentialState::Mock,
    }
}

fn ticketing_from_env() -> CredentialState<TicketingCredentials> {
    match (env_var("VIGIL_TICKETING_BASE_URL"), env_var("VIGIL_TICKETING_AUTH"), env_var("VIGIL_TICKETING_PROJECT_KEY")) {
        (Some(base_url), Some(auth), Some(project_key)) => {
            CredentialState::Configured(TicketingCredentials { base_url, auth, project_key })
        }
        _ => CredentialState::Mock,
    }
}

fn paging_from_env() -> CredentialState<PagingCredentials> {
    match env_var("VIGIL_PAGING_ROUTING_KEY") {
        Some(routing_key) => CredentialState::Configured(PagingCredentials { routing_key }),
        None => CredentialState::Mock,
    }
}

fn firewall_from_env() -> CredentialState<FirewallCredentials> {
    match (env_var("VIGIL_FIREWALL_API_TOKEN"), env_var("VIGIL_FIREWALL_ZONE"), env_var("VIGIL_FIREWALL_RULESET")) {
        (Some(api_token), Some(zone), Some(ruleset)) => {
            CredentialState::Configured(FirewallCredentials { api_token, zone, ruleset })
        }
        _ => CredentialState::Mock,
    }
}

fn identity_from_env() -> CredentialState<IdentityCredentials> {
    match (env_var("VIGIL_IDENTITY_DOMAIN"), env_var("VIGIL_IDENTITY_TOKEN")) {
        (Some(domain), Some(token)) => CredentialState::Configured(IdentityCredentials { domain, token }),
        _ => CredentialState::Mock,
    }
}

fn container_from_env() -> CredentialState<ContainerCredentials> {
    match env_var("VIGIL_CONTAINER_CONTEXT") {
        Some(context) => CredentialState::Configured(ContainerCredentials { context }),
        None => CredentialState::Mock,
    }
}

/// Integration-harness tunables (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Per-attempt timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Base backoff delay between retries, in milliseconds.
    pub retry_base_ms: u64,
    /// Maximum retry attempts.
    pub max_retries: u32,
    /// Consecutive failures before the breaker opens.
    pub breaker_failure_threshold: u32,
    /// Seconds the breaker stays open before probing again.
    pub breaker_reset_timeout_seconds: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retry_base_ms: 500,
            max_retries: 3,
            breaker_failure_threshold: 5,
            breaker_reset_timeout_seconds: 30,
        }
    }
}

/// Approval-gate tunables (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApprovalGateConfig {
    /// Poll interval, in seconds.
    pub poll_interval_seconds: u64,
    /// Total time before the gate times out, in minutes.
    pub timeout_minutes: u64,
    /// Consecutive poll errors before the gate fails closed.
    pub max_consecutive_poll_errors: u32,
}

impl Default for ApprovalGateConfig {
    fn default() -> Self {
        Self { poll_interval_seconds: 15, timeout_minutes: 15, max_consecutive_poll_errors: 3 }
    }
}

/// Verifier tunables (§4.6 Verifier, §13 Open Question Decision 1).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Stabilization wait before checking health criteria, in seconds. This
    /// is a fixed constant, not adaptive to observed recovery speed (§13.1).
    pub stabilization_wait_seconds: u64,
    /// `health_score` pass threshold.
    pub pass_threshold: f64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self { stabilization_wait_seconds: 10, pass_threshold: 0.8 }
    }
}

/// Reflection-loop tunable (§4.8 step 9, P2).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReflectionConfig {
    /// Maximum reflection iterations before an incident is escalated.
    pub max_reflection_count: u32,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self { max_reflection_count: 3 }
    }
}

/// Scoring tunables a deployment may adjust without recompiling (§4.2,
/// §13.3). The sigmoid constants and term weights themselves are pinned.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score at or above which an alert is escalated to `investigate`.
    pub investigate_threshold: f64,
    /// Score below which an alert is suppressed.
    pub suppress_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { investigate_threshold: 0.7, suppress_threshold: 0.4 }
    }
}

/// The TOML-deserializable portion of Vigil's configuration. Integration
/// credentials are deliberately absent from this struct — see
/// [`IntegrationCredentials::from_env`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VigilConfigFile {
    /// Integration-harness tunables.
    pub harness: HarnessConfig,
    /// Approval-gate tunables.
    pub approval_gate: ApprovalGateConfig,
    /// Verifier tunables.
    pub verifier: VerifierConfig,
    /// Reflection-loop tunable.
    pub reflection: ReflectionConfig,
    /// Scoring threshold tunables.
    pub scoring: ScoringConfig,
}

impl Default for VigilConfigFile {
    fn default() -> Self {
        Self {
            harness: HarnessConfig::default(),
            approval_gate: ApprovalGateConfig::default(),
            verifier: VerifierConfig::default(),
            reflection: ReflectionConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

/// Vigil's fully resolved runtime configuration: the TOML file merged with
/// environment-sourced integration credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct VigilConfig {
    /// Tunables loaded from the TOML file (or defaults).
    pub file: VigilConfigFile,
    /// Per-integration credential state resolved from the environment.
    pub credentials: IntegrationCredentials,
}

impl VigilConfig {
    /// Loads configuration from `path`, or [`CONFIG_ENV_VAR`], or
    /// `vigil.toml` in the current directory if neither is present and the
    /// file does not exist (in which case defaults apply).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a config file is present but cannot be
    /// read, exceeds [`MAX_CONFIG_FILE_SIZE`], or fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match resolve_existing_path(path) {
            Some(resolved) => load_file(&resolved)?,
            None => VigilConfigFile::default(),
        };
        validate(&file)?;
        Ok(Self { file, credentials: IntegrationCredentials::from_env() })
    }
}

fn resolve_existing_path(path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = path {
        return Some(path.to_path_buf());
    }
    if let Some(env_path) = env_var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(env_path));
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_NAME);
    default_path.exists().then_some(default_path)
}

fn load_file(path: &Path) -> Result<VigilConfigFile, ConfigError> {
    let metadata = fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    let content = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    toml::from_str(&content).map_err(|err| ConfigError::Parse(err.to_string()))
}

fn validate(file: &VigilConfigFile) -> Result<(), ConfigError> {
    if file.scoring.suppress_threshold >= file.scoring.investigate_threshold {
        return Err(ConfigError::Invalid(
            "scoring.suppress_threshold must be less than scoring.investigate_threshold".to_string(),
        ));
    }
    if file.verifier.pass_threshold < 0.0 || file.verifier.pass_threshold > 1.0 {
        return Err(ConfigError::Invalid("verifier.pass_threshold must be within [0, 1]".to_string()));
    }
    if file.harness.max_retries == 0 {
        return Err(ConfigError::Invalid("harness.max_retries must be greater than zero".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use std::io::Write as _;

    use super::*;

    #[test]
    fn load_with_no_path_and_no_file_uses_defaults() {
        let config = VigilConfig::load(None).expect("defaults must load without a file");
        assert_eq!(config.file.scoring.investigate_threshold, 0.7);
    }

    #[test]
    fn load_rejects_crossed_thresholds() {
        let mut dir = tempfile::NamedTempFile::new().expect("tempfile");
        write!(dir, "[scoring]\ninvestigate_threshold = 0.3\nsuppress_threshold = 0.5\n").expect("write");
        let result = VigilConfig::load(Some(dir.path()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_parses_overridden_harness_settings() {
        let mut dir = tempfile::NamedTempFile::new().expect("tempfile");
        write!(dir, "[harness]\nmax_retries = 5\ntimeout_ms = 2000\n").expect("write");
        let config = VigilConfig::load(Some(dir.path())).expect("config must load");
        assert_eq!(config.file.harness.max_retries, 5);
        assert_eq!(config.file.harness.timeout_ms, 2000);
    }

    #[test]
    fn chat_credentials_require_all_three_fields() {
        assert_eq!(resolve_chat(None, None, None), CredentialState::Mock);
        assert_eq!(
            resolve_chat(Some("tok".to_string()), Some("sig".to_string()), None),
            CredentialState::Mock
        );
        let configured = resolve_chat(
            Some("tok".to_string()),
            Some("sig".to_string()),
            Some("soc, alerts".to_string()),
        );
        assert_eq!(
            configured,
            CredentialState::Configured(ChatCredentials {
                bot_token: "tok".to_string(),
                signing_secret: "sig".to_string(),
                channels: vec!["soc".to_string(), "alerts".to_string()],
            })
        );
    }
}
