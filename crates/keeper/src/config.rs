//! Keeper configuration: `config/keeper.json` plus environment overrides.
//!
//! Addresses and amounts are kept as strings in the serde layer and parsed
//! during validation, so every malformed field is reported at startup rather
//! than surfacing mid-run.

use alloy_primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use topup_engine::PositionKind;

// ---------------------------------------------------------------------------
// Serde layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct KeeperConfig {
    pub logging: LoggingConfig,
    pub timing: TimingConfig,
    pub position: PositionConfig,
    pub scenario: ScenarioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    pub poll_interval_secs: u64,
    /// Sim-clock seconds advanced per poll, so interest accrual is visible
    /// at rehearsal speed.
    pub sim_seconds_per_poll: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionConfig {
    /// "redemption" or "leveraged".
    pub kind: String,
    pub manager: String,
    pub recipient: String,
    pub threshold: String,
    /// Required for the leveraged kind; WAD-scaled annual rate.
    pub max_borrowing_rate: Option<String>,
    pub initial_deposit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub pool_liquidity: String,
    /// WAD-scaled annual borrow rate the sim pool starts at.
    pub borrow_rate: String,
    pub bond_escrow: String,
    pub unclaimed_reserves: String,
    /// Amount the recipient spends each poll, driving the trigger.
    pub recipient_spend_per_poll: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load `keeper.json` from the config directory, apply environment variable
/// overrides, and validate.
///
/// | Env Var                     | Config Field                 |
/// |-----------------------------|------------------------------|
/// | `KEEPER_POLL_INTERVAL_SECS` | `timing.poll_interval_secs`  |
/// | `KEEPER_LOG_DIR`            | `logging.log_dir`            |
/// | `KEEPER_THRESHOLD`          | `position.threshold`         |
pub fn load_config(config_dir: &Path) -> Result<KeeperConfig> {
    let path = config_dir.join("keeper.json");
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let mut config: KeeperConfig =
        serde_json::from_str(&contents).context("parsing keeper.json")?;

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

fn apply_env_overrides(config: &mut KeeperConfig) {
    if let Some(val) = env_parse::<u64>("KEEPER_POLL_INTERVAL_SECS") {
        info!(val, "env override: KEEPER_POLL_INTERVAL_SECS");
        config.timing.poll_interval_secs = val;
    }
    if let Some(val) = env_string("KEEPER_LOG_DIR") {
        info!("env override: KEEPER_LOG_DIR");
        config.logging.log_dir = val;
    }
    if let Some(val) = env_string("KEEPER_THRESHOLD") {
        info!("env override: KEEPER_THRESHOLD");
        config.position.threshold = val;
    }
}

/// Read a non-empty env var as a `String`.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a non-empty env var and parse it as `T`.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate invariants serde alone cannot enforce, collecting every problem
/// before failing.
fn validate_config(config: &KeeperConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if config.timing.poll_interval_secs == 0 {
        errors.push("timing.poll_interval_secs: must be at least 1".into());
    }

    let position = &config.position;
    if parse_kind(&position.kind).is_none() {
        errors.push(format!(
            "position.kind: expected \"redemption\" or \"leveraged\", got {:?}",
            position.kind
        ));
    }
    for (name, value) in [
        ("position.manager", &position.manager),
        ("position.recipient", &position.recipient),
    ] {
        if value.parse::<Address>().is_err() {
            errors.push(format!("{name}: invalid address {value:?}"));
        }
    }
    for (name, value) in [
        ("position.threshold", &position.threshold),
        ("position.initial_deposit", &position.initial_deposit),
        ("scenario.pool_liquidity", &config.scenario.pool_liquidity),
        ("scenario.borrow_rate", &config.scenario.borrow_rate),
        ("scenario.bond_escrow", &config.scenario.bond_escrow),
        ("scenario.unclaimed_reserves", &config.scenario.unclaimed_reserves),
        (
            "scenario.recipient_spend_per_poll",
            &config.scenario.recipient_spend_per_poll,
        ),
    ] {
        if U256::from_str(value).is_err() {
            errors.push(format!("{name}: invalid amount {value:?}"));
        }
    }

    match (parse_kind(&position.kind), &position.max_borrowing_rate) {
        (Some(PositionKind::Leveraged), None) => {
            errors.push("position.max_borrowing_rate: required for the leveraged kind".into());
        }
        (_, Some(rate)) if U256::from_str(rate).is_err() => {
            errors.push(format!("position.max_borrowing_rate: invalid amount {rate:?}"));
        }
        _ => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        bail!(
            "Configuration validation failed ({} error{}):\n  - {}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" },
            errors.join("\n  - ")
        );
    }
}

fn parse_kind(kind: &str) -> Option<PositionKind> {
    match kind {
        "redemption" => Some(PositionKind::Redemption),
        "leveraged" => Some(PositionKind::Leveraged),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Resolved (typed) view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ResolvedPosition {
    pub kind: PositionKind,
    pub manager: Address,
    pub recipient: Address,
    pub threshold: U256,
    pub max_borrowing_rate: U256,
    pub initial_deposit: U256,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedScenario {
    pub pool_liquidity: U256,
    pub borrow_rate: U256,
    pub bond_escrow: U256,
    pub unclaimed_reserves: U256,
    pub recipient_spend_per_poll: U256,
}

impl KeeperConfig {
    /// Parse the validated string fields into their typed forms.
    pub fn resolve(&self) -> Result<(ResolvedPosition, ResolvedScenario)> {
        let position = &self.position;
        let kind = parse_kind(&position.kind)
            .with_context(|| format!("unknown position kind {:?}", position.kind))?;
        let resolved_position = ResolvedPosition {
            kind,
            manager: position.manager.parse().context("position.manager")?,
            recipient: position.recipient.parse().context("position.recipient")?,
            threshold: U256::from_str(&position.threshold).context("position.threshold")?,
            max_borrowing_rate: match &position.max_borrowing_rate {
                Some(rate) => U256::from_str(rate).context("position.max_borrowing_rate")?,
                None => U256::ZERO,
            },
            initial_deposit: U256::from_str(&position.initial_deposit)
                .context("position.initial_deposit")?,
        };

        let scenario = &self.scenario;
        let resolved_scenario = ResolvedScenario {
            pool_liquidity: U256::from_str(&scenario.pool_liquidity)
                .context("scenario.pool_liquidity")?,
            borrow_rate: U256::from_str(&scenario.borrow_rate).context("scenario.borrow_rate")?,
            bond_escrow: U256::from_str(&scenario.bond_escrow).context("scenario.bond_escrow")?,
            unclaimed_reserves: U256::from_str(&scenario.unclaimed_reserves)
                .context("scenario.unclaimed_reserves")?,
            recipient_spend_per_poll: U256::from_str(&scenario.recipient_spend_per_poll)
                .context("scenario.recipient_spend_per_poll")?,
        };

        Ok((resolved_position, resolved_scenario))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::PathBuf;

    fn write_test_config(dir: &Path, kind: &str, max_rate: Option<&str>) {
        std::fs::create_dir_all(dir).unwrap();
        let max_rate_field = match max_rate {
            Some(rate) => format!("\"max_borrowing_rate\": \"{rate}\","),
            None => String::new(),
        };
        let contents = format!(
            r#"{{
  "logging": {{ "log_dir": "logs" }},
  "timing": {{ "poll_interval_secs": 5, "sim_seconds_per_poll": 3600 }},
  "position": {{
    "kind": "{kind}",
    "manager": "0x00000000000000000000000000000000000000a1",
    "recipient": "0x00000000000000000000000000000000000000a2",
    "threshold": "100000000000000000000",
    {max_rate_field}
    "initial_deposit": "1000000000000000000000"
  }},
  "scenario": {{
    "pool_liquidity": "2000000000000000000000",
    "borrow_rate": "50000000000000000",
    "bond_escrow": "0",
    "unclaimed_reserves": "0",
    "recipient_spend_per_poll": "10000000000000000000"
  }}
}}"#
        );
        std::fs::write(dir.join("keeper.json"), contents).unwrap();
    }

    fn temp_config_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("topup-keeper-test-{}-{tag}", std::process::id()))
    }

    #[test]
    #[serial]
    fn test_load_and_resolve_leveraged_config() {
        let dir = temp_config_dir("leveraged");
        write_test_config(&dir, "leveraged", Some("80000000000000000"));

        let config = load_config(&dir).expect("load");
        let (position, scenario) = config.resolve().expect("resolve");
        assert_eq!(position.kind, PositionKind::Leveraged);
        assert_eq!(position.threshold, U256::from(100_000_000_000_000_000_000u128));
        assert_eq!(position.max_borrowing_rate, U256::from(80_000_000_000_000_000u128));
        assert_eq!(
            scenario.recipient_spend_per_poll,
            U256::from(10_000_000_000_000_000_000u128)
        );
    }

    #[test]
    #[serial]
    fn test_leveraged_kind_requires_max_rate() {
        let dir = temp_config_dir("missing-rate");
        write_test_config(&dir, "leveraged", None);
        let err = load_config(&dir).expect_err("missing rate");
        assert!(err.to_string().contains("max_borrowing_rate"));
    }

    #[test]
    #[serial]
    fn test_validation_collects_multiple_errors() {
        let dir = temp_config_dir("invalid");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("keeper.json"),
            r#"{
  "logging": { "log_dir": "logs" },
  "timing": { "poll_interval_secs": 0, "sim_seconds_per_poll": 3600 },
  "position": {
    "kind": "sideways",
    "manager": "not-an-address",
    "recipient": "0x00000000000000000000000000000000000000a2",
    "threshold": "not-a-number",
    "initial_deposit": "1"
  },
  "scenario": {
    "pool_liquidity": "1",
    "borrow_rate": "1",
    "bond_escrow": "1",
    "unclaimed_reserves": "1",
    "recipient_spend_per_poll": "1"
  }
}"#,
        )
        .unwrap();

        let err = load_config(&dir).expect_err("invalid config");
        let message = err.to_string();
        assert!(message.contains("poll_interval_secs"));
        assert!(message.contains("position.kind"));
        assert!(message.contains("position.manager"));
        assert!(message.contains("position.threshold"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_apply() {
        let dir = temp_config_dir("env");
        write_test_config(&dir, "redemption", None);

        std::env::set_var("KEEPER_POLL_INTERVAL_SECS", "42");
        std::env::set_var("KEEPER_THRESHOLD", "5000000000000000000");
        let config = load_config(&dir).expect("load");
        std::env::remove_var("KEEPER_POLL_INTERVAL_SECS");
        std::env::remove_var("KEEPER_THRESHOLD");

        assert_eq!(config.timing.poll_interval_secs, 42);
        assert_eq!(config.position.threshold, "5000000000000000000");
    }
}
