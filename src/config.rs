use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::filter::{Chain, Condition, Filter, Rule, DEFAULT_CHAIN};
use crate::mavlink::MavSubnet;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// UDP endpoints
    #[serde(default)]
    pub udp: Vec<UdpConfig>,

    /// Serial port endpoints
    #[serde(default)]
    pub serial: Vec<SerialConfig>,

    /// Filter chains; the `default` chain is where evaluation starts
    #[serde(default)]
    pub chains: HashMap<String, ChainConfig>,

    /// Policy for packets no rule decides on
    #[serde(default)]
    pub accept_by_default: bool,

    /// Seconds an address stays in a connection's pool without being seen
    #[serde(default = "default_address_ttl")]
    pub address_ttl_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Performance stats logging interval in seconds (0 = disabled)
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UdpConfig {
    /// Port to listen on
    pub port: u16,

    /// Bind address
    #[serde(default = "default_bind_addr")]
    pub address: String,

    /// Optional egress rate limit in bits per second
    pub max_bitrate: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    /// Path to the serial device (e.g., /dev/ttyUSB0)
    pub device: String,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Hardware flow control
    #[serde(default)]
    pub flow_control: bool,

    /// Addresses seeded into the pool so traffic flows before the peer
    /// sends anything (e.g. a listen-only ground station)
    #[serde(default)]
    pub preload: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    pub action: RuleAction,

    /// Target chain, for call/goto
    pub chain: Option<String>,

    /// Priority attached to accepted packets
    pub priority: Option<i32>,

    /// Message name the rule applies to (e.g. "HEARTBEAT")
    #[serde(rename = "type")]
    pub packet_type: Option<String>,

    /// Source subnet the rule applies to
    pub from: Option<String>,

    /// Destination subnet the rule applies to
    pub to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Accept,
    Reject,
    Call,
    Goto,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_baud_rate() -> u32 {
    57600
}

fn default_address_ttl() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stats_interval() -> u64 {
    30
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        Self::from_toml(&content).with_context(|| format!("in config file {path}"))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn address_ttl(&self) -> Duration {
        Duration::from_secs(self.address_ttl_secs)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.udp.is_empty() && self.serial.is_empty() {
            bail!("at least one udp or serial interface is required");
        }
        if !self.chains.contains_key(DEFAULT_CHAIN) {
            bail!("a [chains.default] table is required");
        }
        for serial in &self.serial {
            if serial.device.trim().is_empty() {
                bail!("serial device path cannot be empty");
            }
            for address in &serial.preload {
                address
                    .parse::<crate::mavlink::MavAddress>()
                    .with_context(|| format!("serial:{}: bad preload address", serial.device))?;
            }
        }
        Ok(())
    }

    /// Builds the packet filter from the `[chains]` tables.
    pub fn build_filter(&self) -> anyhow::Result<Filter> {
        let mut default_chain = None;
        let mut subchains = Vec::new();

        for (name, chain_config) in &self.chains {
            let mut chain = Chain::new(name.clone())
                .with_context(|| format!("invalid chain name {name:?}"))?;
            for (index, rule_config) in chain_config.rules.iter().enumerate() {
                let rule = build_rule(rule_config)
                    .with_context(|| format!("chain {name:?}, rule {}", index + 1))?;
                chain.append(rule);
            }
            if name == DEFAULT_CHAIN {
                default_chain = Some(chain);
            } else {
                subchains.push(chain);
            }
        }

        let default_chain = default_chain.context("a default chain is required")?;
        let filter = Filter::new(default_chain, subchains, self.accept_by_default)?;
        Ok(filter)
    }
}

fn build_rule(config: &RuleConfig) -> anyhow::Result<Rule> {
    let condition = build_condition(config)?;

    match config.action {
        RuleAction::Accept => {
            if config.chain.is_some() {
                bail!("accept takes no target chain");
            }
            Ok(Rule::Accept {
                priority: config.priority,
                condition,
            })
        }
        RuleAction::Reject => {
            if config.chain.is_some() {
                bail!("reject takes no target chain");
            }
            if config.priority.is_some() {
                bail!("reject takes no priority");
            }
            Ok(Rule::Reject { condition })
        }
        RuleAction::Call => Ok(Rule::Call {
            chain: config.chain.clone().context("call requires a chain")?,
            priority: config.priority,
            condition,
        }),
        RuleAction::Goto => Ok(Rule::GoTo {
            chain: config.chain.clone().context("goto requires a chain")?,
            priority: config.priority,
            condition,
        }),
    }
}

fn build_condition(config: &RuleConfig) -> anyhow::Result<Option<Condition>> {
    if config.packet_type.is_none() && config.from.is_none() && config.to.is_none() {
        return Ok(None);
    }

    let mut condition = Condition::any();
    if let Some(packet_type) = &config.packet_type {
        condition = condition.packet_type(packet_type)?;
    }
    if let Some(from) = &config.from {
        condition = condition.from(from.parse::<MavSubnet>()?);
    }
    if let Some(to) = &config.to {
        condition = condition.to(to.parse::<MavSubnet>()?);
    }
    Ok(Some(condition))
}
