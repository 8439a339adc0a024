pub mod chain;
pub mod condition;
mod recursion;
pub mod rule;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::mavlink::{MavAddress, Packet};

pub use chain::{Chain, ChainMap};
pub use condition::Condition;
pub use rule::{Action, Rule};

/// Name of the chain every evaluation starts from.
pub const DEFAULT_CHAIN: &str = "default";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("chain name {0:?} contains whitespace")]
    InvalidChainName(String),

    #[error("unknown MAVLink message {0:?}")]
    UnknownMessage(String),

    #[error("rule references unknown chain {0:?}")]
    UnknownChain(String),

    #[error("rules may not call or goto the default chain")]
    DefaultChainTarget,

    #[error("recursion detected in chain {0:?}")]
    Recursion(String),
}

/// The packet firewall: a default chain, the subchains it can reach, and a
/// policy for packets no rule decides on.
///
/// Evaluation is deterministic and side-effect-free; the filter is shared
/// immutably between every connection and may be queried from any number of
/// threads at once.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    chains: ChainMap,
    default_chain: String,
    accept_by_default: bool,
}

impl Filter {
    /// Builds a filter from its default chain and subchains.
    ///
    /// Every call/goto target must resolve to one of the given subchains;
    /// targeting the default chain (by any route) is rejected here so a
    /// config error surfaces before any packet flows.
    pub fn new(
        default_chain: Chain,
        subchains: impl IntoIterator<Item = Chain>,
        accept_by_default: bool,
    ) -> Result<Self, FilterError> {
        let mut chains: ChainMap = HashMap::new();
        let default_name = default_chain.name().to_string();
        chains.insert(default_name.clone(), Arc::new(default_chain));
        for chain in subchains {
            chains.insert(chain.name().to_string(), Arc::new(chain));
        }

        for chain in chains.values() {
            for rule in chain.rules() {
                let target = match rule {
                    Rule::Call { chain, .. } | Rule::GoTo { chain, .. } => chain,
                    _ => continue,
                };
                if *target == default_name {
                    return Err(FilterError::DefaultChainTarget);
                }
                if !chains.contains_key(target) {
                    return Err(FilterError::UnknownChain(target.clone()));
                }
            }
        }

        Ok(Self {
            chains,
            default_chain: default_name,
            accept_by_default,
        })
    }

    /// Decides whether `packet` may be sent to `address`, and at what
    /// priority. The priority is 0 unless an accepting rule attached one.
    pub fn will_accept(
        &self,
        packet: &Packet,
        address: MavAddress,
    ) -> Result<(bool, i32), FilterError> {
        let default_chain = self
            .chains
            .get(&self.default_chain)
            .ok_or_else(|| FilterError::UnknownChain(self.default_chain.clone()))?;

        match default_chain.action(packet, address, &self.chains)? {
            Action::Accept { priority } => Ok((true, priority.unwrap_or(0))),
            Action::Reject => Ok((false, 0)),
            Action::Continue | Action::Default => Ok((self.accept_by_default, 0)),
        }
    }
}
