use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::mavlink::{MavAddress, Packet};

use super::recursion::{RecursionData, RecursionGuard};
use super::rule::{Action, Rule};
use super::FilterError;

/// Chains are kept in an arena keyed by name; call/goto rules store the
/// target's name and resolve it here at evaluation time, which lets chains
/// reference each other in arbitrary (even cyclic) graphs.
pub type ChainMap = HashMap<String, Arc<Chain>>;

/// A named, ordered list of rules.
///
/// Evaluation walks the rules in order and returns the first verdict that is
/// not [`Action::Continue`]; a chain none of whose rules match yields
/// `Continue` itself. Re-entering a chain from the same thread (a call/goto
/// cycle) is caught by the per-chain recursion guard.
#[derive(Debug, Clone)]
pub struct Chain {
    name: String,
    rules: Vec<Rule>,
    recursion: RecursionData,
}

impl Chain {
    /// Creates an empty chain. Names may not contain whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, FilterError> {
        let name = name.into();
        if name.contains(char::is_whitespace) {
            return Err(FilterError::InvalidChainName(name));
        }
        Ok(Self {
            name,
            rules: Vec::new(),
            recursion: RecursionData::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Appends a rule; rules keep their insertion order.
    pub fn append(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub(crate) fn action(
        &self,
        packet: &Packet,
        address: MavAddress,
        chains: &ChainMap,
    ) -> Result<Action, FilterError> {
        let _guard = RecursionGuard::enter(&self.recursion)
            .ok_or_else(|| FilterError::Recursion(self.name.clone()))?;

        for rule in &self.rules {
            match rule.apply(packet, address, chains)? {
                Action::Continue => continue,
                action => return Ok(action),
            }
        }
        Ok(Action::Continue)
    }
}

impl PartialEq for Chain {
    /// Chains compare by name and rule sequence; the recursion bookkeeping
    /// is activation state, not value.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.rules == other.rules
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "chain {} {{", self.name)?;
        for rule in &self.rules {
            writeln!(f, "    {rule};")?;
        }
        write!(f, "}}")
    }
}
