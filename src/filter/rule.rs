use std::fmt;

use crate::mavlink::{MavAddress, Packet};

use super::chain::ChainMap;
use super::condition::Condition;
use super::FilterError;

/// Verdict of a rule or chain for one (packet, address) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Let the packet through, optionally at a given priority.
    Accept { priority: Option<i32> },
    /// Drop the packet.
    Reject,
    /// No verdict; keep evaluating the current chain.
    Continue,
    /// No verdict and evaluation is over; fall back to the filter default.
    Default,
}

impl Action {
    #[allow(dead_code)]
    pub fn accept() -> Self {
        Action::Accept { priority: None }
    }

    #[allow(dead_code)]
    pub fn accept_with_priority(priority: i32) -> Self {
        Action::Accept {
            priority: Some(priority),
        }
    }

    /// Attaches `priority` if the action is an accept without one. Used by
    /// call/goto rules to pass their priority down to a subchain verdict
    /// that did not set its own.
    fn promote(self, priority: Option<i32>) -> Self {
        match self {
            Action::Accept { priority: None } => Action::Accept { priority },
            other => other,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Accept { priority: None } => write!(f, "accept"),
            Action::Accept {
                priority: Some(priority),
            } => write!(f, "accept with priority {priority}"),
            Action::Reject => write!(f, "reject"),
            Action::Continue => write!(f, "continue"),
            Action::Default => write!(f, "default"),
        }
    }
}

/// One entry of a chain.
///
/// A rule whose condition does not match yields [`Action::Continue`] so the
/// chain moves on to its next rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Accept matching packets, optionally at a priority.
    Accept {
        priority: Option<i32>,
        condition: Option<Condition>,
    },
    /// Reject matching packets. Rejection has no priority.
    Reject { condition: Option<Condition> },
    /// Delegate matching packets to another chain; if that chain has no
    /// verdict, resume the current one.
    Call {
        chain: String,
        priority: Option<i32>,
        condition: Option<Condition>,
    },
    /// Jump to another chain; its verdict (or the filter default) is final.
    GoTo {
        chain: String,
        priority: Option<i32>,
        condition: Option<Condition>,
    },
}

impl Rule {
    pub(crate) fn apply(
        &self,
        packet: &Packet,
        address: MavAddress,
        chains: &ChainMap,
    ) -> Result<Action, FilterError> {
        match self {
            Rule::Accept {
                priority,
                condition,
            } => {
                if matches(condition, packet, address) {
                    Ok(Action::Accept {
                        priority: *priority,
                    })
                } else {
                    Ok(Action::Continue)
                }
            }
            Rule::Reject { condition } => {
                if matches(condition, packet, address) {
                    Ok(Action::Reject)
                } else {
                    Ok(Action::Continue)
                }
            }
            Rule::Call {
                chain,
                priority,
                condition,
            } => {
                if !matches(condition, packet, address) {
                    return Ok(Action::Continue);
                }
                let target = chains
                    .get(chain)
                    .ok_or_else(|| FilterError::UnknownChain(chain.clone()))?;
                Ok(target.action(packet, address, chains)?.promote(*priority))
            }
            Rule::GoTo {
                chain,
                priority,
                condition,
            } => {
                if !matches(condition, packet, address) {
                    return Ok(Action::Continue);
                }
                let target = chains
                    .get(chain)
                    .ok_or_else(|| FilterError::UnknownChain(chain.clone()))?;
                match target.action(packet, address, chains)?.promote(*priority) {
                    // The jump is one way: an unmatched subchain ends
                    // evaluation at the filter default, never back here.
                    Action::Continue => Ok(Action::Default),
                    action => Ok(action),
                }
            }
        }
    }
}

fn matches(condition: &Option<Condition>, packet: &Packet, address: MavAddress) -> bool {
    condition
        .as_ref()
        .map_or(true, |condition| condition.check(packet, address))
}

impl fmt::Display for Rule {
    /// Prints e.g. `accept with priority 3 if PING`, `call gcs_in`,
    /// `goto autopilot_out if from 1.0/8`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (priority, condition) = match self {
            Rule::Accept {
                priority,
                condition,
            } => {
                write!(f, "accept")?;
                (priority, condition)
            }
            Rule::Reject { condition } => {
                write!(f, "reject")?;
                (&None, condition)
            }
            Rule::Call {
                chain,
                priority,
                condition,
            } => {
                write!(f, "call {chain}")?;
                (priority, condition)
            }
            Rule::GoTo {
                chain,
                priority,
                condition,
            } => {
                write!(f, "goto {chain}")?;
                (priority, condition)
            }
        };
        if let Some(priority) = priority {
            write!(f, " with priority {priority}")?;
        }
        if let Some(condition) = condition {
            write!(f, " {condition}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::chain::Chain;
    use crate::mavlink::testing::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn no_chains() -> ChainMap {
        HashMap::new()
    }

    fn ping_condition() -> Condition {
        Condition::any().packet_type("PING").unwrap()
    }

    #[test]
    fn accept_without_condition_always_accepts() {
        let rule = Rule::Accept {
            priority: None,
            condition: None,
        };
        let action = rule
            .apply(&ping_v2(), MavAddress::new(127, 1), &no_chains())
            .unwrap();
        assert_eq!(action, Action::accept());
    }

    #[test]
    fn accept_carries_its_priority() {
        let rule = Rule::Accept {
            priority: Some(3),
            condition: Some(ping_condition()),
        };
        assert_eq!(
            rule.apply(&ping_v2(), MavAddress::new(127, 1), &no_chains())
                .unwrap(),
            Action::accept_with_priority(3)
        );
        assert_eq!(
            rule.apply(&heartbeat_v2(), MavAddress::new(127, 1), &no_chains())
                .unwrap(),
            Action::Continue
        );
    }

    #[test]
    fn reject_matches_or_continues() {
        let rule = Rule::Reject {
            condition: Some(ping_condition()),
        };
        assert_eq!(
            rule.apply(&ping_v2(), MavAddress::new(127, 1), &no_chains())
                .unwrap(),
            Action::Reject
        );
        assert_eq!(
            rule.apply(&heartbeat_v2(), MavAddress::new(127, 1), &no_chains())
                .unwrap(),
            Action::Continue
        );
    }

    fn chain_map(chains: Vec<Chain>) -> ChainMap {
        chains
            .into_iter()
            .map(|chain| (chain.name().to_string(), Arc::new(chain)))
            .collect()
    }

    #[test]
    fn call_returns_the_subchain_verdict() {
        let mut sub = Chain::new("sub").unwrap();
        sub.append(Rule::Accept {
            priority: Some(3),
            condition: None,
        });
        let chains = chain_map(vec![sub]);

        let rule = Rule::Call {
            chain: "sub".to_string(),
            priority: None,
            condition: None,
        };
        assert_eq!(
            rule.apply(&ping_v2(), MavAddress::new(127, 1), &chains)
                .unwrap(),
            Action::accept_with_priority(3)
        );
    }

    #[test]
    fn call_promotes_its_priority_onto_an_unset_accept() {
        let mut sub = Chain::new("sub").unwrap();
        sub.append(Rule::Accept {
            priority: None,
            condition: None,
        });
        let chains = chain_map(vec![sub]);

        let rule = Rule::Call {
            chain: "sub".to_string(),
            priority: Some(7),
            condition: None,
        };
        assert_eq!(
            rule.apply(&ping_v2(), MavAddress::new(127, 1), &chains)
                .unwrap(),
            Action::accept_with_priority(7)
        );
    }

    #[test]
    fn call_does_not_override_a_set_priority() {
        let mut sub = Chain::new("sub").unwrap();
        sub.append(Rule::Accept {
            priority: Some(3),
            condition: None,
        });
        let chains = chain_map(vec![sub]);

        let rule = Rule::Call {
            chain: "sub".to_string(),
            priority: Some(7),
            condition: None,
        };
        assert_eq!(
            rule.apply(&ping_v2(), MavAddress::new(127, 1), &chains)
                .unwrap(),
            Action::accept_with_priority(3)
        );
    }

    #[test]
    fn call_with_unmatched_subchain_continues_the_caller() {
        let mut sub = Chain::new("sub").unwrap();
        sub.append(Rule::Accept {
            priority: None,
            condition: Some(ping_condition()),
        });
        let chains = chain_map(vec![sub]);

        let rule = Rule::Call {
            chain: "sub".to_string(),
            priority: None,
            condition: None,
        };
        assert_eq!(
            rule.apply(&heartbeat_v2(), MavAddress::new(127, 1), &chains)
                .unwrap(),
            Action::Continue
        );
    }

    #[test]
    fn goto_converts_continue_into_default() {
        let mut sub = Chain::new("sub").unwrap();
        sub.append(Rule::Accept {
            priority: None,
            condition: Some(ping_condition()),
        });
        let chains = chain_map(vec![sub]);

        let rule = Rule::GoTo {
            chain: "sub".to_string(),
            priority: None,
            condition: None,
        };
        assert_eq!(
            rule.apply(&heartbeat_v2(), MavAddress::new(127, 1), &chains)
                .unwrap(),
            Action::Default
        );
        assert_eq!(
            rule.apply(&ping_v2(), MavAddress::new(127, 1), &chains)
                .unwrap(),
            Action::accept()
        );
    }

    #[test]
    fn goto_surfaces_reject_unchanged() {
        let mut sub = Chain::new("sub").unwrap();
        sub.append(Rule::Reject { condition: None });
        let chains = chain_map(vec![sub]);

        let rule = Rule::GoTo {
            chain: "sub".to_string(),
            priority: Some(5),
            condition: None,
        };
        assert_eq!(
            rule.apply(&ping_v2(), MavAddress::new(127, 1), &chains)
                .unwrap(),
            Action::Reject
        );
    }

    #[test]
    fn missing_target_chain_is_an_error() {
        let rule = Rule::Call {
            chain: "nowhere".to_string(),
            priority: None,
            condition: None,
        };
        assert_eq!(
            rule.apply(&ping_v2(), MavAddress::new(127, 1), &no_chains()),
            Err(FilterError::UnknownChain("nowhere".to_string()))
        );
    }

    #[test]
    fn display_forms() {
        assert_eq!(
            Rule::Accept {
                priority: None,
                condition: None
            }
            .to_string(),
            "accept"
        );
        assert_eq!(
            Rule::Accept {
                priority: Some(3),
                condition: Some(ping_condition())
            }
            .to_string(),
            "accept with priority 3 if PING"
        );
        assert_eq!(Rule::Reject { condition: None }.to_string(), "reject");
        assert_eq!(
            Rule::Call {
                chain: "gcs_in".to_string(),
                priority: Some(-3),
                condition: None
            }
            .to_string(),
            "call gcs_in with priority -3"
        );
        assert_eq!(
            Rule::GoTo {
                chain: "autopilot_out".to_string(),
                priority: None,
                condition: None
            }
            .to_string(),
            "goto autopilot_out"
        );
    }
}
