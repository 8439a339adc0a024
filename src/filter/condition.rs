use std::fmt;

use crate::mavlink::dialect;
use crate::mavlink::{MavAddress, MavSubnet, Packet};

use super::FilterError;

/// Optional predicate over a (packet, destination address) pair.
///
/// Built incrementally; every part that is present must match. An empty
/// condition matches anything:
///
/// ```ignore
/// Condition::any().packet_type("PING")?.from("1.0/8".parse()?).to("255.0".parse()?)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
    id: Option<u32>,
    source: Option<MavSubnet>,
    dest: Option<MavSubnet>,
}

impl Condition {
    /// A condition that matches every packet and address.
    pub fn any() -> Self {
        Self::default()
    }

    /// Restricts the condition to one message type, by name.
    pub fn packet_type(mut self, name: &str) -> Result<Self, FilterError> {
        let info = dialect::by_name(name)
            .ok_or_else(|| FilterError::UnknownMessage(name.to_string()))?;
        self.id = Some(info.id);
        Ok(self)
    }

    /// Restricts the condition to one message type, by numeric ID.
    #[allow(dead_code)]
    pub fn packet_id(mut self, id: u32) -> Result<Self, FilterError> {
        if dialect::by_id(id).is_none() {
            return Err(FilterError::UnknownMessage(format!("#{id}")));
        }
        self.id = Some(id);
        Ok(self)
    }

    /// Requires the packet source to be inside `subnet`.
    pub fn from(mut self, subnet: MavSubnet) -> Self {
        self.source = Some(subnet);
        self
    }

    /// Requires the destination address to be inside `subnet`.
    pub fn to(mut self, subnet: MavSubnet) -> Self {
        self.dest = Some(subnet);
        self
    }

    /// Whether the packet/address pair satisfies every present part.
    pub fn check(&self, packet: &Packet, address: MavAddress) -> bool {
        if let Some(id) = self.id {
            if packet.id() != id {
                return false;
            }
        }
        if let Some(source) = self.source {
            if !source.contains(packet.source()) {
                return false;
            }
        }
        if let Some(dest) = self.dest {
            if !dest.contains(address) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Condition {
    /// Prints e.g. `if PING from 1.0/8 to 255.0`, or `if any`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if")?;

        if self.id.is_none() && self.source.is_none() && self.dest.is_none() {
            return write!(f, " any");
        }
        if let Some(id) = self.id {
            let name = dialect::by_id(id).map(|info| info.name).unwrap_or("UNKNOWN");
            write!(f, " {name}")?;
        }
        if let Some(source) = self.source {
            write!(f, " from {source}")?;
        }
        if let Some(dest) = self.dest {
            write!(f, " to {dest}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mavlink::testing::*;

    fn subnet(s: &str) -> MavSubnet {
        s.parse().unwrap()
    }

    #[test]
    fn empty_condition_matches_anything() {
        let condition = Condition::any();
        assert!(condition.check(&ping_v2(), MavAddress::new(127, 1)));
        assert!(condition.check(&heartbeat_v2(), MavAddress::new(0, 0)));
    }

    #[test]
    fn packet_type_matches_by_id() {
        let condition = Condition::any().packet_type("PING").unwrap();
        assert!(condition.check(&ping_v2(), MavAddress::new(127, 1)));
        assert!(!condition.check(&heartbeat_v2(), MavAddress::new(127, 1)));
    }

    #[test]
    fn packet_type_rejects_unknown_names() {
        assert_eq!(
            Condition::any().packet_type("NOT_A_MESSAGE"),
            Err(FilterError::UnknownMessage("NOT_A_MESSAGE".to_string()))
        );
        assert_eq!(
            Condition::any().packet_id(3),
            Err(FilterError::UnknownMessage("#3".to_string()))
        );
    }

    #[test]
    fn source_and_dest_subnets_must_both_match() {
        let condition = Condition::any()
            .from(subnet("192.0/8"))
            .to(subnet("127.0/8"));
        // ping_v2 is from 192.168.
        assert!(condition.check(&ping_v2(), MavAddress::new(127, 1)));
        assert!(!condition.check(&ping_v2(), MavAddress::new(10, 10)));
        // heartbeat_v2 is from 127.1, outside the source subnet.
        assert!(!condition.check(&heartbeat_v2(), MavAddress::new(127, 1)));
    }

    #[test]
    fn all_three_parts_combine() {
        let condition = Condition::any()
            .packet_type("PING")
            .unwrap()
            .from(subnet("192.168"))
            .to(subnet("127.0/8"));
        assert!(condition.check(&ping_v2(), MavAddress::new(127, 1)));
        assert!(!condition.check(&ping_v2(), MavAddress::new(128, 1)));
        assert!(!condition.check(&mission_set_current_v2(), MavAddress::new(127, 1)));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Condition::any().to_string(), "if any");
        assert_eq!(
            Condition::any()
                .packet_type("PING")
                .unwrap()
                .from(subnet("1.0/8"))
                .to(subnet("255.0"))
                .to_string(),
            "if PING from 1.0/8 to 255.0"
        );
        assert_eq!(
            Condition::any().from(subnet("255.0/8")).to_string(),
            "if from 255.0/8"
        );
    }
}
