pub mod address;
pub mod dialect;
pub mod packet;
pub mod parser;

#[cfg(test)]
pub mod testing;

pub use address::{AddressError, MavAddress, MavSubnet};
pub use packet::{MavVersion, Packet, PacketError};
pub use parser::PacketParser;
