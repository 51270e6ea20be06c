//! Ports Layer - Hexagonal Architecture interfaces
//!
//! - `inbound`: API this subsystem exposes (driving ports)
//! - `outbound`: SPI this subsystem requires (driven ports)

pub mod inbound;
pub mod outbound;

pub use inbound::DatagramHandler;
pub use outbound::{Clock, CommandEndpoint, PreparedCommand};
