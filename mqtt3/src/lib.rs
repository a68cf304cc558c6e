//! MQTT 3.1.1 control packet codec: pure functions to build outbound
//! packets and to frame/inspect inbound ones. No I/O beyond the generic
//! `Read` bound on [`read::read_frame`].

pub mod error;
pub mod frame;
pub mod read;
pub mod types;
pub mod varint;
pub mod write;

pub use error::{MQError, Result};
pub use frame::Frame;
pub use types::{ConnectReturnCode, PacketIdentifier, PacketType, QoS};
