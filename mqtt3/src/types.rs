use crate::error::{MQError, Result};

/// High nibble of a control packet's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Connect = 0x10,
    Connack = 0x20,
    Publish = 0x30,
    Puback = 0x40,
    Pubrec = 0x50,
    Pubrel = 0x60,
    Pubcomp = 0x70,
    Subscribe = 0x80,
    Suback = 0x90,
    Unsubscribe = 0xA0,
    Unsuback = 0xB0,
    Pingreq = 0xC0,
    Pingresp = 0xD0,
    Disconnect = 0xE0,
}

impl PacketType {
    pub fn from_u8(v: u8) -> Result<PacketType> {
        match v & 0xF0 {
            0x10 => Ok(PacketType::Connect),
            0x20 => Ok(PacketType::Connack),
            0x30 => Ok(PacketType::Publish),
            0x40 => Ok(PacketType::Puback),
            0x50 => Ok(PacketType::Pubrec),
            0x60 => Ok(PacketType::Pubrel),
            0x70 => Ok(PacketType::Pubcomp),
            0x80 => Ok(PacketType::Subscribe),
            0x90 => Ok(PacketType::Suback),
            0xA0 => Ok(PacketType::Unsubscribe),
            0xB0 => Ok(PacketType::Unsuback),
            0xC0 => Ok(PacketType::Pingreq),
            0xD0 => Ok(PacketType::Pingresp),
            0xE0 => Ok(PacketType::Disconnect),
            _ => Err(MQError::UnsupportedPacketType),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl QoS {
    pub fn to_u8(self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }

    pub fn from_u8(v: u8) -> Result<QoS> {
        match v {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            _ => Err(MQError::UnsupportedQualityOfService),
        }
    }
}

/// CONNACK return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectReturnCode {
    Accepted,
    UnacceptableProtocolVersion,
    IdentifierRejected,
    ServerUnavailable,
    BadUsernamePassword,
    NotAuthorized,
}

impl ConnectReturnCode {
    pub fn from_u8(v: u8) -> Result<ConnectReturnCode> {
        match v {
            0 => Ok(ConnectReturnCode::Accepted),
            1 => Ok(ConnectReturnCode::UnacceptableProtocolVersion),
            2 => Ok(ConnectReturnCode::IdentifierRejected),
            3 => Ok(ConnectReturnCode::ServerUnavailable),
            4 => Ok(ConnectReturnCode::BadUsernamePassword),
            5 => Ok(ConnectReturnCode::NotAuthorized),
            _ => Err(MQError::UnsupportedConnectReturnCode),
        }
    }
}

/// 16-bit packet identifier. `0` is reserved to mean "none"; `next()`
/// advances the counter, skipping back over `0` on wraparound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketIdentifier(pub u16);

impl PacketIdentifier {
    pub fn zero() -> PacketIdentifier {
        PacketIdentifier(0)
    }

    pub fn next(self) -> PacketIdentifier {
        let next = self.0.wrapping_add(1);
        PacketIdentifier(if next == 0 { 1 } else { next })
    }
}
