use byteorder::{BigEndian, ByteOrder};

use crate::error::{MQError, Result};
use crate::types::{PacketIdentifier, PacketType, QoS};

/// An inbound control packet, still in wire form. Accessors compute
/// offsets into the owned buffer on demand rather than eagerly parsing
/// into a typed struct.
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn new(bytes: Vec<u8>) -> Frame {
        Frame(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn packet_type(&self) -> Result<PacketType> {
        PacketType::from_u8(self.0[0])
    }

    pub fn dup(&self) -> bool {
        self.0[0] & 0x08 != 0
    }

    pub fn qos(&self) -> Result<QoS> {
        QoS::from_u8((self.0[0] >> 1) & 0x03)
    }

    pub fn retain(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Number of remaining-length bytes following the type byte.
    fn remaining_length_size(&self) -> usize {
        let mut n = 1;
        while n < 4 && self.0[n] & 0x80 != 0 {
            n += 1;
        }
        n
    }

    fn fixed_header_len(&self) -> usize {
        1 + self.remaining_length_size()
    }

    /// The packet identifier, or `None` for packet types/QoS levels that
    /// don't carry one.
    pub fn pid(&self) -> Option<PacketIdentifier> {
        let offset = match self.packet_type().ok()? {
            PacketType::Publish => {
                if self.qos().ok()? == QoS::AtMostOnce {
                    return None;
                }
                let header = self.fixed_header_len();
                let topic_len = BigEndian::read_u16(&self.0[header..]) as usize;
                header + 2 + topic_len
            }
            PacketType::Puback
            | PacketType::Pubrec
            | PacketType::Pubrel
            | PacketType::Pubcomp
            | PacketType::Suback
            | PacketType::Unsuback => self.fixed_header_len(),
            _ => return None,
        };
        Some(PacketIdentifier(BigEndian::read_u16(&self.0[offset..])))
    }

    /// Topic name, defined only for PUBLISH.
    pub fn topic(&self) -> Option<&str> {
        if self.packet_type().ok()? != PacketType::Publish {
            return None;
        }
        let header = self.fixed_header_len();
        let topic_len = BigEndian::read_u16(&self.0[header..]) as usize;
        std::str::from_utf8(&self.0[header + 2..header + 2 + topic_len]).ok()
    }

    /// Payload bytes, defined only for PUBLISH.
    pub fn payload(&self) -> Option<&[u8]> {
        if self.packet_type().ok()? != PacketType::Publish {
            return None;
        }
        let header = self.fixed_header_len();
        let topic_len = BigEndian::read_u16(&self.0[header..]) as usize;
        let mut start = header + 2 + topic_len;
        if self.qos().ok()? != QoS::AtMostOnce {
            start += 2;
        }
        Some(&self.0[start..])
    }

    /// Byte index 3 of a CONNACK packet: the server's connect return code.
    pub fn connack_code(&self) -> Result<u8> {
        if self.packet_type().ok() != Some(PacketType::Connack) {
            return Err(MQError::PacketTooShort);
        }
        self.0.get(3).copied().ok_or(MQError::PacketTooShort)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::write;

    #[test]
    fn publish_qos2_topic_and_payload_and_pid() {
        let header = write::publish_header("tp/aa", 1, QoS::ExactlyOnce, false, false, Some(PacketIdentifier(7))).unwrap();
        let mut bytes = header;
        bytes.extend_from_slice(b"x");
        let frame = Frame::new(bytes);
        assert_eq!(frame.packet_type().unwrap(), PacketType::Publish);
        assert_eq!(frame.qos().unwrap(), QoS::ExactlyOnce);
        assert_eq!(frame.topic().unwrap(), "tp/aa");
        assert_eq!(frame.payload().unwrap(), b"x");
        assert_eq!(frame.pid(), Some(PacketIdentifier(7)));
    }

    #[test]
    fn publish_qos0_has_no_pid() {
        let mut bytes = write::publish_header("tp/aa", 2, QoS::AtMostOnce, false, false, None).unwrap();
        bytes.extend_from_slice(b"hi");
        let frame = Frame::new(bytes);
        assert_eq!(frame.pid(), None);
        assert_eq!(frame.payload().unwrap(), b"hi");
    }

    #[test]
    fn puback_pid() {
        let frame = Frame::new(write::puback(PacketIdentifier(10)));
        assert_eq!(frame.packet_type().unwrap(), PacketType::Puback);
        assert_eq!(frame.pid(), Some(PacketIdentifier(10)));
    }

    #[test]
    fn connack_reads_reason_byte() {
        let frame = Frame::new(vec![0x20, 0x02, 0x00, 0x05]);
        assert_eq!(frame.connack_code().unwrap(), 5);
    }
}
