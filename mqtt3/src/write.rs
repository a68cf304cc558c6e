use byteorder::{BigEndian, WriteBytesExt};

use crate::error::{MQError, Result};
use crate::types::{PacketIdentifier, PacketType, QoS};
use crate::varint;

fn write_string(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if s.len() > u16::MAX as usize {
        return Err(MQError::PayloadTooLong);
    }
    buf.write_u16::<BigEndian>(s.len() as u16).expect("write to Vec is infallible");
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

fn fixed_header(buf: &mut Vec<u8>, type_and_flags: u8, remaining_length: usize) {
    buf.push(type_and_flags);
    buf.extend_from_slice(&varint::encode(remaining_length as u32));
}

/// Builds a CONNECT packet. `client_id` must be non-empty. Last-will is
/// not supported.
pub fn connect(
    client_id: &str,
    username: Option<&str>,
    password: Option<&str>,
    clean_session: bool,
    keep_alive: u16,
) -> Result<Vec<u8>> {
    if client_id.is_empty() {
        return Err(MQError::EmptyClientId);
    }

    let mut remaining = 10usize; // "MQTT" (2+4) + level (1) + flags (1) + keep-alive (2)
    remaining += 2 + client_id.len();
    if let Some(u) = username {
        remaining += 2 + u.len();
    }
    if let Some(p) = password {
        remaining += 2 + p.len();
    }

    let mut buf = Vec::with_capacity(remaining + 5);
    fixed_header(&mut buf, PacketType::Connect as u8, remaining);
    write_string(&mut buf, "MQTT")?;
    buf.push(0x04); // protocol level

    let mut flags = 0u8;
    if username.is_some() {
        flags |= 0x80;
    }
    if password.is_some() {
        flags |= 0x40;
    }
    if clean_session {
        flags |= 0x02;
    }
    buf.push(flags);
    buf.write_u16::<BigEndian>(keep_alive).expect("write to Vec is infallible");

    write_string(&mut buf, client_id)?;
    if let Some(u) = username {
        write_string(&mut buf, u)?;
    }
    if let Some(p) = password {
        write_string(&mut buf, p)?;
    }
    Ok(buf)
}

/// Builds the fixed header + variable header of a PUBLISH packet,
/// stopping short of the payload so the caller can transmit the
/// (potentially large) message bytes separately without copying them
/// into this buffer first.
pub fn publish_header(
    topic: &str,
    payload_len: usize,
    qos: QoS,
    retain: bool,
    dup: bool,
    pid: Option<PacketIdentifier>,
) -> Result<Vec<u8>> {
    let pid_len = if qos == QoS::AtMostOnce { 0 } else { 2 };
    let remaining = 2 + topic.len() + pid_len + payload_len;

    let mut buf = Vec::with_capacity(2 + topic.len() + pid_len + 5);
    let type_and_flags = (PacketType::Publish as u8)
        | (qos.to_u8() << 1)
        | ((dup as u8) << 3)
        | (retain as u8);
    fixed_header(&mut buf, type_and_flags, remaining);
    write_string(&mut buf, topic)?;
    if let Some(pid) = pid {
        buf.write_u16::<BigEndian>(pid.0).expect("write to Vec is infallible");
    }
    Ok(buf)
}

fn fixed_four(type_and_flags: u8, pid: PacketIdentifier) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4);
    buf.push(type_and_flags);
    buf.push(0x02);
    buf.write_u16::<BigEndian>(pid.0).expect("write to Vec is infallible");
    buf
}

pub fn puback(pid: PacketIdentifier) -> Vec<u8> {
    fixed_four(PacketType::Puback as u8, pid)
}

pub fn pubrec(pid: PacketIdentifier) -> Vec<u8> {
    fixed_four(PacketType::Pubrec as u8, pid)
}

/// PUBREL carries the mandatory QoS-1 flag bit in its low nibble.
pub fn pubrel(pid: PacketIdentifier) -> Vec<u8> {
    fixed_four((PacketType::Pubrel as u8) | 0x02, pid)
}

pub fn pubcomp(pid: PacketIdentifier) -> Vec<u8> {
    fixed_four(PacketType::Pubcomp as u8, pid)
}

/// Builds a SUBSCRIBE packet carrying exactly one topic filter.
pub fn subscribe(pid: PacketIdentifier, topic: &str, qos: QoS) -> Result<Vec<u8>> {
    let remaining = 2 + 2 + topic.len() + 1;
    let mut buf = Vec::with_capacity(remaining + 5);
    fixed_header(&mut buf, (PacketType::Subscribe as u8) | 0x02, remaining);
    buf.write_u16::<BigEndian>(pid.0).expect("write to Vec is infallible");
    write_string(&mut buf, topic)?;
    buf.push(qos.to_u8());
    Ok(buf)
}

pub fn unsubscribe(pid: PacketIdentifier, topic: &str) -> Result<Vec<u8>> {
    let remaining = 2 + 2 + topic.len();
    let mut buf = Vec::with_capacity(remaining + 5);
    fixed_header(&mut buf, (PacketType::Unsubscribe as u8) | 0x02, remaining);
    buf.write_u16::<BigEndian>(pid.0).expect("write to Vec is infallible");
    write_string(&mut buf, topic)?;
    Ok(buf)
}

pub fn pingreq() -> Vec<u8> {
    vec![PacketType::Pingreq as u8, 0x00]
}

pub fn disconnect() -> Vec<u8> {
    vec![PacketType::Disconnect as u8, 0x00]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn connect_frame() {
        let packet = connect("clientid", Some("username"), Some("password"), true, 30).unwrap();
        assert_eq!(packet[0], 0x10);
        assert_eq!(packet[1], 40);
        assert_eq!(&packet[2..8], b"\x00\x04MQTT");
        assert_eq!(packet[8], 0x04);
        assert_eq!(packet[9], 0xC2);
        assert_eq!(&packet[10..12], &[0x00, 0x1E]);
        assert_eq!(&packet[12..14], &[0x00, 0x08]);
        assert_eq!(&packet[14..22], b"clientid");
    }

    #[test]
    fn connect_rejects_empty_client_id() {
        assert!(matches!(connect("", None, None, true, 0), Err(MQError::EmptyClientId)));
    }

    #[test]
    fn publish_qos0_frame() {
        let mut packet = publish_header("tp/aa", 2, QoS::AtMostOnce, false, false, None).unwrap();
        packet.extend_from_slice(b"hi");
        assert_eq!(
            packet,
            vec![0x30, 0x09, 0x00, 0x05, b't', b'p', b'/', b'a', b'a', b'h', b'i']
        );
    }

    #[test]
    fn publish_qos2_frame() {
        let mut packet =
            publish_header("tp/aa", 1, QoS::ExactlyOnce, false, false, Some(PacketIdentifier(7))).unwrap();
        packet.extend_from_slice(b"x");
        assert_eq!(
            packet,
            vec![0x34, 0x0A, 0x00, 0x05, b't', b'p', b'/', b'a', b'a', 0x00, 0x07, b'x']
        );
    }

    #[test]
    fn subscribe_frame() {
        let packet = subscribe(PacketIdentifier(3), "test/topic", QoS::ExactlyOnce).unwrap();
        assert_eq!(
            packet,
            vec![
                0x82, 0x0F, 0x00, 0x03, 0x00, 0x0A, b't', b'e', b's', b't', b'/', b't', b'o', b'p', b'i', b'c', 0x02
            ]
        );
    }

    #[test]
    fn pubrel_frame() {
        assert_eq!(pubrel(PacketIdentifier(9)), vec![0x62, 0x02, 0x00, 0x09]);
    }

    #[test]
    fn every_builder_frames_its_own_remaining_length() {
        let packets: Vec<Vec<u8>> = vec![
            connect("c", None, None, false, 0).unwrap(),
            {
                let mut p = publish_header("t", 3, QoS::AtLeastOnce, false, false, Some(PacketIdentifier(1))).unwrap();
                p.extend_from_slice(b"abc");
                p
            },
            puback(PacketIdentifier(1)),
            subscribe(PacketIdentifier(1), "t", QoS::AtMostOnce).unwrap(),
            unsubscribe(PacketIdentifier(1), "t").unwrap(),
            pingreq(),
            disconnect(),
        ];
        for packet in packets {
            let len_bytes = {
                let mut n = 1;
                while n < 4 && packet[n] & 0x80 != 0 {
                    n += 1;
                }
                n
            };
            let remaining = varint::decode(&packet[1..1 + len_bytes]).unwrap() as usize;
            assert_eq!(packet.len(), 1 + len_bytes + remaining);
        }
    }
}
