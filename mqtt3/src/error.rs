use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MQError>;

/// Failures from the codec layer: malformed framing or an out-of-range
/// field. The broker is trusted to send well-formed packets beyond this.
#[derive(Error, Debug)]
pub enum MQError {
    #[error("unsupported packet type")]
    UnsupportedPacketType,
    #[error("unsupported quality of service")]
    UnsupportedQualityOfService,
    #[error("unsupported connect return code")]
    UnsupportedConnectReturnCode,
    #[error("malformed remaining length")]
    MalformedRemainingLength,
    #[error("packet too short for its declared fields")]
    PacketTooShort,
    #[error("unexpected eof mid-packet")]
    UnexpectedEof,
    #[error("client id must not be empty")]
    EmptyClientId,
    #[error("topic or payload too long to frame")]
    PayloadTooLong,
    #[error(transparent)]
    Io(#[from] io::Error),
}
