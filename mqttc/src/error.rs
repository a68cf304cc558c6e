use std::io;
use std::result;
use thiserror::Error;

use mqtt3::MQError as MqttError;

pub type Result<T> = result::Result<T, Error>;

/// One variant per distinguishable failure mode a session operation can
/// report. Success is `Ok(())`, not a variant.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connect rejected: unsupported protocol version")]
    VersionErr,
    #[error("connect rejected: identifier rejected")]
    IdErr,
    #[error("connect rejected: server unavailable")]
    ServerErr,
    #[error("connect rejected: bad username or password")]
    PasswordErr,
    #[error("connect rejected: not authorized")]
    PermissionErr,
    #[error("invalid parameter: {0}")]
    ParamErr(&'static str),
    #[error("transport write failed or returned a short write")]
    SendErr,
    #[error("no matching reply within retry * timeout")]
    AckErr,
    #[error(transparent)]
    Mqtt(#[from] MqttError),
    #[error(transparent)]
    Io(#[from] io::Error),
}
