//! A client for the MQTT 3.1.1 protocol: configuration, a single-slot
//! rendezvous correlating requests with their acknowledgements, and the
//! `Session` that ties both to a [`netopt::Transport`].

pub mod config;
pub mod error;
pub mod rendezvous;
pub mod session;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use session::{OnPublish, Session};

pub use mqtt3::QoS;
