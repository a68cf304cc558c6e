use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use log::{debug, trace, warn};

use mqtt3::{write, ConnectReturnCode, MQError, PacketIdentifier, PacketType, QoS};
use netopt::Transport;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::rendezvous::Rendezvous;

/// Invoked by [`Session::pump`] for every non-duplicate inbound
/// publication. Must not block for long and must not call back into the
/// session from the same thread.
pub type OnPublish = dyn Fn(&str, &[u8]) + Send + Sync;

/// The live client-broker relationship. Shared between exactly one
/// sender thread (which calls the `connect`/`publish`/`subscribe`/...
/// methods) and exactly one pump thread (which calls [`Session::pump`]
/// in a loop). `seq` is touched only by the sender; `seq2` only by the
/// pump; both are atomics purely so `Session` can be `Send + Sync` and
/// shared via `Arc` — there is no real contention on them.
pub struct Session<T: Transport> {
    transport: T,
    config: ClientConfig,
    seq: AtomicU16,
    seq2: AtomicU16,
    rendezvous: Rendezvous,
    on_publish: Mutex<Option<Box<OnPublish>>>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: ClientConfig) -> Session<T> {
        Session {
            transport,
            config,
            seq: AtomicU16::new(1),
            seq2: AtomicU16::new(0),
            rendezvous: Rendezvous::new(),
            on_publish: Mutex::new(None),
        }
    }

    pub fn set_on_publish<F: Fn(&str, &[u8]) + Send + Sync + 'static>(&self, callback: F) {
        *self.on_publish.lock().unwrap() = Some(Box::new(callback));
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms())
    }

    fn next_pid(&self) -> PacketIdentifier {
        let current = self.seq.load(Ordering::Relaxed);
        let next = PacketIdentifier(current).next();
        self.seq.store(next.0, Ordering::Relaxed);
        PacketIdentifier(current)
    }

    /// Arms the rendezvous, then transmits `packet` up to `RETRY` times,
    /// waiting `TIMEOUT` ms for a signal after each send. This is the
    /// skeleton every acknowledged sender operation follows.
    fn send_and_wait(&self, wait_type: PacketType, pid: Option<PacketIdentifier>, packet: &[u8]) -> Result<Option<u8>> {
        self.rendezvous.arm(wait_type, pid);
        for attempt in 0..self.config.retry() {
            if self.transport.send(packet).is_err() {
                self.rendezvous.disarm();
                return Err(Error::SendErr);
            }
            if let Some(connack_code) = self.rendezvous.wait(self.timeout()) {
                return Ok(Some(connack_code));
            }
            trace!("timed out waiting for {:?}, attempt {}/{}", wait_type, attempt + 1, self.config.retry());
        }
        self.rendezvous.disarm();
        Err(Error::AckErr)
    }

    pub fn connect(&self) -> Result<()> {
        let client_id = self.config.client_id().ok_or(Error::ParamErr("client_id must be set before connect"))?;
        let packet = write::connect(
            client_id,
            self.config.username(),
            self.config.password(),
            self.config.clean_session(),
            self.config.keep_alive(),
        )
        .map_err(Error::Mqtt)?;

        let code = self
            .send_and_wait(PacketType::Connack, None, &packet)?
            .expect("connack carries a reason code");
        match ConnectReturnCode::from_u8(code).map_err(Error::Mqtt)? {
            ConnectReturnCode::Accepted => Ok(()),
            ConnectReturnCode::UnacceptableProtocolVersion => Err(Error::VersionErr),
            ConnectReturnCode::IdentifierRejected => Err(Error::IdErr),
            ConnectReturnCode::ServerUnavailable => Err(Error::ServerErr),
            ConnectReturnCode::BadUsernamePassword => Err(Error::PasswordErr),
            ConnectReturnCode::NotAuthorized => Err(Error::PermissionErr),
        }
    }

    pub fn disconnect(&self) -> Result<()> {
        self.transport.send(&write::disconnect()).map_err(|_| Error::SendErr)?;
        Ok(())
    }

    pub fn ping(&self) -> Result<()> {
        self.transport.send(&write::pingreq()).map_err(|_| Error::SendErr)?;
        Ok(())
    }

    /// Publishes `payload` on `topic` at the given QoS. QoS 0 is a bare
    /// fire-and-forget send; QoS 1 is a single PUBACK handshake; QoS 2 is
    /// the two-step PUBREC/PUBREL/PUBCOMP exchange. PUBREL reuses the
    /// PID from PUBREC per strict MQTT 3.1.1 compliance, and
    /// retransmissions set the DUP flag.
    pub fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<()> {
        match qos {
            QoS::AtMostOnce => {
                let header = write::publish_header(topic, payload.len(), qos, retain, false, None).map_err(Error::Mqtt)?;
                self.transport.send(&header).map_err(|_| Error::SendErr)?;
                self.transport.send(payload).map_err(|_| Error::SendErr)?;
                Ok(())
            }
            QoS::AtLeastOnce => {
                let pid = self.next_pid();
                self.publish_with_retry(topic, payload, qos, retain, pid, PacketType::Puback)?;
                Ok(())
            }
            QoS::ExactlyOnce => {
                let pid = self.next_pid();
                self.publish_with_retry(topic, payload, qos, retain, pid, PacketType::Pubrec)?;

                let pubrel = write::pubrel(pid);
                self.send_and_wait(PacketType::Pubcomp, Some(pid), &pubrel)?;
                Ok(())
            }
        }
    }

    fn publish_with_retry(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
        pid: PacketIdentifier,
        wait_type: PacketType,
    ) -> Result<()> {
        self.rendezvous.arm(wait_type, Some(pid));
        for attempt in 0..self.config.retry() {
            let dup = attempt > 0;
            let header = write::publish_header(topic, payload.len(), qos, retain, dup, Some(pid)).map_err(Error::Mqtt)?;
            if self.transport.send(&header).is_err() {
                self.rendezvous.disarm();
                return Err(Error::SendErr);
            }
            if self.transport.send(payload).is_err() {
                self.rendezvous.disarm();
                return Err(Error::SendErr);
            }
            if self.rendezvous.wait(self.timeout()).is_some() {
                return Ok(());
            }
            trace!("timed out waiting for {:?}, attempt {}/{}", wait_type, attempt + 1, self.config.retry());
        }
        self.rendezvous.disarm();
        Err(Error::AckErr)
    }

    pub fn subscribe(&self, topic: &str, qos: QoS) -> Result<()> {
        let pid = self.next_pid();
        let packet = write::subscribe(pid, topic, qos).map_err(Error::Mqtt)?;
        self.send_and_wait(PacketType::Suback, Some(pid), &packet)?;
        Ok(())
    }

    pub fn unsubscribe(&self, topic: &str) -> Result<()> {
        let pid = self.next_pid();
        let packet = write::unsubscribe(pid, topic).map_err(Error::Mqtt)?;
        self.send_and_wait(PacketType::Unsuback, Some(pid), &packet)?;
        Ok(())
    }

    /// Reads and processes exactly one inbound packet. Returns `Ok(1)`
    /// while the connection is alive, `Ok(0)` on an orderly close
    /// observed before any byte of a new packet arrived, and `Err` on a
    /// transport failure. The caller is expected to call this in a loop
    /// on a dedicated thread and treat a non-positive return as
    /// terminal.
    pub fn pump(&self) -> Result<i32> {
        let frame = match mqtt3::read::read_frame(&mut TransportReader(&self.transport)) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(0),
            Err(MQError::Io(e)) => return Err(Error::Io(e)),
            Err(e) => return Err(Error::Mqtt(e)),
        };

        let packet_type = frame.packet_type().map_err(Error::Mqtt)?;
        let pid = frame.pid();
        let connack_code = if packet_type == PacketType::Connack { frame.connack_code().map_err(Error::Mqtt)? } else { 0 };

        if self.rendezvous.try_signal(packet_type, pid, connack_code) {
            return Ok(1);
        }

        match packet_type {
            PacketType::Publish => {
                let qos = frame.qos().map_err(Error::Mqtt)?;
                let topic = frame.topic().ok_or(Error::Mqtt(MQError::PacketTooShort))?;
                let payload = frame.payload().ok_or(Error::Mqtt(MQError::PacketTooShort))?;

                let is_duplicate = qos == QoS::ExactlyOnce && pid == Some(PacketIdentifier(self.seq2.load(Ordering::Relaxed)));
                if is_duplicate {
                    debug!("suppressing duplicate QoS 2 delivery for pid {:?}", pid);
                } else if let Some(callback) = self.on_publish.lock().unwrap().as_ref() {
                    callback(topic, payload);
                }

                match qos {
                    QoS::AtMostOnce => {}
                    QoS::AtLeastOnce => {
                        let pid = pid.ok_or(Error::Mqtt(MQError::PacketTooShort))?;
                        self.transport.send(&write::puback(pid)).map_err(|_| Error::SendErr)?;
                    }
                    QoS::ExactlyOnce => {
                        let pid = pid.ok_or(Error::Mqtt(MQError::PacketTooShort))?;
                        self.seq2.store(pid.0, Ordering::Relaxed);
                        self.transport.send(&write::pubrec(pid)).map_err(|_| Error::SendErr)?;
                    }
                }
            }
            PacketType::Pubrel => {
                let pid = pid.ok_or(Error::Mqtt(MQError::PacketTooShort))?;
                self.seq2.store(0, Ordering::Relaxed);
                self.transport.send(&write::pubcomp(pid)).map_err(|_| Error::SendErr)?;
            }
            _ => {
                warn!("pump observed unarmed packet type {:?}, discarding", packet_type);
            }
        }

        Ok(1)
    }
}

struct TransportReader<'a, T: Transport>(&'a T);

impl<'a, T: Transport> std::io::Read for TransportReader<'a, T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.recv(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use netopt::{MockStream, NetworkStream};

    fn session_with_incoming(incoming: Vec<u8>) -> Arc<Session<NetworkStream>> {
        let transport = NetworkStream::Mock(MockStream::with_vec(incoming));
        let mut config = ClientConfig::new();
        config.set_client_id("test-client");
        config.set_retry(1);
        config.set_timeout_ms(200);
        Arc::new(Session::new(transport, config))
    }

    #[test]
    fn connect_maps_connack_accepted_to_ok() {
        let session = session_with_incoming(vec![0x20, 0x02, 0x00, 0x00]);
        let pump_session = Arc::clone(&session);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            pump_session.pump().unwrap();
        });
        session.connect().unwrap();
    }

    #[test]
    fn connect_maps_connack_rejection_to_matching_error() {
        let session = session_with_incoming(vec![0x20, 0x02, 0x00, 0x05]);
        let pump_session = Arc::clone(&session);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            pump_session.pump().unwrap();
        });
        let err = session.connect().unwrap_err();
        assert!(matches!(err, Error::PermissionErr));
    }

    #[test]
    fn connect_without_a_client_id_is_a_param_error() {
        let transport = NetworkStream::Mock(MockStream::with_vec(Vec::new()));
        let session = Session::new(transport, ClientConfig::new());
        assert!(matches!(session.connect(), Err(Error::ParamErr(_))));
    }

    #[test]
    fn qos2_inbound_duplicate_is_suppressed_until_pubrel() {
        let publish = {
            let mut p = write::publish_header("t", 5, QoS::ExactlyOnce, false, false, Some(PacketIdentifier(41))).unwrap();
            p.extend_from_slice(b"hello");
            p
        };
        let mut incoming = Vec::new();
        incoming.extend_from_slice(&publish);
        incoming.extend_from_slice(&publish);
        incoming.extend_from_slice(&write::pubrel(PacketIdentifier(41)));

        let session = session_with_incoming(incoming);
        let calls = Arc::new(Mutex::new(0u32));
        let calls_clone = Arc::clone(&calls);
        session.set_on_publish(move |topic, payload| {
            assert_eq!(topic, "t");
            assert_eq!(payload, b"hello");
            *calls_clone.lock().unwrap() += 1;
        });

        assert_eq!(session.pump().unwrap(), 1);
        assert_eq!(session.pump().unwrap(), 1);
        assert_eq!(session.pump().unwrap(), 1);

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(session.seq2.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn pump_reports_clean_close_as_zero() {
        let session = session_with_incoming(Vec::new());
        assert_eq!(session.pump().unwrap(), 0);
    }

    #[test]
    fn publish_qos0_is_fire_and_forget_with_no_rendezvous() {
        let session = session_with_incoming(Vec::new());
        session.publish("tp/aa", b"hi", QoS::AtMostOnce, false).unwrap();
    }

    struct FailingTransport;

    impl Transport for FailingTransport {
        fn send(&self, _buf: &[u8]) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "write failed"))
        }

        fn recv(&self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn set_read_timeout(&self, _dur: Option<Duration>) -> std::io::Result<()> {
            Ok(())
        }

        fn shutdown(&self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn a_failed_write_is_reported_as_send_err_not_io() {
        let mut config = ClientConfig::new();
        config.set_client_id("test-client");
        config.set_retry(1);
        config.set_timeout_ms(50);
        let session = Session::new(FailingTransport, config);

        assert!(matches!(session.connect(), Err(Error::SendErr)));
        assert!(matches!(session.ping(), Err(Error::SendErr)));
        assert!(matches!(session.disconnect(), Err(Error::SendErr)));
        assert!(matches!(session.publish("t", b"x", QoS::AtMostOnce, false), Err(Error::SendErr)));
        assert!(matches!(session.publish("t", b"x", QoS::AtLeastOnce, false), Err(Error::SendErr)));
        assert!(matches!(session.subscribe("t", QoS::AtMostOnce), Err(Error::SendErr)));
        assert!(matches!(session.unsubscribe("t"), Err(Error::SendErr)));
    }
}
