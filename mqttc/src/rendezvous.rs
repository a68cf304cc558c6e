use std::sync::{Condvar, Mutex};
use std::time::Duration;

use mqtt3::{PacketIdentifier, PacketType};

/// What the sender is currently blocked on: a packet type and, for every
/// type except CONNACK, the packet identifier it expects back. CONNACK
/// carries no PID.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Armed {
    wait_type: PacketType,
    pid: Option<PacketIdentifier>,
}

struct Slot {
    armed: Option<Armed>,
    /// Output slot for the CONNACK reason byte, written by the pump
    /// before it clears `armed` and wakes the waiter.
    connack_code: u8,
}

/// Single-slot request/reply correlator shared by the sender thread and
/// the pump thread of one [`crate::Session`]. Only one sender operation
/// may be outstanding at a time.
pub struct Rendezvous {
    slot: Mutex<Slot>,
    signalled: Condvar,
}

impl Rendezvous {
    pub fn new() -> Rendezvous {
        Rendezvous {
            slot: Mutex::new(Slot { armed: None, connack_code: 0 }),
            signalled: Condvar::new(),
        }
    }

    /// Declares what the sender is about to wait for. Must be called
    /// before the packet is transmitted, so the pump can never observe
    /// the reply before the slot is armed.
    pub fn arm(&self, wait_type: PacketType, pid: Option<PacketIdentifier>) {
        let mut slot = self.slot.lock().unwrap();
        slot.armed = Some(Armed { wait_type, pid });
    }

    /// Blocks until signalled or `timeout` elapses. On success, returns
    /// the CONNACK reason byte the pump captured (meaningless for any
    /// armed type other than CONNACK).
    pub fn wait(&self, timeout: Duration) -> Option<u8> {
        let mut slot = self.slot.lock().unwrap();
        while slot.armed.is_some() {
            let (guard, result) = self.signalled.wait_timeout(slot, timeout).unwrap();
            slot = guard;
            if result.timed_out() && slot.armed.is_some() {
                return None;
            }
        }
        Some(slot.connack_code)
    }

    /// Disarms without waiting, used when a sender operation abandons
    /// its rendezvous after exhausting its retries.
    pub fn disarm(&self) {
        self.slot.lock().unwrap().armed = None;
    }

    /// Called by the pump for every inbound packet. Signals and clears
    /// the slot if `(packet_type, pid)` matches what's armed, or if the
    /// armed type is CONNACK (which matches on type alone). For CONNACK,
    /// the reason byte is copied into the slot before it is cleared and
    /// the waiter is woken, so the sender never observes a cleared slot
    /// with a stale reason code.
    pub fn try_signal(&self, packet_type: PacketType, pid: Option<PacketIdentifier>, connack_code: u8) -> bool {
        let mut slot = self.slot.lock().unwrap();
        let matches = match slot.armed {
            Some(Armed { wait_type: PacketType::Connack, .. }) => packet_type == PacketType::Connack,
            Some(armed) => armed.wait_type == packet_type && armed.pid == pid,
            None => false,
        };
        if !matches {
            return false;
        }
        if packet_type == PacketType::Connack {
            slot.connack_code = connack_code;
        }
        slot.armed = None;
        drop(slot);
        self.signalled.notify_one();
        true
    }
}

impl Default for Rendezvous {
    fn default() -> Rendezvous {
        Rendezvous::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn signal_wakes_a_matching_waiter() {
        let rv = Arc::new(Rendezvous::new());
        rv.arm(PacketType::Puback, Some(PacketIdentifier(5)));

        let signaller = Arc::clone(&rv);
        thread::spawn(move || {
            assert!(signaller.try_signal(PacketType::Puback, Some(PacketIdentifier(5)), 0));
        });

        assert!(rv.wait(Duration::from_secs(1)).is_some());
    }

    #[test]
    fn mismatched_pid_does_not_signal() {
        let rv = Rendezvous::new();
        rv.arm(PacketType::Puback, Some(PacketIdentifier(5)));
        assert!(!rv.try_signal(PacketType::Puback, Some(PacketIdentifier(6)), 0));
        assert!(rv.wait(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn connack_matches_on_type_alone_and_carries_reason_code() {
        let rv = Arc::new(Rendezvous::new());
        rv.arm(PacketType::Connack, None);

        let signaller = Arc::clone(&rv);
        thread::spawn(move || {
            assert!(signaller.try_signal(PacketType::Connack, None, 4));
        });

        assert_eq!(rv.wait(Duration::from_secs(1)), Some(4));
    }

    #[test]
    fn wait_times_out_when_never_signalled() {
        let rv = Rendezvous::new();
        rv.arm(PacketType::Pingresp, None);
        assert!(rv.wait(Duration::from_millis(20)).is_none());
    }
}
