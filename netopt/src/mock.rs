use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

/// An in-memory stand-in for a TCP connection: reads drain a fixed byte
/// buffer, writes append to a separate one the test can inspect
/// afterwards. Cloning shares the same backing buffers, matching how
/// cloning a `TcpStream` handle shares the same socket.
#[derive(Clone)]
pub struct MockStream {
    incoming: Arc<Mutex<Cursor<Vec<u8>>>>,
    outgoing: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    pub fn with_vec(incoming: Vec<u8>) -> MockStream {
        MockStream {
            incoming: Arc::new(Mutex::new(Cursor::new(incoming))),
            outgoing: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn written(&self) -> Vec<u8> {
        self.outgoing.lock().unwrap().clone()
    }
}

impl<'a> Read for &'a MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.incoming.lock().unwrap().read(buf)
    }
}

impl<'a> Write for &'a MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outgoing.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
