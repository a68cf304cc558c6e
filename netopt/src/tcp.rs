use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, SocketAddrV4, Ipv4Addr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::mock::MockStream;

/// Builds outbound connections or listeners, optionally substituting an
/// in-memory [`MockStream`] so tests never touch a real socket.
pub struct NetworkOptions {
    mock: Option<MockStream>,
}

impl NetworkOptions {
    pub fn new() -> NetworkOptions {
        NetworkOptions { mock: None }
    }

    pub fn attach(&mut self, mock: MockStream) -> &mut NetworkOptions {
        self.mock = Some(mock);
        self
    }

    pub fn bind<A: ToSocketAddrs>(&self, addr: A) -> io::Result<NetworkListener> {
        Ok(NetworkListener { tcp: TcpListener::bind(addr)? })
    }

    pub fn connect<A: ToSocketAddrs>(&self, addr: A) -> io::Result<NetworkStream> {
        if let Some(ref mock) = self.mock {
            return Ok(NetworkStream::Mock(mock.clone()));
        }
        Ok(NetworkStream::Tcp(TcpStream::connect(addr)?))
    }
}

impl Default for NetworkOptions {
    fn default() -> NetworkOptions {
        NetworkOptions::new()
    }
}

pub struct NetworkListener {
    tcp: TcpListener,
}

impl NetworkListener {
    pub fn accept(&mut self) -> io::Result<(NetworkStream, SocketAddr)> {
        let (stream, addr) = self.tcp.accept()?;
        Ok((NetworkStream::Tcp(stream), addr))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp.local_addr()
    }
}

/// Either a real TCP socket or an in-memory mock. `Read`/`Write` are
/// implemented on `&NetworkStream` (not `NetworkStream`), mirroring
/// `TcpStream`'s own `impl Read for &TcpStream`, so a shared reference
/// can be handed to two threads at once.
pub enum NetworkStream {
    Tcp(TcpStream),
    Mock(MockStream),
}

impl NetworkStream {
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match *self {
            NetworkStream::Tcp(ref s) => s.peer_addr(),
            NetworkStream::Mock(_) => Ok(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 80))),
        }
    }

    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match *self {
            NetworkStream::Tcp(ref s) => s.shutdown(how),
            NetworkStream::Mock(_) => Ok(()),
        }
    }

    pub fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        match *self {
            NetworkStream::Tcp(ref s) => s.set_read_timeout(dur),
            NetworkStream::Mock(_) => Ok(()),
        }
    }

    pub fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        match *self {
            NetworkStream::Tcp(ref s) => s.set_write_timeout(dur),
            NetworkStream::Mock(_) => Ok(()),
        }
    }
}

impl<'a> Read for &'a NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match **self {
            NetworkStream::Tcp(ref s) => (&*s).read(buf),
            NetworkStream::Mock(ref s) => (&*s).read(buf),
        }
    }
}

impl<'a> Write for &'a NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match **self {
            NetworkStream::Tcp(ref s) => (&*s).write(buf),
            NetworkStream::Mock(ref s) => (&*s).write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match **self {
            NetworkStream::Tcp(ref s) => (&*s).flush(),
            NetworkStream::Mock(ref s) => (&*s).flush(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn tcp_server_client_test() {
        let mut listener = NetworkOptions::new().bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let client = NetworkOptions::new().connect(addr).unwrap();
            (&client).write_all(&[0, 1, 2, 3, 4, 5]).unwrap();
            client.shutdown(Shutdown::Both).unwrap();
        });

        let (stream, _) = listener.accept().unwrap();
        let mut req = Vec::new();
        (&stream).read_to_end(&mut req).unwrap();
        assert_eq!(req, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn tcp_attach_test() {
        let mock = MockStream::with_vec(vec![0xFE, 0xFD]);
        let mut options = NetworkOptions::new();
        options.attach(mock);
        let client = options.connect("127.0.0.1:80").unwrap();
        let mut buf = Vec::new();
        (&client).read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![0xFE, 0xFD]);
    }
}
