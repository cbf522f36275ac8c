use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Mutex;

use tbench_core::{Request, Response, ResponseTag, Result, TbenchError, MAX_RESP_BYTES};
use tracing::info;

use crate::wire::{
    check_len, decode_response_header, encode_request_header, RESP_HEADER_LEN,
};

/// Blocking stream transport with independent send and receive locks.
/// `send` and `recv` may proceed concurrently since they guard two
/// separate clones of the same socket fd — mirroring the original's
/// one fd behind two independent `pthread_mutex_t`s.
pub struct TcpTransport {
    send: Mutex<TcpStream>,
    recv: Mutex<TcpStream>,
}

impl TcpTransport {
    /// Connects to `server:port`, enabling `TCP_NODELAY` to keep latency
    /// measurements free of Nagle-induced queueing delay. An empty
    /// `server` means passive/local, matching the original's
    /// `AI_PASSIVE`-resolved wildcard address — resolved here to
    /// loopback rather than passed straight to the resolver.
    pub fn connect(server: &str, port: u16) -> Result<Self> {
        let server = if server.is_empty() { "127.0.0.1" } else { server };
        let stream = TcpStream::connect((server, port))
            .map_err(|e| TbenchError::Transport(format!("connect() failed: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| TbenchError::Transport(format!("set_nodelay() failed: {e}")))?;
        let recv_stream = stream
            .try_clone()
            .map_err(|e| TbenchError::Transport(format!("try_clone() failed: {e}")))?;
        info!(server, port, "connected to server");
        Ok(Self {
            send: Mutex::new(stream),
            recv: Mutex::new(recv_stream),
        })
    }

    /// Wraps an already-connected pair of stream clones — used by tests
    /// against a loopback listener.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream
            .set_nodelay(true)
            .map_err(|e| TbenchError::Transport(format!("set_nodelay() failed: {e}")))?;
        let recv_stream = stream
            .try_clone()
            .map_err(|e| TbenchError::Transport(format!("try_clone() failed: {e}")))?;
        Ok(Self {
            send: Mutex::new(stream),
            recv: Mutex::new(recv_stream),
        })
    }

    /// Serializes the fixed header plus `req.payload` and writes them
    /// under the send-side lock, retrying partial writes until the full
    /// length is transferred or the socket errors.
    pub fn send(&self, req: &Request) -> Result<()> {
        let header = encode_request_header(req.id, req.payload.len() as u64);
        let mut stream = self.send.lock().expect("send lock poisoned");
        write_full(&mut *stream, &header)?;
        write_full(&mut *stream, &req.payload)?;
        Ok(())
    }

    /// Reads the fixed response header under the recv-side lock; if the
    /// tag is `RESPONSE`, reads the additional `len` payload bytes under
    /// the same lock.
    pub fn recv(&self) -> Result<Response> {
        let mut stream = self.recv.lock().expect("recv lock poisoned");
        let mut header = [0u8; RESP_HEADER_LEN];
        read_full(&mut *stream, &mut header)?;
        let (tag, id, svc_ns, len) = decode_response_header(&header)?;

        let payload = if tag == ResponseTag::Response {
            let n = check_len(len, MAX_RESP_BYTES, "response payload")?;
            let mut buf = vec![0u8; n];
            read_full(&mut *stream, &mut buf)?;
            buf
        } else {
            Vec::new()
        };

        Response::new(tag, id, svc_ns, payload)
    }
}

fn write_full(stream: &mut TcpStream, mut buf: &[u8]) -> Result<()> {
    while !buf.is_empty() {
        match stream.write(buf) {
            Ok(0) => {
                return Err(TbenchError::Transport(
                    "connection closed during send".to_string(),
                ));
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TbenchError::Transport(format!("send() failed: {e}"))),
        }
    }
    Ok(())
}

fn read_full(stream: &mut TcpStream, mut buf: &mut [u8]) -> Result<()> {
    while !buf.is_empty() {
        match stream.read(buf) {
            Ok(0) => {
                return Err(TbenchError::Transport(
                    "connection closed during recv".to_string(),
                ));
            }
            Ok(n) => {
                let tmp = buf;
                buf = &mut tmp[n..];
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TbenchError::Transport(format!("recv() failed: {e}"))),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn request_response_round_trip_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let transport = TcpTransport::from_stream(stream).unwrap();
            // Echo server: read the request manually off the recv side
            // isn't exposed, so we drive the protocol directly here by
            // reading raw bytes matching the request wire format.
            let mut raw_stream = transport.recv.into_inner().unwrap();
            let mut header = [0u8; crate::wire::REQ_HEADER_LEN];
            read_full(&mut raw_stream, &mut header).unwrap();
            let (id, len) = crate::wire::decode_request_header(&header);
            let mut payload = vec![0u8; len as usize];
            read_full(&mut raw_stream, &mut payload).unwrap();

            let resp = Response::new(ResponseTag::Response, id, 123, payload).unwrap();
            let resp_header =
                crate::wire::encode_response_header(resp.tag, resp.id, resp.svc_ns, resp.payload.len() as u64);
            write_full(&mut raw_stream, &resp_header).unwrap();
            write_full(&mut raw_stream, &resp.payload).unwrap();
        });

        let client = TcpTransport::connect(&addr.ip().to_string(), addr.port()).unwrap();
        let req = Request::new(5, 0, b"hello".to_vec()).unwrap();
        client.send(&req).unwrap();

        let resp = client.recv().unwrap();
        assert_eq!(resp.tag, ResponseTag::Response);
        assert_eq!(resp.id, 5);
        assert_eq!(resp.svc_ns, 123);
        assert_eq!(resp.payload, b"hello");

        server.join().unwrap();
    }

    #[test]
    fn control_response_carries_no_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let header = crate::wire::encode_response_header(ResponseTag::Finish, 0, 0, 0);
            let mut stream = stream;
            write_full(&mut stream, &header).unwrap();
        });

        let client = TcpTransport::connect(&addr.ip().to_string(), addr.port()).unwrap();
        let resp = client.recv().unwrap();
        assert_eq!(resp.tag, ResponseTag::Finish);
        assert!(resp.payload.is_empty());

        server.join().unwrap();
    }
}
