//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves one canned response to every request. The body can be split into chunks written
//! with a delay between them, and Content-Length can be omitted (the body is then delimited
//! by closing the connection).

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub status: &'static str,
    pub content_type: Option<&'static str>,
    pub send_length: bool,
    pub chunks: Vec<Vec<u8>>,
    pub chunk_delay: Duration,
}

impl ServerOptions {
    pub fn new(content_type: &'static str, body: &[u8]) -> Self {
        Self {
            status: "200 OK",
            content_type: Some(content_type),
            send_length: true,
            chunks: vec![body.to_vec()],
            chunk_delay: Duration::ZERO,
        }
    }

    pub fn split(mut self, size: usize) -> Self {
        let body: Vec<u8> = self.chunks.concat();
        self.chunks = body.chunks(size.max(1)).map(<[u8]>::to_vec).collect();
        self
    }

    pub fn delay(mut self, d: Duration) -> Self {
        self.chunk_delay = d;
        self
    }

    pub fn without_length(mut self) -> Self {
        self.send_length = false;
        self
    }

    pub fn status(mut self, status: &'static str) -> Self {
        self.status = status;
        self
    }
}

/// Starts the server on a background thread and returns its base URL
/// (e.g. "http://127.0.0.1:12345/"). The server runs until the process exits.
pub fn start(opts: ServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let opts = Arc::new(opts);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let opts = Arc::clone(&opts);
            thread::spawn(move || handle(stream, &opts));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

/// A URL on a port nothing listens on.
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: TcpStream, opts: &ServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(_) => {}
    }

    let total: usize = opts.chunks.iter().map(Vec::len).sum();
    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", opts.status);
    if let Some(ct) = opts.content_type {
        head.push_str(&format!("Content-Type: {}\r\n", ct));
    }
    if opts.send_length {
        head.push_str(&format!("Content-Length: {}\r\n", total));
    }
    head.push_str("\r\n");
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    let _ = stream.flush();

    for chunk in &opts.chunks {
        if !opts.chunk_delay.is_zero() {
            thread::sleep(opts.chunk_delay);
        }
        if stream.write_all(chunk).is_err() || stream.flush().is_err() {
            return;
        }
    }
    let _ = stream.shutdown(std::net::Shutdown::Write);
}
