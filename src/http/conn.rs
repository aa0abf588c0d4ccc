use std::net::Shutdown;
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::prelude::*;

static USER_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Per-connection state machine: owned buffers, parser and builder, plus
/// the two-segment scatter vector (header bytes, mapped file bytes).
///
/// A connection is only ever touched under its table mutex, so reads,
/// processing and writes for one socket never interleave across workers.
pub struct HttpConn {
    stream: TcpStream,
    addr: SocketAddr,
    token: Token,
    src_dir: Arc<PathBuf>,
    read_buf: Buffer,
    write_buf: Buffer,
    request: HttpRequest,
    response: HttpResponse,
    /// Bytes of the mapped file already written (scatter slot 1 offset).
    file_written: usize,
    keep_alive: bool,
    is_close: bool,
}

impl HttpConn {
    /// Live connections across the process.
    pub fn user_count() -> usize {
        USER_COUNT.load(Ordering::Relaxed)
    }

    pub fn new(stream: TcpStream, addr: SocketAddr, src_dir: Arc<PathBuf>) -> Self {
        let token = Token(stream.as_raw_fd() as usize);
        USER_COUNT.fetch_add(1, Ordering::Relaxed);
        info!(
            "client[{}]({}) in, user_count: {}",
            token.0,
            addr,
            Self::user_count()
        );
        HttpConn {
            stream,
            addr,
            token,
            src_dir,
            read_buf: Buffer::default(),
            write_buf: Buffer::default(),
            request: HttpRequest::new(),
            response: HttpResponse::new(),
            file_written: 0,
            keep_alive: false,
            is_close: false,
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    pub fn is_keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn is_closed(&self) -> bool {
        self.is_close
    }

    /// Drains the socket into the read buffer until the kernel runs dry.
    /// Returns true when the peer closed its end.
    pub fn read_data(&mut self) -> io::Result<bool> {
        loop {
            match self.read_buf.read_from(&mut self.stream) {
                Ok(0) => return Ok(true),
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Parses buffered bytes and, given a full (or malformed) request,
    /// assembles the response. Returns true when there is a response to
    /// write; false asks the caller to wait for more data.
    pub fn process(&mut self) -> bool {
        if self.read_buf.readable_bytes() == 0 {
            return false;
        }
        match self.request.parse(&mut self.read_buf) {
            Ok(()) => {
                debug!("{}", self.request.path);
                self.keep_alive = self.request.is_keep_alive();
                let path = self.request.path.clone();
                self.response
                    .init(&self.src_dir, &path, self.keep_alive, Some(200));
            }
            Err(ParseError::Incomplete) => return false,
            Err(_) => {
                self.keep_alive = false;
                let path = self.request.path.clone();
                self.response.init(&self.src_dir, &path, false, Some(400));
            }
        }
        self.request.init();
        self.file_written = 0;
        self.response.make_response(&mut self.write_buf);
        true
    }

    /// Header bytes plus unsent mapped-file bytes.
    pub fn to_write_bytes(&self) -> usize {
        self.write_buf.readable_bytes() + (self.response.file_len() - self.file_written)
    }

    /// Scatter-writes header and file segments until everything is out or
    /// the socket stops taking bytes; `WouldBlock` surfaces to the caller.
    pub fn write_data(&mut self) -> io::Result<usize> {
        let mut total = 0;
        while self.to_write_bytes() > 0 {
            let n = {
                let head = self.write_buf.peek();
                match self.response.file() {
                    Some(mm) if self.file_written < mm.len() => {
                        let segments =
                            [IoSlice::new(head), IoSlice::new(&mm[self.file_written..])];
                        self.stream.write_vectored(&segments)
                    }
                    _ => self.stream.write(head),
                }
            };
            let n = match n {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                return Err(io::Error::from(ErrorKind::WriteZero));
            }
            total += n;
            let head_len = self.write_buf.readable_bytes();
            if n > head_len {
                self.file_written += n - head_len;
                if head_len > 0 {
                    self.write_buf.reset();
                }
            } else {
                self.write_buf.has_read(n);
            }
        }
        Ok(total)
    }

    /// Deregisters, shuts the socket down and drops the live-count claim.
    /// Exactly once; later calls only unmap.
    pub fn disconn(&mut self, registry: &Registry) {
        self.response.unmap_file();
        if !self.is_close {
            self.is_close = true;
            let _ = registry.deregister(&mut self.stream);
            let _ = self.stream.shutdown(Shutdown::Both);
            USER_COUNT.fetch_sub(1, Ordering::Relaxed);
            info!(
                "client[{}]({}) quit, user_count: {}",
                self.token.0,
                self.addr,
                Self::user_count()
            );
        }
    }
}
