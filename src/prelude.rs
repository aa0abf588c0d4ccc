pub use crate::buffer::Buffer;
pub use crate::config::ServerConfig;
pub use crate::error::Result;
pub use crate::http::*;
pub use crate::poller::Poller;
pub use crate::pool::ThreadPool;
pub use crate::server::Server;
pub use crate::timer::TimerHeap;

pub use async_log::{debug, error, info, warn};

pub use mio::{
    Events, Interest, Registry, Token,
    event::Event,
    net::{TcpListener, TcpStream},
};
pub use std::collections::HashMap;
pub use std::io::{self, ErrorKind, IoSlice, Read, Write};
pub use std::net::SocketAddr;
pub use std::path::{Path, PathBuf};
pub use std::sync::{Arc, Mutex};
pub use std::time::{Duration, Instant};

/// Hard cap on live connections; the accept loop turns extras away.
pub const MAX_CONNECTIONS: usize = 65_536;
/// Second gather-read segment size.
pub const EXTRA_READ_SIZE: usize = 65_535;
pub const LISTEN_BACKLOG: i32 = 6;
