use std::sync::atomic::{AtomicBool, Ordering};

use mio::Waker;
use socket2::{Domain, Protocol, Socket, Type};

use crate::prelude::*;

const MAX_EVENTS: usize = 1024;
const WAKER_TOKEN: Token = Token(usize::MAX);

/// Handles shared by worker tasks: the registry to rearm interest, the
/// retire list for connections a worker shut down, and the waker that
/// tells the reactor to collect them.
#[derive(Clone)]
struct WorkerCtx {
    registry: Arc<Registry>,
    retired: Arc<Mutex<Vec<Token>>>,
    waker: Arc<Waker>,
}

/// Cross-thread stop switch for [`Server::run`].
#[derive(Clone)]
pub struct ShutdownHandle {
    closed: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Relaxed);
        let _ = self.waker.wake();
    }
}

/// Single-threaded reactor: accepts, waits for readiness, fires idle
/// timers and hands per-connection read/write work to the pool. Only this
/// thread touches the connection table and the timer heap; workers talk
/// back through the retire list.
pub struct Server {
    timeout_ms: u64,
    src_dir: Arc<PathBuf>,
    listener: TcpListener,
    listen_token: Token,
    poller: Poller,
    registry: Arc<Registry>,
    timer: TimerHeap,
    pool: ThreadPool,
    conns: HashMap<Token, Arc<Mutex<HttpConn>>>,
    retired: Arc<Mutex<Vec<Token>>>,
    waker: Arc<Waker>,
    closed: Arc<AtomicBool>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Server> {
        if config.open_log {
            async_log::Logger::init(config.log_level, "./log", ".log", config.log_queue_capacity);
        }
        if config.port < 1024 {
            error!("port {} error!", config.port);
            return Err(format!("port {} error: ports below 1024 are reserved", config.port).into());
        }
        let src_dir = Arc::new(match &config.root_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?.join("resources"),
        });

        let mut listener = Server::init_socket(config.port, config.open_linger)?;
        let poller = Poller::new()?;
        let listen_token = {
            use std::os::fd::AsRawFd;
            Token(listener.as_raw_fd() as usize)
        };
        poller.add(&mut listener, listen_token, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poller.registry(), WAKER_TOKEN)?);
        let registry = Arc::new(poller.registry_handle()?);
        let pool = ThreadPool::new(config.worker_threads);

        info!("========== Server init ==========");
        info!(
            "port: {}, open_linger: {}",
            config.port, config.open_linger
        );
        info!("src_dir: {}", src_dir.display());
        info!("thread_pool num: {}", config.worker_threads);

        Ok(Server {
            timeout_ms: config.timeout_ms,
            src_dir,
            listener,
            listen_token,
            poller,
            registry,
            timer: TimerHeap::new(),
            pool,
            conns: HashMap::new(),
            retired: Arc::new(Mutex::new(Vec::new())),
            waker,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            closed: Arc::clone(&self.closed),
            waker: Arc::clone(&self.waker),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(MAX_EVENTS);
        info!("========== Server start ==========");
        while !self.closed.load(Ordering::Relaxed) {
            self.drain_retired();
            let mut timeout = None;
            if self.timeout_ms > 0 {
                for id in self.timer.tick() {
                    self.close_conn(id);
                }
                timeout = self.timer.next_timeout();
            }
            if let Err(e) = self.poller.wait(&mut events, timeout) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }
            for event in events.iter() {
                let token = event.token();
                if token == WAKER_TOKEN {
                    // Retire list is drained at the top of the loop.
                } else if token == self.listen_token {
                    self.deal_listen();
                } else if event.is_error() || event.is_read_closed() || event.is_write_closed() {
                    self.close_conn(token);
                } else if event.is_readable() {
                    self.deal_read(token);
                } else if event.is_writable() {
                    self.deal_write(token);
                } else {
                    error!("unexpected event: {:?}", event);
                }
            }
        }
        Ok(())
    }

    fn init_socket(port: u16, open_linger: bool) -> Result<TcpListener> {
        let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
        if open_linger {
            // Close gracefully: give queued data one second to drain.
            socket.set_linger(Some(Duration::from_secs(1)))?;
        }
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(LISTEN_BACKLOG)?;
        socket.set_nonblocking(true)?;
        info!("server port: {}", port);
        Ok(TcpListener::from_std(socket.into()))
    }

    /// Removes connections that worker threads already shut down.
    fn drain_retired(&mut self) {
        let retired: Vec<Token> = std::mem::take(&mut *self.retired.lock().unwrap());
        for token in retired {
            if self.conns.remove(&token).is_some() {
                self.timer.remove(token);
            }
        }
    }

    fn close_conn(&mut self, token: Token) {
        if let Some(slot) = self.conns.remove(&token) {
            self.timer.remove(token);
            slot.lock().unwrap().disconn(&self.registry);
        }
    }

    fn deal_listen(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if HttpConn::user_count() >= MAX_CONNECTIONS {
                        self.send_busy(stream, addr);
                        return;
                    }
                    self.add_client(stream, addr);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("accept error: {}", e);
                    break;
                }
            }
        }
    }

    fn send_busy(&self, mut stream: TcpStream, addr: SocketAddr) {
        if stream.write(b"Server busy!").is_err() {
            warn!("send busy message to {} failed", addr);
        }
        warn!("clients are full!");
    }

    fn add_client(&mut self, stream: TcpStream, addr: SocketAddr) {
        let mut conn = HttpConn::new(stream, addr, Arc::clone(&self.src_dir));
        let token = conn.token();
        if self.timeout_ms > 0 {
            self.timer.add(token, Duration::from_millis(self.timeout_ms));
        }
        if let Err(e) = self.poller.add(conn.stream_mut(), token, Interest::READABLE) {
            error!("register client[{}] failed: {}", token.0, e);
            self.timer.remove(token);
            conn.disconn(&self.registry);
            return;
        }
        self.conns.insert(token, Arc::new(Mutex::new(conn)));
    }

    fn extend_time(&mut self, token: Token) {
        if self.timeout_ms > 0 {
            self.timer
                .adjust(token, Duration::from_millis(self.timeout_ms));
        }
    }

    fn deal_read(&mut self, token: Token) {
        let Some(conn) = self.conns.get(&token) else {
            return;
        };
        let conn = Arc::clone(conn);
        self.extend_time(token);
        let ctx = self.worker_ctx();
        self.pool.add_task(move || Server::on_read(conn, ctx));
    }

    fn deal_write(&mut self, token: Token) {
        let Some(conn) = self.conns.get(&token) else {
            return;
        };
        let conn = Arc::clone(conn);
        self.extend_time(token);
        let ctx = self.worker_ctx();
        self.pool.add_task(move || Server::on_write(conn, ctx));
    }

    fn worker_ctx(&self) -> WorkerCtx {
        WorkerCtx {
            registry: Arc::clone(&self.registry),
            retired: Arc::clone(&self.retired),
            waker: Arc::clone(&self.waker),
        }
    }

    fn on_read(conn: Arc<Mutex<HttpConn>>, ctx: WorkerCtx) {
        let mut conn = conn.lock().unwrap();
        if conn.is_closed() {
            return;
        }
        match conn.read_data() {
            Ok(false) => Server::on_process(&mut conn, &ctx),
            Ok(true) => Server::retire(&mut conn, &ctx),
            Err(e) => {
                info!("client[{}] read error: {}", conn.token().0, e);
                Server::retire(&mut conn, &ctx);
            }
        }
    }

    fn on_write(conn: Arc<Mutex<HttpConn>>, ctx: WorkerCtx) {
        let mut conn = conn.lock().unwrap();
        if conn.is_closed() {
            return;
        }
        match conn.write_data() {
            Ok(_) => {
                if conn.is_keep_alive() {
                    // Transfer done; look for the next request.
                    Server::on_process(&mut conn, &ctx);
                } else {
                    Server::retire(&mut conn, &ctx);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                Server::rearm(&mut conn, Interest::WRITABLE, &ctx);
            }
            Err(e) => {
                info!("client[{}] write error: {}", conn.token().0, e);
                Server::retire(&mut conn, &ctx);
            }
        }
    }

    fn on_process(conn: &mut HttpConn, ctx: &WorkerCtx) {
        if conn.process() {
            Server::rearm(conn, Interest::WRITABLE, ctx);
        } else {
            Server::rearm(conn, Interest::READABLE, ctx);
        }
    }

    fn rearm(conn: &mut HttpConn, interest: Interest, ctx: &WorkerCtx) {
        let token = conn.token();
        if let Err(e) = ctx.registry.reregister(conn.stream_mut(), token, interest) {
            info!("client[{}] rearm failed: {}", token.0, e);
            Server::retire(conn, ctx);
        }
    }

    /// Shuts the connection down and queues it for the reactor to evict.
    fn retire(conn: &mut HttpConn, ctx: &WorkerCtx) {
        conn.disconn(&ctx.registry);
        ctx.retired.lock().unwrap().push(conn.token());
        let _ = ctx.waker.wake();
    }
}
