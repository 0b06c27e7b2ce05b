//! TCP transport with dedicated sender and receiver workers
//!
//! One transport exists per successful connection attempt. The sender
//! worker drains the command queue one entry at a time, writing the line
//! terminator after each command and sleeping the inter-command delay
//! (receivers choke on back-to-back commands). The receiver worker feeds
//! raw bytes through the [`LineScanner`] and hands completed frames to the
//! coordinator.
//!
//! Closure from either side releases the supervisor's blocking wait.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use avr_protocol::{Frame, LineScanner, LINE_TERMINATOR};
use parking_lot::{Condvar, Mutex};

use crate::queue::CommandQueue;

/// Minimum spacing between consecutive outbound commands.
pub const INTER_COMMAND_DELAY: Duration = Duration::from_millis(100);

/// Timeout for opening the control connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Consumer of inbound protocol frames.
pub trait ReceiveFrames: Send + Sync {
    fn received(&self, frame: Frame);
}

/// Blocking close signal shared between the workers and the supervisor.
struct ClosedSignal {
    closed: Mutex<bool>,
    cond: Condvar,
}

impl ClosedSignal {
    fn new() -> Self {
        Self {
            closed: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn signal(&self) {
        let mut closed = self.closed.lock();
        *closed = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut closed = self.closed.lock();
        while !*closed {
            self.cond.wait(&mut closed);
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

/// One live control connection.
pub struct TcpTransport {
    stream: TcpStream,
    queue: Arc<CommandQueue>,
    shutdown: Arc<AtomicBool>,
    closed: Arc<ClosedSignal>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TcpTransport {
    /// Open the connection and start both workers.
    pub fn connect(
        addr: &str,
        queue: Arc<CommandQueue>,
        sink: Arc<dyn ReceiveFrames>,
    ) -> std::io::Result<Self> {
        let socket_addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, addr.to_string()))?;
        let stream = TcpStream::connect_timeout(&socket_addr, CONNECT_TIMEOUT)?;
        stream.set_nodelay(true)?;
        tracing::info!("connected to {}", addr);

        let shutdown = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(ClosedSignal::new());

        let sender = spawn_sender(
            stream.try_clone()?,
            queue.clone(),
            shutdown.clone(),
            closed.clone(),
        );
        let receiver = spawn_receiver(
            stream.try_clone()?,
            sink,
            queue.clone(),
            shutdown.clone(),
            closed.clone(),
        );

        Ok(Self {
            stream,
            queue,
            shutdown,
            closed,
            workers: Mutex::new(vec![sender, receiver]),
        })
    }

    /// Block until the connection closes, from either side.
    pub fn wait_closed(&self) {
        self.closed.wait();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }

    /// Tear the connection down and join both workers. Idempotent.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.stream.shutdown(Shutdown::Both);
        self.queue.shutdown();
        self.closed.signal();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.join().is_err() {
                tracing::warn!("transport worker panicked");
            }
        }
    }
}

fn spawn_sender(
    mut stream: TcpStream,
    queue: Arc<CommandQueue>,
    shutdown: Arc<AtomicBool>,
    closed: Arc<ClosedSignal>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("avr-sender".into())
        .spawn(move || {
            while let Some(command) = queue.pop() {
                tracing::debug!("-> {}", command);
                let mut line = command.into_bytes();
                line.push(LINE_TERMINATOR);
                if let Err(e) = stream.write_all(&line).and_then(|_| stream.flush()) {
                    if !shutdown.load(Ordering::Relaxed) {
                        tracing::warn!("write failed: {}", e);
                    }
                    break;
                }
                thread::sleep(INTER_COMMAND_DELAY);
            }
            closed.signal();
            tracing::debug!("sender worker stopped");
        })
        .expect("spawn sender worker")
}

fn spawn_receiver(
    mut stream: TcpStream,
    sink: Arc<dyn ReceiveFrames>,
    queue: Arc<CommandQueue>,
    shutdown: Arc<AtomicBool>,
    closed: Arc<ClosedSignal>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("avr-receiver".into())
        .spawn(move || {
            let mut scanner = LineScanner::new();
            let mut buf = [0u8; 1024];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) => {
                        tracing::info!("connection closed by receiver");
                        break;
                    }
                    Ok(n) => {
                        for frame in scanner.feed(&buf[..n]) {
                            tracing::debug!("<- {:?}", frame);
                            sink.received(frame);
                        }
                    }
                    Err(e) => {
                        if !shutdown.load(Ordering::Relaxed) {
                            tracing::warn!("read failed: {}", e);
                        }
                        break;
                    }
                }
            }
            // release the sender and the supervisor's wait
            queue.shutdown();
            closed.signal();
            tracing::debug!("receiver worker stopped");
        })
        .expect("spawn receiver worker")
}
