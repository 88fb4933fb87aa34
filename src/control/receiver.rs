//! The control endpoint itself: bind, listen/accept, decode, dispatch.
//!
//! One receiver owns one local endpoint.  Handlers are registered before
//! bind; at listen time they are frozen into a dispatch table ordered
//! most-specific-pattern-first (registration order breaks ties), and the
//! receive loop moves onto its own thread.  In TCP mode each retained
//! connection gets its own reader thread consuming 4-byte big-endian
//! length-framed OSC packets; UDP is one datagram per packet.
//!
//! Faults follow the taxonomy in [`crate::control::error`]: bind failures
//! are returned to the caller (fatal there), everything later is handled
//! locally and the visual pipeline keeps running.
use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, error, info, trace, warn};
use simple_error::bail;
use std::{
    collections::HashMap,
    io::{ErrorKind, Read},
    net::{SocketAddr, TcpListener, TcpStream, UdpSocket},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use crate::common::box_error::BoxError;
use crate::common::sock_with_tos;
use crate::control::address::AddressPattern;
use crate::control::error::{AcceptError, BindError, ConnectionError, ListenError};
use crate::control::message::ControlMessage;

/// largest length-framed packet we will accept on a stream connection
const MAX_FRAME_SIZE: usize = 65536;
/// how long blocking reads wait before re-checking the shutdown flag
const READ_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

type Handler = Box<dyn Fn(&ControlMessage) + Send + Sync>;

struct DispatchEntry {
    pattern: AddressPattern,
    handler: Handler,
    order: usize,
}

/// Frozen routing table shared by the receive threads.
struct Dispatcher {
    entries: Vec<DispatchEntry>,
    unmatched: AtomicU64,
    malformed: AtomicU64,
}

impl Dispatcher {
    fn build(mut entries: Vec<DispatchEntry>) -> Dispatcher {
        // most literal segments first, registration order breaks ties
        entries.sort_by(|a, b| {
            b.pattern
                .specificity()
                .cmp(&a.pattern.specificity())
                .then(a.order.cmp(&b.order))
        });
        Dispatcher {
            entries,
            unmatched: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
        }
    }

    /// decode one wire packet and route every message in it
    fn dispatch_packet(&self, data: &[u8]) {
        match rosc::decoder::decode_udp(data) {
            Ok((_rest, packet)) => {
                for msg in ControlMessage::from_packet(packet) {
                    self.dispatch_message(msg);
                }
            }
            Err(e) => {
                self.malformed.fetch_add(1, Ordering::Relaxed);
                warn!("dropping malformed control packet: {:?}", e);
            }
        }
    }

    fn dispatch_message(&self, msg: ControlMessage) {
        for entry in &self.entries {
            if let Some(captures) = entry.pattern.matches(msg.address()) {
                let routed = ControlMessage::with_wildcards(
                    msg.address(),
                    msg.args().to_vec(),
                    captures,
                );
                trace!("dispatch {} -> {}", msg.address(), entry.pattern);
                (entry.handler)(&routed);
                return;
            }
        }
        self.unmatched.fetch_add(1, Ordering::Relaxed);
        trace!("no handler for {}", msg.address());
    }
}

enum BoundSocket {
    Udp(UdpSocket),
    Tcp(TcpListener),
}

pub struct ControlReceiver {
    transport: Transport,
    entries: Vec<DispatchEntry>,
    socket: Option<BoundSocket>,
    local_port: Option<u16>,
}

impl ControlReceiver {
    pub fn new(transport: Transport) -> ControlReceiver {
        ControlReceiver {
            transport,
            entries: Vec::new(),
            socket: None,
            local_port: None,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_bound(&self) -> bool {
        self.socket.is_some()
    }

    /// port actually bound (useful when binding port 0)
    pub fn local_port(&self) -> Option<u16> {
        self.local_port
    }

    /// Bind an address pattern to a handler.  Must happen before bind();
    /// late registrations are ignored with a warning, bad patterns too.
    pub fn register_handler<F>(&mut self, pattern: &str, handler: F) -> ()
    where
        F: Fn(&ControlMessage) + Send + Sync + 'static,
    {
        if self.is_bound() {
            warn!("ignoring handler for {} registered after bind", pattern);
            return;
        }
        match AddressPattern::parse(pattern) {
            Ok(parsed) => {
                let order = self.entries.len();
                self.entries.push(DispatchEntry {
                    pattern: parsed,
                    handler: Box::new(handler),
                    order,
                });
            }
            Err(e) => {
                warn!("ignoring handler: {}", e);
            }
        }
    }

    /// Open the local endpoint.  At most one bind per receiver; failure is
    /// fatal to the application (callers terminate on it).
    pub fn bind(&mut self, port: u16) -> Result<(), BindError> {
        if self.is_bound() {
            return Err(BindError::new("endpoint already bound", -1));
        }
        match self.transport {
            Transport::Udp => {
                let sock = sock_with_tos::new(port)?;
                self.local_port = Some(sock.local_addr().map_err(BindError::from)?.port());
                self.socket = Some(BoundSocket::Udp(sock));
            }
            Transport::Tcp => {
                let listener = TcpListener::bind(("0.0.0.0", port)).map_err(BindError::from)?;
                self.local_port = Some(listener.local_addr().map_err(BindError::from)?.port());
                self.socket = Some(BoundSocket::Tcp(listener));
            }
        }
        debug!("control endpoint bound on port {}", self.local_port.unwrap_or(0));
        Ok(())
    }

    /// Start receiving datagrams (UDP mode).  error_fn is called per
    /// socket fault; returning false stops the listener.
    pub fn listen<F>(mut self, error_fn: F) -> Result<ListenerHandle, BoxError>
    where
        F: Fn(&ListenError) -> bool + Send + 'static,
    {
        let sock = match self.socket.take() {
            Some(BoundSocket::Udp(s)) => s,
            _ => bail!("listen requires a bound UDP endpoint"),
        };
        sock.set_read_timeout(Some(READ_TIMEOUT))?;
        let dispatcher = Arc::new(Dispatcher::build(std::mem::take(&mut self.entries)));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_dispatcher = dispatcher.clone();
        let thread_shutdown = shutdown.clone();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; MAX_FRAME_SIZE];
            while !thread_shutdown.load(Ordering::Relaxed) {
                match sock.recv_from(&mut buf) {
                    Ok((size, _from)) => thread_dispatcher.dispatch_packet(&buf[..size]),
                    Err(e)
                        if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
                    Err(e) => {
                        let err = ListenError::from(e);
                        if !error_fn(&err) {
                            info!("listener stopping: {}", err);
                            break;
                        }
                    }
                }
            }
        });

        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
            dispatcher,
            connections: None,
        })
    }

    /// Start accepting connections (TCP mode).  accept_error_fn decides
    /// whether to keep accepting after a fault; accept_fn decides whether
    /// to retain a given connection.  Connections that are not retained
    /// are dropped on the spot and never tracked.
    pub fn accept<E, A>(mut self, accept_error_fn: E, accept_fn: A) -> Result<ListenerHandle, BoxError>
    where
        E: Fn(&AcceptError) -> bool + Send + 'static,
        A: Fn(SocketAddr, u64) -> bool + Send + 'static,
    {
        let listener = match self.socket.take() {
            Some(BoundSocket::Tcp(l)) => l,
            _ => bail!("accept requires a bound TCP endpoint"),
        };
        listener.set_nonblocking(true)?;
        let dispatcher = Arc::new(Dispatcher::build(std::mem::take(&mut self.entries)));
        let shutdown = Arc::new(AtomicBool::new(false));
        let connections: Arc<Mutex<HashMap<u64, SocketAddr>>> = Arc::new(Mutex::new(HashMap::new()));

        let thread_dispatcher = dispatcher.clone();
        let thread_shutdown = shutdown.clone();
        let thread_connections = connections.clone();
        let handle = thread::spawn(move || {
            let mut next_id: u64 = 0;
            while !thread_shutdown.load(Ordering::Relaxed) {
                match listener.accept() {
                    Ok((stream, peer)) => {
                        next_id += 1;
                        let id = next_id;
                        if !accept_fn(peer, id) {
                            info!("dismissing connection {} from {}", id, peer);
                            continue;
                        }
                        if let Err(e) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
                            warn!("cannot set read timeout for {}: {}", peer, e);
                            continue;
                        }
                        thread_connections.lock().unwrap().insert(id, peer);
                        info!("tracking connection {} from {}", id, peer);
                        let reader_dispatcher = thread_dispatcher.clone();
                        let reader_shutdown = thread_shutdown.clone();
                        let reader_connections = thread_connections.clone();
                        thread::spawn(move || {
                            connection_reader(
                                stream,
                                peer,
                                id,
                                reader_dispatcher,
                                reader_connections,
                                reader_shutdown,
                            );
                        });
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(50));
                    }
                    Err(e) => {
                        let err = AcceptError::from(e);
                        if !accept_error_fn(&err) {
                            info!("acceptor stopping: {}", err);
                            break;
                        }
                    }
                }
            }
        });

        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
            dispatcher,
            connections: Some(connections),
        })
    }
}

/// Read length-framed packets off one retained connection until EOF,
/// error or shutdown; the connection map entry goes away with us.
fn connection_reader(
    mut stream: TcpStream,
    peer: SocketAddr,
    id: u64,
    dispatcher: Arc<Dispatcher>,
    connections: Arc<Mutex<HashMap<u64, SocketAddr>>>,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        let mut header = [0u8; 4];
        match read_full(&mut stream, &mut header, &shutdown) {
            Ok(false) => break, // shutting down
            Ok(true) => {}
            Err(e) => {
                log_connection_error(peer, e);
                break;
            }
        }
        // 4-byte big-endian packet length, then the OSC packet itself
        let size = match (&header[..]).read_u32::<BigEndian>() {
            Ok(n) => n as usize,
            Err(_) => break,
        };
        if size == 0 || size > MAX_FRAME_SIZE {
            error!(
                "connection {} from {} sent an unreasonable frame length {}",
                id, peer, size
            );
            break;
        }
        let mut frame = vec![0u8; size];
        match read_full(&mut stream, &mut frame, &shutdown) {
            Ok(false) => break,
            Ok(true) => dispatcher.dispatch_packet(&frame),
            Err(e) => {
                log_connection_error(peer, e);
                break;
            }
        }
    }
    connections.lock().unwrap().remove(&id);
    debug!("connection {} from {} untracked", id, peer);
}

fn log_connection_error(peer: SocketAddr, err: std::io::Error) {
    if err.kind() == ErrorKind::UnexpectedEof {
        // the other side closing while we expected to read is not a fault
        warn!("{}", ConnectionError::Closed { peer });
    } else {
        error!(
            "{}",
            ConnectionError::Io {
                peer,
                code: err.raw_os_error().unwrap_or(-1),
                message: err.to_string(),
            }
        );
    }
}

/// Fill buf completely, riding out read timeouts so the shutdown flag
/// gets polled.  Ok(false) means shutdown was requested mid-read.
fn read_full(stream: &mut TcpStream, buf: &mut [u8], shutdown: &AtomicBool) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(false);
        }
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(std::io::Error::from(ErrorKind::UnexpectedEof)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Handle to a running listener.  Dropping it signals shutdown; stop()
/// also joins the receive thread.
pub struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    dispatcher: Arc<Dispatcher>,
    connections: Option<Arc<Mutex<HashMap<u64, SocketAddr>>>>,
}

impl ListenerHandle {
    /// messages that matched no registered pattern
    pub fn unmatched_count(&self) -> u64 {
        self.dispatcher.unmatched.load(Ordering::Relaxed)
    }

    /// packets that did not decode as OSC
    pub fn malformed_count(&self) -> u64 {
        self.dispatcher.malformed.load(Ordering::Relaxed)
    }

    /// currently tracked connections (always 0 in UDP mode)
    pub fn connection_count(&self) -> usize {
        match &self.connections {
            Some(map) => map.lock().unwrap().len(),
            None => 0,
        }
    }

    pub fn tracked_peers(&self) -> Vec<SocketAddr> {
        match &self.connections {
            Some(map) => map.lock().unwrap().values().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn stop(mut self) -> () {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _res = handle.join();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
