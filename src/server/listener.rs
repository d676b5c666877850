use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Registry, Token, Waker};
use tracing::{debug, error, info};

use super::{ServerError, ServerState, ShutdownHandle};
use crate::config::Config;
use crate::handler::Dispatcher;
use crate::http::connection::{Connection, ConnectionState};

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CONNECTION: usize = 2;

const EVENTS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Readiness {
    token: Token,
    readable: bool,
    writable: bool,
    error: bool,
}

/// The poller and the listening socket registered with it. Dropped as a
/// whole when the server stops.
struct Reactor {
    poll: Poll,
    events: Events,
    listener: TcpListener,
}

/// The event loop: one listener, many connections, one thread.
pub struct Server {
    reactor: Option<Reactor>,
    waker: Arc<Waker>,
    shutdown: Arc<AtomicBool>,
    connections: HashMap<Token, Connection<TcpStream>>,
    next_token: usize,
    dispatcher: Dispatcher,
    state: ServerState,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the listening socket on all interfaces at `config.port`.
    pub fn bind(config: &Config) -> anyhow::Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let mut listener = TcpListener::bind(addr).with_context(|| format!("binding {addr}"))?;
        let local_addr = listener.local_addr()?;

        let poll = Poll::new().context("creating poller")?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);

        info!(
            addr = %local_addr,
            root = %config.document_root().display(),
            "Bound listener"
        );

        Ok(Self {
            reactor: Some(Reactor {
                poll,
                events: Events::with_capacity(EVENTS_CAPACITY),
                listener,
            }),
            waker,
            shutdown: Arc::new(AtomicBool::new(false)),
            connections: HashMap::new(),
            next_token: FIRST_CONNECTION,
            dispatcher: Dispatcher::from_config(config),
            state: ServerState::Idle,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(self.waker.clone(), self.shutdown.clone())
    }

    /// Runs the event loop until a [`ShutdownHandle`] stops it or the
    /// listener fails. Returns once every connection, the listener and the
    /// poller have been closed.
    pub fn run(&mut self) -> Result<(), ServerError> {
        match self.state {
            ServerState::Running => return Err(ServerError::AlreadyRunning),
            ServerState::Stopped => return Err(ServerError::Stopped),
            ServerState::Idle => {}
        }
        let Some(mut reactor) = self.reactor.take() else {
            return Err(ServerError::Stopped);
        };

        self.state = ServerState::Running;
        info!(addr = %self.local_addr, "Listening");

        let result = self.event_loop(&mut reactor);
        if let Err(e) = &result {
            error!(error = %e, "Event loop failed");
        }

        self.reactor = Some(reactor);
        self.stop();
        result
    }

    /// Closes every connection, the listener and the poller. In-flight
    /// exchanges are abandoned. A stopped server cannot be run again.
    pub fn stop(&mut self) {
        if self.state == ServerState::Stopped {
            return;
        }
        self.shutdown.store(true, Ordering::SeqCst);

        if let Some(reactor) = self.reactor.take() {
            let registry = reactor.poll.registry();
            for (_, mut conn) in self.connections.drain() {
                // dropping the stream closes the socket
                let _ = registry.deregister(conn.stream_mut());
            }
        }
        self.connections.clear();

        self.state = ServerState::Stopped;
        info!(addr = %self.local_addr, "Server stopped");
    }

    fn event_loop(&mut self, reactor: &mut Reactor) -> Result<(), ServerError> {
        let mut ready = Vec::with_capacity(EVENTS_CAPACITY);

        while !self.shutdown.load(Ordering::SeqCst) {
            if let Err(e) = reactor.poll.poll(&mut reactor.events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            ready.clear();
            ready.extend(reactor.events.iter().map(|event| Readiness {
                token: event.token(),
                readable: event.is_readable(),
                writable: event.is_writable(),
                error: event.is_error(),
            }));

            for readiness in &ready {
                match readiness.token {
                    LISTENER => self.accept(reactor)?,
                    WAKER => {}
                    _ => self.connection_event(reactor.poll.registry(), *readiness),
                }
                self.purge_closed(reactor.poll.registry());
            }
        }

        Ok(())
    }

    /// Accepts until the backlog is empty. Errors that concern the listener
    /// itself, such as running out of descriptors, stop the server.
    fn accept(&mut self, reactor: &Reactor) -> Result<(), ServerError> {
        loop {
            match reactor.listener.accept() {
                Ok((mut stream, peer)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    if let Err(e) = reactor
                        .poll
                        .registry()
                        .register(&mut stream, token, Interest::READABLE)
                    {
                        error!(peer = %peer, error = %e, "Unable to register connection");
                        continue;
                    }

                    info!(peer = %peer, "Accepted connection");
                    let mut conn = Connection::new(stream);
                    conn.start_reading();
                    self.connections.insert(token, conn);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if is_transient_accept_error(&e) => {
                    debug!(error = %e, "Pending connection dropped before accept");
                }
                Err(e) => {
                    error!(error = %e, "Accept failed");
                    return Err(e.into());
                }
            }
        }
    }

    fn connection_event(&mut self, registry: &Registry, readiness: Readiness) {
        let Some(conn) = self.connections.get_mut(&readiness.token) else {
            return;
        };

        if readiness.error {
            debug!(token = readiness.token.0, "Socket error");
            conn.close();
            return;
        }

        let result = match conn.state() {
            ConnectionState::Reading | ConnectionState::Draining if readiness.readable => conn.on_readable(),
            ConnectionState::Writing if readiness.writable => conn.on_writable(&self.dispatcher),
            state => Ok(state),
        };

        let interest = match result {
            Ok(ConnectionState::Reading | ConnectionState::Draining) => Interest::READABLE,
            Ok(ConnectionState::Writing) => Interest::WRITABLE,
            Ok(ConnectionState::Accepted | ConnectionState::Closed) => return,
            Err(e) => {
                debug!(token = readiness.token.0, error = %e, "Closing connection");
                conn.close();
                return;
            }
        };

        // re-arm: edge-triggered readiness is not reported again otherwise
        if let Err(e) = registry.reregister(conn.stream_mut(), readiness.token, interest) {
            debug!(token = readiness.token.0, error = %e, "Unable to update interest");
            conn.close();
        }
    }

    fn purge_closed(&mut self, registry: &Registry) {
        self.connections.retain(|token, conn| {
            if !conn.is_closed() {
                return true;
            }
            let _ = registry.deregister(conn.stream_mut());
            debug!(token = token.0, "Connection closed");
            false
        });
    }
}

/// Accept failures caused by one pending connection rather than the
/// listening socket.
fn is_transient_accept_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset
    )
}
