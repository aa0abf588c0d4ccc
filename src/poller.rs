use std::io;
use std::time::Duration;

use mio::event::Source;
use mio::{Events, Interest, Poll, Registry, Token};

/// Thin wrapper over the OS readiness facility. Registrations are
/// edge-triggered (mio's contract), so consumers must drain sockets until
/// `WouldBlock` after every event.
pub struct Poller {
    poll: Poll,
}

impl Poller {
    pub fn new() -> io::Result<Self> {
        Ok(Poller { poll: Poll::new()? })
    }

    pub fn registry(&self) -> &Registry {
        self.poll.registry()
    }

    /// Independent registry handle for rearming from worker threads.
    pub fn registry_handle(&self) -> io::Result<Registry> {
        self.poll.registry().try_clone()
    }

    pub fn add<S: Source>(&self, source: &mut S, token: Token, interest: Interest) -> io::Result<()> {
        self.poll.registry().register(source, token, interest)
    }

    pub fn modify<S: Source>(
        &self,
        source: &mut S,
        token: Token,
        interest: Interest,
    ) -> io::Result<()> {
        self.poll.registry().reregister(source, token, interest)
    }

    pub fn delete<S: Source>(&self, source: &mut S) -> io::Result<()> {
        self.poll.registry().deregister(source)
    }

    /// Blocks until readiness or `timeout`; `None` waits indefinitely.
    pub fn wait(&mut self, events: &mut Events, timeout: Option<Duration>) -> io::Result<()> {
        self.poll.poll(events, timeout)
    }
}
