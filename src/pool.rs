//! # Summary
//!
//! Outgoing side of the transport. Peers are stored by address only, and an
//! address is resolved to a connection from this pool when a call is issued.
//!
//! Idle connections are kept per address behind a `parking_lot` mutex. A
//! connection is checked out for the duration of exactly one call and only
//! returned to the pool if that call completed cleanly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, SinkExt, StreamExt};
use hashbrown::HashMap as Map;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::socket;

/// Thread-safe pool of request/response channels, keyed by peer address.
#[derive(Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = ""))]
pub struct Pool<Req, Resp> {
    #[derivative(Debug = "ignore")]
    idle: Arc<Mutex<Map<SocketAddr, Vec<socket::Channel<Resp, Req>>>>>,
    timeout: Duration,
}

impl<Req, Resp> Pool<Req, Resp>
where Req: serde::Serialize + std::fmt::Debug + Clone + Unpin,
      Resp: serde::de::DeserializeOwned + Unpin,
{
    pub fn new(timeout: Duration) -> Self {
        Pool {
            idle: Arc::new(Mutex::new(Map::default())),
            timeout,
        }
    }

    /// Issues `request` to `addr` and waits for the reply. Every transport
    /// failure, including the timeout elapsing, is reported as `Unreachable`.
    ///
    /// A request is sent at most once: only a pooled connection that failed
    /// before the request was written is replaced by a fresh one.
    pub async fn call(&self, addr: SocketAddr, request: Req) -> Result<Resp> {
        if let Some(channel) = self.checkout(addr) {
            match self.exchange(addr, channel, request.clone()).await {
            | Ok(response) => return Ok(response),
            | Err(Failure::Sent(error)) => return Err(error),
            | Err(Failure::Unsent(error)) => debug!("pooled connection to {} failed: {}", addr, error),
            }
        }

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|error| Error::unreachable(addr, error))?
            .map_err(|error| Error::unreachable(addr, error))?;

        match self.exchange(addr, socket::channel(stream), request).await {
        | Ok(response) => Ok(response),
        | Err(Failure::Sent(error)) | Err(Failure::Unsent(error)) => Err(error),
        }
    }

    /// Drops every idle connection to `addr`.
    pub fn forget(&self, addr: SocketAddr) {
        self.idle.lock().remove(&addr);
    }

    /// Pops an idle connection to `addr`, dropping any the other end has
    /// already closed. Idle connections never have a reply pending, so
    /// anything readable on one means it is dead.
    fn checkout(&self, addr: SocketAddr) -> Option<socket::Channel<Resp, Req>> {
        let mut idle = self.idle.lock();
        let channels = idle.get_mut(&addr)?;
        while let Some(mut channel) = channels.pop() {
            match channel.next().now_or_never() {
            | None => return Some(channel),
            | Some(_) => trace!("dropping closed connection to {}", addr),
            }
        }
        None
    }

    async fn exchange(
        &self,
        addr: SocketAddr,
        mut channel: socket::Channel<Resp, Req>,
        request: Req,
    ) -> std::result::Result<Resp, Failure> {
        trace!("calling {} with {:?}", addr, request);
        let deadline = Instant::now() + self.timeout;

        // A frame cut short by the timeout may still reach the other end.
        match tokio::time::timeout_at(deadline, channel.send(request)).await {
        | Ok(Ok(())) => (),
        | Ok(Err(error)) => return Err(Failure::Unsent(Error::unreachable(addr, error))),
        | Err(elapsed) => return Err(Failure::Sent(Error::unreachable(addr, elapsed))),
        }

        let response = match tokio::time::timeout_at(deadline, channel.next()).await {
        | Ok(Some(Ok(response))) => response,
        | Ok(Some(Err(error))) => return Err(Failure::Sent(Error::unreachable(addr, error))),
        | Ok(None) => return Err(Failure::Sent(Error::unreachable(addr, "connection closed"))),
        | Err(elapsed) => return Err(Failure::Sent(Error::unreachable(addr, elapsed))),
        };

        self.idle.lock()
            .entry(addr)
            .or_default()
            .push(channel);
        Ok(response)
    }
}

/// Where an exchange broke off.
enum Failure {
    /// The request never fully left, so the other end cannot have seen it.
    Unsent(Error),

    /// The request went out and may have been processed.
    Sent(Error),
}
