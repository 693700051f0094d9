//! # Summary
//!
//! The tracker is a singleton discovery service. It keeps the names and
//! addresses of known participants in join order together with the session
//! parameters N and K, and hands a consistent snapshot to every joiner. It
//! never sees game state.
//!
//! All three calls share one mutex, so no call can observe a half-applied
//! append or removal.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::message::{Bootstrap, Peer, TrackerCall, TrackerInfo, TrackerReply, TrackerRequest, TrackerResponse};
use crate::pool::Pool;
use crate::socket;

pub const DEFAULT_SERVICE: &str = "tracker";

/// Discovery state shared by every connection to the tracker.
#[derive(Debug)]
pub struct Tracker {
    info: TrackerInfo,
    n: usize,
    k: usize,
    peers: Mutex<Vec<Peer>>,
}

impl Tracker {
    pub fn new(info: TrackerInfo, n: usize, k: usize) -> Self {
        Tracker {
            info,
            n,
            k,
            peers: Mutex::new(Vec::new()),
        }
    }

    pub fn info(&self) -> &TrackerInfo {
        &self.info
    }

    /// Appends `peer` and returns a snapshot that includes it.
    pub fn register(&self, peer: Peer) -> Result<Bootstrap> {
        let mut peers = self.peers.lock();
        if peers.iter().any(|known| known.name == peer.name) {
            return Err(Error::DuplicateName(peer.name))
        }
        info!("registered {} at {}", peer.name, peer.addr);
        peers.push(peer);
        Ok(self.snapshot(&peers))
    }

    /// Removes `name` if present. Repeated crash reports are harmless.
    pub fn unregister(&self, name: &str) {
        let mut peers = self.peers.lock();
        let before = peers.len();
        peers.retain(|peer| peer.name != name);
        if peers.len() < before {
            info!("unregistered {}", name);
        }
    }

    pub fn fetch(&self) -> Bootstrap {
        let peers = self.peers.lock();
        self.snapshot(&peers)
    }

    fn snapshot(&self, peers: &[Peer]) -> Bootstrap {
        Bootstrap {
            peers: peers.to_vec(),
            n: self.n,
            k: self.k,
            tracker: self.info.clone(),
        }
    }
}

impl socket::Handler for Tracker {
    type Request = TrackerRequest;
    type Response = TrackerResponse;

    async fn handle(&self, request: TrackerRequest) -> TrackerResponse {
        if request.service != self.info.service {
            return Err(Error::UnknownService(request.service))
        }
        match request.call {
        | TrackerCall::Register(peer) => self.register(peer).map(TrackerReply::Bootstrap),
        | TrackerCall::Unregister(name) => {
            self.unregister(&name);
            Ok(TrackerReply::Ack)
        }
        | TrackerCall::Fetch => Ok(TrackerReply::Bootstrap(self.fetch())),
        }
    }
}

/// Typed calls against a remote tracker.
#[derive(Clone, Debug)]
pub struct Client {
    info: TrackerInfo,
    pool: Pool<TrackerRequest, TrackerResponse>,
}

impl Client {
    pub fn new(info: TrackerInfo, timeout: Duration) -> Self {
        Client {
            info,
            pool: Pool::new(timeout),
        }
    }

    pub fn info(&self) -> &TrackerInfo {
        &self.info
    }

    pub async fn register(&self, peer: Peer) -> Result<Bootstrap> {
        match self.call(TrackerCall::Register(peer)).await? {
        | TrackerReply::Bootstrap(bootstrap) => Ok(bootstrap),
        | TrackerReply::Ack => Err(Error::Protocol),
        }
    }

    pub async fn unregister(&self, name: &str) -> Result<()> {
        match self.call(TrackerCall::Unregister(name.to_string())).await? {
        | TrackerReply::Ack => Ok(()),
        | TrackerReply::Bootstrap(_) => Err(Error::Protocol),
        }
    }

    pub async fn fetch(&self) -> Result<Bootstrap> {
        match self.call(TrackerCall::Fetch).await? {
        | TrackerReply::Bootstrap(bootstrap) => Ok(bootstrap),
        | TrackerReply::Ack => Err(Error::Protocol),
        }
    }

    async fn call(&self, call: TrackerCall) -> Result<TrackerReply> {
        let addr = tokio::net::lookup_host(self.info.endpoint())
            .await?
            .next()
            .ok_or_else(|| Error::Io(format!("cannot resolve {}", self.info.endpoint())))?;
        let request = TrackerRequest {
            service: self.info.service.clone(),
            call,
        };
        self.pool.call(addr, request).await?
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Host to listen on and to advertise to players
    host: String,

    /// Port to listen on, 0 to pick any free port
    port: u16,

    /// Name players must quote when calling the tracker
    service: String,

    /// Side of the square grid
    n: usize,

    /// Number of treasures
    k: usize,
}

impl Config {
    pub fn new(port: u16, n: usize, k: usize) -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port,
            service: DEFAULT_SERVICE.to_string(),
            n,
            k,
        }
    }

    pub fn with_host<H: Into<String>>(mut self, host: H) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_service<S: Into<String>>(mut self, service: S) -> Self {
        self.service = service.into();
        self
    }

    /// Binds the listener and starts serving in the background.
    pub async fn spawn(self) -> Result<Handle> {
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        let addr = listener.local_addr()?;
        let info = TrackerInfo::new(self.host, addr.port(), self.service);
        let tracker = Arc::new(Tracker::new(info.clone(), self.n, self.k));
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(socket::serve(listener, tracker.clone(), shutdown.clone()));
        info!("tracker {} ready at {} with N = {}, K = {}", info.service, addr, self.n, self.k);
        Ok(Handle { info, addr, tracker, shutdown, task })
    }
}

/// A running tracker.
#[derive(Debug)]
pub struct Handle {
    info: TrackerInfo,
    addr: SocketAddr,
    tracker: Arc<Tracker>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Handle {
    pub fn info(&self) -> &TrackerInfo {
        &self.info
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Resolves once the tracker stops serving.
    pub async fn stopped(self) {
        self.task.await.ok();
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.task.await.ok();
    }
}
