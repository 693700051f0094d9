use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::message::{Peer, TrackerInfo};
use crate::node::Node;
use crate::socket;

#[derive(Clone, Debug)]
pub struct Config {
    /// Unique player name
    name: String,

    /// Address to listen on for peer calls
    addr: SocketAddr,

    /// Where to find the tracker
    tracker: TrackerInfo,

    /// Timeout for detecting unresponsive peers
    timeout: Duration,

    /// Period between failure-detection rounds
    heartbeat: Duration,

    /// Number of bootstrap retries after the first attempt
    retries: usize,

    /// Pause before each bootstrap retry
    retry_delay: Duration,
}

impl Config {
    pub fn new<N: Into<String>>(name: N, tracker: TrackerInfo) -> Self {
        Config {
            name: name.into(),
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            tracker,
            timeout: Duration::from_secs(1),
            heartbeat: Duration::from_millis(500),
            retries: 5,
            retry_delay: Duration::from_millis(500),
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_retries(mut self, retries: usize, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tracker(&self) -> &TrackerInfo {
        &self.tracker
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Binds the listener and starts answering peer calls. The node holds
    /// no state until it has joined.
    pub async fn spawn(self) -> Result<Arc<Node>> {
        let listener = TcpListener::bind(self.addr).await?;
        let me = Peer::new(self.name.clone(), listener.local_addr()?);
        let node = Arc::new(Node::new(me, self));
        let task = tokio::spawn(socket::serve(listener, node.clone(), node.shutdown_token()));
        node.track(task);
        debug!("{} listening on {}", node.name(), node.addr());
        Ok(node)
    }

    /// Spawns a node, joins the game through the tracker and starts the
    /// heartbeat. Failing to join is fatal.
    pub async fn join(self) -> Result<Arc<Node>> {
        let node = self.spawn().await?;
        if let Err(error) = node.bootstrap().await {
            node.shutdown().await;
            return Err(error)
        }
        node.spawn_heartbeat();
        info!("{} joined as {:?}", node.name(), node.role().await);
        Ok(node)
    }
}
