//! # Summary
//!
//! This module contains the player node: one copy of the replicated state,
//! the role this node currently plays, and the protocol around them.
//!
//! The state and the role sit behind a single `tokio` reader-writer lock.
//! Every write path holds the exclusive lock across the whole
//! read-modify-write-replicate sequence, so a concurrent reader never sees a
//! half-applied mutation. The lock holds `None` until bootstrap completes.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{RwLock, RwLockMappedWriteGuard, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::message::{Move, Outcome, Peer};
use crate::role::{Role, Transition};
use crate::state::State;
use crate::tracker;

/// Joining the game through the tracker.
mod bootstrap;

/// Voluntary exit and leadership handoff.
mod handoff;

/// Failure detection and crash recovery.
mod heartbeat;

/// Typed calls against other nodes.
mod remote;

/// Inbound calls from other nodes.
mod service;

pub use self::remote::Remote;

/// A node's copy of the game together with its role.
#[derive(Clone, Debug)]
pub(crate) struct Replica {
    role: Role,
    state: State,
}

impl Replica {
    fn new(role: Role, state: State) -> Self {
        Replica { role, state }
    }

    /// Applies `transition`, failing with `fail` if it is illegal in the current role.
    fn transition(&mut self, transition: Transition, fail: Error) -> Result<()> {
        let next = self.role.transition(transition).ok_or(fail)?;
        if next != self.role {
            info!("{} -> {} ({:?})", self.role, next, transition);
        }
        self.role = next;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Node {
    me: Peer,
    config: Config,
    replica: RwLock<Option<Replica>>,
    remote: Remote,
    tracker: tracker::Client,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Node {
    pub(crate) fn new(me: Peer, config: Config) -> Self {
        Node {
            remote: Remote::new(config.timeout()),
            tracker: tracker::Client::new(config.tracker().clone(), config.timeout()),
            me,
            config,
            replica: RwLock::new(None),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.me.name
    }

    pub fn addr(&self) -> SocketAddr {
        self.me.addr
    }

    pub fn peer(&self) -> &Peer {
        &self.me
    }

    /// Current role, or `None` while bootstrapping.
    pub async fn role(&self) -> Option<Role> {
        self.replica.read().await.as_ref().map(|replica| replica.role)
    }

    /// Copy of this node's current state, or `None` while bootstrapping.
    pub async fn snapshot(&self) -> Option<State> {
        self.replica.read().await.as_ref().map(|replica| replica.state.clone())
    }

    /// Moves this node's player. The Primary applies the move itself; other
    /// nodes submit it to the Primary, falling back to a shadow move if the
    /// Primary is retiring.
    pub async fn send_move(&self, direction: Move) -> Result<Outcome> {
        let peers = {
            let mut replica = self.write().await?;
            match replica.role {
            | Role::Primary => {
                let outcome = replica.state.apply(direction, &self.me.name)?;
                if outcome.is_moved() {
                    self.replicate(&replica.state).await;
                }
                return Ok(outcome)
            }
            | Role::Retiree => return Err(Error::Retiring),
            | Role::Backup | Role::Normal => replica.state.peers().to_vec(),
            }
        };

        let mut last = Error::NotPrimary;
        for peer in peers.iter().filter(|peer| peer.name != self.me.name) {
            match self.remote.move_to(peer, direction, &self.me.name).await {
            | Ok((outcome, state)) => {
                self.cache(state).await;
                return Ok(outcome)
            }
            | Err(Error::Retiring) => return self.shadow_move(direction, &peers).await,
            | Err(error) => {
                debug!("move through {} failed: {}", peer.name, error);
                last = error;
            }
            }
        }
        Err(last)
    }

    /// Returns a fresh copy of the game. Normal nodes fetch it from the
    /// first peer willing to serve a read; everybody else has it locally.
    pub async fn refresh(&self) -> Result<State> {
        let peers = {
            let replica = self.read().await?;
            if replica.role != Role::Normal {
                return Ok(replica.state.clone())
            }
            replica.state.peers().to_vec()
        };

        let mut last = Error::NotBackup;
        for peer in peers.iter().filter(|peer| peer.name != self.me.name) {
            match self.remote.get(peer, &self.me.name).await {
            | Ok(state) => {
                self.cache(state.clone()).await;
                return Ok(state)
            }
            | Err(error) => {
                debug!("refresh from {} failed: {}", peer.name, error);
                last = error;
            }
            }
        }
        Err(last)
    }

    /// Stops serving immediately, without telling anyone. Other nodes will
    /// treat this node as crashed.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task.await.ok();
        }
    }

    /// Resolves once this node has stopped serving.
    pub async fn stopped(&self) {
        self.shutdown.cancelled().await
    }

    pub(crate) fn track(&self, task: JoinHandle<()>) {
        self.tasks.lock().push(task);
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    async fn read(&self) -> Result<RwLockReadGuard<'_, Replica>> {
        RwLockReadGuard::try_map(self.replica.read().await, Option::as_ref)
            .map_err(|_| Error::Joining)
    }

    async fn write(&self) -> Result<RwLockMappedWriteGuard<'_, Replica>> {
        RwLockWriteGuard::try_map(self.replica.write().await, Option::as_mut)
            .map_err(|_| Error::Joining)
    }

    /// Replaces a Normal node's cached copy with a newer one obtained from a
    /// reply. Backups are kept current by pushes instead.
    async fn cache(&self, state: State) {
        if let Ok(mut replica) = self.write().await {
            if replica.role == Role::Normal && state.count() >= replica.state.count() {
                replica.state = state;
            }
        }
    }

    /// Forwards `state` to the Backup. Failures are logged and left to the
    /// failure detector.
    async fn replicate(&self, state: &State) {
        match self.push_to_backup(state).await {
        | Ok(()) => (),
        | Err(Error::NoBackupAvailable) => debug!("no backup to replicate to"),
        | Err(error) if error.is_unreachable() => warn!("backup unreachable: {}", error),
        | Err(error) => warn!("backup rejected push: {}", error),
        }
    }

    async fn push_to_backup(&self, state: &State) -> Result<()> {
        let backup = state.backup().ok_or(Error::NoBackupAvailable)?;
        debug!("pushing count {} to {}", state.count(), backup.name);
        self.remote.push(backup, state.clone()).await
    }

    /// Sends `leave(name)` along the ring until the Primary accepts it.
    async fn leave_via_ring(&self, peers: &[Peer], name: &str) -> Result<()> {
        let mut last = Error::NotPrimary;
        for peer in peers.iter().filter(|peer| peer.name != self.me.name) {
            match self.remote.leave(peer, name).await {
            | Ok(()) => return Ok(()),
            | Err(error) => {
                debug!("leave({}) through {} failed: {}", name, peer.name, error);
                last = error;
            }
            }
        }
        Err(last)
    }

    async fn report_crash(&self, name: &str) {
        match self.tracker.unregister(name).await {
        | Ok(()) => info!("reported {} to tracker", name),
        | Err(error) => warn!("failed to report {} to tracker: {}", name, error),
        }
    }

    pub(crate) fn spawn_heartbeat(self: &Arc<Self>) {
        let node = self.clone();
        let shutdown = self.shutdown.clone();
        let period = self.config.heartbeat();
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => node.heartbeat().await,
                }
            }
        });
        self.track(task);
    }
}
