//! # Summary
//!
//! Failure detection. Once per period every node pings its designated ring
//! neighbours: the Primary pings the Backup, the Backup pings the Primary and
//! its successor, and a Normal node pings its successor. Only a transport
//! failure counts as a crash; any reply at all proves liveness.
//!
//! Pings are issued without holding the state lock. Recovery re-checks the
//! ring under the write lock before acting, since it may have changed while
//! the ping was in flight.

use crate::error::Error;
use crate::message::Peer;
use crate::node::Node;
use crate::role::{Role, Transition};

impl Node {
    /// Runs one failure-detection cycle.
    pub async fn heartbeat(&self) {
        let (role, index, peers) = match self.read().await {
        | Ok(replica) => (
            replica.role,
            replica.state.index_of(&self.me.name),
            replica.state.peers().to_vec(),
        ),
        | Err(_) => return,
        };

        let index = match index {
        | Some(index) => index,
        | None => {
            warn!("missing from own roster, skipping heartbeat");
            return
        }
        };

        match role {
        | Role::Primary => {
            if let Some(backup) = peers.get(index + 1) {
                if !self.probe(backup).await {
                    self.backup_crashed(backup).await;
                }
            }
        }
        | Role::Backup => {
            if let Some(primary) = index.checked_sub(1).and_then(|i| peers.get(i)) {
                if !self.probe(primary).await {
                    // Successor is checked again next period, now as Primary.
                    self.primary_crashed(primary).await;
                    return
                }
            }
            if let Some(next) = peers.get(index + 1) {
                if !self.probe(next).await {
                    self.successor_crashed(role, &peers, next).await;
                }
            }
        }
        | Role::Normal => {
            if let Some(next) = peers.get(index + 1) {
                if !self.probe(next).await {
                    self.successor_crashed(role, &peers, next).await;
                }
            }
        }
        | Role::Retiree => (),
        }
    }

    /// Returns false only if `peer` is unreachable.
    async fn probe(&self, peer: &Peer) -> bool {
        match self.remote.ping(peer).await {
        | Ok(()) => true,
        | Err(error) if error.is_unreachable() => {
            warn!("{} failed heartbeat: {}", peer.name, error);
            false
        }
        | Err(error) => {
            debug!("{} answered heartbeat with {}", peer.name, error);
            true
        }
        }
    }

    /// Primary side: drop the dead Backup and promote the first Normal.
    async fn backup_crashed(&self, dead: &Peer) {
        let mut replica = match self.write().await {
        | Ok(replica) => replica,
        | Err(_) => return,
        };
        if replica.role != Role::Primary || replica.state.backup() != Some(dead) {
            return
        }
        replica.state.remove_player(&dead.name);
        self.remote.forget(dead);
        info!("removed crashed backup {}", dead.name);
        self.replicate(&replica.state).await;
        self.report_crash(&dead.name).await;
    }

    /// Backup side: take over from the dead Primary.
    async fn primary_crashed(&self, dead: &Peer) {
        let mut replica = match self.write().await {
        | Ok(replica) => replica,
        | Err(_) => return,
        };
        if replica.role != Role::Backup || replica.state.primary() != Some(dead) {
            return
        }
        if let Err(error) = replica.transition(Transition::PrimaryCrashed, Error::NotBackup) {
            warn!("cannot take over from {}: {}", dead.name, error);
            return
        }
        replica.state.remove_player(&dead.name);
        self.remote.forget(dead);
        info!("removed crashed primary {}", dead.name);
        self.replicate(&replica.state).await;
        self.report_crash(&dead.name).await;
    }

    /// Backup or Normal side: the ring successor is gone. The roster belongs
    /// to the Primary, so the removal is forwarded there. A Backup leaves its
    /// own copy alone because the Primary's next push replaces it.
    async fn successor_crashed(&self, role: Role, peers: &[Peer], dead: &Peer) {
        self.remote.forget(dead);
        let forwarded = match role {
        | Role::Backup => match peers.first() {
            | Some(primary) => self.remote.leave(primary, &dead.name).await,
            | None => Err(Error::NotPrimary),
            },
        | _ => self.leave_via_ring(peers, &dead.name).await,
        };
        if let Err(error) = forwarded {
            warn!("failed to forward removal of {}: {}", dead.name, error);
        }

        if role == Role::Normal {
            if let Ok(mut replica) = self.write().await {
                if replica.role == Role::Normal {
                    replica.state.remove_player(&dead.name);
                }
            }
        }

        self.report_crash(&dead.name).await;
    }
}
