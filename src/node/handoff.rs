//! # Summary
//!
//! Leaving the game voluntarily.
//!
//! A departing Primary first becomes a Retiree, which makes every `move`
//! addressed to it fail with `Error::Retiring`. It then hands leadership to
//! its Backup through `set_primary`. Callers caught in between resubmit
//! their move as a shadow move, which the Backup (or the new Primary)
//! applies directly, so no move submitted during the handoff is lost.
//!
//! A departing Backup or Normal node simply asks the Primary to remove it.

use crate::error::{Error, Result};
use crate::message::{Move, Outcome, Peer};
use crate::node::Node;
use crate::role::{Role, Transition};
use crate::state::State;

impl Node {
    /// Leaves the game, unregisters from the tracker and stops serving.
    pub async fn quit(&self) -> Result<()> {
        let (role, peers) = {
            let mut replica = self.write().await?;
            let role = replica.role;
            if role == Role::Primary {
                replica.transition(Transition::Retired, Error::NotPrimary)?;
            }
            (role, replica.state.peers().to_vec())
        };

        match role {
        | Role::Primary => self.hand_off(&peers).await,
        | Role::Backup | Role::Normal => {
            if let Err(error) = self.leave_via_ring(&peers, &self.me.name).await {
                warn!("could not reach primary to leave: {}", error);
            }
        }
        | Role::Retiree => (),
        }

        if let Err(error) = self.tracker.unregister(&self.me.name).await {
            warn!("failed to unregister from tracker: {}", error);
        }
        info!("{} left the game", self.me.name);
        self.shutdown().await;
        Ok(())
    }

    async fn hand_off(&self, peers: &[Peer]) {
        let backup = self.ring_index(peers)
            .and_then(|index| peers.get(index + 1));
        match backup {
        | Some(backup) => match self.remote.set_primary(backup, &self.me.name).await {
            | Ok(()) => info!("handed leadership to {}", backup.name),
            | Err(error) => warn!("handoff to {} failed: {}", backup.name, error),
            },
        | None => info!("last player leaving, game ends"),
        }
    }

    fn ring_index(&self, peers: &[Peer]) -> Option<usize> {
        peers.iter().position(|peer| peer.name == self.me.name)
    }

    /// Resubmits a move rejected with `Error::Retiring` to whichever node now
    /// holds the authoritative copy, trying the ring in order.
    pub(crate) async fn shadow_move(&self, direction: Move, peers: &[Peer]) -> Result<Outcome> {
        info!("primary is retiring, resubmitting {:?} as shadow move", direction);
        let mut last = Error::NotBackup;
        for peer in peers {
            let result = if peer.name == self.me.name {
                self.apply_shadow(direction, &self.me.name).await
            } else {
                self.remote.shadow_move(peer, direction, &self.me.name).await
            };
            match result {
            | Ok((outcome, state)) => {
                self.cache(state).await;
                return Ok(outcome)
            }
            | Err(error) => {
                debug!("shadow move through {} failed: {}", peer.name, error);
                last = error;
            }
            }
        }
        Err(last)
    }

    /// Applies a move directly, bypassing the Primary-only gate. Only the
    /// Backup and the Primary hold a copy worth mutating.
    pub(crate) async fn apply_shadow(&self, direction: Move, mover: &str) -> Result<(Outcome, State)> {
        let mut replica = self.write().await?;
        let role = replica.role;
        match role {
        | Role::Primary | Role::Backup => (),
        | Role::Retiree => return Err(Error::Retiring),
        | Role::Normal => return Err(Error::NotBackup),
        }
        let outcome = replica.state.apply(direction, mover)?;
        debug!("shadow move by {} {:?}: {:?}", mover, direction, outcome);
        if role == Role::Primary && outcome.is_moved() {
            self.replicate(&replica.state).await;
        }
        Ok((outcome, replica.state.clone()))
    }
}
