//! # Summary
//!
//! Joining the game. The tracker's snapshot lists every peer it knows of,
//! but any of them may have died since, so a joiner tries each one in turn
//! and keeps the first registration the Primary accepts. A snapshot that
//! lists nobody else means this node starts a new game.

use crate::error::{Error, Result};
use crate::message::Bootstrap;
use crate::node::{Node, Replica};
use crate::role::Role;
use crate::state::State;

impl Node {
    /// Registers with the tracker and then with the Primary, retrying with
    /// a fresh snapshot after every failed round.
    pub(crate) async fn bootstrap(&self) -> Result<()> {
        let mut bootstrap = self.tracker.register(self.me.clone()).await?;
        let attempts = self.config.retries() + 1;

        for attempt in 1..=attempts {
            match self.join(&bootstrap).await {
            | Ok(replica) => {
                self.install(replica).await;
                return Ok(())
            }
            | Err(error) => warn!("bootstrap attempt {} of {} failed: {}", attempt, attempts, error),
            }

            if attempt == attempts {
                break
            }

            tokio::time::sleep(self.config.retry_delay()).await;
            match self.tracker.fetch().await {
            | Ok(fresh) => bootstrap = fresh,
            | Err(error) => warn!("failed to refresh peers from tracker: {}", error),
            }
        }

        if let Err(error) = self.tracker.unregister(&self.me.name).await {
            warn!("failed to withdraw from tracker: {}", error);
        }
        Err(Error::Bootstrap { attempts })
    }

    /// One pass over the snapshot.
    async fn join(&self, bootstrap: &Bootstrap) -> Result<Replica> {
        let others = bootstrap.peers
            .iter()
            .filter(|peer| peer.name != self.me.name)
            .collect::<Vec<_>>();

        if others.is_empty() {
            info!("no other players known, starting a new {0}x{0} game", bootstrap.n);
            let state = State::new(self.me.clone(), bootstrap.n, bootstrap.k)?;
            return Ok(Replica::new(Role::Primary, state))
        }

        let mut last = Error::NotPrimary;
        for peer in others {
            match self.remote.register(peer, self.me.clone()).await {
            | Ok(state) => {
                let index = state.index_of(&self.me.name).ok_or(Error::Protocol)?;
                info!("registered with {} at ring index {}", peer.name, index);
                return Ok(Replica::new(Role::from_index(index), state))
            }
            | Err(error) => {
                debug!("registration with {} failed: {}", peer.name, error);
                last = error;
            }
            }
        }
        Err(last)
    }

    async fn install(&self, replica: Replica) {
        let mut guard = self.replica.write().await;
        match guard.as_ref() {
        | Some(current) => info!("joined as {}, keeping state pushed during registration", current.role),
        | None => {
            info!("joined as {}", replica.role);
            *guard = Some(replica);
        }
        }
    }
}
