//! # Summary
//!
//! Inbound half of the node RPC surface. Writes are served by the Primary
//! only and end by replicating to the Backup; reads are served by anyone but
//! the Primary.

use crate::error::{Error, Result};
use crate::message::{Move, Outcome, Peer, Reply, Request, Response};
use crate::node::{Node, Replica};
use crate::role::{Role, Transition};
use crate::socket;
use crate::state::State;

impl socket::Handler for Node {
    type Request = Request;
    type Response = Response;

    async fn handle(&self, request: Request) -> Response {
        match request {
        | Request::Register(peer) => self.on_register(peer).await.map(boxed),
        | Request::Push(state) => self.on_push(*state).await.map(|()| Reply::Ack),
        | Request::Ping => Ok(Reply::Ack),
        | Request::Move { direction, caller } => self.on_move(direction, &caller).await.map(moved),
        | Request::Get { caller } => self.on_get(&caller).await.map(boxed),
        | Request::Leave { name } => self.on_leave(&name).await.map(|()| Reply::Ack),
        | Request::SetPrimary { caller } => self.on_set_primary(&caller).await.map(|()| Reply::Ack),
        | Request::ShadowMove { direction, caller } => {
            self.on_shadow_move(direction, &caller).await.map(moved)
        }
        }
    }
}

fn boxed(state: State) -> Reply {
    Reply::State(Box::new(state))
}

fn moved((outcome, state): (Outcome, State)) -> Reply {
    Reply::Moved(outcome, Box::new(state))
}

impl Node {
    fn reject_self(&self, caller: &str) -> Result<()> {
        if caller == self.me.name {
            return Err(Error::SelfReferential)
        }
        Ok(())
    }

    async fn on_register(&self, peer: Peer) -> Result<State> {
        self.reject_self(&peer.name)?;
        let mut replica = self.write().await?;
        if replica.role != Role::Primary {
            return Err(Error::NotPrimary)
        }
        // Same handle again: the joiner lost our earlier reply
        if replica.state.peers().contains(&peer) {
            debug!("{} registered again", peer.name);
            return Ok(replica.state.clone())
        }
        let name = peer.name.clone();
        let index = replica.state.add_player(peer)?;
        info!("registered {} at ring index {}", name, index);
        // A joiner landing at index 1 is the Backup and receives the state in the reply.
        if index > 1 {
            self.replicate(&replica.state).await;
        }
        Ok(replica.state.clone())
    }

    async fn on_push(&self, latest: State) -> Result<()> {
        let mut guard = self.replica.write().await;
        if guard.is_none() {
            // Pushed to while our own registration reply is still in flight
            if latest.index_of(&self.me.name) != Some(1) {
                return Err(Error::NotBackup)
            }
            info!("received push while joining, starting as backup");
            *guard = Some(Replica::new(Role::Backup, latest));
            return Ok(())
        }
        let replica = guard.as_mut().ok_or(Error::Joining)?;
        if replica.role.transition(Transition::Pushed).is_none() {
            return Err(Error::NotBackup)
        }
        if latest.count() < replica.state.count() {
            return Err(Error::Stale { have: replica.state.count(), got: latest.count() })
        }
        replica.transition(Transition::Pushed, Error::NotBackup)?;
        debug!("installed push with count {}", latest.count());
        replica.state = latest;
        Ok(())
    }

    async fn on_move(&self, direction: Move, caller: &str) -> Result<(Outcome, State)> {
        let mut replica = self.write().await?;
        match replica.role {
        | Role::Primary => (),
        | Role::Retiree => return Err(Error::Retiring),
        | Role::Backup | Role::Normal => return Err(Error::NotPrimary),
        }
        self.reject_self(caller)?;
        let outcome = replica.state.apply(direction, caller)?;
        debug!("{} moved {:?}: {:?}", caller, direction, outcome);
        if outcome.is_moved() {
            self.replicate(&replica.state).await;
        }
        Ok((outcome, replica.state.clone()))
    }

    async fn on_get(&self, caller: &str) -> Result<State> {
        let replica = self.read().await?;
        if replica.role == Role::Primary {
            return Err(Error::NotPrimary)
        }
        self.reject_self(caller)?;
        Ok(replica.state.clone())
    }

    async fn on_leave(&self, name: &str) -> Result<()> {
        let mut replica = self.write().await?;
        match replica.role {
        | Role::Primary => (),
        | Role::Retiree => return Err(Error::Retiring),
        | Role::Backup | Role::Normal => return Err(Error::NotPrimary),
        }
        self.reject_self(name)?;
        match replica.state.remove_player(name) {
        | Some(_) => {
            info!("{} left", name);
            self.replicate(&replica.state).await;
        }
        | None => debug!("{} already left", name),
        }
        Ok(())
    }

    async fn on_set_primary(&self, caller: &str) -> Result<()> {
        self.reject_self(caller)?;
        let mut replica = self.write().await?;
        replica.transition(Transition::HandedOff, Error::NotBackup)?;
        info!("took over from retiring {}", caller);
        replica.state.remove_player(caller);
        self.replicate(&replica.state).await;
        Ok(())
    }

    async fn on_shadow_move(&self, direction: Move, caller: &str) -> Result<(Outcome, State)> {
        self.reject_self(caller)?;
        self.apply_shadow(direction, caller).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::Config;
    use crate::state::Position;
    use crate::tracker;

    async fn join(name: &str, tracker: &tracker::Handle) -> Arc<Node> {
        Config::new(name, tracker.info().clone())
            .with_heartbeat(Duration::from_secs(3600))
            .with_timeout(Duration::from_millis(500))
            .join()
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn normal_move_right_end_to_end() {
        let tracker = tracker::Config::new(0, 5, 2).spawn().await.unwrap();
        let p = join("p", &tracker).await;
        let b = join("b", &tracker).await;
        let c = join("c", &tracker).await;

        p.write().await.unwrap().state.arrange(
            &[
                ("p", Position::new(0, 0)),
                ("b", Position::new(4, 4)),
                ("c", Position::new(1, 2)),
            ],
            &[Position::new(0, 4), Position::new(4, 0)],
        );

        let outcome = c.send_move(Move::Right).await.unwrap();
        assert_eq!(outcome, Outcome::Moved { to: Position::new(2, 2), scored: false });

        let primary = p.snapshot().await.unwrap();
        assert_eq!(primary.player("c").unwrap().pos, Position::new(2, 2));
        assert_eq!(primary.player("p").unwrap().pos, Position::new(0, 0));
        assert_eq!(primary.player("b").unwrap().pos, Position::new(4, 4));
        assert_eq!(primary.count(), 1, "registrations are not counted");
        assert_eq!(b.snapshot().await.unwrap(), primary);
        assert_eq!(c.snapshot().await.unwrap(), primary);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn register_is_idempotent_for_the_same_handle() {
        let tracker = tracker::Config::new(0, 5, 1).spawn().await.unwrap();
        let p = join("p", &tracker).await;
        let b = join("b", &tracker).await;

        let again = p.on_register(b.peer().clone()).await.unwrap();
        assert_eq!(again, p.snapshot().await.unwrap());
        assert_eq!(again.len(), 2);

        let moved = Peer::new("b", p.addr());
        assert_eq!(p.on_register(moved).await, Err(Error::DuplicateName("b".to_string())));
    }
}
