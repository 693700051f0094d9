use std::time::Duration;

use crate::error::{Error, Result};
use crate::message::{Move, Outcome, Peer, Reply, Request, Response};
use crate::pool::Pool;
use crate::state::State;

/// Typed view over the node RPC surface. Rejections come back as the
/// `Error` kind the remote node raised; transport failures as `Unreachable`.
#[derive(Clone, Debug)]
pub struct Remote {
    pool: Pool<Request, Response>,
}

impl Remote {
    pub fn new(timeout: Duration) -> Self {
        Remote { pool: Pool::new(timeout) }
    }

    pub async fn register(&self, peer: &Peer, joiner: Peer) -> Result<State> {
        match self.call(peer, Request::Register(joiner)).await? {
        | Reply::State(state) => Ok(*state),
        | _ => Err(Error::Protocol),
        }
    }

    pub async fn push(&self, peer: &Peer, state: State) -> Result<()> {
        self.ack(peer, Request::Push(Box::new(state))).await
    }

    pub async fn ping(&self, peer: &Peer) -> Result<()> {
        self.ack(peer, Request::Ping).await
    }

    pub async fn move_to(&self, peer: &Peer, direction: Move, caller: &str) -> Result<(Outcome, State)> {
        let request = Request::Move { direction, caller: caller.to_string() };
        self.moved(peer, request).await
    }

    pub async fn get(&self, peer: &Peer, caller: &str) -> Result<State> {
        match self.call(peer, Request::Get { caller: caller.to_string() }).await? {
        | Reply::State(state) => Ok(*state),
        | _ => Err(Error::Protocol),
        }
    }

    pub async fn leave(&self, peer: &Peer, name: &str) -> Result<()> {
        self.ack(peer, Request::Leave { name: name.to_string() }).await
    }

    pub async fn set_primary(&self, peer: &Peer, caller: &str) -> Result<()> {
        self.ack(peer, Request::SetPrimary { caller: caller.to_string() }).await
    }

    pub async fn shadow_move(&self, peer: &Peer, direction: Move, caller: &str) -> Result<(Outcome, State)> {
        let request = Request::ShadowMove { direction, caller: caller.to_string() };
        self.moved(peer, request).await
    }

    /// Drops pooled connections to a peer known to be gone.
    pub fn forget(&self, peer: &Peer) {
        self.pool.forget(peer.addr);
    }

    async fn ack(&self, peer: &Peer, request: Request) -> Result<()> {
        match self.call(peer, request).await? {
        | Reply::Ack => Ok(()),
        | _ => Err(Error::Protocol),
        }
    }

    async fn moved(&self, peer: &Peer, request: Request) -> Result<(Outcome, State)> {
        match self.call(peer, request).await? {
        | Reply::Moved(outcome, state) => Ok((outcome, *state)),
        | _ => Err(Error::Protocol),
        }
    }

    async fn call(&self, peer: &Peer, request: Request) -> Result<Reply> {
        self.pool.call(peer.addr, request).await?
    }
}
