//! # Summary
//!
//! Wire types exchanged between nodes and with the tracker. Peers are
//! addressed by `{name, address}` pairs and resolved to connections only when
//! a call is issued, so serialized state never embeds live handles.

use std::net::SocketAddr;

use serde_derive::{Deserialize, Serialize};

use crate::error;
use crate::state::{Position, State};

/// Location-independent handle to a participant.
#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Peer {
    pub name: String,
    pub addr: SocketAddr,
}

impl Peer {
    pub fn new<N: Into<String>>(name: N, addr: SocketAddr) -> Self {
        Peer { name: name.into(), addr }
    }
}

/// How to reach the tracker again after bootstrap.
#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerInfo {
    pub host: String,
    pub port: u16,
    pub service: String,
}

impl TrackerInfo {
    pub fn new<H: Into<String>, S: Into<String>>(host: H, port: u16, service: S) -> Self {
        TrackerInfo { host: host.into(), port, service: service.into() }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Snapshot handed to a joining node.
#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bootstrap {
    pub peers: Vec<Peer>,
    pub n: usize,
    pub k: usize,
    pub tracker: TrackerInfo,
}

#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

/// Result of applying a move. A blocked move is not an error.
#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Moved { to: Position, scored: bool },
    Blocked,
}

impl Outcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, Outcome::Moved { .. })
    }
}

/// Calls served by every node.
#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug)]
pub enum Request {
    Register(Peer),
    Push(Box<State>),
    Ping,
    Move { direction: Move, caller: String },
    Get { caller: String },
    Leave { name: String },
    SetPrimary { caller: String },
    ShadowMove { direction: Move, caller: String },
}

#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug)]
pub enum Reply {
    Ack,
    State(Box<State>),
    Moved(Outcome, Box<State>),
}

pub type Response = error::Result<Reply>;

/// Calls served by the tracker. `service` must match the tracker's name.
#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug)]
pub struct TrackerRequest {
    pub service: String,
    pub call: TrackerCall,
}

#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug)]
pub enum TrackerCall {
    Register(Peer),
    Unregister(String),
    Fetch,
}

#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug)]
pub enum TrackerReply {
    Bootstrap(Bootstrap),
    Ack,
}

pub type TrackerResponse = error::Result<TrackerReply>;
