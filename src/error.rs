//! # Summary
//!
//! Every rejection in the protocol is a typed `Error` kind. The enum is
//! serializable so that a remote node's refusal arrives at the caller as the
//! same variant it was raised as, and callers branch on the kind instead of
//! on an opaque failure.

use std::net::SocketAddr;

use serde_derive::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Serialize, Deserialize)]
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Write-path call addressed to a node that is not the Primary.
    #[error("not primary")]
    NotPrimary,

    /// Replication or handoff call addressed to a node that cannot take it.
    #[error("not backup")]
    NotBackup,

    /// Registering, querying or moving against oneself.
    #[error("cannot address self")]
    SelfReferential,

    /// The Primary is handing off leadership. Retry through `shadow_move`.
    #[error("primary is retiring")]
    Retiring,

    /// Transport-level failure. The only crash signal.
    #[error("peer at {addr} unreachable: {reason}")]
    Unreachable { addr: SocketAddr, reason: String },

    #[error("no backup available")]
    NoBackupAvailable,

    /// The node is still bootstrapping and holds no state yet.
    #[error("node has not joined yet")]
    Joining,

    #[error("stale push: holding count {have}, received {got}")]
    Stale { have: u64, got: u64 },

    #[error("name {0} is already registered")]
    DuplicateName(String),

    #[error("unknown player {0}")]
    UnknownPlayer(String),

    #[error("no free cell left on the grid")]
    GridFull,

    #[error("unknown service {0}")]
    UnknownService(String),

    #[error("unexpected reply")]
    Protocol,

    #[error("bootstrap failed after {attempts} attempts")]
    Bootstrap { attempts: usize },

    #[error("io: {0}")]
    Io(String),
}

impl Error {
    pub fn unreachable<E: std::fmt::Display>(addr: SocketAddr, error: E) -> Self {
        Error::Unreachable { addr, reason: error.to_string() }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Error::Unreachable { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error.to_string())
    }
}
