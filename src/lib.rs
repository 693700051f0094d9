#[macro_use] extern crate derivative;
#[macro_use] extern crate log;

mod config;
mod error;
mod message;
mod node;
mod pool;
mod role;
mod socket;
mod state;

pub mod tracker;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::message::{Bootstrap, Move, Outcome, Peer, TrackerInfo};
pub use crate::node::{Node, Remote};
pub use crate::role::{Role, Transition};
pub use crate::state::{PlayerInfo, Position, State};
