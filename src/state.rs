//! # Summary
//!
//! The replicated game state: the roster of players, the handles used to
//! reach them, the treasures, and a counter of applied moves.
//!
//! `players[i]` and `peers[i]` always describe the same participant. Both
//! vectors are private and only ever modified together. Index 0 is the
//! Primary, index 1 the Backup, everything after is Normal.

use rand::Rng;
use serde_derive::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::message::{Move, Outcome, Peer};

#[derive(Serialize, Deserialize)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Neighbouring cell in screen coordinates, if it lies on an `n` by `n` grid.
    pub fn step(self, direction: Move, n: usize) -> Option<Position> {
        let (x, y) = match direction {
        | Move::Up => (Some(self.x), self.y.checked_sub(1)),
        | Move::Down => (Some(self.x), self.y.checked_add(1)),
        | Move::Left => (self.x.checked_sub(1), Some(self.y)),
        | Move::Right => (self.x.checked_add(1), Some(self.y)),
        };
        match (x, y) {
        | (Some(x), Some(y)) if x < n && y < n => Some(Position { x, y }),
        | _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerInfo {
    pub pos: Position,
    pub name: String,
    pub score: u64,
}

#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    players: Vec<PlayerInfo>,
    peers: Vec<Peer>,
    treasures: Vec<Position>,
    count: u64,
    n: usize,
    k: usize,
}

impl State {
    /// Creates a fresh game with `origin` as the sole player and Primary.
    pub fn new(origin: Peer, n: usize, k: usize) -> Result<Self> {
        if k + 1 > n * n {
            return Err(Error::GridFull)
        }
        let mut state = State {
            players: Vec::with_capacity(1),
            peers: Vec::with_capacity(1),
            treasures: Vec::with_capacity(k),
            count: 0,
            n,
            k,
        };
        let mut rng = rand::thread_rng();
        for _ in 0..k {
            let pos = state.sample_free(&mut rng);
            state.treasures.push(pos);
        }
        state.add_player(origin)?;
        Ok(state)
    }

    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn treasures(&self) -> &[Position] {
        &self.treasures
    }

    /// Number of moves applied so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|player| player.name == name)
    }

    pub fn player(&self, name: &str) -> Option<&PlayerInfo> {
        self.index_of(name).map(|i| &self.players[i])
    }

    pub fn peer(&self, index: usize) -> Option<&Peer> {
        self.peers.get(index)
    }

    pub fn primary(&self) -> Option<&Peer> {
        self.peers.first()
    }

    pub fn backup(&self) -> Option<&Peer> {
        self.peers.get(1)
    }

    /// Appends a player at a random free cell and returns its ring index.
    pub fn add_player(&mut self, peer: Peer) -> Result<usize> {
        if self.index_of(&peer.name).is_some() {
            return Err(Error::DuplicateName(peer.name))
        }
        if self.occupied() >= self.n * self.n {
            return Err(Error::GridFull)
        }
        let pos = self.sample_free(&mut rand::thread_rng());
        self.players.push(PlayerInfo {
            pos,
            name: peer.name.clone(),
            score: 0,
        });
        self.peers.push(peer);
        Ok(self.players.len() - 1)
    }

    /// Removes the named player from the roster, if present.
    pub fn remove_player(&mut self, name: &str) -> Option<PlayerInfo> {
        let index = self.index_of(name)?;
        self.peers.remove(index);
        Some(self.players.remove(index))
    }

    /// Moves the named player one cell. Moves off the grid or onto another
    /// player leave the state untouched and report `Outcome::Blocked`.
    pub fn apply(&mut self, direction: Move, name: &str) -> Result<Outcome> {
        let index = self.index_of(name)
            .ok_or_else(|| Error::UnknownPlayer(name.to_string()))?;

        let to = match self.players[index].pos.step(direction, self.n) {
        | Some(to) if !self.players.iter().any(|player| player.pos == to) => to,
        | _ => return Ok(Outcome::Blocked),
        };

        self.players[index].pos = to;
        let scored = match self.treasures.iter().position(|treasure| *treasure == to) {
        | Some(t) => {
            self.players[index].score += 1;
            // The mover now stands on the old cell, so it can't be resampled.
            self.treasures[t] = self.sample_free(&mut rand::thread_rng());
            true
        }
        | None => false,
        };

        self.count += 1;
        Ok(Outcome::Moved { to, scored })
    }

    /// Pins named players and every treasure to given cells.
    #[cfg(test)]
    pub(crate) fn arrange(&mut self, players: &[(&str, Position)], treasures: &[Position]) {
        for (name, pos) in players {
            if let Some(index) = self.index_of(name) {
                self.players[index].pos = *pos;
            }
        }
        self.treasures = treasures.to_vec();
    }

    fn occupied(&self) -> usize {
        self.players.len() + self.treasures.len()
    }

    fn is_free(&self, pos: Position) -> bool {
        !self.players.iter().any(|player| player.pos == pos)
            && !self.treasures.iter().any(|treasure| *treasure == pos)
    }

    /// Retry-until-unique sampling. Callers guarantee a free cell exists.
    fn sample_free<R: Rng>(&self, rng: &mut R) -> Position {
        loop {
            let pos = Position::new(rng.gen_range(0..self.n), rng.gen_range(0..self.n));
            if self.is_free(pos) {
                return pos
            }
        }
    }
}
