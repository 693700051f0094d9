#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use maze::tracker;
use maze::{Config, Move, Node, Position, State};

/// Long enough that the periodic heartbeat never fires during a test;
/// failure detection is driven by calling `Node::heartbeat` directly.
pub const NO_HEARTBEAT: Duration = Duration::from_secs(3600);

pub async fn tracker(n: usize, k: usize) -> tracker::Handle {
    tracker::Config::new(0, n, k)
        .spawn()
        .await
        .expect("tracker should bind")
}

pub fn config(name: &str, tracker: &tracker::Handle) -> Config {
    Config::new(name, tracker.info().clone())
        .with_heartbeat(NO_HEARTBEAT)
        .with_timeout(Duration::from_millis(500))
        .with_retries(5, Duration::from_millis(50))
}

pub async fn join(name: &str, tracker: &tracker::Handle) -> Arc<Node> {
    config(name, tracker)
        .join()
        .await
        .expect("node should join")
}

pub async fn snapshot(node: &Node) -> State {
    node.snapshot().await.expect("node should hold state")
}

pub fn names(state: &State) -> Vec<String> {
    state.players().iter().map(|player| player.name.clone()).collect()
}

pub fn tracked(tracker: &tracker::Handle) -> Vec<String> {
    tracker.tracker()
        .fetch()
        .peers
        .into_iter()
        .map(|peer| peer.name)
        .collect()
}

/// A direction in which `name` can move without leaving the grid or
/// bumping into another player.
pub fn free_direction(state: &State, name: &str) -> Option<(Move, Position)> {
    let from = state.player(name)?.pos;
    [Move::Up, Move::Down, Move::Left, Move::Right]
        .into_iter()
        .filter_map(|direction| from.step(direction, state.n()).map(|to| (direction, to)))
        .find(|(_, to)| state.players().iter().all(|player| player.pos != *to))
}

/// A direction that walks `name` off the grid.
pub fn wall_direction(state: &State, name: &str) -> Option<Move> {
    let from = state.player(name)?.pos;
    [Move::Up, Move::Down, Move::Left, Move::Right]
        .into_iter()
        .find(|direction| from.step(*direction, state.n()).is_none())
}
