use std::fmt::Write;

use maze::{Move, Position, State};

/// One line of player input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Fetch a fresh copy of the game
    Refresh,

    /// Move the local player one cell
    Move(Move),

    /// Leave the game
    Quit,
}

impl std::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
        | "0" => Ok(Command::Refresh),
        | "1" => Ok(Command::Move(Move::Up)),
        | "2" => Ok(Command::Move(Move::Down)),
        | "3" => Ok(Command::Move(Move::Left)),
        | "4" => Ok(Command::Move(Move::Right)),
        | "9" => Ok(Command::Quit),
        | _ => Err(()),
        }
    }
}

pub fn usage() -> &'static str {
    "0 refresh | 1 up | 2 down | 3 left | 4 right | 9 quit"
}

/// Paints the grid with each player as the first letter of their name and
/// each treasure as `*`, followed by the score table in ring order.
pub fn render(state: &State) -> String {
    let n = state.n();
    let mut grid = vec![vec!['.'; n]; n];
    // Cells off the grid are skipped; the state may come from a faulty peer.
    let mut paint = |pos: Position, mark: char| {
        if let Some(cell) = grid.get_mut(pos.y).and_then(|row| row.get_mut(pos.x)) {
            *cell = mark;
        }
    };
    for treasure in state.treasures() {
        paint(*treasure, '*');
    }
    for player in state.players() {
        paint(player.pos, player.name.chars().next().unwrap_or('?'));
    }

    let mut out = String::new();
    for row in grid {
        out.extend(row);
        out.push('\n');
    }
    for (index, player) in state.players().iter().enumerate() {
        let role = match index {
        | 0 => " (primary)",
        | 1 => " (backup)",
        | _ => "",
        };
        writeln!(out, "{:>4} {}{}", player.score, player.name, role).ok();
    }
    out
}

/// Installs a `fern` dispatcher on stderr. Each `-v` raises the level by one
/// step starting from `warn`.
pub fn logger(verbosity: u8) -> anyhow::Result<()> {
    let level = match verbosity {
    | 0 => log::LevelFilter::Warn,
    | 1 => log::LevelFilter::Info,
    | 2 => log::LevelFilter::Debug,
    | _ => log::LevelFilter::Trace,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}][{}] {}", record.level(), record.target(), message))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}
