use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use log::warn;
use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, BufReader};

use game::Command;

#[derive(StructOpt)]
#[structopt(name = "game")]
struct Opt {
    /// Tracker host
    #[structopt(long = "host", default_value = "127.0.0.1")]
    host: String,

    /// Tracker port
    #[structopt(short = "p", long = "port")]
    port: u16,

    /// Tracker service name
    #[structopt(long = "service", default_value = "tracker")]
    service: String,

    /// Unique player name
    #[structopt(short = "i", long = "id")]
    name: String,

    /// Address to listen on for other players
    #[structopt(short = "l", long = "listen", default_value = "127.0.0.1:0")]
    listen: SocketAddr,

    /// Timeout between players (in milliseconds)
    #[structopt(short = "t", long = "timeout", default_value = "1000")]
    timeout: u64,

    /// Log verbosity, repeat for more
    #[structopt(short = "v", parse(from_occurrences))]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    game::logger(opt.verbose)?;

    let tracker = maze::TrackerInfo::new(opt.host, opt.port, opt.service);
    let node = maze::Config::new(opt.name, tracker)
        .with_addr(opt.listen)
        .with_timeout(Duration::from_millis(opt.timeout))
        .join()
        .await
        .context("could not join the game")?;

    if let Some(state) = node.snapshot().await {
        print!("{}", game::render(&state));
    }
    println!("{}", game::usage());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse::<Command>() {
        | Ok(command) => command,
        | Err(()) => {
            println!("{}", game::usage());
            continue
        }
        };

        let result = match command {
        | Command::Refresh => node.refresh().await.map(|_| ()),
        | Command::Move(direction) => node.send_move(direction).await.map(|outcome| {
            if !outcome.is_moved() {
                println!("blocked");
            }
        }),
        | Command::Quit => {
            node.quit().await?;
            return Ok(())
        }
        };

        if let Err(error) = result {
            warn!("{:?} failed: {}", command, error);
        }
        if let Some(state) = node.snapshot().await {
            print!("{}", game::render(&state));
        }
    }

    node.quit().await?;
    Ok(())
}
