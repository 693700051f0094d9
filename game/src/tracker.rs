use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "tracker")]
struct Opt {
    /// Port to listen on
    #[structopt(short = "p", long = "port")]
    port: u16,

    /// Grid side length
    #[structopt(short = "n")]
    n: usize,

    /// Number of treasures on the grid
    #[structopt(short = "k")]
    k: usize,

    /// Host players use to reach this tracker
    #[structopt(long = "host", default_value = "127.0.0.1")]
    host: String,

    /// Service name players must ask for
    #[structopt(long = "service", default_value = "tracker")]
    service: String,

    /// Log verbosity, repeat for more
    #[structopt(short = "v", parse(from_occurrences))]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    game::logger(opt.verbose)?;

    let handle = maze::tracker::Config::new(opt.port, opt.n, opt.k)
        .with_host(opt.host)
        .with_service(opt.service)
        .spawn()
        .await?;

    println!("tracker listening on {} ({}x{}, {} treasures)", handle.addr(), opt.n, opt.n, opt.k);
    tokio::signal::ctrl_c().await?;
    handle.shutdown().await;
    Ok(())
}
