mod app;

use clap::Parser;

use shard::{ConnectTarget, GameLoop, LoopConfig};

#[derive(Parser)]
#[command(name = "shard")]
#[command(about = "Shard client runtime demo")]
struct Args {
    #[arg(
        short,
        long,
        help = "Server origin to connect to (e.g. http://127.0.0.1)"
    )]
    server: Option<String>,

    #[arg(
        short,
        long,
        default_value_t = 43594,
        help = "Base server port (the scheme offset is applied on top)"
    )]
    port: u16,

    #[arg(long, default_value_t = 50, help = "Logic ticks per second")]
    rate: u32,

    #[arg(long, help = "Destroy the loop after this many seconds")]
    run_for: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let target = args
        .server
        .as_deref()
        .map(|origin| ConnectTarget::from_origin(origin, args.port));

    let config = LoopConfig {
        ticks_per_second: args.rate,
        ..LoopConfig::default()
    };
    let deadline = args.run_for.map(|secs| secs * u64::from(args.rate));

    let mut shell = GameLoop::new(config);
    let mut app = app::DemoApp::new(target, deadline);
    shell.run(&mut app).await?;

    Ok(())
}
