use clap::Parser;
use client::config::Args;
use client::input::TerminalKeys;
use client::pipeline::Client;
use client::rendering::{TerminalGuard, TerminalRenderer};
use env_logger::{Env, Target};
use log::info;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Tick interval: {}ms", args.tick_ms);

    let mut client = Client::new(&args.server, args.tick());
    client.start()?;

    let terminal = TerminalGuard::enter()?;
    let result = client
        .run(&mut TerminalKeys::default(), &mut TerminalRenderer::stdout())
        .await;
    drop(terminal);

    result?;
    info!("Client exited");
    Ok(())
}

/// Sends log output to `path` so it does not draw over the game screen
fn init_logging(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .init();
    Ok(())
}
