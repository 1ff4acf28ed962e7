use clap::Parser;
use client::network::{Client, ClientResult, ClientSettings};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Distance moved per step
    #[arg(long, default_value_t = shared::MOVE_SPEED)]
    speed: f32,

    /// Milliseconds between movement steps
    #[arg(long, default_value_t = 16)]
    send_interval_ms: u64,

    /// Stop after this many seconds (runs until Ctrl+C if omitted)
    #[arg(short = 'd', long)]
    duration_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> ClientResult<()> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    let settings = ClientSettings {
        speed: args.speed,
        send_interval: Duration::from_millis(args.send_interval_ms.max(1)),
        ..ClientSettings::default()
    };

    let mut client = Client::new(&args.server, settings).await?;
    let duration = args.duration_secs.map(Duration::from_secs);

    tokio::select! {
        result = client.run(duration) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}
