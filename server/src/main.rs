use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::{Server, ServerResult};

#[tokio::main]
async fn main() -> ServerResult<()> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::parse();

    let server = Server::bind(&config).await?;
    let handle = server.handle();
    let server_task = tokio::spawn(server.run());

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server stopped with error: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.shutdown();
        }
    }

    Ok(())
}
