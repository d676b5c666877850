use anyhow::Context;
use lantern::config::Config;
use lantern::server::Server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let base_dir = std::env::current_dir().context("resolving working directory")?;
    let cfg = Config::load(&base_dir);

    let mut server = Server::bind(&cfg)?;
    let shutdown = server.shutdown_handle();
    let mut task = tokio::task::spawn_blocking(move || server.run());

    tokio::select! {
        res = &mut task => {
            res??;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            shutdown.stop();
            task.await??;
        }
    }

    Ok(())
}
