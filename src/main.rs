use clap::Parser;
use mcp_hello_world::{
    config::{CliArgs, Config, TransportMode},
    domain::builtin_registry,
    logging,
    mcp::server::Dispatcher,
    serve_http, shutdown_signal, stdio, AppState,
};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_args(CliArgs::parse())?;
    logging::init_logging(config.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(&config));

    // A stdin read parked on the blocking pool only returns once the peer writes
    // or closes the pipe; exit without joining it.
    runtime.shutdown_background();

    result?;
    info!(mode = %config.mode, "server stopped");
    Ok(())
}

async fn run(config: &Config) -> std::io::Result<()> {
    let dispatcher = Dispatcher::new(builtin_registry());

    match config.mode {
        TransportMode::Stdio => stdio::run_stdio(&dispatcher, shutdown_signal()).await,
        TransportMode::Http => {
            let listener = tokio::net::TcpListener::bind(config.bind_target()).await?;
            info!(
                host = %config.host,
                port = config.port,
                "server starting"
            );
            serve_http(listener, AppState::new(dispatcher), shutdown_signal()).await
        }
    }
}
