use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::Parser;

use nereid_core::zone::RestrictedZone;
use nereid_server::repository::MemoryRepository;
use nereid_server::web::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "nereid-server", version, about = "Maritime incident dispatch server")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    address: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = 8000)]
    port: u16,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    let repository = Arc::new(MemoryRepository::with_default_fleet());
    let state = AppState::new(repository, RestrictedZone::indian_ocean());
    let app = router(state);

    let addr = SocketAddr::new(cli.address, cli.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("nereid-server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
