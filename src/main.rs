use spinledger::confidential::{BundleDecryptor, DecryptRelayer, RelayerClient, RpcBundleReader};
use spinledger::datasource::EtherscanLogSource;
use spinledger::ledger::LedgerBuilder;
use spinledger::{api, config::Config};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;
    let timeout = Duration::from_millis(config.request_timeout_ms);

    let log_source = Arc::new(EtherscanLogSource::new(
        config.etherscan_api_url.clone(),
        config.etherscan_api_key.clone(),
        timeout,
    ));
    let ledger = Arc::new(LedgerBuilder::new(log_source));

    let bundle_reader = Arc::new(RpcBundleReader::new(config.rpc_url.clone(), timeout));
    let relayer = config
        .relayer_url
        .clone()
        .map(|url| Arc::new(RelayerClient::new(url, timeout)) as Arc<dyn DecryptRelayer>);
    let decryptor = Arc::new(BundleDecryptor::new(
        bundle_reader,
        relayer,
        config.chain_id,
        config.decryption_verifier,
    ));

    // Create router
    let app = api::create_router(api::AppState::new(config, ledger, decryptor));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
