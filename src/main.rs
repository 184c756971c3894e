use std::sync::Arc;

use rentpay_backend::app;
use rentpay_backend::config::Config;
use rentpay_backend::eth::client::ChainClient;
use rentpay_backend::eth::decimals::Erc20Decimals;
use rentpay_backend::ledger::PayoutLedger;
use rentpay_backend::offramp::OfframpClient;
use rentpay_backend::state::AppState;
use rentpay_backend::worker::IngestWorker;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Load env
    dotenvy::dotenv().ok();

    let config = Config::from_env().expect("invalid configuration");

    let provider = ChainClient::build_provider(&config).expect("invalid RPC_URL");
    let chain = ChainClient::new(provider.clone(), config.contract_address);
    chain.verify_contract().await;

    let decimals = Erc20Decimals::new(provider);
    let ledger = Arc::new(PayoutLedger::new(config.ledger_capacity));
    let offramp = config.offramp.clone().map(OfframpClient::new);

    let worker = IngestWorker::new(
        chain,
        decimals,
        ledger.clone(),
        offramp,
        config.poll_interval,
        config.lookback_blocks,
    );

    tokio::spawn(async move {
        worker.run().await;
    });

    let state = AppState { ledger };
    let app = app(state);

    tracing::info!("Server running on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
