pub mod attestation;
pub mod health;
pub mod state;

use crate::confidential::BundleDecryptor;
use crate::config::Config;
use crate::ledger::LedgerBuilder;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ledger: Arc<LedgerBuilder>,
    pub decryptor: Arc<BundleDecryptor>,
}

impl AppState {
    pub fn new(config: Config, ledger: Arc<LedgerBuilder>, decryptor: Arc<BundleDecryptor>) -> Self {
        Self {
            config,
            ledger,
            decryptor,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/user/:address/state",
            get(state::get_user_state).post(state::post_user_state),
        )
        .route(
            "/claim-attestation",
            post(attestation::post_claim_attestation),
        )
        .layer(cors)
        .with_state(state)
}
