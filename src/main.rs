// src/main.rs

//! # Certificate Attestation Service - Main Entry Point
//!
//! Issues signed, QR-encoded attestations that a certificate was valid at a
//! point in time, and verifies scanned attestations against both the issuer
//! key and the live certificate ledger.
//!
//! ## Architecture Overview
//! 1. **Blockchain Layer**: certificate ledger (contract over JSON-RPC, or in-memory)
//! 2. **Services Layer**: payload building, signing, verification, QR codec, HTTP API
//! 3. **Storage Layer**: IPFS for certificate metadata documents
//! 4. **Wallet Layer**: issuer signing key
//!
//! Configuration is read from the environment (see [`config`]); an invalid
//! issuer key aborts startup.

use crate::blockchain::in_memory_ledger::InMemoryLedger;
use crate::blockchain::ledger_client::{CertificateLedger, ContractLedger};
use crate::config::Settings;
use crate::services::api_server::ApiServer;
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::cross_checker::CrossChecker;
use crate::services::verifier::Verifier;
use crate::storage::ipfs_client::IpfsStorage;
use anyhow::Context;
use dotenv::dotenv;
use env_logger::Env;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

// Module declarations (organized by functional domain)
mod blockchain; // certificate ledger access
mod config; // environment configuration
mod error; // error taxonomy
mod models; // payloads, wire records, verdicts
mod services; // business logic and API
mod storage; // IPFS storage layer
mod utils; // hashing, canonical JSON, time
mod wallet; // issuer key

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load `.env` and initialise logging
/// 2. Load and validate configuration (issuer key is mandatory)
/// 3. Connect the certificate ledger and metadata store
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = Settings::load().context("failed to load configuration")?;
    let issuer_key = Arc::new(settings.issuer_key()?);
    info!("attestation issuer {}", issuer_key.checksum_address());

    let ledger: Arc<dyn CertificateLedger> = match settings.contract_address()? {
        Some(address) => {
            let ledger = ContractLedger::connect(
                &settings.rpc_url,
                address,
                settings.minter_wallet()?,
                settings.ledger_timeout(),
            )
            .await
            .context("failed to connect to the certificate ledger")?;
            info!("certificate ledger {:?} via {}", address, settings.rpc_url);
            Arc::new(ledger)
        }
        None => {
            warn!("CERT_CONTRACT_ADDRESS not set; using an in-memory ledger");
            Arc::new(InMemoryLedger::new())
        }
    };

    let metadata_store = Arc::new(IpfsStorage::new(&settings.ipfs_url)?);

    let verifier = Verifier::new(issuer_key.address());
    let api_server = ApiServer::new(
        CredentialIssuer::new(issuer_key),
        CrossChecker::new(verifier, ledger.clone()),
        ledger,
        metadata_store,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!("Available endpoints:");
    info!("- POST /api/qr/generate");
    info!("- POST /api/qr/verify");
    info!("- GET  /api/verify/:token_id");
    info!("- POST /api/issue, /api/revoke, /api/upload");

    api_server.run(addr).await?;
    Ok(())
}
