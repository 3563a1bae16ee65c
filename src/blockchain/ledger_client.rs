// src/blockchain/ledger_client.rs
//! Certificate ledger client.
//!
//! The ledger is the authority on whether a certificate is valid *now*.
//! Attestation verification only ever reads it; the mint/revoke calls exist
//! for the surrounding issuance endpoints.
//!
//! Every call is bounded by a timeout. A slow or unreachable node surfaces
//! as a `LedgerError`, which callers must keep distinct from "invalid".

use crate::error::LedgerError;
use async_trait::async_trait;
use ethers::abi::parse_abi;
use ethers::contract::{BaseContract, Contract};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use log::{info, warn};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Human-readable ABI of the certificate contract functions used here.
const CERTIFICATE_ABI: &[&str] = &[
    "function mintCertificate(address recipient) returns (uint256)",
    "function revokeCertificate(uint256 tokenId)",
    "function isValid(uint256 tokenId) view returns (bool)",
];

/// Outcome of a ledger mutation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// Read access to certificate validity, plus the mutations issuance needs.
#[async_trait]
pub trait CertificateLedger: Send + Sync {
    /// Current validity of `token_id`.
    async fn is_valid(&self, token_id: u64) -> Result<bool, LedgerError>;

    /// Mints a new certificate to `recipient`.
    async fn mint_certificate(&self, recipient: Address) -> Result<TxReceipt, LedgerError>;

    /// Marks `token_id` as revoked.
    async fn revoke_certificate(&self, token_id: u64) -> Result<TxReceipt, LedgerError>;
}

type MinterClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Ledger backed by the certificate contract over JSON-RPC.
pub struct ContractLedger {
    /// Read-only RPC provider
    provider: Arc<Provider<Http>>,
    /// Certificate contract address
    contract_address: Address,
    abi: BaseContract,
    /// Signing client for mint/revoke; `None` keeps the ledger read-only
    minter: Option<Arc<MinterClient>>,
    /// Upper bound for every RPC round trip
    timeout: Duration,
}

impl ContractLedger {
    /// Connects to the certificate contract.
    ///
    /// Without a minter wallet no network call is made here. With one, the
    /// chain id is fetched so transactions are replay-protected.
    ///
    /// # Errors
    /// - `InvalidEndpoint` if `rpc_url` cannot be parsed
    /// - `Rpc`/`Timeout` if the chain id lookup fails
    pub async fn connect(
        rpc_url: &str,
        contract_address: Address,
        minter: Option<LocalWallet>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let provider = Arc::new(
            Provider::<Http>::try_from(rpc_url)
                .map_err(|e| LedgerError::InvalidEndpoint(e.to_string()))?,
        );
        let abi = BaseContract::from(parse_abi(CERTIFICATE_ABI).map_err(|e| LedgerError::Abi(e.to_string()))?);

        let minter = match minter {
            Some(wallet) => {
                let chain_id = bounded(timeout, provider.get_chainid()).await?.as_u64();
                info!("ledger minter {:?} on chain {}", wallet.address(), chain_id);
                Some(Arc::new(SignerMiddleware::new(
                    (*provider).clone(),
                    wallet.with_chain_id(chain_id),
                )))
            }
            None => None,
        };

        Ok(Self {
            provider,
            contract_address,
            abi,
            minter,
            timeout,
        })
    }

    fn reader(&self) -> Contract<Provider<Http>> {
        Contract::new(self.contract_address, self.abi.clone(), self.provider.clone())
    }

    fn writer(&self) -> Result<Contract<MinterClient>, LedgerError> {
        let minter = self.minter.clone().ok_or(LedgerError::ReadOnly)?;
        Ok(Contract::new(self.contract_address, self.abi.clone(), minter))
    }

    async fn send<T>(&self, method: &str, args: T) -> Result<TxReceipt, LedgerError>
    where
        T: ethers::abi::Tokenize,
    {
        let contract = self.writer()?;
        let call = contract
            .method::<_, ()>(method, args)
            .map_err(|e| LedgerError::Abi(e.to_string()))?;
        let pending = bounded(self.timeout, call.send()).await?;
        let tx_hash = pending.tx_hash();
        let receipt = bounded(self.timeout, pending)
            .await?
            .ok_or(LedgerError::MissingReceipt)?;

        Ok(TxReceipt {
            tx_hash: format!("0x{:x}", tx_hash),
            block_number: receipt.block_number.map(|n| n.as_u64()),
        })
    }
}

#[async_trait]
impl CertificateLedger for ContractLedger {
    async fn is_valid(&self, token_id: u64) -> Result<bool, LedgerError> {
        let contract = self.reader();
        let call = contract
            .method::<_, bool>("isValid", U256::from(token_id))
            .map_err(|e| LedgerError::Abi(e.to_string()))?;
        bounded(self.timeout, call.call()).await.map_err(|e| {
            warn!("isValid({}) failed: {}", token_id, e);
            e
        })
    }

    async fn mint_certificate(&self, recipient: Address) -> Result<TxReceipt, LedgerError> {
        let receipt = self.send("mintCertificate", recipient).await?;
        info!("minted certificate for {:?} in {}", recipient, receipt.tx_hash);
        Ok(receipt)
    }

    async fn revoke_certificate(&self, token_id: u64) -> Result<TxReceipt, LedgerError> {
        let receipt = self.send("revokeCertificate", U256::from(token_id)).await?;
        info!("revoked certificate {} in {}", token_id, receipt.tx_hash);
        Ok(receipt)
    }
}

/// Runs `call` under `limit`, folding both failure modes into `LedgerError`.
async fn bounded<F, T, E>(limit: Duration, call: F) -> Result<T, LedgerError>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(LedgerError::Rpc(e.to_string())),
        Err(_) => Err(LedgerError::Timeout(limit)),
    }
}
