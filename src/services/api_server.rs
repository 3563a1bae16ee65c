// src/services/api_server.rs
//! API Server for certificate attestations
//!
//! REST interface over the attestation core. Handlers are thin call-throughs:
//! every decision about payloads, signatures and ledger status is made by the
//! services they delegate to.
//!
//! Endpoints:
//! - QR attestation generation and verification
//! - Live ledger status lookup
//! - Certificate minting and revocation
//! - Metadata document storage and retrieval via IPFS
//! - Health check

use crate::blockchain::ledger_client::{CertificateLedger, TxReceipt};
use crate::error::{CodecError, LedgerError};
use crate::models::attestation::{parse_token_id, AttestationPayload, Metadata};
use crate::models::qr_record::QrWireRecord;
use crate::models::verdict::{LedgerStatus, SignatureVerdict};
use crate::services::credential_issuer::{CredentialIssuer, IssueError, IssuedProof};
use crate::services::cross_checker::CrossChecker;
use crate::services::qr_codec::{decode, decode_value, scan_data_url};
use crate::storage::ipfs_client::MetadataStore;
use crate::utils::time::unix_now;
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use ethers::types::Address;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

const SERVICE_NAME: &str = "cert-backend";
const DEFAULT_NAME: &str = "Certificate";
const DEFAULT_INSTITUTION: &str = "University";

// API request and response structures

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateQrRequest {
    token_id: Option<Value>,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Serialize)]
struct GenerateQrResponse {
    ok: bool,
    #[serde(flatten)]
    proof: IssuedProof,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyQrRequest {
    qr_data: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyQrResponse {
    ok: bool,
    signature: SignatureVerdict,
    qr_valid: bool,
    /// `null` when the ledger could not be reached
    current_valid: Option<bool>,
    ledger: LedgerStatus,
    payload: Option<AttestationPayload>,
    timestamp: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenStatusResponse {
    ok: bool,
    token_id: u64,
    valid: bool,
    timestamp: u64,
}

#[derive(Deserialize)]
struct IssueRequest {
    to: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevokeRequest {
    token_id: Option<Value>,
}

#[derive(Serialize)]
struct ReceiptResponse {
    ok: bool,
    #[serde(flatten)]
    receipt: TxReceipt,
}

#[derive(Serialize)]
struct UploadResponse {
    ok: bool,
    cid: String,
    uri: String,
}

/// API server state containing all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    /// Builds, signs and renders attestations
    credential_issuer: Arc<CredentialIssuer>,

    /// Signature + ledger verification of scanned records
    cross_checker: Arc<CrossChecker>,

    /// Certificate ledger for status reads and mint/revoke
    ledger: Arc<dyn CertificateLedger>,

    /// Content-addressed metadata storage
    metadata_store: Arc<dyn MetadataStore>,
}

impl ApiServer {
    /// Creates a new instance of the API server
    pub fn new(
        credential_issuer: CredentialIssuer,
        cross_checker: CrossChecker,
        ledger: Arc<dyn CertificateLedger>,
        metadata_store: Arc<dyn MetadataStore>,
    ) -> Self {
        ApiServer {
            credential_issuer: Arc::new(credential_issuer),
            cross_checker: Arc::new(cross_checker),
            ledger,
            metadata_store,
        }
    }

    /// All API routes with permissive CORS headers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/qr/generate", post(Self::generate_qr_handler))
            .route("/api/qr/verify", post(Self::verify_qr_handler))
            .route("/api/verify/:token_id", get(Self::token_status_handler))
            .route("/api/issue", post(Self::issue_handler))
            .route("/api/revoke", post(Self::revoke_handler))
            .route("/api/upload", post(Self::upload_handler))
            .route("/api/metadata/:cid", get(Self::metadata_handler))
            .route("/api/health", get(Self::health_handler))
            .layer(CorsLayer::permissive())
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and serves until the listener fails
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", addr);
        axum::serve(listener, self.router()).await
    }

    // =====================
    // QR Attestations
    // =====================

    /// Generates a signed QR attestation for a token
    ///
    /// # Endpoint
    /// POST /api/qr/generate
    ///
    /// # Responses
    /// - 200 OK: QR image, wire record, signature, payload, message hash
    /// - 400 Bad Request: missing/invalid tokenId, reserved metadata key, or
    ///   metadata too large for a QR symbol
    /// - 502 Bad Gateway: ledger unreachable
    async fn generate_qr_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<GenerateQrRequest>, JsonRejection>,
    ) -> Response {
        let request = match json_body(body) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let token_id = match request.token_id.as_ref().map(parse_token_id) {
            Some(Ok(token_id)) => token_id,
            Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, e),
            None => return error_response(StatusCode::BAD_REQUEST, "tokenId is required"),
        };

        let mut metadata = request.metadata.unwrap_or_default();
        metadata
            .entry("name".to_string())
            .or_insert_with(|| json!(DEFAULT_NAME));
        metadata
            .entry("institution".to_string())
            .or_insert_with(|| json!(DEFAULT_INSTITUTION));

        let currently_valid = match state.ledger.is_valid(token_id).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!("ledger read for token {} failed: {}", token_id, e);
                return ledger_error_response(e);
            }
        };

        match state
            .credential_issuer
            .issue(token_id, currently_valid, metadata)
        {
            Ok(proof) => (StatusCode::OK, Json(GenerateQrResponse { ok: true, proof })).into_response(),
            Err(IssueError::Attestation(e)) => {
                warn!("rejected attestation request for token {}: {}", token_id, e);
                error_response(StatusCode::BAD_REQUEST, e)
            }
            Err(IssueError::Codec(e @ CodecError::TooLarge(_))) => {
                warn!("rejected attestation request for token {}: {}", token_id, e);
                error_response(StatusCode::BAD_REQUEST, e)
            }
            Err(IssueError::Codec(e)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
        }
    }

    /// Verifies a scanned QR attestation
    ///
    /// # Endpoint
    /// POST /api/qr/verify
    ///
    /// # Request Body
    /// `qrData`: the wire record as an object, its JSON text, or the
    /// rendered `data:image/png;base64,` image
    ///
    /// # Responses
    /// - 200 OK: signature verdict and live ledger status, side by side
    /// - 400 Bad Request: malformed QR data
    async fn verify_qr_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<VerifyQrRequest>, JsonRejection>,
    ) -> Response {
        let request = match json_body(body) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let record = match request.qr_data.map(parse_qr_data) {
            Some(Ok(record)) => record,
            Some(Err(e)) => {
                warn!("rejected QR data: {}", e);
                return error_response(StatusCode::BAD_REQUEST, e);
            }
            None => return error_response(StatusCode::BAD_REQUEST, "qrData is required"),
        };

        let verdict = state.cross_checker.check(&record).await;
        (
            StatusCode::OK,
            Json(VerifyQrResponse {
                ok: true,
                qr_valid: verdict.signature_valid(),
                current_valid: verdict.ledger_valid_now(),
                signature: verdict.signature,
                ledger: verdict.ledger,
                payload: verdict.payload,
                timestamp: verdict.checked_at,
            }),
        )
            .into_response()
    }

    // =====================
    // Ledger
    // =====================

    /// Live ledger status of a token
    ///
    /// # Endpoint
    /// GET /api/verify/:token_id
    async fn token_status_handler(
        State(state): State<Arc<ApiServer>>,
        Path(token_id): Path<String>,
    ) -> Response {
        let token_id = match parse_token_id(&Value::String(token_id)) {
            Ok(token_id) => token_id,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        };

        match state.ledger.is_valid(token_id).await {
            Ok(valid) => (
                StatusCode::OK,
                Json(TokenStatusResponse {
                    ok: true,
                    token_id,
                    valid,
                    timestamp: unix_now(),
                }),
            )
                .into_response(),
            Err(e) => {
                warn!("ledger read for token {} failed: {}", token_id, e);
                ledger_error_response(e)
            }
        }
    }

    /// Mints a certificate to the given address
    ///
    /// # Endpoint
    /// POST /api/issue
    ///
    /// # Responses
    /// - 200 OK: transaction hash and block number
    /// - 400 Bad Request: missing or invalid `to`
    /// - 503 Service Unavailable: no minter wallet configured
    async fn issue_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<IssueRequest>, JsonRejection>,
    ) -> Response {
        let request = match json_body(body) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let recipient = match request.to.as_deref().map(Address::from_str) {
            Some(Ok(recipient)) => recipient,
            Some(Err(e)) => {
                return error_response(StatusCode::BAD_REQUEST, format!("invalid recipient: {}", e))
            }
            None => return error_response(StatusCode::BAD_REQUEST, "Missing required field: to"),
        };

        match state.ledger.mint_certificate(recipient).await {
            Ok(receipt) => receipt_response(receipt),
            Err(e) => {
                warn!("mint to {:?} failed: {}", recipient, e);
                ledger_error_response(e)
            }
        }
    }

    /// Revokes a certificate
    ///
    /// # Endpoint
    /// POST /api/revoke
    ///
    /// # Responses
    /// - 200 OK: transaction hash and block number
    /// - 400 Bad Request: missing or invalid tokenId
    /// - 422 Unprocessable Entity: the ledger refused (unknown or already revoked)
    async fn revoke_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<RevokeRequest>, JsonRejection>,
    ) -> Response {
        let request = match json_body(body) {
            Ok(request) => request,
            Err(response) => return response,
        };
        let token_id = match request.token_id.as_ref().map(parse_token_id) {
            Some(Ok(token_id)) => token_id,
            Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, e),
            None => return error_response(StatusCode::BAD_REQUEST, "tokenId is required"),
        };

        match state.ledger.revoke_certificate(token_id).await {
            Ok(receipt) => receipt_response(receipt),
            Err(e) => {
                warn!("revoke of token {} failed: {}", token_id, e);
                ledger_error_response(e)
            }
        }
    }

    // =====================
    // Metadata Storage
    // =====================

    /// Stores an arbitrary JSON document on IPFS
    ///
    /// # Endpoint
    /// POST /api/upload
    async fn upload_handler(
        State(state): State<Arc<ApiServer>>,
        body: Result<Json<Value>, JsonRejection>,
    ) -> Response {
        let document = match json_body(body) {
            Ok(document) => document,
            Err(response) => return response,
        };
        match state.metadata_store.store_json(&document).await {
            Ok(cid) => (
                StatusCode::OK,
                Json(UploadResponse {
                    ok: true,
                    uri: format!("ipfs://{}", cid),
                    cid,
                }),
            )
                .into_response(),
            Err(e) => {
                warn!("metadata upload failed: {}", e);
                error_response(StatusCode::BAD_GATEWAY, e)
            }
        }
    }

    /// Retrieves a stored JSON document
    ///
    /// # Endpoint
    /// GET /api/metadata/:cid
    async fn metadata_handler(
        State(state): State<Arc<ApiServer>>,
        Path(cid): Path<String>,
    ) -> Response {
        match state.metadata_store.retrieve_json(&cid).await {
            Ok(document) => {
                (StatusCode::OK, Json(json!({ "ok": true, "cid": cid, "document": document }))).into_response()
            }
            Err(e) => {
                warn!("metadata retrieval of {} failed: {}", cid, e);
                error_response(StatusCode::BAD_GATEWAY, e)
            }
        }
    }

    /// GET /api/health
    async fn health_handler(State(state): State<Arc<ApiServer>>) -> impl IntoResponse {
        Json(json!({
            "ok": true,
            "service": SERVICE_NAME,
            "issuer": state.credential_issuer.issuer(),
            "timestamp": chrono::Utc::now().timestamp_millis(),
        }))
    }
}

/// Accepts the wire record as an object, as JSON text, or as a rendered image.
fn parse_qr_data(qr_data: Value) -> Result<QrWireRecord, CodecError> {
    match qr_data {
        Value::String(text) if text.starts_with("data:") => decode(&scan_data_url(&text)?),
        Value::String(text) => decode(&text),
        other => decode_value(other),
    }
}

/// Unwraps a JSON body, answering malformed or mistyped input in the
/// `{ok: false, error}` envelope instead of axum's plain-text rejection.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(value)| value).map_err(|rejection| {
        warn!("rejected request body: {}", rejection.body_text());
        error_response(StatusCode::BAD_REQUEST, rejection.body_text())
    })
}

fn ledger_error_status(error: &LedgerError) -> StatusCode {
    match error {
        LedgerError::ReadOnly => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn ledger_error_response(error: LedgerError) -> Response {
    error_response(ledger_error_status(&error), error)
}

fn receipt_response(receipt: TxReceipt) -> Response {
    (StatusCode::OK, Json(ReceiptResponse { ok: true, receipt })).into_response()
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(json!({ "ok": false, "error": message.to_string() }))).into_response()
}
