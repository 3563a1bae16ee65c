// src/services/mod.rs
pub mod api_server;
pub mod credential_issuer;
pub mod cross_checker;
pub mod payload_builder;
pub mod qr_codec;
pub mod verifier;
