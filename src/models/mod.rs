// src/models/mod.rs
pub mod attestation;
pub mod qr_record;
pub mod verdict;
