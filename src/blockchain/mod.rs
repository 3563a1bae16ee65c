// src/blockchain/mod.rs
pub mod in_memory_ledger;
pub mod ledger_client;
