//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound ports against real infrastructure.

mod http_transport;
mod kv_store;
mod rpc_wallet;

pub use http_transport::ReqwestTransport;
pub use kv_store::{InMemoryKeyValueStore, JsonFileKeyValueStore};
pub use rpc_wallet::{map_rpc_error, JsonRpcWalletSigner};
