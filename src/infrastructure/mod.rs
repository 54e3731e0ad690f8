pub mod auth_client;
pub mod auth_gateway;
pub mod chat_client;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod kv_store;
pub mod logging;
pub mod storage;
