pub mod app_session;
pub mod auth_gate;
pub mod bootstrap;
pub mod chat_session;
pub mod persistence;
pub mod preferences_store;
pub mod task_store;
