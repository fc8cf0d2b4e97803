pub mod auth;
pub mod catalog;
pub mod code_generation;
pub mod firebase_auth;
pub mod generation_api;
pub mod history_store;
pub mod prompt;
pub mod subscription;
