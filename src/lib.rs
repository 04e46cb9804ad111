// Library exports for binaries and integration tests
pub mod api;
pub mod config;
pub mod gate;
pub mod i18n;
pub mod interface;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod poller;
pub mod progress;
pub mod resource;
pub mod retry;
pub mod session;
