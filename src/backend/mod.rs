// src/backend/mod.rs

//! Client side of the pipeline backend.
//!
//! The engine talks to a [`Backend`] instead of raw HTTP so tests can swap in
//! an in-memory fake. [`HttpBackend`] is the production implementation.
//!
//! - [`protocol`] holds the JSON wire types.
//! - [`http`] implements the trait over `reqwest`.

pub mod http;
pub mod protocol;

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::steps::ModuleName;

pub use http::HttpBackend;
pub use protocol::{
    BackendConfig, MessageResponse, RunAck, RunRequest, StatusReport, StreamMessage,
};

/// Boxed future returned by [`Backend`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Operations the dashboard needs from the backend.
pub trait Backend: Send + Sync + 'static {
    /// `POST /run`: ask the backend to start (or resume) from `start_step`.
    ///
    /// A rejection is a normal answer, not an error.
    fn start_run<'a>(&'a self, start_step: &'a str) -> BackendFuture<'a, RunAck>;

    /// `GET /status`: cumulative log and status blobs.
    fn fetch_status(&self) -> BackendFuture<'_, StatusReport>;

    /// `GET /history`: modules completed by previous runs.
    fn fetch_history(&self) -> BackendFuture<'_, Vec<ModuleName>>;

    /// `POST /history`: forget completed modules.
    fn clear_history(&self) -> BackendFuture<'_, String>;

    /// `GET /config`.
    fn fetch_config(&self) -> BackendFuture<'_, BackendConfig>;

    /// `POST /config`.
    fn save_config<'a>(&'a self, config: &'a BackendConfig) -> BackendFuture<'a, String>;
}
