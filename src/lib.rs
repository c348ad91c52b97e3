//! pumpdeck: Telegram front-end for the BSC volume-boost backend.
//!
//! The core is the session orchestration layer: a per-user configuration
//! state machine ([`controller`]), an idempotent config-menu renderer
//! ([`view`]), lifecycle rules gating backend calls, and a background
//! watcher that announces job completion exactly once ([`watcher`]).
//! The chat platform and the job backend are collaborators behind the
//! [`transport::ChatTransport`] and [`backend::BackendGateway`] traits.

pub mod amounts;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod session;
pub mod telegram;
pub mod transport;
pub mod view;
pub mod watcher;

pub use error::{Error, Result};
