//! Core library for sidedoor.
//!
//! Sidedoor opens temporary SSH access into an ephemeral CI runner by
//! provisioning an frp reverse-tunnel client and keeping the job alive for a
//! bounded duration. This crate holds the session controller and the thin
//! collaborator interfaces it drives: the binary provisioner, the credential
//! source, the remote-login activator, and the log tail.

pub mod cmd;
pub mod config;
pub mod inputs;
pub mod keys;
pub mod launcher;
pub mod logtail;
pub mod outputs;
pub mod provision;
pub mod remote_login;
pub mod session;
pub mod tracing_init;
