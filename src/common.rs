//! Plumbing shared between the control listener, the particle engine and the
//! top level vj client.
pub mod box_error;
pub mod config;
pub mod param_message;
pub mod session;
pub mod sock_with_tos;
pub mod stream_time_stat;
