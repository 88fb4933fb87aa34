//! vjserver - live visual performance server library
//!
//! provides the pieces to run a VJ server unit: an OSC control-channel
//! listener that routes network control messages (cursor, tempo, body
//! tracking) into typed parameter updates forwarded to the session runtime,
//! and a transform-feedback particle engine that advances a fixed particle
//! population once per frame over ping-pong GPU buffers.
#[macro_use]
extern crate num_derive;

pub mod common;
pub mod control;
pub mod particles;
pub mod utils;
pub mod vj;
