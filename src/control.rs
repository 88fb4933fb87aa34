//! OSC control-channel listener.
//!
//! A [`receiver::ControlReceiver`] binds one local endpoint (UDP datagrams
//! or length-framed TCP), decodes incoming OSC packets and routes each
//! message to exactly one registered handler by address-pattern match.
//! Handlers push [`state::ControlEvent`]s onto an mpsc channel; the frame
//! loop drains them once per tick, so no control state is ever shared
//! mutably across threads.
pub mod address;
pub mod error;
pub mod message;
pub mod receiver;
pub mod state;
pub mod surface;
