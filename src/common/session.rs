//! Outbound seam to the session runtime.
//!
//! The actual session object (the thing that owns the WebSocket to the U/X
//! and the uniform store) lives outside this crate.  All it needs from us
//! is a fire-and-forget `send(text)`, so that is the whole trait.  The
//! channel implementation is what the vj client wires up; tests use it to
//! observe exactly what would have gone out.
use std::sync::mpsc;

use crate::common::box_error::BoxError;

pub trait SessionSink: Send {
    fn send(&self, text: &str) -> Result<(), BoxError>;
}

/// Session sink backed by an mpsc channel.  Whoever owns the receiving end
/// relays the text on to the real session runtime.
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    pub fn new() -> (ChannelSink, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel();
        (ChannelSink { tx }, rx)
    }
}

impl SessionSink for ChannelSink {
    fn send(&self, text: &str) -> Result<(), BoxError> {
        self.tx
            .send(String::from(text))
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod test_session {
    use super::*;

    #[test]
    fn sends_text_through() {
        let (sink, rx) = ChannelSink::new();
        sink.send("{\"params\":[]}").unwrap();
        assert_eq!(rx.recv().unwrap(), "{\"params\":[]}");
    }

    #[test]
    fn send_fails_when_receiver_gone() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        assert!(sink.send("anything").is_err());
    }
}
