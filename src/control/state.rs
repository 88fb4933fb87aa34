//! Control events and the frame-local state they drain into.
//!
//! Handlers run on the listener threads, so they never touch shared
//! fields directly; they push a ControlEvent and the frame loop drains
//! the queue once per tick.  Single producer side per handler, single
//! consumer, no locks.
use log::{trace, warn};
use num::FromPrimitive;
use std::fmt;
use std::sync::mpsc;

use crate::common::param_message::{ParamId, ParamPayload};
use crate::common::session::SessionSink;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// raw cursor position in pixels
    CursorMove { x: i32, y: i32 },
    /// click position already scaled to the render surface
    CursorClick { x: f32, y: f32 },
    /// parameter updates bound for the session runtime
    Forward(ParamPayload),
    /// body tracker came up / went down
    TrackerStatus(String),
}

/// What the frame loop knows about the outside world.  Updated only by
/// drain_events on the frame thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub cursor: (i32, i32),
    pub click: (f32, f32),
    pub tracker_status: String,
}

impl ControlState {
    pub fn new() -> ControlState {
        ControlState {
            cursor: (0, 0),
            click: (0.0, 0.0),
            tracker_status: String::new(),
        }
    }

    pub fn apply(&mut self, event: &ControlEvent) -> () {
        match event {
            ControlEvent::CursorMove { x, y } => {
                self.cursor = (*x, *y);
            }
            ControlEvent::CursorClick { x, y } => {
                self.click = (*x, *y);
            }
            ControlEvent::TrackerStatus(status) => {
                self.tracker_status = status.clone();
            }
            ControlEvent::Forward(_) => {
                // forwarded payloads bypass local state
            }
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        ControlState::new()
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{ cursor: ({}, {}), click: ({}, {}), tracker: {} }}",
            self.cursor.0, self.cursor.1, self.click.0, self.click.1, self.tracker_status
        )
    }
}

/// Drain everything queued since the last tick.  Forward events go out
/// through the session sink, the rest update frame-local state.  Returns
/// how many events were handled.
pub fn drain_events(
    rx: &mpsc::Receiver<ControlEvent>,
    state: &mut ControlState,
    sink: &dyn SessionSink,
) -> usize {
    let mut handled = 0;
    loop {
        match rx.try_recv() {
            Ok(ControlEvent::Forward(payload)) => {
                for p in payload.params() {
                    trace!("forward {:?} = {}", ParamId::from_i64(p.name), p.value);
                }
                if let Err(e) = sink.send(&payload.to_text()) {
                    warn!("session sink: {}", e);
                }
                handled += 1;
            }
            Ok(event) => {
                state.apply(&event);
                handled += 1;
            }
            Err(mpsc::TryRecvError::Empty) => break,
            Err(mpsc::TryRecvError::Disconnected) => {
                warn!("control: disconnected channel");
                break;
            }
        }
    }
    handled
}

#[cfg(test)]
mod test_state {
    use super::*;
    use crate::common::session::ChannelSink;

    #[test]
    fn cursor_move_updates_state() {
        let mut state = ControlState::new();
        state.apply(&ControlEvent::CursorMove { x: 150, y: 200 });
        assert_eq!(state.cursor, (150, 200));
    }

    #[test]
    fn drain_routes_forwards_to_sink() {
        let (tx, rx) = mpsc::channel();
        let (sink, sink_rx) = ChannelSink::new();
        let mut state = ControlState::new();

        tx.send(ControlEvent::CursorMove { x: 10, y: 20 }).unwrap();
        let mut payload = ParamPayload::new();
        payload.push_id(ParamId::Bpm, 120.0);
        tx.send(ControlEvent::Forward(payload)).unwrap();
        tx.send(ControlEvent::TrackerStatus(String::from("Tracking")))
            .unwrap();

        let handled = drain_events(&rx, &mut state, &sink);
        assert_eq!(handled, 3);
        assert_eq!(state.cursor, (10, 20));
        assert_eq!(state.tracker_status, "Tracking");
        let text = sink_rx.try_recv().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["params"][0]["name"], 100);
        assert_eq!(parsed["params"][0]["value"], 120.0);
    }

    #[test]
    fn drain_on_empty_queue_is_a_noop() {
        let (_tx, rx) = mpsc::channel::<ControlEvent>();
        let (sink, _sink_rx) = ChannelSink::new();
        let mut state = ControlState::new();
        assert_eq!(drain_events(&rx, &mut state, &sink), 0);
        assert_eq!(state, ControlState::new());
    }
}
