//! The concrete control surface: which addresses this server listens on
//! and what each one does.
//!
//! Handlers decode with the validating accessors and drop anything that
//! does not line up, with a warning; a malformed packet must never take
//! the listener down mid-set.
use log::{debug, warn};
use std::sync::mpsc;

use crate::common::param_message::{joint_param_x, joint_param_y, ParamId, ParamPayload};
use crate::control::receiver::ControlReceiver;
use crate::control::state::ControlEvent;

pub struct SurfaceConfig {
    /// render surface size; normalized click coordinates get scaled by it
    pub render_width: f32,
    pub render_height: f32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        SurfaceConfig {
            render_width: 640.0,
            render_height: 480.0,
        }
    }
}

/// Register every address this server answers to.  Call before bind().
pub fn register_control_surface(
    receiver: &mut ControlReceiver,
    events: mpsc::Sender<ControlEvent>,
    cfg: SurfaceConfig,
) -> () {
    let tx = events.clone();
    receiver.register_handler("/mousemove/1", move |msg| {
        match (msg.int(0), msg.int(1)) {
            (Ok(x), Ok(y)) => {
                let _res = tx.send(ControlEvent::CursorMove { x, y });
            }
            (Err(e), _) | (_, Err(e)) => warn!("mousemove: {}", e),
        }
    });

    let tx = events.clone();
    let (width, height) = (cfg.render_width, cfg.render_height);
    receiver.register_handler("/mouseclick/1", move |msg| {
        match (msg.float(0), msg.float(1)) {
            (Ok(u), Ok(v)) => {
                let _res = tx.send(ControlEvent::CursorClick {
                    x: u * width,
                    y: v * height,
                });
            }
            (Err(e), _) | (_, Err(e)) => warn!("mouseclick: {}", e),
        }
    });

    let tx = events.clone();
    receiver.register_handler("/link/", move |msg| {
        match (msg.double(0), msg.double(1), msg.double(2)) {
            (Ok(bpm), Ok(beat), Ok(phase)) => {
                let mut payload = ParamPayload::new();
                payload.push_id(ParamId::Bpm, bpm);
                payload.push_id(ParamId::Beat, beat);
                payload.push_id(ParamId::Phase, phase);
                let _res = tx.send(ControlEvent::Forward(payload));
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => warn!("link: {}", e),
        }
    });

    let tx = events.clone();
    receiver.register_handler("/kV2/body/?", move |msg| {
        let joint = match msg.wildcards().first().map(|s| s.parse::<i64>()) {
            Some(Ok(j)) if j >= 0 => j,
            _ => {
                warn!("body joint address without a joint id: {}", msg.address());
                return;
            }
        };
        match (msg.float(0), msg.float(1)) {
            (Ok(x), Ok(y)) => {
                let mut payload = ParamPayload::new();
                payload.push(joint_param_x(joint), x as f64);
                payload.push(joint_param_y(joint), y as f64);
                let _res = tx.send(ControlEvent::Forward(payload));
            }
            (Err(e), _) | (_, Err(e)) => warn!("body joint: {}", e),
        }
    });

    let tx = events.clone();
    receiver.register_handler("/kv2status", move |msg| match msg.str_arg(0) {
        Ok(status) => {
            let _res = tx.send(ControlEvent::TrackerStatus(String::from(status)));
        }
        Err(e) => warn!("kv2status: {}", e),
    });

    // catch-all keeps an eye on what senders are trying to say that we
    // don't answer yet
    receiver.register_handler("/?/*", move |msg| {
        debug!("unhandled control message: {}", msg);
    });
}
