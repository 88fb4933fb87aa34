//! Outbound parameter updates forwarded to the session runtime.
//!
//! The session side speaks a fixed JSON shape:
//! `{"params":[{"name":<index>,"value":<number>},...]}`.  Parameter names
//! are numeric indexes so the payload stays cheap to parse on the far end;
//! the well-known ones live in [`ParamId`].
use num::FromPrimitive;
use serde_json::json;
use std::fmt;

/// Well known parameter indexes in the session's numeric namespace.
///
/// Body joints use a computed range starting at [`JOINT_PARAM_BASE`]
/// (two slots per joint, x then y).  HandX/HandY are the hand joint's
/// slots in that range.
#[derive(Debug, Clone, Copy, PartialEq, FromPrimitive, ToPrimitive)]
pub enum ParamId {
    Fps = 0,
    Bpm = 100,
    Beat = 101,
    Phase = 102,
    TrackerStatus = 130,
    HandX = 214,
    HandY = 215,
}

pub const JOINT_PARAM_BASE: i64 = 200;
/// Kinect body joint id for the tracked hand
pub const HAND_JOINT: i64 = 7;

pub fn joint_param_x(joint: i64) -> i64 {
    JOINT_PARAM_BASE + 2 * joint
}

pub fn joint_param_y(joint: i64) -> i64 {
    JOINT_PARAM_BASE + 2 * joint + 1
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamUpdate {
    pub name: i64,
    pub value: f64,
}

impl ParamUpdate {
    pub fn new(name: i64, value: f64) -> ParamUpdate {
        ParamUpdate { name, value }
    }

    /// the well-known id this update maps to, if any
    pub fn id(&self) -> Option<ParamId> {
        ParamId::from_i64(self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamPayload {
    params: Vec<ParamUpdate>,
}

impl ParamPayload {
    pub fn new() -> ParamPayload {
        ParamPayload { params: Vec::new() }
    }

    pub fn push(&mut self, name: i64, value: f64) -> () {
        self.params.push(ParamUpdate::new(name, value));
    }

    pub fn push_id(&mut self, id: ParamId, value: f64) -> () {
        self.push(id as i64, value);
    }

    pub fn params(&self) -> &[ParamUpdate] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn as_json(&self) -> serde_json::Value {
        let params: Vec<serde_json::Value> = self
            .params
            .iter()
            .map(|p| json!({ "name": p.name, "value": p.value }))
            .collect();
        json!({ "params": params })
    }

    /// wire text handed to the session sink
    pub fn to_text(&self) -> String {
        self.as_json().to_string()
    }
}

impl fmt::Display for ParamPayload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

#[cfg(test)]
mod test_param_message {
    use super::*;

    #[test]
    fn payload_shape() {
        // The session side depends on this exact shape
        let mut payload = ParamPayload::new();
        payload.push_id(ParamId::Bpm, 120.0);
        payload.push_id(ParamId::Beat, 2.0);
        payload.push_id(ParamId::Phase, 0.5);
        let text = payload.to_text();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["params"][0]["name"], 100);
        assert_eq!(parsed["params"][0]["value"], 120.0);
        assert_eq!(parsed["params"][2]["name"], 102);
        assert_eq!(parsed["params"][2]["value"], 0.5);
        assert_eq!(parsed["params"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn joint_params() {
        // hand joint lands on the HandX/HandY slots
        assert_eq!(joint_param_x(HAND_JOINT), ParamId::HandX as i64);
        assert_eq!(joint_param_y(HAND_JOINT), ParamId::HandY as i64);
        assert_eq!(joint_param_x(0), 200);
        assert_eq!(joint_param_y(3), 207);
    }

    #[test]
    fn well_known_ids_round_trip() {
        let update = ParamUpdate::new(100, 120.0);
        assert_eq!(update.id(), Some(ParamId::Bpm));
        let unknown = ParamUpdate::new(9999, 1.0);
        assert_eq!(unknown.id(), None);
    }

    #[test]
    fn empty_payload() {
        let payload = ParamPayload::new();
        assert!(payload.is_empty());
        assert_eq!(payload.to_text(), "{\"params\":[]}");
    }
}
