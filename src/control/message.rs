//! Decoded control messages.
//!
//! A ControlMessage is the immutable unit handed to a handler: the address
//! it arrived on, the ordered typed arguments, and whatever segments the
//! matching pattern's wildcards captured.  The typed accessors validate
//! arity and tags instead of indexing blindly; senders are sloppy about
//! int vs float tags, so the float accessors promote the narrower types.
use std::fmt;

use log::trace;
use rosc::{OscPacket, OscType};

use crate::control::error::DecodeError;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlArg {
    Int(i32),
    Float(f32),
    Double(f64),
    Str(String),
}

impl ControlArg {
    fn from_osc(arg: OscType) -> Option<ControlArg> {
        match arg {
            OscType::Int(v) => Some(ControlArg::Int(v)),
            OscType::Float(v) => Some(ControlArg::Float(v)),
            OscType::Double(v) => Some(ControlArg::Double(v)),
            OscType::String(v) => Some(ControlArg::Str(v)),
            other => {
                trace!("ignoring unsupported osc argument: {:?}", other);
                None
            }
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ControlArg::Int(_) => "int32",
            ControlArg::Float(_) => "float32",
            ControlArg::Double(_) => "float64",
            ControlArg::Str(_) => "string",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlMessage {
    address: String,
    args: Vec<ControlArg>,
    wildcards: Vec<String>,
}

impl ControlMessage {
    pub fn new(address: &str, args: Vec<ControlArg>) -> ControlMessage {
        ControlMessage {
            address: String::from(address),
            args,
            wildcards: Vec::new(),
        }
    }

    pub fn with_wildcards(address: &str, args: Vec<ControlArg>, wildcards: Vec<String>) -> ControlMessage {
        ControlMessage {
            address: String::from(address),
            args,
            wildcards,
        }
    }

    /// Flatten a decoded packet into its messages.  Bundles nest, so this
    /// recurses; ordering inside a bundle is preserved.
    pub fn from_packet(packet: OscPacket) -> Vec<ControlMessage> {
        match packet {
            OscPacket::Message(msg) => {
                let args = msg.args.into_iter().filter_map(ControlArg::from_osc).collect();
                vec![ControlMessage::new(&msg.addr, args)]
            }
            OscPacket::Bundle(bundle) => bundle
                .content
                .into_iter()
                .flat_map(ControlMessage::from_packet)
                .collect(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn args(&self) -> &[ControlArg] {
        &self.args
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// segments captured by the matching pattern's wildcards
    pub fn wildcards(&self) -> &[String] {
        &self.wildcards
    }

    fn arg(&self, index: usize, expected: &'static str) -> Result<&ControlArg, DecodeError> {
        self.args
            .get(index)
            .ok_or_else(|| DecodeError::new(&self.address, index, expected, "missing"))
    }

    pub fn int(&self, index: usize) -> Result<i32, DecodeError> {
        match self.arg(index, "int32")? {
            ControlArg::Int(v) => Ok(*v),
            other => Err(DecodeError::new(&self.address, index, "int32", other.type_name())),
        }
    }

    pub fn float(&self, index: usize) -> Result<f32, DecodeError> {
        match self.arg(index, "float32")? {
            ControlArg::Float(v) => Ok(*v),
            ControlArg::Int(v) => Ok(*v as f32),
            other => Err(DecodeError::new(&self.address, index, "float32", other.type_name())),
        }
    }

    pub fn double(&self, index: usize) -> Result<f64, DecodeError> {
        match self.arg(index, "float64")? {
            ControlArg::Double(v) => Ok(*v),
            ControlArg::Float(v) => Ok(*v as f64),
            ControlArg::Int(v) => Ok(*v as f64),
            other => Err(DecodeError::new(&self.address, index, "float64", other.type_name())),
        }
    }

    pub fn str_arg(&self, index: usize) -> Result<&str, DecodeError> {
        match self.arg(index, "string")? {
            ControlArg::Str(v) => Ok(v.as_str()),
            other => Err(DecodeError::new(&self.address, index, "string", other.type_name())),
        }
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{ addr: {}, args: {:?} }}", self.address, self.args)
    }
}
