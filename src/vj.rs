//! components used to run the vj server unit
pub mod client;
