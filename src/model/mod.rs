//! Model module
//!
//! A single fixed CNN architecture; see [`cnn::Net`].

pub mod cnn;

pub use cnn::{Net, NetConfig, NetRecord, ParamShape};
