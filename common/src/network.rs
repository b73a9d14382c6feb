//! Model of what the external scanner discovered on the network.

pub mod host;
pub mod port;
pub mod target;
