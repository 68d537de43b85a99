//! Single device instance: VM lifecycle around the bootstrap loop.

mod attach;
mod controller;

pub use attach::{DeviceAttach, TcpAttach};
pub use controller::InstanceController;
