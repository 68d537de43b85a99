//! Launch-wide configuration: options, constants and filesystem layout.

pub mod constants;
pub mod layout;
pub mod options;

pub use layout::StagingLayout;
pub use options::{DeviceOptions, LaunchMode, LaunchOptions};
