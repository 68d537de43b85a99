mod net;
mod process;

pub use net::connect_with_retry;
pub use process::terminate_process;
