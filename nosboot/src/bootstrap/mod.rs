//! First-boot dialogue with the switch console.
//!
//! ## States
//!
//! ```text
//! WaitingLogin ──► BaseConfig ──► UserConfig ──► Saving ──► Detached ──► Ready
//!      │  ▲                                                    ▲
//!      │  └── Stalled (spin budget exhausted, VM power-cycled) │
//!      └────────────── install mode ───────────────────────────┘
//! ```
//!
//! `Bootstrapper::step` performs the work of exactly one state. The console
//! session is the only buffer; the machine itself keeps a spin counter and
//! phase timings.

mod control;
mod machine;
mod metrics;
mod sequence;
mod state;
mod user_config;

pub use control::ControlChannel;
pub use machine::{Bootstrapper, StepOutcome};
pub use metrics::{BootMetrics, BootReport, PhaseMetrics};
pub use sequence::{ConsoleLine, base_sequence, save_sequence, user_sequence};
pub use state::BootstrapState;
pub use user_config::load_user_config;
