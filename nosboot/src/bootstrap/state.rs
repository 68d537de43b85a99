use serde::{Deserialize, Serialize};
use std::fmt;

/// Bootstrap progress of one device instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapState {
    /// Polling the console for the login banner.
    #[default]
    WaitingLogin,
    /// Writing the fixed base configuration, then ejecting the boot media.
    BaseConfig,
    /// Writing the user startup configuration, if any.
    UserConfig,
    /// Persisting the running configuration.
    Saving,
    /// Hanging up console and monitor.
    Detached,
    /// Terminal.
    Ready,
}

impl BootstrapState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapState::WaitingLogin => "waiting_login",
            BootstrapState::BaseConfig => "base_config",
            BootstrapState::UserConfig => "user_config",
            BootstrapState::Saving => "saving",
            BootstrapState::Detached => "detached",
            BootstrapState::Ready => "ready",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, BootstrapState::Ready)
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_display() {
        for state in [
            BootstrapState::WaitingLogin,
            BootstrapState::BaseConfig,
            BootstrapState::UserConfig,
            BootstrapState::Saving,
            BootstrapState::Detached,
            BootstrapState::Ready,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
    }

    #[test]
    fn test_only_ready_is_ready() {
        assert!(BootstrapState::Ready.is_ready());
        assert!(!BootstrapState::Detached.is_ready());
        assert_eq!(BootstrapState::default(), BootstrapState::WaitingLogin);
    }
}
