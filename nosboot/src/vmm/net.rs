//! Datapath wiring: management NIC plus data-plane NICs.

use crate::runtime::constants::{mgmt, ports};
use nosboot_shared::NosbootError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Host ports forwarded to the management address: (protocol, host, guest).
const MGMT_FORWARDS: &[(&str, u16, u16)] = &[
    ("tcp", 2022, 22),
    ("udp", 2161, 161),
    ("tcp", 2830, 830),
    ("tcp", 2080, 80),
    ("tcp", 2443, 443),
];

/// How data-plane NICs are connected to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// QEMU socket backends listening on `DATAPLANE_BASE + i`, stitched by vr-xcon.
    #[default]
    Vrxcon,
    /// Tap interfaces bridged with tc mirred rules by the ifup script.
    Tc,
}

impl std::str::FromStr for ConnectionMode {
    type Err = NosbootError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vrxcon" => Ok(ConnectionMode::Vrxcon),
            "tc" => Ok(ConnectionMode::Tc),
            other => Err(NosbootError::Config(format!(
                "unknown connection mode {:?} (expected vrxcon or tc)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionMode::Vrxcon => write!(f, "vrxcon"),
            ConnectionMode::Tc => write!(f, "tc"),
        }
    }
}

/// Locally administered MAC with the NIC index in the last octet.
pub fn mac_address(index: usize) -> String {
    let mut rng = rand::rng();
    format!(
        "52:54:00:{:02x}:{:02x}:{:02x}",
        rng.random::<u8>(),
        rng.random::<u8>(),
        index as u8
    )
}

/// QEMU arguments for the management NIC (user-mode network with forwards).
pub fn mgmt_nic_args(nic_model: &str, tftp_dir: &Path) -> Vec<String> {
    let mut netdev = format!(
        "user,id=p00,net={},tftp={}",
        mgmt::NETWORK,
        tftp_dir.display()
    );
    for (proto, host, guest) in MGMT_FORWARDS {
        netdev.push_str(&format!(
            ",hostfwd={}::{}-{}:{}",
            proto,
            host,
            mgmt::DEVICE_ADDRESS,
            guest
        ));
    }

    vec![
        "-device".to_string(),
        format!("{},netdev=p00,mac={}", nic_model, mac_address(0)),
        "-netdev".to_string(),
        netdev,
    ]
}

/// QEMU arguments for data-plane NIC `index` (1-based).
pub fn data_nic_args(mode: ConnectionMode, nic_model: &str, index: usize) -> Vec<String> {
    let id = format!("p{:02}", index);
    let netdev = match mode {
        ConnectionMode::Vrxcon => format!(
            "socket,id={},listen=:{}",
            id,
            ports::DATAPLANE_BASE as usize + index
        ),
        ConnectionMode::Tc => format!(
            "tap,id={},ifname=tap{},script=/etc/tc-tap-ifup,downscript=no",
            id, index
        ),
    };

    vec![
        "-device".to_string(),
        format!("{},netdev={},mac={}", nic_model, id, mac_address(index)),
        "-netdev".to_string(),
        netdev,
    ]
}
