//! Per-instance identity: serial number and virtual hardware topology.
//!
//! The device reads both from the boot media on first boot. Two instances
//! sharing a serial number collide on the management plane, so the serial is
//! drawn fresh for every launch.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Serial number alphabet.
pub const SERIAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of random symbols in a serial.
pub const SERIAL_RANDOM_LEN: usize = 10;

/// Fixed leading character of every serial.
pub const SERIAL_PREFIX: char = '9';

/// One front-panel port as seen by the simulated ASIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    /// Logical port number (1-based).
    pub lpn: u16,
    pub asic_id: u8,
    pub asic_ifg: u8,
    pub asic_slice: u8,
}

/// Hardware topology descriptor of one device model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Virtual board id selecting the simulated ASIC.
    pub board_id: u32,
    /// Port count announced to the device. Must precede the port records.
    pub port_count: u16,
    pub ports: Vec<PortRecord>,
}

impl Topology {
    /// Virtual Catalyst 9000 on the S1 ASIC simulation.
    ///
    /// The announced port count and the number of port records differ on
    /// purpose; this is the layout the image ships with.
    pub fn cat9kv_s1() -> Self {
        let ports = (1..=16)
            .map(|lpn| PortRecord {
                lpn,
                asic_id: 0,
                asic_ifg: 0,
                asic_slice: 0,
            })
            .collect();

        Self {
            board_id: 20612,
            port_count: 8,
            ports,
        }
    }
}

/// Serial number plus topology, immutable once rendered into boot media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub serial: String,
    pub topology: Topology,
}

/// Generate a fresh identity for the virtual Cat9k.
pub fn generate_identity() -> Identity {
    Identity {
        serial: generate_serial(),
        topology: Topology::cat9kv_s1(),
    }
}

/// Draw a new serial number: prefix followed by uniform alphabet symbols.
pub fn generate_serial() -> String {
    let mut rng = rand::rng();
    let mut serial = String::with_capacity(SERIAL_RANDOM_LEN + 1);
    serial.push(SERIAL_PREFIX);
    for _ in 0..SERIAL_RANDOM_LEN {
        let idx = rng.random_range(0..SERIAL_ALPHABET.len());
        serial.push(SERIAL_ALPHABET[idx] as char);
    }
    serial
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_serial_shape() {
        for _ in 0..200 {
            let serial = generate_serial();
            assert_eq!(serial.len(), SERIAL_RANDOM_LEN + 1);
            assert!(serial.starts_with(SERIAL_PREFIX));
            assert!(serial[1..].bytes().all(|b| SERIAL_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_serials_do_not_collide() {
        // 36^10 outcomes: a collision among 5000 draws has probability ~1e-8.
        let serials: HashSet<String> = (0..5000).map(|_| generate_serial()).collect();
        assert_eq!(serials.len(), 5000);
    }

    #[test]
    fn test_topology_is_fixed() {
        let a = generate_identity();
        let b = generate_identity();
        assert_eq!(a.topology, b.topology);
        assert_ne!(a.serial, b.serial);

        let topology = Topology::cat9kv_s1();
        assert_eq!(topology.board_id, 20612);
        assert_eq!(topology.port_count, 8);
        assert_eq!(topology.ports.len(), 16);
        let lpns: Vec<u16> = topology.ports.iter().map(|p| p.lpn).collect();
        assert_eq!(lpns, (1..=16).collect::<Vec<_>>());
    }
}
