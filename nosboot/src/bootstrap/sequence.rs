//! Console line sequences written during bootstrap.

use std::borrow::Cow;

use crate::runtime::DeviceOptions;
use crate::runtime::constants::{console, filenames, mgmt};

/// One line written to the console, optionally after a prompt.
///
/// The text is raw bytes so user configuration reaches the device untouched,
/// whatever its encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub text: Vec<u8>,
    /// Prompt to wait for before writing. `None` writes immediately.
    pub wait_for: Option<&'static str>,
}

impl ConsoleLine {
    /// Line written once the privileged prompt shows up.
    pub fn at_prompt(text: impl Into<Vec<u8>>) -> Self {
        Self::after(text, console::PRIVILEGED_PROMPT)
    }

    pub fn after(text: impl Into<Vec<u8>>, prompt: &'static str) -> Self {
        Self {
            text: text.into(),
            wait_for: Some(prompt),
        }
    }

    pub fn immediate(text: impl Into<Vec<u8>>) -> Self {
        Self {
            text: text.into(),
            wait_for: None,
        }
    }

    /// Text for log output; invalid UTF-8 is replaced.
    pub fn display(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }
}

/// Fixed configuration applied on every first boot.
///
/// Ends with removing the first-boot script from bootflash so a reload does
/// not re-run it.
pub fn base_sequence(device: &DeviceOptions) -> Vec<ConsoleLine> {
    const MAC_ALGORITHMS: &str = "hmac-sha2-256-etm hmac-sha2-512-etm hmac-sha2-256 hmac-sha2-512";

    vec![
        ConsoleLine::immediate(""),
        ConsoleLine::after("enable", console::USER_PROMPT),
        ConsoleLine::after("configure terminal", console::USER_PROMPT),
        ConsoleLine::at_prompt(format!("hostname {}", device.hostname)),
        ConsoleLine::at_prompt(format!(
            "username {} privilege 15 password {}",
            device.username, device.password
        )),
        ConsoleLine::at_prompt("ip domain name vrf Mgmt-vrf lab.local"),
        ConsoleLine::at_prompt("ip domain lookup source-interface GigabitEthernet 0/0"),
        ConsoleLine::at_prompt(format!("ip name-server vrf Mgmt-vrf {}", mgmt::NAME_SERVER)),
        ConsoleLine::at_prompt("crypto key generate rsa modulus 4096"),
        ConsoleLine::at_prompt(format!("ip ssh server algorithm mac {}", MAC_ALGORITHMS)),
        ConsoleLine::at_prompt(format!("ip ssh client algorithm mac {}", MAC_ALGORITHMS)),
        ConsoleLine::at_prompt("ip scp server enable"),
        ConsoleLine::at_prompt("ip ssh source-interface gigabitEthernet 0/0"),
        ConsoleLine::at_prompt("cdp run"),
        ConsoleLine::at_prompt("lldp run"),
        ConsoleLine::at_prompt("interface GigabitEthernet0/0"),
        ConsoleLine::at_prompt(format!(
            "ip address {} {}",
            mgmt::DEVICE_ADDRESS,
            mgmt::NETMASK
        )),
        ConsoleLine::at_prompt("no shut"),
        ConsoleLine::at_prompt("exit"),
        ConsoleLine::at_prompt(format!(
            "ip route vrf Mgmt-vrf 0.0.0.0 0.0.0.0 {}",
            mgmt::GATEWAY
        )),
        ConsoleLine::at_prompt("restconf"),
        ConsoleLine::at_prompt("netconf-yang"),
        ConsoleLine::at_prompt("snmp-server community C1sco12345 RW"),
        ConsoleLine::at_prompt("line vty 0 15"),
        ConsoleLine::at_prompt("login local"),
        ConsoleLine::at_prompt("transport input ssh"),
        ConsoleLine::at_prompt("end"),
        ConsoleLine::at_prompt(format!("delete bootflash:{}", filenames::FIRST_BOOT_SCRIPT)),
        ConsoleLine::after("\r\r", console::FILENAME_CONFIRM),
        ConsoleLine::after("\r\r", console::CONFIRM),
    ]
}

/// User configuration wrapped in a configuration-mode block.
pub fn user_sequence(lines: &[Vec<u8>]) -> Vec<ConsoleLine> {
    let mut sequence = Vec::with_capacity(lines.len() + 2);
    sequence.push(ConsoleLine::at_prompt("configure terminal"));
    sequence.extend(lines.iter().map(|line| ConsoleLine::at_prompt(line.as_slice())));
    sequence.push(ConsoleLine::at_prompt("end"));
    sequence
}

/// Write the running configuration to startup.
pub fn save_sequence() -> Vec<ConsoleLine> {
    vec![
        ConsoleLine::at_prompt("wr"),
        ConsoleLine::at_prompt("\r\r"),
    ]
}
