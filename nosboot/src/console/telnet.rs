//! Minimal telnet option handling for the QEMU serial socket.
//!
//! QEMU's telnet server opens with option offers (echo, suppress go-ahead,
//! binary). Every offer is refused, negotiation bytes never reach the
//! console buffer, and an escaped `IAC IAC` becomes a single data byte.

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;
const NUL: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Streaming telnet decoder; keeps state across reads.
#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: State,
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `input`, appending payload bytes to `data` and negotiation
    /// replies to `replies`.
    pub fn feed(&mut self, input: &[u8], data: &mut Vec<u8>, replies: &mut Vec<u8>) {
        for &byte in input {
            self.state = match self.state {
                State::Data => match byte {
                    IAC => State::Iac,
                    NUL => State::Data,
                    _ => {
                        data.push(byte);
                        State::Data
                    }
                },
                State::Iac => match byte {
                    IAC => {
                        data.push(IAC);
                        State::Data
                    }
                    DO | DONT | WILL | WONT => State::Negotiate(byte),
                    SB => State::Subnegotiation,
                    // NOP, GA, AYT and friends carry no payload.
                    _ => State::Data,
                },
                State::Negotiate(command) => {
                    match command {
                        DO => replies.extend_from_slice(&[IAC, WONT, byte]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, byte]),
                        _ => {}
                    }
                    State::Data
                }
                State::Subnegotiation => match byte {
                    IAC => State::SubnegotiationIac,
                    _ => State::Subnegotiation,
                },
                State::SubnegotiationIac => match byte {
                    SE => State::Data,
                    _ => State::Subnegotiation,
                },
            };
        }
    }
}
