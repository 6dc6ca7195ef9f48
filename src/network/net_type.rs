use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// The network architectures, each with the tag written at the head of a
/// saved network file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetType {
    /// Plain back-propagation network.
    Plain = 1000,
    /// Two plain networks whose outputs are blended by the modulator.
    OutputBlending = 1001,
    /// Plain network with the modulator as an extra input.
    HInput = 1002,
    /// Plain topology with every weight scaled by `h + 1`.
    Uesmann = 1003,
}

impl NetType {
    pub const ALL: [NetType; 4] = [
        NetType::Plain,
        NetType::OutputBlending,
        NetType::HInput,
        NetType::Uesmann,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            NetType::Plain => "plain",
            NetType::OutputBlending => "output_blending",
            NetType::HInput => "h_input",
            NetType::Uesmann => "uesmann",
        }
    }
}

impl TryFrom<u32> for NetType {
    type Error = NetError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        NetType::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(NetError::UnknownNetType(tag))
    }
}

impl FromStr for NetType {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(NetType::Plain),
            "ob" | "output_blending" | "outputblending" => Ok(NetType::OutputBlending),
            "hin" | "h_input" | "hinput" => Ok(NetType::HInput),
            "ues" | "uesmann" => Ok(NetType::Uesmann),
            _ => Err(NetError::Config(format!("unknown network type '{}'", s))),
        }
    }
}

impl fmt::Display for NetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
