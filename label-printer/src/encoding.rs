//! Command byte encoding
//!
//! ZPL is plain text, but label data often is not. Printers configured with
//! `^CI28` expect UTF-8; printers set to `^CI26` expect GBK for Chinese text.

use std::str::FromStr;

use crate::error::PrintError;

/// Byte encoding applied to a rendered command before transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandEncoding {
    #[default]
    Utf8,
    Gbk,
}

impl CommandEncoding {
    /// Encode a rendered command
    ///
    /// Characters GBK cannot represent are replaced by encoding_rs with
    /// numeric character references.
    pub fn encode(&self, command: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => command.as_bytes().to_vec(),
            Self::Gbk => {
                let (cow, _, _) = encoding_rs::GBK.encode(command);
                cow.into_owned()
            }
        }
    }

    /// Decode bytes read back from a device
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Gbk => {
                let (cow, _, _) = encoding_rs::GBK.decode(bytes);
                cow.into_owned()
            }
        }
    }
}

impl FromStr for CommandEncoding {
    type Err = PrintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "gbk" | "gb2312" => Ok(Self::Gbk),
            other => Err(PrintError::InvalidConfig(format!(
                "Unknown command encoding: {}",
                other
            ))),
        }
    }
}
