//! File-transfer command frames.
//!
//! Commands are short ASCII strings written to the command characteristic.
//! Frames carry UTF-8 bytes only; the transport payload encoding (base64)
//! is applied at the session boundary, not here.

use std::fmt;

/// A single file-transfer command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFrame {
    /// `LS` — list the files on the device.
    List,
    /// `GET <name>` — stream a file's size and contents.
    Get(String),
    /// `RM <name>` — delete a file.
    Remove(String),
    /// `FMT` — format the device storage.
    Format,
}

impl CommandFrame {
    /// The frame encoded as wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => f.write_str("LS"),
            Self::Get(name) => write!(f, "GET {name}"),
            Self::Remove(name) => write!(f, "RM {name}"),
            Self::Format => f.write_str("FMT"),
        }
    }
}
