//! Operation names of the remote file namespace.

use std::{fmt, str::FromStr};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Edit,
    Chmod,
    Copy,
    Move,
    Delete,
    Compress,
    Touch,
    Mkdir,
    Lock,
    Unlock,
    CheckLock,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::List,
        Operation::Edit,
        Operation::Chmod,
        Operation::Copy,
        Operation::Move,
        Operation::Delete,
        Operation::Compress,
        Operation::Touch,
        Operation::Mkdir,
        Operation::Lock,
        Operation::Unlock,
        Operation::CheckLock,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::List => "file/list",
            Operation::Edit => "file/edit",
            Operation::Chmod => "file/chmod",
            Operation::Copy => "file/copy",
            Operation::Move => "file/move",
            Operation::Delete => "file/delete",
            Operation::Compress => "file/compress",
            Operation::Touch => "file/touch",
            Operation::Mkdir => "file/mkdir",
            Operation::Lock => "file/lock",
            Operation::Unlock => "file/unlock",
            Operation::CheckLock => "file/check_lock",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| Error::UnknownOperation(s.to_string()).into())
    }
}
