use std::fs::OpenOptions;
use std::str::FromStr;

use crate::MessageError;

/// An fopen-style open mode: `r`, `w`, `a`, `x` or `c`, optionally followed by `b` and/or `+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    kind: u8,
    update: bool,
}

impl OpenMode {
    pub const READ: Self = Self { kind: b'r', update: false };
    pub const READ_WRITE: Self = Self { kind: b'r', update: true };
    pub const WRITE: Self = Self { kind: b'w', update: false };

    pub fn is_readable(self) -> bool {
        self.kind == b'r' || self.update
    }

    pub fn is_writable(self) -> bool {
        self.kind != b'r' || self.update
    }

    /// Translates the mode into [`OpenOptions`]:
    ///
    /// | mode | opens                                  |
    /// |------|----------------------------------------|
    /// | `r`  | existing file                          |
    /// | `w`  | truncated, created if missing          |
    /// | `a`  | appending, created if missing          |
    /// | `x`  | created, failing if it exists          |
    /// | `c`  | created if missing, not truncated      |
    pub(crate) fn to_open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.is_readable());

        match self.kind {
            b'w' => options.write(true).create(true).truncate(true),
            b'a' => options.append(true).create(true),
            b'x' => options.write(true).create_new(true),
            b'c' => options.write(true).create(true).truncate(false),
            _ => options.write(self.update),
        };
        options
    }
}

impl FromStr for OpenMode {
    type Err = MessageError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        let invalid = || MessageError::invalid_argument(format!("invalid open mode: {mode:?}"));

        let bytes = mode.as_bytes();
        let (&kind, flags) = bytes.split_first().ok_or_else(invalid)?;
        if !matches!(kind, b'r' | b'w' | b'a' | b'x' | b'c') {
            return Err(invalid());
        }

        let mut update = false;
        for &flag in flags {
            match flag {
                b'+' if !update => update = true,
                b'b' | b't' => {}
                _ => return Err(invalid()),
            }
        }

        Ok(Self { kind, update })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_from_mode() {
        let cases = [("r", true, false), ("rb", true, false), ("r+", true, true), ("rb+", true, true), ("w", false, true), ("w+", true, true), ("a", false, true), ("a+", true, true), ("x", false, true), ("xb+", true, true), ("c", false, true), ("c+", true, true)];

        for (mode, readable, writable) in cases {
            let parsed: OpenMode = mode.parse().unwrap();
            assert_eq!(parsed.is_readable(), readable, "{mode} readable");
            assert_eq!(parsed.is_writable(), writable, "{mode} writable");
        }
    }

    #[test]
    fn invalid_modes() {
        for mode in ["", "z", "r++", "+r", "rq"] {
            assert!(mode.parse::<OpenMode>().unwrap_err().is_invalid_argument(), "{mode}");
        }
    }
}
