//! Integer byte order for the history file.
//!
//! The file carries no endianness tag, so reader and writer must agree out of
//! band. `Little` is the default and matches files written by the legacy
//! writer on x86 hosts; `Native` follows whatever the current host uses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
    Native,
}

impl ByteOrder {
    /// Collapse `Native` into the concrete order of this host.
    #[must_use]
    pub const fn resolve(self) -> Self {
        match self {
            Self::Native if cfg!(target_endian = "big") => Self::Big,
            Self::Native => Self::Little,
            other => other,
        }
    }

    #[inline]
    #[must_use]
    pub const fn u32_to_bytes(self, value: u32) -> [u8; 4] {
        match self.resolve() {
            Self::Big => value.to_be_bytes(),
            _ => value.to_le_bytes(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn u32_from_bytes(self, bytes: [u8; 4]) -> u32 {
        match self.resolve() {
            Self::Big => u32::from_be_bytes(bytes),
            _ => u32::from_le_bytes(bytes),
        }
    }

    #[inline]
    #[must_use]
    pub const fn i32_to_bytes(self, value: i32) -> [u8; 4] {
        match self.resolve() {
            Self::Big => value.to_be_bytes(),
            _ => value.to_le_bytes(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn i32_from_bytes(self, bytes: [u8; 4]) -> i32 {
        match self.resolve() {
            Self::Big => i32::from_be_bytes(bytes),
            _ => i32::from_le_bytes(bytes),
        }
    }

    #[inline]
    #[must_use]
    pub const fn i64_to_bytes(self, value: i64) -> [u8; 8] {
        match self.resolve() {
            Self::Big => value.to_be_bytes(),
            _ => value.to_le_bytes(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn i64_from_bytes(self, bytes: [u8; 8]) -> i64 {
        match self.resolve() {
            Self::Big => i64::from_be_bytes(bytes),
            _ => i64::from_le_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_resolves_to_host_order() {
        let value = 0x12_34_56_78_u32;
        let encoded = ByteOrder::Native.u32_to_bytes(value);
        assert_eq!(encoded, value.to_ne_bytes());
        assert_eq!(ByteOrder::Native.u32_from_bytes(encoded), value);
    }

    #[test]
    fn test_little_and_big_differ() {
        assert_eq!(ByteOrder::Little.u32_to_bytes(1), [1, 0, 0, 0]);
        assert_eq!(ByteOrder::Big.u32_to_bytes(1), [0, 0, 0, 1]);
        assert_eq!(ByteOrder::Big.i32_to_bytes(-2), [0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(ByteOrder::Little.i64_from_bytes([5, 0, 0, 0, 0, 0, 0, 0]), 5);
    }

    #[test]
    fn test_default_is_little() {
        assert_eq!(ByteOrder::default(), ByteOrder::Little);
        assert_eq!(ByteOrder::Little.resolve(), ByteOrder::Little);
    }

    #[test]
    fn test_serde_names() {
        let order: ByteOrder = serde_json::from_str("\"big\"").expect("big parses");
        assert_eq!(order, ByteOrder::Big);
        assert_eq!(
            serde_json::to_string(&ByteOrder::Native).expect("serializes"),
            "\"native\""
        );
    }
}
