//! Dump options.

use std::env;

/// Environment variable enabling the `(nop)`/`(squashed)` records.
pub const ENV_DUMP_NOPS: &str = "ARMLIR_DUMP_NOPS";
/// Environment variable enabling `use:`/`def:` mask lines.
pub const ENV_DUMP_MASKS: &str = "ARMLIR_DUMP_MASKS";
/// Environment variable holding the code base address (decimal or `0x` hex).
pub const ENV_BASE_ADDRESS: &str = "ARMLIR_BASE_ADDRESS";

/// Knobs read by the printer and the dumper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Address added to record offsets when printing absolute addresses.
    pub base_address: u32,
    /// Print squashed and no-op records too.
    pub dump_nops: bool,
    /// Print non-empty use/def masks after each instruction.
    pub dump_resource_masks: bool,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_address(mut self, base_address: u32) -> Self {
        self.base_address = base_address;
        self
    }

    pub fn with_dump_nops(mut self, dump_nops: bool) -> Self {
        self.dump_nops = dump_nops;
        self
    }

    pub fn with_resource_masks(mut self, dump_resource_masks: bool) -> Self {
        self.dump_resource_masks = dump_resource_masks;
        self
    }

    /// Defaults overridden by the `ARMLIR_*` environment variables.
    ///
    /// Unparseable values are ignored with a debug log.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();
        if let Some(value) = lookup(ENV_DUMP_NOPS) {
            options.dump_nops = parse_flag(ENV_DUMP_NOPS, &value);
        }
        if let Some(value) = lookup(ENV_DUMP_MASKS) {
            options.dump_resource_masks = parse_flag(ENV_DUMP_MASKS, &value);
        }
        if let Some(value) = lookup(ENV_BASE_ADDRESS) {
            match parse_address(&value) {
                Some(addr) => options.base_address = addr,
                None => log::debug!("ignoring {}={:?}: not an address", ENV_BASE_ADDRESS, value),
            }
        }
        options
    }

    /// Absolute 32-bit address of code offset `offset`.
    pub fn address_of(&self, offset: u32) -> u32 {
        self.base_address.wrapping_add(offset)
    }
}

fn parse_flag(key: &str, value: &str) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "" | "0" | "false" | "no" | "off" => false,
        other => {
            log::debug!("ignoring {}={:?}: not a boolean", key, other);
            false
        }
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal 32-bit address.
pub fn parse_address(text: &str) -> Option<u32> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
