//! Resource (hazard) masks attached to each record by the scheduler.
//!
//! Bits below [`REG_END`] are physical registers (core 0-15, single FP
//! 16-47); the bits above them are condition flags and the memory classes
//! used for alias disambiguation.

use std::ops::{BitOr, BitOrAssign};

use crate::lir::Lir;

/// First bit after the register bits.
pub const REG_END: u32 = 48;

/// Bit of the first single-precision FP register.
pub const FP_REG0_BIT: u32 = 16;

/// Set in the alias payload when a Dalvik access spans two slots.
pub const ALIAS_WIDE_FLAG: u32 = 0x8000_0000;

/// Packed use/def resource set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResourceMask(pub u64);

impl ResourceMask {
    pub const NONE: Self = Self(0);
    /// Every resource.
    pub const ALL: Self = Self(!0);

    pub const CCODE: Self = Self(1 << REG_END);
    pub const FP_STATUS: Self = Self(1 << (REG_END + 1));
    /// Dalvik frame slot, fully disambiguated by the alias payload.
    pub const DALVIK_REG: Self = Self(1 << (REG_END + 2));
    pub const LITERAL: Self = Self(1 << (REG_END + 3));
    pub const HEAP_REF: Self = Self(1 << (REG_END + 4));
    pub const MUST_NOT_ALIAS: Self = Self(1 << (REG_END + 5));

    pub const MEM: Self = Self(
        Self::DALVIK_REG.0 | Self::LITERAL.0 | Self::HEAP_REF.0 | Self::MUST_NOT_ALIAS.0,
    );

    /// Mask with only register bit `bit` set.
    pub const fn reg(bit: u32) -> Self {
        Self(1 << bit)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Register bits that are set, lowest first.
    pub fn registers(self) -> impl Iterator<Item = u32> {
        (0..REG_END).filter(move |&bit| self.0 & (1 << bit) != 0)
    }
}

impl BitOr for ResourceMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ResourceMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Renders `mask` as space-separated resource tokens.
///
/// Returns `None` when nothing is set, so callers print no line at all. The
/// `dr<n>` token needs the owning record's alias payload and is skipped
/// without one.
pub fn render_resource_mask(mask: ResourceMask, owner: Option<&Lir<'_>>) -> Option<String> {
    if mask == ResourceMask::ALL {
        return Some("all".to_string());
    }

    let mut tokens: Vec<String> = mask.registers().map(|bit| bit.to_string()).collect();

    if mask.contains(ResourceMask::CCODE) {
        tokens.push("cc".to_string());
    }
    if mask.contains(ResourceMask::FP_STATUS) {
        tokens.push("fpcc".to_string());
    }
    if let Some(lir) = owner.filter(|_| mask.contains(ResourceMask::DALVIK_REG)) {
        let wide = if lir.alias_info & ALIAS_WIDE_FLAG != 0 { "(+1)" } else { "" };
        tokens.push(format!("dr{}{}", lir.alias_info & 0xffff, wide));
    }
    if mask.contains(ResourceMask::LITERAL) {
        tokens.push("lit".to_string());
    }
    if mask.contains(ResourceMask::HEAP_REF) {
        tokens.push("heap".to_string());
    }
    if mask.contains(ResourceMask::MUST_NOT_ALIAS) {
        tokens.push("noalias".to_string());
    }

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::opcode::{ArmOpcode, LirOpcode};

    #[test]
    fn test_all_and_empty() {
        assert_eq!(render_resource_mask(ResourceMask::ALL, None).as_deref(), Some("all"));
        assert_eq!(render_resource_mask(ResourceMask::NONE, None), None);
    }

    #[test]
    fn test_heap_only() {
        assert_eq!(
            render_resource_mask(ResourceMask::HEAP_REF, None).as_deref(),
            Some("heap")
        );
    }

    #[test]
    fn test_token_order() {
        let mask = ResourceMask::MUST_NOT_ALIAS
            | ResourceMask::LITERAL
            | ResourceMask::FP_STATUS
            | ResourceMask::CCODE
            | ResourceMask::reg(FP_REG0_BIT + 2)
            | ResourceMask::reg(13)
            | ResourceMask::reg(0);
        assert_eq!(
            render_resource_mask(mask, None).as_deref(),
            Some("0 13 18 cc fpcc lit noalias")
        );
    }

    #[test]
    fn test_dalvik_alias_needs_owner() {
        let mut lir = Lir::new(LirOpcode::Insn(ArmOpcode::ThumbLdrRRI5));
        lir.alias_info = ALIAS_WIDE_FLAG | 7;
        let mask = ResourceMask::DALVIK_REG | ResourceMask::reg(1);
        assert_eq!(render_resource_mask(mask, Some(&lir)).as_deref(), Some("1 dr7(+1)"));
        assert_eq!(render_resource_mask(mask, None).as_deref(), Some("1"));

        lir.alias_info = 0x0001_0003;
        assert_eq!(
            render_resource_mask(ResourceMask::DALVIK_REG, Some(&lir)).as_deref(),
            Some("dr3")
        );
        assert_eq!(render_resource_mask(ResourceMask::DALVIK_REG, None), None);
    }

    #[test]
    fn test_register_bits_disjoint_from_flags() {
        let regs = (0..REG_END).fold(ResourceMask::NONE, |m, bit| m | ResourceMask::reg(bit));
        let flags = ResourceMask::CCODE | ResourceMask::FP_STATUS | ResourceMask::MEM;
        assert!(!regs.intersects(flags));
    }
}
