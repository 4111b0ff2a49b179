//! Register-list operands of `push`/`pop`/`ldm`/`stm` and `vpush`/`vpop`/`vldm`/`vstm`.

use super::encoding::ArmOpcode;
use super::registers::{R14_LR, R15_PC};

/// Renders a 16-bit core register mask as `r<a>, r<b>, ...`, lowest bit first.
///
/// The 16-bit Thumb `push`/`pop` encodings reuse list bit 8 for `lr`/`pc`,
/// so for those opcodes bit 8 prints as `r14`/`r15`.
pub fn core_reg_list(opcode: ArmOpcode, mask: u32) -> String {
    (0..16u32)
        .filter(|&bit| mask & (1 << bit) != 0)
        .map(|bit| {
            let reg = match bit {
                8 if opcode.is_narrow_push() => R14_LR,
                8 if opcode.is_narrow_pop() => R15_PC,
                _ => bit as i32,
            };
            format!("r{reg}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders `count` consecutive single-precision registers starting at `s<base>`.
pub fn fp_reg_list(count: i32, base: i32) -> String {
    (0..count.max(0))
        .map(|i| format!("s{}", base + i))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_pop_substitution() {
        assert_eq!(core_reg_list(ArmOpcode::ThumbPush, 0b1_0000_0001), "r0, r14");
        assert_eq!(core_reg_list(ArmOpcode::ThumbPop, 0b1_0000_0001), "r0, r15");
        // the 32-bit forms have a real r8 slot
        assert_eq!(core_reg_list(ArmOpcode::Thumb2Push, 0b1_0000_0001), "r0, r8");
        assert_eq!(core_reg_list(ArmOpcode::ThumbLdmia, 0x100), "r8");
    }

    fn parse_list(text: &str) -> Vec<u32> {
        if text.is_empty() {
            return Vec::new();
        }
        text.split(", ")
            .map(|r| r.trim_start_matches('r').parse().unwrap())
            .collect()
    }

    #[test]
    fn test_list_order_without_duplicates() {
        let wide = (0..=0xffffu32).map(|mask| (ArmOpcode::ThumbLdmia, mask));
        // narrow push/pop lists are nine bits wide
        let narrow = (0..0x200u32)
            .flat_map(|mask| [(ArmOpcode::ThumbPush, mask), (ArmOpcode::ThumbPop, mask)]);
        for (opcode, mask) in wide.chain(narrow) {
            let regs = parse_list(&core_reg_list(opcode, mask));
            assert_eq!(regs.len() as u32, mask.count_ones(), "mask {mask:#x}");
            assert!(
                regs.windows(2).all(|w| w[0] < w[1]),
                "{opcode:?} mask {mask:#x} rendered {regs:?}"
            );
        }
        assert_eq!(core_reg_list(ArmOpcode::Thumb2Pop, 0x8011), "r0, r4, r15");
    }

    #[test]
    fn test_empty_mask() {
        assert_eq!(core_reg_list(ArmOpcode::ThumbPush, 0), "");
    }

    #[test]
    fn test_fp_list() {
        assert_eq!(fp_reg_list(3, 16), "s16, s17, s18");
        assert_eq!(fp_reg_list(1, 0), "s0");
        assert_eq!(fp_reg_list(0, 16), "");
    }
}
