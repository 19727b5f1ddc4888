//! Canonical signatures and selectors.
//!
//! A selector is the first 4 bytes of the Keccak-256 digest of the
//! canonical signature `name(type1,type2,…)`, where type names use their
//! canonical ABI spelling (`uint` ⇒ `uint256`, `int` ⇒ `int256`).

use sha3::{Digest, Keccak256};
use sol_ir::{Ast, FunctionId, StringInterner, TypeTable};

/// Canonical signature of a function: `name(uint256,address,…)`.
pub fn canonical_signature(
    ast: &Ast,
    types: &TypeTable,
    interner: &StringInterner,
    func: FunctionId,
) -> String {
    let decl = ast.function(func);
    let params = decl
        .params
        .params
        .iter()
        .map(|&p| types.canonical_name(ast.var(p).ty, interner))
        .collect::<Vec<_>>()
        .join(",");
    format!("{}({})", interner.lookup(decl.name), params)
}

/// Canonical signature of an event, same shape as for functions.
pub fn event_signature(
    ast: &Ast,
    types: &TypeTable,
    interner: &StringInterner,
    event: sol_ir::EventId,
) -> String {
    let decl = ast.event(event);
    let params = decl
        .params
        .params
        .iter()
        .map(|&p| types.canonical_name(ast.var(p).ty, interner))
        .collect::<Vec<_>>()
        .join(",");
    format!("{}({})", interner.lookup(decl.name), params)
}

/// 4-byte selector of a canonical signature, as a host integer holding
/// the big-endian bytes (`set(uint256)` → `0x60fe47b1`).
pub fn selector(signature: &str) -> u32 {
    let digest = Keccak256::digest(signature.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Full 32-byte signature hash, used as topic 0 of non-anonymous events.
pub fn signature_hash(signature: &str) -> [u8; 32] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_selectors() {
        // The reference values every ABI implementation agrees on.
        assert_eq!(selector("set(uint256)"), 0x60fe_47b1);
        assert_eq!(selector("get()"), 0x6d4c_e63c);
        assert_eq!(selector("transfer(address,uint256)"), 0xa905_9cbb);
        assert_eq!(selector("baz(uint32,bool)"), 0xcdcd_77c0);
    }

    #[test]
    fn signature_hash_prefix_matches_selector() {
        let hash = signature_hash("set(uint256)");
        assert_eq!(
            u32::from_be_bytes([hash[0], hash[1], hash[2], hash[3]]),
            selector("set(uint256)")
        );
    }
}
