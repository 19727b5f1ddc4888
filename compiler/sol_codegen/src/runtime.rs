//! The environment interface.
//!
//! The generated code calls a fixed set of host-provided functions by
//! name. They are declared once per module, with the same signatures on
//! both targets; the word type stays `i256` and the EWASM backend maps it
//! onto its linear memory.

use sol_ssa::{IrType, Module};

const PTR: IrType = IrType::Ptr;
const I32: IrType = IrType::I32;
const I64: IrType = IrType::Int(64);
const I256: IrType = IrType::I256;
const VOID: IrType = IrType::Void;

/// Declare every environment function plus the helper routines
/// (`bswap256`, `memcpy`, `print32`).
pub fn declare_environment(module: &mut Module) {
    let decls: &[(&str, &[IrType], IrType)] = &[
        ("callDataCopy", &[PTR, I32, I32], VOID),
        ("finish", &[PTR, I32], VOID),
        ("revert", &[PTR, I32], VOID),
        ("log", &[PTR, I32, I32, PTR, PTR, PTR, PTR], VOID),
        ("log0", &[PTR, I32], VOID),
        ("log1", &[PTR, I32, PTR], VOID),
        ("log2", &[PTR, I32, PTR, PTR], VOID),
        ("log3", &[PTR, I32, PTR, PTR, PTR], VOID),
        ("log4", &[PTR, I32, PTR, PTR, PTR, PTR], VOID),
        ("getCallDataSize", &[], I32),
        ("getCallValue", &[], I256),
        ("getCaller", &[], I256),
        ("getGasLeft", &[], I64),
        ("returnDataCopy", &[PTR, I32, I32], VOID),
        ("storageLoad", &[I256], I256),
        ("storageStore", &[I256, I256], VOID),
        ("getTxGasPrice", &[], I256),
        ("getTxOrigin", &[], I256),
        ("getBlockCoinbase", &[], I256),
        ("getBlockDifficulty", &[], I256),
        ("getBlockGasLimit", &[], I64),
        ("getBlockNumber", &[], I64),
        ("getBlockTimestamp", &[], I64),
        ("getBlockHash", &[I64], I256),
        ("keccak256", &[PTR, I32], I256),
        ("sha256", &[PTR, I32], I256),
        ("bswap256", &[I256], I256),
        ("memcpy", &[PTR, PTR, I32], PTR),
        ("print32", &[I32], VOID),
    ];
    for (name, params, ret) in decls {
        module.declare_external(name, params.to_vec(), *ret);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sol_ssa::Target;

    #[test]
    fn all_environment_functions_are_declared() {
        let mut module = Module::new("t", Target::Evm);
        declare_environment(&mut module);
        for name in [
            "callDataCopy",
            "finish",
            "revert",
            "log",
            "log0",
            "log4",
            "getCallDataSize",
            "storageLoad",
            "storageStore",
            "getBlockTimestamp",
            "keccak256",
            "sha256",
            "bswap256",
            "memcpy",
            "print32",
        ] {
            assert!(module.external(name).is_some(), "missing {name}");
        }
    }
}
