//! Function bodies: value, instruction and block arenas.

use crate::IrType;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        #[repr(transparent)]
        pub struct $name(pub(crate) u32);

        impl $name {
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Handle to an SSA value.
    ValueId
);
define_id!(
    /// Handle to an instruction.
    InstId
);
define_id!(
    /// Handle to a basic block.
    BlockId
);

/// What a value is.
#[derive(Clone, Debug)]
pub enum ValueKind {
    /// The n-th function parameter.
    Param(u32),
    /// The result of an instruction.
    Inst(InstId),
    /// An integer constant.
    ConstInt(u128),
    /// A wide integer constant, big-endian bytes (printed in hex).
    ConstBig([u8; 32]),
}

#[derive(Clone, Debug)]
pub struct ValueData {
    pub ty: IrType,
    pub kind: ValueKind,
}

/// Integer binary operations. Division, remainder and right shift carry
/// signedness, as in LLVM.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IrBinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
}

impl IrBinOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            IrBinOp::Add => "add",
            IrBinOp::Sub => "sub",
            IrBinOp::Mul => "mul",
            IrBinOp::UDiv => "udiv",
            IrBinOp::SDiv => "sdiv",
            IrBinOp::URem => "urem",
            IrBinOp::SRem => "srem",
            IrBinOp::Shl => "shl",
            IrBinOp::LShr => "lshr",
            IrBinOp::AShr => "ashr",
            IrBinOp::And => "and",
            IrBinOp::Or => "or",
            IrBinOp::Xor => "xor",
        }
    }
}

/// Integer comparison predicates.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IcmpPred {
    Eq,
    Ne,
    Ult,
    Ule,
    Ugt,
    Uge,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl IcmpPred {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            IcmpPred::Eq => "eq",
            IcmpPred::Ne => "ne",
            IcmpPred::Ult => "ult",
            IcmpPred::Ule => "ule",
            IcmpPred::Ugt => "ugt",
            IcmpPred::Uge => "uge",
            IcmpPred::Slt => "slt",
            IcmpPred::Sle => "sle",
            IcmpPred::Sgt => "sgt",
            IcmpPred::Sge => "sge",
        }
    }
}

/// Integer width/sign conversions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CastOp {
    Zext,
    Sext,
    Trunc,
}

impl CastOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            CastOp::Zext => "zext",
            CastOp::Sext => "sext",
            CastOp::Trunc => "trunc",
        }
    }
}

#[derive(Clone, Debug)]
pub enum InstKind {
    Binary {
        op: IrBinOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    ICmp {
        pred: IcmpPred,
        lhs: ValueId,
        rhs: ValueId,
    },
    Alloca {
        ty: IrType,
        /// Element count for array allocations; `None` allocates one.
        count: Option<ValueId>,
    },
    Load {
        ty: IrType,
        ptr: ValueId,
    },
    Store {
        value: ValueId,
        ptr: ValueId,
    },
    Cast {
        op: CastOp,
        value: ValueId,
        ty: IrType,
    },
    /// Byte-offset pointer arithmetic.
    PtrAdd {
        base: ValueId,
        offset: ValueId,
    },
    Call {
        callee: String,
        args: Vec<ValueId>,
        ty: IrType,
    },
    Br {
        dest: BlockId,
    },
    CondBr {
        cond: ValueId,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    Ret {
        value: Option<ValueId>,
    },
    Unreachable,
}

impl InstKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Br { .. }
                | InstKind::CondBr { .. }
                | InstKind::Ret { .. }
                | InstKind::Unreachable
        )
    }
}

#[derive(Clone, Debug)]
pub struct InstData {
    pub kind: InstKind,
    pub result: Option<ValueId>,
}

#[derive(Clone, Debug)]
pub(crate) struct BlockData {
    pub(crate) label: String,
    pub(crate) insts: Vec<InstId>,
}

/// A defined function.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<(String, IrType)>,
    pub ret: IrType,
    pub(crate) values: Vec<ValueData>,
    pub(crate) insts: Vec<InstData>,
    pub(crate) blocks: Vec<BlockData>,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<(String, IrType)>, ret: IrType) -> Self {
        let mut func = Function {
            name: name.into(),
            params,
            ret,
            values: Vec::new(),
            insts: Vec::new(),
            blocks: Vec::new(),
        };
        for (idx, (_, ty)) in func.params.clone().iter().enumerate() {
            func.values.push(ValueData {
                ty: *ty,
                kind: ValueKind::Param(idx as u32),
            });
        }
        func
    }

    /// The value handle of the n-th parameter.
    pub fn param(&self, idx: usize) -> ValueId {
        debug_assert!(idx < self.params.len());
        ValueId(idx as u32)
    }

    /// Append a block. Labels are made unique with a numeric suffix.
    pub fn add_block(&mut self, label: &str) -> BlockId {
        let unique = if self.blocks.iter().any(|b| b.label == label) {
            format!("{label}{}", self.blocks.len())
        } else {
            label.to_owned()
        };
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BlockData {
            label: unique,
            insts: Vec::new(),
        });
        id
    }

    pub fn const_int(&mut self, ty: IrType, value: u128) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(ValueData {
            ty,
            kind: ValueKind::ConstInt(value),
        });
        id
    }

    /// A constant wider than 128 bits, given as big-endian bytes.
    pub fn const_big(&mut self, ty: IrType, bytes: [u8; 32]) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(ValueData {
            ty,
            kind: ValueKind::ConstBig(bytes),
        });
        id
    }

    pub fn value(&self, id: ValueId) -> &ValueData {
        &self.values[id.0 as usize]
    }

    pub fn value_ty(&self, id: ValueId) -> IrType {
        self.values[id.0 as usize].ty
    }

    pub fn inst(&self, id: InstId) -> &InstData {
        &self.insts[id.0 as usize]
    }

    pub fn block_label(&self, id: BlockId) -> &str {
        &self.blocks[id.0 as usize].label
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Append an instruction to a block, allocating a result value when
    /// the instruction produces one.
    pub(crate) fn push_inst(&mut self, block: BlockId, kind: InstKind) -> Option<ValueId> {
        let result_ty = match &kind {
            InstKind::Binary { lhs, .. } => Some(self.value_ty(*lhs)),
            InstKind::ICmp { .. } => Some(IrType::I1),
            InstKind::Alloca { .. } | InstKind::PtrAdd { .. } => Some(IrType::Ptr),
            InstKind::Load { ty, .. } => Some(*ty),
            InstKind::Cast { ty, .. } => Some(*ty),
            InstKind::Call { ty, .. } if !ty.is_void() => Some(*ty),
            _ => None,
        };

        let inst_id = InstId(self.insts.len() as u32);
        let result = result_ty.map(|ty| {
            let value_id = ValueId(self.values.len() as u32);
            self.values.push(ValueData {
                ty,
                kind: ValueKind::Inst(inst_id),
            });
            value_id
        });
        self.insts.push(InstData { kind, result });
        self.blocks[block.0 as usize].insts.push(inst_id);
        result
    }

    /// True if the block's last instruction is a terminator.
    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.blocks[block.0 as usize]
            .insts
            .last()
            .map(|&inst| self.insts[inst.0 as usize].kind.is_terminator())
            .unwrap_or(false)
    }
}
