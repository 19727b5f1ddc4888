//! Instruction builder.
//!
//! Owns the function under construction and a current-block cursor; every
//! `build_*` method appends to the current block.

use crate::function::InstKind;
use crate::{BlockId, CastOp, Function, IcmpPred, IrBinOp, IrType, ValueId};

/// Builder positioned inside a function.
pub struct Builder {
    func: Function,
    current: Option<BlockId>,
}

impl Builder {
    pub fn new(func: Function) -> Self {
        Builder {
            func,
            current: None,
        }
    }

    /// Take back the finished function.
    pub fn finish(self) -> Function {
        self.func
    }

    pub fn func(&self) -> &Function {
        &self.func
    }

    pub fn create_block(&mut self, label: &str) -> BlockId {
        self.func.add_block(label)
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    pub fn current_block(&self) -> BlockId {
        self.current.expect("builder is not positioned")
    }

    /// True if the current block already ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.func.is_terminated(self.current_block())
    }

    pub fn param(&self, idx: usize) -> ValueId {
        self.func.param(idx)
    }

    pub fn const_int(&mut self, ty: IrType, value: u128) -> ValueId {
        self.func.const_int(ty, value)
    }

    pub fn value_ty(&self, value: ValueId) -> IrType {
        self.func.value_ty(value)
    }

    fn push(&mut self, kind: InstKind) -> Option<ValueId> {
        let block = self.current_block();
        self.func.push_inst(block, kind)
    }

    fn push_valued(&mut self, kind: InstKind) -> ValueId {
        self.push(kind).expect("instruction produces a value")
    }

    pub fn build_binary(&mut self, op: IrBinOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.push_valued(InstKind::Binary { op, lhs, rhs })
    }

    pub fn build_icmp(&mut self, pred: IcmpPred, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.push_valued(InstKind::ICmp { pred, lhs, rhs })
    }

    pub fn build_alloca(&mut self, ty: IrType) -> ValueId {
        self.push_valued(InstKind::Alloca { ty, count: None })
    }

    /// `alloca ty, <count>` — an array allocation.
    pub fn build_array_alloca(&mut self, ty: IrType, count: ValueId) -> ValueId {
        self.push_valued(InstKind::Alloca {
            ty,
            count: Some(count),
        })
    }

    pub fn const_big(&mut self, ty: IrType, bytes: [u8; 32]) -> ValueId {
        self.func.const_big(ty, bytes)
    }

    pub fn build_load(&mut self, ty: IrType, ptr: ValueId) -> ValueId {
        self.push_valued(InstKind::Load { ty, ptr })
    }

    pub fn build_store(&mut self, value: ValueId, ptr: ValueId) {
        self.push(InstKind::Store { value, ptr });
    }

    pub fn build_cast(&mut self, op: CastOp, value: ValueId, ty: IrType) -> ValueId {
        self.push_valued(InstKind::Cast { op, value, ty })
    }

    pub fn build_ptr_add(&mut self, base: ValueId, offset: ValueId) -> ValueId {
        self.push_valued(InstKind::PtrAdd { base, offset })
    }

    /// Call by symbol name; returns the result value for non-void callees.
    pub fn build_call(&mut self, callee: &str, args: Vec<ValueId>, ty: IrType) -> Option<ValueId> {
        self.push(InstKind::Call {
            callee: callee.to_owned(),
            args,
            ty,
        })
    }

    pub fn build_br(&mut self, dest: BlockId) {
        self.push(InstKind::Br { dest });
    }

    pub fn build_cond_br(&mut self, cond: ValueId, then_dest: BlockId, else_dest: BlockId) {
        self.push(InstKind::CondBr {
            cond,
            then_dest,
            else_dest,
        });
    }

    pub fn build_ret(&mut self, value: Option<ValueId>) {
        self.push(InstKind::Ret { value });
    }

    pub fn build_unreachable(&mut self) {
        self.push(InstKind::Unreachable);
    }

    /// Zero-extend, sign-extend or truncate to a target integer width;
    /// no-op when widths already match.
    pub fn build_int_resize(&mut self, value: ValueId, to: IrType, signed: bool) -> ValueId {
        let from_bits = match self.value_ty(value) {
            IrType::Int(bits) => bits,
            IrType::I1 => 1,
            _ => return value,
        };
        let to_bits = match to {
            IrType::Int(bits) => bits,
            IrType::I1 => 1,
            _ => return value,
        };
        if from_bits == to_bits {
            value
        } else if from_bits < to_bits {
            let op = if signed { CastOp::Sext } else { CastOp::Zext };
            self.build_cast(op, value, to)
        } else {
            self.build_cast(CastOp::Trunc, value, to)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_line_emission() {
        let func = Function::new(
            "add2",
            vec![("a".into(), IrType::I256), ("b".into(), IrType::I256)],
            IrType::I256,
        );
        let mut b = Builder::new(func);
        let entry = b.create_block("entry");
        b.position_at_end(entry);
        let sum = b.build_binary(IrBinOp::Add, b.param(0), b.param(1));
        b.build_ret(Some(sum));

        let func = b.finish();
        assert!(func.is_terminated(entry));
        assert_eq!(func.value_ty(sum), IrType::I256);
    }

    #[test]
    fn int_resize_chooses_the_right_cast() {
        let func = Function::new("f", vec![("x".into(), IrType::Int(64))], IrType::Void);
        let mut b = Builder::new(func);
        let entry = b.create_block("entry");
        b.position_at_end(entry);

        let x = b.param(0);
        let wide = b.build_int_resize(x, IrType::I256, false);
        assert_eq!(b.value_ty(wide), IrType::I256);
        let same = b.build_int_resize(wide, IrType::I256, false);
        assert_eq!(same, wide);
        let narrow = b.build_int_resize(wide, IrType::Int(32), false);
        assert_eq!(b.value_ty(narrow), IrType::Int(32));
    }

    #[test]
    fn block_labels_are_unique() {
        let mut func = Function::new("f", vec![], IrType::Void);
        let a = func.add_block("body");
        let b = func.add_block("body");
        assert_ne!(func.block_label(a), func.block_label(b));
    }
}
