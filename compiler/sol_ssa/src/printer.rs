//! Textual IR output in LLVM assembly style.
//!
//! Printing is deterministic: instruction results are numbered `%0, %1, …`
//! in emission order per function, parameters print by name.

use std::fmt;

use crate::function::{InstKind, ValueKind};
use crate::{Function, InstData, Module, ValueId};

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "; target = {}", self.target.as_str())?;
        writeln!(f)?;
        for ext in self.externals() {
            let params = ext
                .params
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "declare {} @{}({})", ext.ret, ext.name, params)?;
        }
        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{func}")?;
        }
        Ok(())
    }
}

/// Per-function printing state: stable names for every value.
struct Namer {
    names: Vec<Option<String>>,
}

impl Namer {
    fn new(func: &Function) -> Self {
        let mut names = vec![None; func.values.len()];
        let mut next = 0u32;
        for (idx, (name, _)) in func.params.iter().enumerate() {
            names[idx] = Some(if name.is_empty() {
                format!("%arg{idx}")
            } else {
                format!("%{name}")
            });
        }
        // Number instruction results in emission order.
        for block in &func.blocks {
            for &inst in &block.insts {
                if let Some(result) = func.insts[inst.raw() as usize].result {
                    names[result.raw() as usize] = Some(format!("%{next}"));
                    next += 1;
                }
            }
        }
        Namer { names }
    }

    /// Operand spelling: named values by name, constants inline.
    fn operand(&self, func: &Function, value: ValueId) -> String {
        let data = func.value(value);
        match &data.kind {
            ValueKind::ConstInt(v) => v.to_string(),
            ValueKind::ConstBig(bytes) => {
                let mut s = String::with_capacity(66);
                s.push_str("u0x");
                for b in bytes {
                    s.push_str(&format!("{b:02x}"));
                }
                s
            }
            _ => self.names[value.raw() as usize]
                .clone()
                .unwrap_or_else(|| format!("%v{}", value.raw())),
        }
    }

    /// Operand with its type prefix, e.g. `i256 %x` or `i256 42`.
    fn typed_operand(&self, func: &Function, value: ValueId) -> String {
        format!("{} {}", func.value_ty(value), self.operand(func, value))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let namer = Namer::new(self);
        let params = self
            .params
            .iter()
            .enumerate()
            .map(|(idx, (_, ty))| format!("{ty} {}", namer.operand(self, self.param(idx))))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "define {} @{}({}) {{", self.ret, self.name, params)?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for &inst in &block.insts {
                let data = &self.insts[inst.raw() as usize];
                writeln!(f, "  {}", render_inst(self, &namer, data))?;
            }
        }
        writeln!(f, "}}")
    }
}

fn render_inst(func: &Function, namer: &Namer, data: &InstData) -> String {
    let result = data
        .result
        .map(|r| format!("{} = ", namer.operand(func, r)));
    let lhs = result.unwrap_or_default();

    match &data.kind {
        InstKind::Binary { op, lhs: a, rhs: b } => format!(
            "{lhs}{} {} {}, {}",
            op.mnemonic(),
            func.value_ty(*a),
            namer.operand(func, *a),
            namer.operand(func, *b)
        ),
        InstKind::ICmp { pred, lhs: a, rhs: b } => format!(
            "{lhs}icmp {} {} {}, {}",
            pred.mnemonic(),
            func.value_ty(*a),
            namer.operand(func, *a),
            namer.operand(func, *b)
        ),
        InstKind::Alloca { ty, count: None } => format!("{lhs}alloca {ty}"),
        InstKind::Alloca {
            ty,
            count: Some(count),
        } => format!(
            "{lhs}alloca {ty}, {}",
            namer.typed_operand(func, *count)
        ),
        InstKind::Load { ty, ptr } => {
            format!("{lhs}load {ty}, ptr {}", namer.operand(func, *ptr))
        }
        InstKind::Store { value, ptr } => format!(
            "store {}, ptr {}",
            namer.typed_operand(func, *value),
            namer.operand(func, *ptr)
        ),
        InstKind::Cast { op, value, ty } => format!(
            "{lhs}{} {} to {ty}",
            op.mnemonic(),
            namer.typed_operand(func, *value)
        ),
        InstKind::PtrAdd { base, offset } => format!(
            "{lhs}getelementptr i8, ptr {}, {}",
            namer.operand(func, *base),
            namer.typed_operand(func, *offset)
        ),
        InstKind::Call { callee, args, ty } => {
            let args = args
                .iter()
                .map(|&a| namer.typed_operand(func, a))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{lhs}call {ty} @{callee}({args})")
        }
        InstKind::Br { dest } => format!("br label %{}", func.block_label(*dest)),
        InstKind::CondBr {
            cond,
            then_dest,
            else_dest,
        } => format!(
            "br i1 {}, label %{}, label %{}",
            namer.operand(func, *cond),
            func.block_label(*then_dest),
            func.block_label(*else_dest)
        ),
        InstKind::Ret { value: Some(v) } => format!("ret {}", namer.typed_operand(func, *v)),
        InstKind::Ret { value: None } => "ret void".to_owned(),
        InstKind::Unreachable => "unreachable".to_owned(),
    }
}
