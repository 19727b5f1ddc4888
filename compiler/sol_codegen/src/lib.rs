//! Code generation: lowering typed contract ASTs into SSA IR.
//!
//! [`CodeGenModule`] drives one source unit: it declares the environment
//! interface, then per contract emits the constructor, the selector
//! dispatcher, every member function and every event. Function bodies go
//! through [`body::FuncBodyCodeGen`].
//!
//! Code generation assumes a fully-typed tree; any untyped expression is
//! a precondition violation that aborts the module.

pub mod abi;
mod body;
mod runtime;

#[cfg(test)]
mod tests;

use rustc_hash::FxHashMap;
use sol_ir::{
    Ast, ContractId, FunctionId, SourceItem, SourceUnit, Span, StringInterner, Ty, TyId,
    TypeTable, VarId,
};
use sol_ssa::{Builder, Function, IcmpPred, IrBinOp, IrType, Module, Target, ValueId};
use tracing::debug;

use body::{FuncBodyCodeGen, StateInit};

/// Precondition violation during lowering. The module is abandoned.
#[derive(Debug, Clone)]
pub struct CodeGenError {
    pub message: String,
    pub span: Span,
}

impl CodeGenError {
    #[cold]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        CodeGenError {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code generation failed: {}", self.message)
    }
}

impl std::error::Error for CodeGenError {}

/// Memoized source-type → IR-type mapping plus storage-slot allocation.
///
/// Slots are 256-bit storage keys handed out by a monotonically
/// increasing cursor at first encounter; the map lives for the whole
/// module lowering.
pub struct TypeCache {
    ir_types: FxHashMap<TyId, IrType>,
    state_var_slots: FxHashMap<VarId, u64>,
    state_var_addr_cursor: u64,
}

impl TypeCache {
    pub fn new() -> Self {
        TypeCache {
            ir_types: FxHashMap::default(),
            state_var_slots: FxHashMap::default(),
            state_var_addr_cursor: 0,
        }
    }

    /// IR type of a source type. Value types keep their width; reference
    /// types lower to pointers.
    pub fn ir_type(&mut self, types: &TypeTable, ty: TyId) -> IrType {
        if let Some(&cached) = self.ir_types.get(&ty) {
            return cached;
        }
        let lowered = match types.get(ty) {
            Ty::Bool => IrType::I1,
            Ty::Integer(kind) => IrType::Int(kind.bits),
            Ty::FixedBytes(n) => IrType::Int(u16::from(*n) * 8),
            Ty::Address(_) => IrType::Int(160),
            Ty::Bytes
            | Ty::String
            | Ty::Array { .. }
            | Ty::Mapping { .. }
            | Ty::Function { .. }
            | Ty::UserDefined(_) => IrType::Ptr,
        };
        self.ir_types.insert(ty, lowered);
        lowered
    }

    /// Whether the integer interpretation of a type is signed.
    pub fn is_signed(&self, types: &TypeTable, ty: TyId) -> bool {
        matches!(types.get(ty), Ty::Integer(kind) if kind.signed)
    }

    /// Storage slot of a state variable, allocated on first use.
    pub fn state_var_slot(&mut self, var: VarId) -> u64 {
        if let Some(&slot) = self.state_var_slots.get(&var) {
            return slot;
        }
        let slot = self.state_var_addr_cursor;
        self.state_var_addr_cursor += 1;
        self.state_var_slots.insert(var, slot);
        slot
    }
}

impl Default for TypeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower a parsed, typed source unit into an IR module.
pub fn emit_source_unit(
    unit: &SourceUnit,
    ast: &Ast,
    types: &TypeTable,
    interner: &StringInterner,
    module_name: &str,
    target: Target,
) -> Result<Module, CodeGenError> {
    let mut cgm = CodeGenModule::new(ast, types, interner, module_name, target);
    for item in &unit.items {
        if let SourceItem::Contract(contract) = item {
            cgm.emit_contract_decl(*contract)?;
        }
    }
    Ok(cgm.module)
}

/// Per-module lowering driver. Owns the IR module and the type cache.
pub struct CodeGenModule<'a> {
    pub module: Module,
    ast: &'a Ast,
    types: &'a TypeTable,
    interner: &'a StringInterner,
    cache: TypeCache,
    target: Target,
}

impl<'a> CodeGenModule<'a> {
    pub fn new(
        ast: &'a Ast,
        types: &'a TypeTable,
        interner: &'a StringInterner,
        module_name: &str,
        target: Target,
    ) -> Self {
        let mut module = Module::new(module_name, target);
        runtime::declare_environment(&mut module);
        CodeGenModule {
            module,
            ast,
            types,
            interner,
            cache: TypeCache::new(),
            target,
        }
    }

    /// Emit one contract: constructor, dispatcher, member functions,
    /// events — in that order.
    pub fn emit_contract_decl(&mut self, contract: ContractId) -> Result<(), CodeGenError> {
        let name = self.interner.lookup(self.ast.contract(contract).name);
        debug!(contract = name, "lowering contract");

        self.emit_contract_constructor_decl(contract)?;
        self.emit_contract_dispatcher_decl(contract)?;

        let functions = self.ast.contract(contract).functions.clone();
        for func in functions {
            self.emit_function_decl(contract, func)?;
        }
        if let Some(fallback) = self.ast.contract(contract).fallback {
            self.emit_function_decl(contract, fallback)?;
        }

        for &event in &self.ast.contract(contract).events {
            let signature = abi::event_signature(self.ast, self.types, self.interner, event);
            debug!(event = %signature, "event lowers through log at emit sites");
        }
        Ok(())
    }

    fn mangled_name(&self, contract: ContractId, func: FunctionId) -> String {
        format!(
            "{}.{}",
            self.interner.lookup(self.ast.contract(contract).name),
            self.interner.lookup(self.ast.function(func).name)
        )
    }

    fn contract_name(&self, contract: ContractId) -> &'static str {
        self.interner.lookup(self.ast.contract(contract).name)
    }

    fn emit_function_decl(
        &mut self,
        contract: ContractId,
        func: FunctionId,
    ) -> Result<(), CodeGenError> {
        let symbol = self.mangled_name(contract, func);
        let contract_name = self.contract_name(contract);
        debug!(function = %symbol, "lowering function body");
        let lowered = FuncBodyCodeGen::new(
            self.ast,
            self.types,
            self.interner,
            &mut self.cache,
            contract_name,
        )
        .compile(Some(func), &symbol, &[])?;
        self.module.add_function(lowered);
        Ok(())
    }

    /// The constructor stores every state variable's initial value to its
    /// slot, then runs the user constructor body if one was declared.
    fn emit_contract_constructor_decl(
        &mut self,
        contract: ContractId,
    ) -> Result<(), CodeGenError> {
        let decl = self.ast.contract(contract);
        let state_vars = decl.state_vars.clone();
        let ctor = decl.constructor;

        let mut inits = Vec::with_capacity(state_vars.len());
        for var in state_vars {
            let slot = self.cache.state_var_slot(var);
            let var_decl = self.ast.var(var);
            inits.push(StateInit {
                slot,
                init: var_decl.initializer,
                ty: var_decl.ty,
            });
        }

        let contract_name = self.contract_name(contract);
        let symbol = format!("{contract_name}.solidity.constructor");
        let lowered = FuncBodyCodeGen::new(
            self.ast,
            self.types,
            self.interner,
            &mut self.cache,
            contract_name,
        )
        .compile(ctor, &symbol, &inits)?;
        self.module.add_function(lowered);
        Ok(())
    }

    /// The contract entry point: route an incoming call by selector.
    fn emit_contract_dispatcher_decl(&mut self, contract: ContractId) -> Result<(), CodeGenError> {
        let entry_symbol = match self.target {
            Target::Ewasm => "main".to_owned(),
            Target::Evm => "solidity.main".to_owned(),
        };

        let func = Function::new(entry_symbol, Vec::new(), IrType::Void);
        let mut b = Builder::new(func);
        let entry = b.create_block("entry");
        let default_block = b.create_block("fallthrough");
        let selector_block = b.create_block("selector");

        b.position_at_end(entry);
        let size = b
            .build_call("getCallDataSize", vec![], IrType::I32)
            .expect("getCallDataSize returns a value");
        let four = b.const_int(IrType::I32, 4);
        let too_small = b.build_icmp(IcmpPred::Ult, size, four);
        b.build_cond_br(too_small, default_block, selector_block);

        // Load the 4-byte selector and swap it to host order.
        b.position_at_end(selector_block);
        let sel_buf = b.build_alloca(IrType::I32);
        let zero = b.const_int(IrType::I32, 0);
        b.build_call("callDataCopy", vec![sel_buf, zero, four], IrType::Void);
        let raw = b.build_load(IrType::I32, sel_buf);
        let selector = emit_bswap32(&mut b, raw);

        // One comparison block per externally-callable member.
        let dispatched: Vec<FunctionId> = self
            .ast
            .contract(contract)
            .functions
            .iter()
            .copied()
            .filter(|&f| self.ast.function(f).visibility.is_externally_callable())
            .collect();

        for func in dispatched {
            let signature = abi::canonical_signature(self.ast, self.types, self.interner, func);
            let sel_value = abi::selector(&signature);
            debug!(signature = %signature, selector = sel_value, "dispatch entry");

            let call_block = b.create_block("call");
            let next_block = b.create_block("check");
            let expected = b.const_int(IrType::I32, u128::from(sel_value));
            let matches = b.build_icmp(IcmpPred::Eq, selector, expected);
            b.build_cond_br(matches, call_block, next_block);

            b.position_at_end(call_block);
            self.emit_dispatch_call(&mut b, contract, func)?;
            b.position_at_end(next_block);
        }

        // No selector matched.
        b.build_br(default_block);

        b.position_at_end(default_block);
        match self.ast.contract(contract).fallback {
            Some(fallback) => {
                let symbol = self.mangled_name(contract, fallback);
                b.build_call(&symbol, vec![], IrType::Void);
                b.build_ret(None);
            }
            None => {
                let buf = b.build_alloca(IrType::I256);
                let len = b.const_int(IrType::I32, 0);
                b.build_call("revert", vec![buf, len], IrType::Void);
                b.build_unreachable();
            }
        }

        self.module.add_function(b.finish());
        Ok(())
    }

    /// Decode arguments, call the member, encode the result, finish.
    fn emit_dispatch_call(
        &mut self,
        b: &mut Builder,
        contract: ContractId,
        func: FunctionId,
    ) -> Result<(), CodeGenError> {
        let decl = self.ast.function(func);
        let params = decl.params.params.clone();
        let ret_ty = decl.returns.params.first().map(|&p| self.ast.var(p).ty);
        let symbol = self.mangled_name(contract, func);

        let mut args = Vec::new();
        let mut offset = 4u32;
        for param in params {
            let ty = self.ast.var(param).ty;
            if self.types.get(ty).is_dynamic() {
                let (ptr, len) = emit_abi_load_param_dynamic(b, offset);
                args.push(ptr);
                args.push(len);
            } else {
                let ir_ty = self.cache.ir_type(self.types, ty);
                let signed = self.cache.is_signed(self.types, ty);
                let fixed_bytes = matches!(self.types.get(ty), Ty::FixedBytes(_));
                args.push(emit_abi_load_param_static(
                    b,
                    ir_ty,
                    signed,
                    fixed_bytes,
                    offset,
                ));
            }
            offset += 32;
        }

        let ir_ret = match ret_ty {
            Some(ty) => self.cache.ir_type(self.types, ty),
            None => IrType::Void,
        };
        let result = b.build_call(&symbol, args, ir_ret);

        match (result, ret_ty) {
            (Some(value), Some(ty)) if !self.types.get(ty).is_dynamic() => {
                let signed = self.cache.is_signed(self.types, ty);
                emit_abi_store_static(b, value, signed);
            }
            _ => {
                // No declared (static) result: finish with empty data.
                let buf = b.build_alloca(IrType::I256);
                let len = b.const_int(IrType::I32, 0);
                b.build_call("finish", vec![buf, len], IrType::Void);
            }
        }
        b.build_ret(None);
        Ok(())
    }
}

/// Byte-swap an i32 with shifts and masks (selector endian conversion).
fn emit_bswap32(b: &mut Builder, raw: ValueId) -> ValueId {
    let c24 = b.const_int(IrType::I32, 24);
    let c8 = b.const_int(IrType::I32, 8);
    let mask1 = b.const_int(IrType::I32, 0xFF00);
    let mask2 = b.const_int(IrType::I32, 0xFF_0000);

    let hi = b.build_binary(IrBinOp::LShr, raw, c24);
    let mid_hi_shift = b.build_binary(IrBinOp::LShr, raw, c8);
    let mid_hi = b.build_binary(IrBinOp::And, mid_hi_shift, mask1);
    let mid_lo_shift = b.build_binary(IrBinOp::Shl, raw, c8);
    let mid_lo = b.build_binary(IrBinOp::And, mid_lo_shift, mask2);
    let lo = b.build_binary(IrBinOp::Shl, raw, c24);

    let upper = b.build_binary(IrBinOp::Or, hi, mid_hi);
    let lower = b.build_binary(IrBinOp::Or, mid_lo, lo);
    b.build_binary(IrBinOp::Or, upper, lower)
}

/// Read one static parameter from call data at a fixed offset:
/// copy the 32-byte slot, endian-convert, then narrow to the target
/// width. Fixed-bytes values are left-aligned in their slot and are
/// shifted down before narrowing.
fn emit_abi_load_param_static(
    b: &mut Builder,
    ir_ty: IrType,
    signed: bool,
    fixed_bytes: bool,
    offset: u32,
) -> ValueId {
    let buf = b.build_alloca(IrType::I256);
    let off = b.const_int(IrType::I32, u128::from(offset));
    let thirty_two = b.const_int(IrType::I32, 32);
    b.build_call("callDataCopy", vec![buf, off, thirty_two], IrType::Void);
    let word = b.build_load(IrType::I256, buf);
    let host = b
        .build_call("bswap256", vec![word], IrType::I256)
        .expect("bswap256 returns a value");
    let aligned = if fixed_bytes {
        let bits = match ir_ty {
            IrType::Int(bits) => bits,
            _ => 256,
        };
        let shift = b.const_int(IrType::I256, u128::from(256 - bits));
        b.build_binary(IrBinOp::LShr, host, shift)
    } else {
        host
    };
    b.build_int_resize(aligned, ir_ty, signed)
}

/// Read one dynamic parameter: head offset, then length, then payload.
/// Returns the `(pointer, length)` pair.
fn emit_abi_load_param_dynamic(b: &mut Builder, offset: u32) -> (ValueId, ValueId) {
    let thirty_two = b.const_int(IrType::I32, 32);

    let head_buf = b.build_alloca(IrType::I256);
    let head_off = b.const_int(IrType::I32, u128::from(offset));
    b.build_call(
        "callDataCopy",
        vec![head_buf, head_off, thirty_two],
        IrType::Void,
    );
    let head_word = b.build_load(IrType::I256, head_buf);
    let head = b
        .build_call("bswap256", vec![head_word], IrType::I256)
        .expect("bswap256 returns a value");
    let head32 = b.build_int_resize(head, IrType::I32, false);
    let four = b.const_int(IrType::I32, 4);
    let len_off = b.build_binary(IrBinOp::Add, head32, four);

    let len_buf = b.build_alloca(IrType::I256);
    b.build_call(
        "callDataCopy",
        vec![len_buf, len_off, thirty_two],
        IrType::Void,
    );
    let len_word = b.build_load(IrType::I256, len_buf);
    let len = b
        .build_call("bswap256", vec![len_word], IrType::I256)
        .expect("bswap256 returns a value");
    let len32 = b.build_int_resize(len, IrType::I32, false);

    let payload = b.build_array_alloca(IrType::Int(8), len32);
    let data_off = b.build_binary(IrBinOp::Add, len_off, thirty_two);
    b.build_call(
        "callDataCopy",
        vec![payload, data_off, len32],
        IrType::Void,
    );
    (payload, len)
}

/// Encode a static result into one 32-byte big-endian slot and finish.
fn emit_abi_store_static(b: &mut Builder, value: ValueId, signed: bool) {
    let wide = b.build_int_resize(value, IrType::I256, signed);
    let be = b
        .build_call("bswap256", vec![wide], IrType::I256)
        .expect("bswap256 returns a value");
    let buf = b.build_alloca(IrType::I256);
    b.build_store(be, buf);
    let thirty_two = b.const_int(IrType::I32, 32);
    b.build_call("finish", vec![buf, thirty_two], IrType::Void);
}
