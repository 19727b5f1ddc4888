//! Function-body code generation.
//!
//! A statement/expression visitor that emits SSA for a single function.
//! Locals live behind allocas (`local_addr_table` maps names to
//! addresses); sub-expression results are memoized in `temp_value_table`;
//! loop headers are recorded in `basic_block_table`. All returns converge
//! on `end_of_func`, which loads `ret_val` and emits the final `ret`.
//!
//! Lvalues and rvalues: an identifier naming a storage variable lowers to
//! its slot, a local to its alloca address. Any operator that consumes an
//! rvalue reads through the place first — a `load` for memory, a
//! `bswap256(storageLoad(slot))` for storage. Assignments store the other
//! way around (`storageStore(slot, bswap256(v))`).

use rustc_hash::FxHashMap;
use sol_ir::{
    Ast, BinaryOp, CastKind, DeclRef, ExprId, ExprKind, FunctionId, Name, Span, StmtId, StmtKind,
    StringInterner, Ty, TyId, TypeTable, UnaryOp,
};
use sol_ssa::{BlockId, Builder, Function, IcmpPred, IrBinOp, IrType, ValueId};

use crate::{abi, CodeGenError, TypeCache};

/// A state variable initialization the constructor performs.
pub(crate) struct StateInit {
    pub slot: u64,
    pub init: Option<ExprId>,
    pub ty: TyId,
}

/// Result of lowering an expression.
#[derive(Copy, Clone)]
enum Lowered {
    /// Address of a memory location.
    Addr(ValueId),
    /// Storage slot key (an `i256` value).
    Slot(ValueId),
    /// A plain SSA value.
    Value(ValueId),
    /// Pointer plus length (dynamic data).
    Buffer { ptr: ValueId, len: ValueId },
    /// Nothing (void calls, bare declaration references).
    Unit,
}

struct LoopTargets {
    continue_dest: BlockId,
    break_dest: BlockId,
}

/// Context for lowering one function body.
pub(crate) struct FuncBodyCodeGen<'a> {
    ast: &'a Ast,
    types: &'a TypeTable,
    interner: &'a StringInterner,
    cache: &'a mut TypeCache,
    contract_name: &'a str,
}

impl<'a> FuncBodyCodeGen<'a> {
    pub(crate) fn new(
        ast: &'a Ast,
        types: &'a TypeTable,
        interner: &'a StringInterner,
        cache: &'a mut TypeCache,
        contract_name: &'a str,
    ) -> Self {
        FuncBodyCodeGen {
            ast,
            types,
            interner,
            cache,
            contract_name,
        }
    }

    /// Compile `decl` (or a synthesized empty function when `None`, used
    /// for implicit constructors) into an IR function named `symbol`.
    /// `state_inits` is the constructor prologue.
    pub(crate) fn compile(
        self,
        decl: Option<FunctionId>,
        symbol: &str,
        state_inits: &[StateInit],
    ) -> Result<Function, CodeGenError> {
        let mut params = Vec::new();
        let mut bindings = Vec::new();
        let mut ret_ir_ty = IrType::Void;

        if let Some(fd) = decl {
            let func = self.ast.function(fd);
            for &p in &func.params.params {
                let var = self.ast.var(p);
                let name = self.interner.lookup(var.name);
                let is_dynamic = self.types.get(var.ty).is_dynamic();
                let ir_ty = self.cache.ir_type(self.types, var.ty);
                params.push((name.to_owned(), ir_ty));
                if is_dynamic {
                    // Dynamic parameters travel as (pointer, length).
                    params.push((format!("{name}.len"), IrType::I256));
                }
                bindings.push((var.name, ir_ty, is_dynamic));
            }
            if let Some(&r) = func.returns.params.first() {
                ret_ir_ty = self.cache.ir_type(self.types, self.ast.var(r).ty);
            }
        }

        let mut builder = Builder::new(Function::new(symbol, params, ret_ir_ty));
        let entry = builder.create_block("entry");
        let end_of_func = builder.create_block("end");
        builder.position_at_end(entry);

        let ret_val = if ret_ir_ty.is_void() {
            None
        } else {
            Some(builder.build_alloca(ret_ir_ty))
        };

        let mut emitter = Emitter {
            ast: self.ast,
            types: self.types,
            interner: self.interner,
            cache: self.cache,
            contract_name: self.contract_name,
            builder,
            local_addr_table: FxHashMap::default(),
            temp_value_table: FxHashMap::default(),
            basic_block_table: FxHashMap::default(),
            loop_stack: Vec::new(),
            end_of_func,
            ret_val,
            ret_ir_ty,
        };

        // Make parameters addressable.
        let mut ir_idx = 0usize;
        for (name, ir_ty, is_dynamic) in bindings {
            let value = emitter.builder.param(ir_idx);
            ir_idx += 1;
            let slot = emitter.builder.build_alloca(ir_ty);
            emitter.builder.build_store(value, slot);
            if !name.is_empty() {
                emitter.local_addr_table.insert(name, slot);
            }
            if is_dynamic {
                let len_value = emitter.builder.param(ir_idx);
                ir_idx += 1;
                let len_slot = emitter.builder.build_alloca(IrType::I256);
                emitter.builder.build_store(len_value, len_slot);
                if !name.is_empty() {
                    let len_name = emitter
                        .interner
                        .intern(&format!("{}.len", emitter.interner.lookup(name)));
                    emitter.local_addr_table.insert(len_name, len_slot);
                }
            }
        }

        for init in state_inits {
            emitter.emit_state_init(init)?;
        }

        if let Some(fd) = decl {
            if let Some(body) = self.ast.function(fd).body {
                emitter.visit_stmt(body)?;
            }
        }

        if !emitter.builder.is_terminated() {
            emitter.builder.build_br(end_of_func);
        }
        emitter.builder.position_at_end(end_of_func);
        match emitter.ret_val {
            Some(slot) => {
                let value = emitter.builder.build_load(ret_ir_ty, slot);
                emitter.builder.build_ret(Some(value));
            }
            None => emitter.builder.build_ret(None),
        }

        Ok(emitter.builder.finish())
    }
}

struct Emitter<'a> {
    ast: &'a Ast,
    types: &'a TypeTable,
    interner: &'a StringInterner,
    cache: &'a mut TypeCache,
    contract_name: &'a str,
    builder: Builder,
    local_addr_table: FxHashMap<Name, ValueId>,
    temp_value_table: FxHashMap<ExprId, ValueId>,
    basic_block_table: FxHashMap<StmtId, BlockId>,
    loop_stack: Vec<LoopTargets>,
    end_of_func: BlockId,
    ret_val: Option<ValueId>,
    ret_ir_ty: IrType,
}

impl<'a> Emitter<'a> {
    fn error(&self, message: impl Into<String>, span: Span) -> CodeGenError {
        CodeGenError::new(message, span)
    }

    fn expr_ty(&self, expr: ExprId) -> Result<TyId, CodeGenError> {
        self.ast
            .expr(expr)
            .ty
            .ok_or_else(|| self.error("expression lacks a type", self.ast.expr(expr).span))
    }

    fn expr_ir_ty(&mut self, expr: ExprId) -> Result<IrType, CodeGenError> {
        let ty = self.expr_ty(expr)?;
        Ok(self.cache.ir_type(self.types, ty))
    }

    fn expr_signed(&self, expr: ExprId) -> bool {
        match self.ast.expr(expr).ty {
            Some(ty) => self.cache.is_signed(self.types, ty),
            None => false,
        }
    }

    /// Continue emission in a fresh unreachable block after a terminator.
    fn start_dead_block(&mut self) {
        let dead = self.builder.create_block("dead");
        self.builder.position_at_end(dead);
    }

    // --- Places and values ---

    /// Read a value out of a lowered place.
    fn read(&mut self, lowered: Lowered, ty: IrType, span: Span) -> Result<ValueId, CodeGenError> {
        match lowered {
            Lowered::Value(v) => Ok(v),
            Lowered::Addr(ptr) => Ok(self.builder.build_load(ty, ptr)),
            Lowered::Slot(slot) => {
                let raw = self
                    .builder
                    .build_call("storageLoad", vec![slot], IrType::I256)
                    .expect("storageLoad returns a value");
                let host = self
                    .builder
                    .build_call("bswap256", vec![raw], IrType::I256)
                    .expect("bswap256 returns a value");
                Ok(self.builder.build_int_resize(host, ty, false))
            }
            Lowered::Buffer { ptr, .. } => Ok(ptr),
            Lowered::Unit => Err(self.error("expected a value", span)),
        }
    }

    /// Store a value into a lowered place.
    fn write(
        &mut self,
        lowered: Lowered,
        value: ValueId,
        signed: bool,
        span: Span,
    ) -> Result<(), CodeGenError> {
        match lowered {
            Lowered::Addr(ptr) => {
                self.builder.build_store(value, ptr);
                Ok(())
            }
            Lowered::Slot(slot) => {
                let wide = self.builder.build_int_resize(value, IrType::I256, signed);
                let be = self
                    .builder
                    .build_call("bswap256", vec![wide], IrType::I256)
                    .expect("bswap256 returns a value");
                self.builder
                    .build_call("storageStore", vec![slot, be], IrType::Void);
                Ok(())
            }
            _ => Err(self.error("assignment target is not a place", span)),
        }
    }

    fn visit_rvalue(&mut self, expr: ExprId) -> Result<ValueId, CodeGenError> {
        let ty = self.expr_ir_ty(expr)?;
        let span = self.ast.expr(expr).span;
        let lowered = self.visit_expr(expr)?;
        self.read(lowered, ty, span)
    }

    /// Collapse an integer/boolean into an `i1`.
    fn to_bool(&mut self, value: ValueId, span: Span) -> Result<ValueId, CodeGenError> {
        match self.builder.value_ty(value) {
            IrType::I1 => Ok(value),
            IrType::Int(_) => {
                let ty = self.builder.value_ty(value);
                let zero = self.builder.const_int(ty, 0);
                Ok(self.builder.build_icmp(IcmpPred::Ne, value, zero))
            }
            _ => Err(self.error("condition is not a boolean", span)),
        }
    }

    /// All-ones constant of an integer type (for bitwise not).
    fn all_ones(&mut self, ty: IrType) -> ValueId {
        match ty {
            IrType::Int(bits) if bits < 128 => {
                self.builder.const_int(ty, (1u128 << bits) - 1)
            }
            IrType::Int(128) => self.builder.const_int(ty, u128::MAX),
            IrType::I1 => self.builder.const_int(ty, 1),
            _ => self.builder.const_big(ty, [0xFF; 32]),
        }
    }

    /// Materialize a byte string as a stack buffer.
    fn emit_byte_buffer(&mut self, bytes: &[u8]) -> Lowered {
        let count = self
            .builder
            .const_int(IrType::I32, bytes.len() as u128);
        let ptr = self.builder.build_array_alloca(IrType::Int(8), count);
        for (i, &byte) in bytes.iter().enumerate() {
            let offset = self.builder.const_int(IrType::I256, i as u128);
            let slot = self.builder.build_ptr_add(ptr, offset);
            let value = self.builder.const_int(IrType::Int(8), u128::from(byte));
            self.builder.build_store(value, slot);
        }
        let len = self
            .builder
            .const_int(IrType::I256, bytes.len() as u128);
        Lowered::Buffer { ptr, len }
    }

    fn emit_state_init(&mut self, init: &StateInit) -> Result<(), CodeGenError> {
        let slot = self.builder.const_int(IrType::I256, u128::from(init.slot));
        let value = match init.init {
            Some(expr) => {
                let signed = self.cache.is_signed(self.types, init.ty);
                let v = self.visit_rvalue(expr)?;
                let wide = self.builder.build_int_resize(v, IrType::I256, signed);
                self.builder
                    .build_call("bswap256", vec![wide], IrType::I256)
                    .expect("bswap256 returns a value")
            }
            None => self.builder.const_int(IrType::I256, 0),
        };
        self.builder
            .build_call("storageStore", vec![slot, value], IrType::Void);
        Ok(())
    }

    // --- Statements ---

    fn visit_stmt(&mut self, stmt: StmtId) -> Result<(), CodeGenError> {
        let span = self.ast.stmt(stmt).span;
        match &self.ast.stmt(stmt).kind {
            StmtKind::Block(stmts) => {
                for &s in stmts.clone().iter() {
                    self.visit_stmt(s)?;
                }
                Ok(())
            }
            StmtKind::If {
                cond,
                then_stmt,
                else_stmt,
            } => {
                let (cond, then_stmt, else_stmt) = (*cond, *then_stmt, *else_stmt);
                let cond_value = self.visit_rvalue(cond)?;
                let cond_value = self.to_bool(cond_value, span)?;

                let then_bb = self.builder.create_block("if.then");
                let merge_bb = self.builder.create_block("if.end");
                let else_bb = match else_stmt {
                    Some(_) => self.builder.create_block("if.else"),
                    None => merge_bb,
                };
                self.basic_block_table.insert(stmt, then_bb);
                self.builder.build_cond_br(cond_value, then_bb, else_bb);

                self.builder.position_at_end(then_bb);
                self.visit_stmt(then_stmt)?;
                if !self.builder.is_terminated() {
                    self.builder.build_br(merge_bb);
                }

                if let Some(else_stmt) = else_stmt {
                    self.builder.position_at_end(else_bb);
                    self.visit_stmt(else_stmt)?;
                    if !self.builder.is_terminated() {
                        self.builder.build_br(merge_bb);
                    }
                }
                self.builder.position_at_end(merge_bb);
                Ok(())
            }
            StmtKind::While {
                cond,
                body,
                is_do_while,
            } => {
                let (cond, body, is_do_while) = (*cond, *body, *is_do_while);
                let cond_bb = self.builder.create_block("while.cond");
                let body_bb = self.builder.create_block("while.body");
                let exit_bb = self.builder.create_block("while.end");
                self.basic_block_table.insert(stmt, cond_bb);

                // A do-while tests at the tail: enter the body first.
                self.builder
                    .build_br(if is_do_while { body_bb } else { cond_bb });

                self.builder.position_at_end(cond_bb);
                let cond_value = self.visit_rvalue(cond)?;
                let cond_value = self.to_bool(cond_value, span)?;
                self.builder.build_cond_br(cond_value, body_bb, exit_bb);

                self.builder.position_at_end(body_bb);
                self.loop_stack.push(LoopTargets {
                    continue_dest: cond_bb,
                    break_dest: exit_bb,
                });
                self.visit_stmt(body)?;
                self.loop_stack.pop();
                if !self.builder.is_terminated() {
                    self.builder.build_br(cond_bb);
                }

                self.builder.position_at_end(exit_bb);
                Ok(())
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let (init, cond, step, body) = (*init, *cond, *step, *body);
                if let Some(init) = init {
                    self.visit_stmt(init)?;
                }
                let cond_bb = self.builder.create_block("for.cond");
                let body_bb = self.builder.create_block("for.body");
                let step_bb = self.builder.create_block("for.inc");
                let exit_bb = self.builder.create_block("for.end");
                self.basic_block_table.insert(stmt, cond_bb);

                self.builder.build_br(cond_bb);
                self.builder.position_at_end(cond_bb);
                match cond {
                    Some(cond) => {
                        let value = self.visit_rvalue(cond)?;
                        let value = self.to_bool(value, span)?;
                        self.builder.build_cond_br(value, body_bb, exit_bb);
                    }
                    None => self.builder.build_br(body_bb),
                }

                self.builder.position_at_end(body_bb);
                self.loop_stack.push(LoopTargets {
                    continue_dest: step_bb,
                    break_dest: exit_bb,
                });
                self.visit_stmt(body)?;
                self.loop_stack.pop();
                if !self.builder.is_terminated() {
                    self.builder.build_br(step_bb);
                }

                self.builder.position_at_end(step_bb);
                if let Some(step) = step {
                    self.visit_expr(step)?;
                }
                self.builder.build_br(cond_bb);

                self.builder.position_at_end(exit_bb);
                Ok(())
            }
            StmtKind::Continue => {
                let dest = self
                    .loop_stack
                    .last()
                    .map(|t| t.continue_dest)
                    .ok_or_else(|| self.error("continue outside of a loop", span))?;
                self.builder.build_br(dest);
                self.start_dead_block();
                Ok(())
            }
            StmtKind::Break => {
                let dest = self
                    .loop_stack
                    .last()
                    .map(|t| t.break_dest)
                    .ok_or_else(|| self.error("break outside of a loop", span))?;
                self.builder.build_br(dest);
                self.start_dead_block();
                Ok(())
            }
            StmtKind::Return { value } => {
                let value = *value;
                if let Some(expr) = value {
                    let v = self.visit_rvalue(expr)?;
                    if let Some(slot) = self.ret_val {
                        let signed = self.expr_signed(expr);
                        let resized = self.builder.build_int_resize(v, self.ret_ir_ty, signed);
                        self.builder.build_store(resized, slot);
                    }
                }
                self.builder.build_br(self.end_of_func);
                self.start_dead_block();
                Ok(())
            }
            StmtKind::Decl { vars, init } => {
                let (vars, init) = (vars.clone(), *init);
                for var in vars {
                    self.emit_local_decl(var, init)?;
                }
                Ok(())
            }
            StmtKind::Emit { call } => self.emit_event(*call, span),
            StmtKind::Expr(expr) => {
                let expr = *expr;
                self.visit_expr(expr)?;
                Ok(())
            }
        }
    }

    fn emit_local_decl(
        &mut self,
        var: sol_ir::VarId,
        init: Option<ExprId>,
    ) -> Result<(), CodeGenError> {
        let decl = self.ast.var(var);
        let (name, ty, span) = (decl.name, decl.ty, decl.span);
        let signed = self.cache.is_signed(self.types, ty);

        let slot = match self.types.get(ty) {
            Ty::Array {
                len: Some(len), ..
            } => {
                // Fixed-size in-memory array: one word per element.
                let count = self.builder.const_int(IrType::I32, u128::from(*len));
                self.builder.build_array_alloca(IrType::I256, count)
            }
            _ => {
                let ir_ty = self.cache.ir_type(self.types, ty);
                self.builder.build_alloca(ir_ty)
            }
        };
        if !name.is_empty() {
            self.local_addr_table.insert(name, slot);
        }

        if let Some(init) = init {
            if let Ty::Array { len, .. } = self.types.get(ty) {
                // Copy the source aggregate into the fresh allocation,
                // one word per element.
                let Some(len) = *len else {
                    return Err(
                        self.error("dynamic array initializers are not supported", span)
                    );
                };
                let src = self.aggregate_base(init)?;
                let bytes = self.builder.const_int(IrType::I32, u128::from(len) * 32);
                self.builder
                    .build_call("memcpy", vec![slot, src, bytes], IrType::Ptr);
                return Ok(());
            }
            let ir_ty = self.cache.ir_type(self.types, ty);
            let value = self.visit_rvalue(init)?;
            let value = self.builder.build_int_resize(value, ir_ty, signed);
            self.builder.build_store(value, slot);
        }
        Ok(())
    }

    /// Base pointer of an aggregate-valued expression. Reads through the
    /// value-category casts the actions layer inserted: for an in-memory
    /// array, the place itself is the base pointer.
    fn aggregate_base(&mut self, expr: ExprId) -> Result<ValueId, CodeGenError> {
        let mut expr = expr;
        loop {
            match &self.ast.expr(expr).kind {
                ExprKind::Paren(sub) => expr = *sub,
                ExprKind::ImplicitCast {
                    kind: CastKind::LValueToRValue,
                    sub,
                } => expr = *sub,
                _ => break,
            }
        }
        let span = self.ast.expr(expr).span;
        match self.visit_expr(expr)? {
            Lowered::Addr(ptr) | Lowered::Value(ptr) | Lowered::Buffer { ptr, .. } => Ok(ptr),
            Lowered::Slot(_) => {
                Err(self.error("copying a storage aggregate into memory is not supported", span))
            }
            Lowered::Unit => Err(self.error("array initializer has no address", span)),
        }
    }

    /// `emit Event(args)` lowers to `logN` with topic 0 = the event's
    /// signature hash (unless anonymous) and one topic per indexed
    /// parameter; the remaining arguments form the data payload.
    fn emit_event(&mut self, call: ExprId, span: Span) -> Result<(), CodeGenError> {
        let (callee, args) = match &self.ast.expr(call).kind {
            ExprKind::Call { callee, args } => (*callee, args.clone()),
            _ => return Err(self.error("emit payload is not a call", span)),
        };
        let event = match &self.ast.expr(self.strip_parens(callee)).kind {
            ExprKind::Ident {
                decl: Some(DeclRef::Event(event)),
                ..
            } => *event,
            _ => return Err(self.error("emit target does not name an event", span)),
        };

        let decl = self.ast.event(event);
        let anonymous = decl.anonymous;
        let params = decl.params.params.clone();
        let signature = abi::event_signature(self.ast, self.types, self.interner, event);
        let topic_hash = abi::signature_hash(&signature);

        let mut indexed_args = Vec::new();
        let mut data_args = Vec::new();
        for (i, &arg) in args.iter().enumerate() {
            let is_indexed = params
                .get(i)
                .map(|&p| self.ast.var(p).is_indexed)
                .unwrap_or(false);
            if is_indexed {
                indexed_args.push(arg);
            } else {
                data_args.push(arg);
            }
        }

        // Topics: signature hash first, then each indexed argument as a
        // big-endian word.
        let mut topics = Vec::new();
        if !anonymous {
            let buf = self.builder.build_alloca(IrType::I256);
            let hash = self.builder.const_big(IrType::I256, topic_hash);
            self.builder.build_store(hash, buf);
            topics.push(buf);
        }
        for arg in indexed_args {
            let signed = self.expr_signed(arg);
            let value = self.visit_rvalue(arg)?;
            let wide = self.builder.build_int_resize(value, IrType::I256, signed);
            let be = self
                .builder
                .build_call("bswap256", vec![wide], IrType::I256)
                .expect("bswap256 returns a value");
            let buf = self.builder.build_alloca(IrType::I256);
            self.builder.build_store(be, buf);
            topics.push(buf);
        }
        if topics.len() > 4 {
            return Err(self.error("events support at most four topics", span));
        }

        // Data payload.
        let (data_ptr, data_len) = if data_args.len() == 1 {
            match self.visit_expr(data_args[0])? {
                Lowered::Buffer { ptr, len } => {
                    let len32 = self.builder.build_int_resize(len, IrType::I32, false);
                    (ptr, len32)
                }
                lowered => {
                    let ty = self.expr_ir_ty(data_args[0])?;
                    let arg_span = self.ast.expr(data_args[0]).span;
                    let value = self.read(lowered, ty, arg_span)?;
                    self.emit_static_data_word(value, self.expr_signed(data_args[0]))?
                }
            }
        } else {
            self.emit_static_data_words(&data_args, span)?
        };

        let callee = format!("log{}", topics.len());
        let mut log_args = vec![data_ptr, data_len];
        log_args.extend(topics);
        self.builder.build_call(&callee, log_args, IrType::Void);
        Ok(())
    }

    /// One static argument as a single 32-byte data word.
    fn emit_static_data_word(
        &mut self,
        value: ValueId,
        signed: bool,
    ) -> Result<(ValueId, ValueId), CodeGenError> {
        let wide = self.builder.build_int_resize(value, IrType::I256, signed);
        let be = self
            .builder
            .build_call("bswap256", vec![wide], IrType::I256)
            .expect("bswap256 returns a value");
        let buf = self.builder.build_alloca(IrType::I256);
        self.builder.build_store(be, buf);
        let len = self.builder.const_int(IrType::I32, 32);
        Ok((buf, len))
    }

    /// Several static arguments packed into consecutive 32-byte words.
    fn emit_static_data_words(
        &mut self,
        args: &[ExprId],
        span: Span,
    ) -> Result<(ValueId, ValueId), CodeGenError> {
        let count = self
            .builder
            .const_int(IrType::I32, args.len().max(1) as u128);
        let buf = self.builder.build_array_alloca(IrType::I256, count);
        for (i, &arg) in args.iter().enumerate() {
            let ty = self.expr_ty(arg)?;
            if self.types.get(ty).is_dynamic() {
                return Err(
                    self.error("mixed static and dynamic event data is not supported", span)
                );
            }
            let signed = self.cache.is_signed(self.types, ty);
            let value = self.visit_rvalue(arg)?;
            let wide = self.builder.build_int_resize(value, IrType::I256, signed);
            let be = self
                .builder
                .build_call("bswap256", vec![wide], IrType::I256)
                .expect("bswap256 returns a value");
            let offset = self.builder.const_int(IrType::I256, (i * 32) as u128);
            let slot = self.builder.build_ptr_add(buf, offset);
            self.builder.build_store(be, slot);
        }
        let len = self
            .builder
            .const_int(IrType::I32, (args.len() * 32) as u128);
        Ok((buf, len))
    }

    // --- Expressions ---

    fn strip_parens(&self, mut expr: ExprId) -> ExprId {
        while let ExprKind::Paren(sub) = &self.ast.expr(expr).kind {
            expr = *sub;
        }
        expr
    }

    fn visit_expr(&mut self, expr: ExprId) -> Result<Lowered, CodeGenError> {
        // Memoized sub-expressions produce their recorded value again
        // instead of re-emitting (and re-executing side effects).
        if let Some(&value) = self.temp_value_table.get(&expr) {
            return Ok(Lowered::Value(value));
        }
        let lowered = self.visit_expr_uncached(expr)?;
        if let Lowered::Value(value) = lowered {
            self.temp_value_table.insert(expr, value);
        }
        Ok(lowered)
    }

    fn visit_expr_uncached(&mut self, expr: ExprId) -> Result<Lowered, CodeGenError> {
        let span = self.ast.expr(expr).span;
        match &self.ast.expr(expr).kind {
            ExprKind::Ident { name, decl } => {
                let (name, decl) = (*name, *decl);
                match decl {
                    Some(DeclRef::Var(var)) => {
                        if self.ast.var(var).is_state {
                            let slot = self.cache.state_var_slot(var);
                            let key = self.builder.const_int(IrType::I256, u128::from(slot));
                            Ok(Lowered::Slot(key))
                        } else {
                            let ptr = self.local_addr_table.get(&name).copied().ok_or_else(
                                || {
                                    self.error(
                                        format!(
                                            "local `{}` has no address",
                                            self.interner.lookup(name)
                                        ),
                                        span,
                                    )
                                },
                            )?;
                            Ok(Lowered::Addr(ptr))
                        }
                    }
                    Some(_) => Ok(Lowered::Unit),
                    None => Err(self.error("unresolved identifier in code generation", span)),
                }
            }
            ExprKind::BoolLit(value) => {
                let v = self.builder.const_int(IrType::I1, u128::from(*value));
                Ok(Lowered::Value(v))
            }
            ExprKind::NumberLit(value) => {
                let value = *value;
                let ty = self.expr_ir_ty(expr)?;
                Ok(Lowered::Value(self.builder.const_int(ty, value)))
            }
            ExprKind::StringLit(name) => {
                let bytes = self.interner.lookup(*name).as_bytes().to_vec();
                Ok(self.emit_byte_buffer(&bytes))
            }
            ExprKind::HexLit(bytes) => {
                let bytes = bytes.clone();
                Ok(self.emit_byte_buffer(&bytes))
            }
            ExprKind::Unary { op, sub, prefix } => self.visit_unary(*op, *sub, *prefix, span),
            ExprKind::Binary { op, lhs, rhs } => self.visit_binary(*op, *lhs, *rhs, span),
            ExprKind::Paren(sub) => self.visit_expr(*sub),
            ExprKind::ImplicitCast { kind, sub } | ExprKind::ExplicitCast { kind, sub } => {
                let (kind, sub) = (*kind, *sub);
                match kind {
                    CastKind::LValueToRValue => {
                        let ty = self.expr_ir_ty(expr)?;
                        let lowered = self.visit_expr(sub)?;
                        Ok(Lowered::Value(self.read(lowered, ty, span)?))
                    }
                    CastKind::IntegralCast | CastKind::TypeCast => {
                        let to = self.expr_ir_ty(expr)?;
                        let signed = self.expr_signed(sub);
                        let value = self.visit_rvalue(sub)?;
                        Ok(Lowered::Value(
                            self.builder.build_int_resize(value, to, signed),
                        ))
                    }
                }
            }
            ExprKind::Call { callee, args } => {
                let (callee, args) = (*callee, args.clone());
                self.visit_call(callee, &args, span)
            }
            ExprKind::Member { .. } => {
                Err(self.error("member access is not supported in code generation", span))
            }
            ExprKind::Index { base, index } => {
                let (base, index) = (*base, *index);
                self.visit_index(base, index, span)
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                let (cond, then_expr, else_expr) = (*cond, *then_expr, *else_expr);
                self.visit_conditional(expr, cond, then_expr, else_expr, span)
            }
            ExprKind::New(_) => Err(self.error("new expressions are not lowered", span)),
        }
    }

    fn visit_unary(
        &mut self,
        op: UnaryOp,
        sub: ExprId,
        prefix: bool,
        span: Span,
    ) -> Result<Lowered, CodeGenError> {
        match op {
            UnaryOp::Inc | UnaryOp::Dec => {
                let ty = self.expr_ir_ty(sub)?;
                let signed = self.expr_signed(sub);
                let place = self.visit_expr(sub)?;
                let old = self.read(place, ty, span)?;
                let one = self.builder.const_int(ty, 1);
                let binop = if op == UnaryOp::Inc {
                    IrBinOp::Add
                } else {
                    IrBinOp::Sub
                };
                let new = self.builder.build_binary(binop, old, one);
                self.write(place, new, signed, span)?;
                Ok(Lowered::Value(if prefix { new } else { old }))
            }
            UnaryOp::Plus => {
                let value = self.visit_rvalue(sub)?;
                Ok(Lowered::Value(value))
            }
            UnaryOp::Minus => {
                let value = self.visit_rvalue(sub)?;
                let ty = self.builder.value_ty(value);
                let zero = self.builder.const_int(ty, 0);
                Ok(Lowered::Value(
                    self.builder.build_binary(IrBinOp::Sub, zero, value),
                ))
            }
            UnaryOp::Not => {
                let value = self.visit_rvalue(sub)?;
                let value = self.to_bool(value, span)?;
                let one = self.builder.const_int(IrType::I1, 1);
                Ok(Lowered::Value(
                    self.builder.build_binary(IrBinOp::Xor, value, one),
                ))
            }
            UnaryOp::BitNot => {
                let value = self.visit_rvalue(sub)?;
                let ty = self.builder.value_ty(value);
                let mask = self.all_ones(ty);
                Ok(Lowered::Value(
                    self.builder.build_binary(IrBinOp::Xor, value, mask),
                ))
            }
            UnaryOp::AddrOf | UnaryOp::Deref => {
                Err(self.error("address-of and dereference are not supported", span))
            }
        }
    }

    fn visit_binary(
        &mut self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> Result<Lowered, CodeGenError> {
        if op == BinaryOp::Assign {
            let lhs_ty = self.expr_ir_ty(lhs)?;
            let signed = self.expr_signed(lhs);
            let value = self.visit_rvalue(rhs)?;
            let value = self.builder.build_int_resize(value, lhs_ty, signed);
            let place = self.visit_expr(lhs)?;
            self.write(place, value, signed, span)?;
            return Ok(Lowered::Value(value));
        }
        if let Some(base) = op.compound_base() {
            let lhs_ty = self.expr_ir_ty(lhs)?;
            let signed = self.expr_signed(lhs);
            let place = self.visit_expr(lhs)?;
            let current = self.read(place, lhs_ty, span)?;
            let rhs_value = self.visit_rvalue(rhs)?;
            let rhs_value = self.builder.build_int_resize(rhs_value, lhs_ty, signed);
            let result = self.emit_arith(base, current, rhs_value, signed, span)?;
            self.write(place, result, signed, span)?;
            return Ok(Lowered::Value(result));
        }

        if op.is_logical() {
            return self.emit_short_circuit(op, lhs, rhs, span);
        }

        let signed = self.expr_signed(lhs);
        let lhs_value = self.visit_rvalue(lhs)?;
        let rhs_value = self.visit_rvalue(rhs)?;

        if op.is_comparison() {
            let pred = comparison_pred(op, signed);
            return Ok(Lowered::Value(
                self.builder.build_icmp(pred, lhs_value, rhs_value),
            ));
        }
        let value = self.emit_arith(op, lhs_value, rhs_value, signed, span)?;
        Ok(Lowered::Value(value))
    }

    /// `&&`/`||` with short-circuit control flow: the right operand only
    /// evaluates when the left one doesn't decide the result. The operand
    /// values merge through memory, like `visit_conditional`.
    fn emit_short_circuit(
        &mut self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> Result<Lowered, CodeGenError> {
        let is_and = op == BinaryOp::LogicalAnd;
        let lhs_value = self.visit_rvalue(lhs)?;
        let lhs_bool = self.to_bool(lhs_value, span)?;
        let result = self.builder.build_alloca(IrType::I1);
        self.builder.build_store(lhs_bool, result);

        let rhs_bb = self
            .builder
            .create_block(if is_and { "land.rhs" } else { "lor.rhs" });
        let merge_bb = self
            .builder
            .create_block(if is_and { "land.end" } else { "lor.end" });
        if is_and {
            // false && _ is false without touching the right operand.
            self.builder.build_cond_br(lhs_bool, rhs_bb, merge_bb);
        } else {
            // true || _ is true without touching the right operand.
            self.builder.build_cond_br(lhs_bool, merge_bb, rhs_bb);
        }

        self.builder.position_at_end(rhs_bb);
        let rhs_value = self.visit_rvalue(rhs)?;
        let rhs_bool = self.to_bool(rhs_value, span)?;
        self.builder.build_store(rhs_bool, result);
        self.builder.build_br(merge_bb);

        self.builder.position_at_end(merge_bb);
        Ok(Lowered::Value(self.builder.build_load(IrType::I1, result)))
    }

    fn emit_arith(
        &mut self,
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
        signed: bool,
        span: Span,
    ) -> Result<ValueId, CodeGenError> {
        let ir_op = match op {
            BinaryOp::Add => IrBinOp::Add,
            BinaryOp::Sub => IrBinOp::Sub,
            BinaryOp::Mul => IrBinOp::Mul,
            BinaryOp::Div => {
                if signed {
                    IrBinOp::SDiv
                } else {
                    IrBinOp::UDiv
                }
            }
            BinaryOp::Rem => {
                if signed {
                    IrBinOp::SRem
                } else {
                    IrBinOp::URem
                }
            }
            BinaryOp::Shl => IrBinOp::Shl,
            BinaryOp::Shr => {
                if signed {
                    IrBinOp::AShr
                } else {
                    IrBinOp::LShr
                }
            }
            BinaryOp::BitAnd => IrBinOp::And,
            BinaryOp::BitOr => IrBinOp::Or,
            BinaryOp::BitXor => IrBinOp::Xor,
            BinaryOp::Exp => return self.emit_exp(lhs, rhs),
            _ => return Err(self.error("operator is not an arithmetic operation", span)),
        };
        Ok(self.builder.build_binary(ir_op, lhs, rhs))
    }

    /// Exponentiation by repeated multiplication.
    fn emit_exp(&mut self, base: ValueId, exponent: ValueId) -> Result<ValueId, CodeGenError> {
        let ty = self.builder.value_ty(base);
        let result = self.builder.build_alloca(ty);
        let one = self.builder.const_int(ty, 1);
        self.builder.build_store(one, result);
        let counter = self.builder.build_alloca(ty);
        self.builder.build_store(exponent, counter);

        let cond_bb = self.builder.create_block("pow.cond");
        let body_bb = self.builder.create_block("pow.body");
        let exit_bb = self.builder.create_block("pow.end");
        self.builder.build_br(cond_bb);

        self.builder.position_at_end(cond_bb);
        let remaining = self.builder.build_load(ty, counter);
        let zero = self.builder.const_int(ty, 0);
        let more = self.builder.build_icmp(IcmpPred::Ugt, remaining, zero);
        self.builder.build_cond_br(more, body_bb, exit_bb);

        self.builder.position_at_end(body_bb);
        let acc = self.builder.build_load(ty, result);
        let next = self.builder.build_binary(IrBinOp::Mul, acc, base);
        self.builder.build_store(next, result);
        let one_again = self.builder.const_int(ty, 1);
        let decremented = self
            .builder
            .build_binary(IrBinOp::Sub, remaining, one_again);
        self.builder.build_store(decremented, counter);
        self.builder.build_br(cond_bb);

        self.builder.position_at_end(exit_bb);
        Ok(self.builder.build_load(ty, result))
    }

    fn visit_call(
        &mut self,
        callee: ExprId,
        args: &[ExprId],
        span: Span,
    ) -> Result<Lowered, CodeGenError> {
        let target = self.strip_parens(callee);
        let func = match &self.ast.expr(target).kind {
            ExprKind::Ident {
                decl: Some(DeclRef::Function(func)),
                ..
            } => *func,
            ExprKind::Ident {
                decl: Some(DeclRef::Event(_)),
                ..
            } => {
                return Err(self.error("events can only be raised with `emit`", span));
            }
            _ => return Err(self.error("unsupported call target", span)),
        };

        let decl = self.ast.function(func);
        let param_vars = decl.params.params.clone();
        let ret_ty = decl.returns.params.first().map(|&p| self.ast.var(p).ty);
        let symbol = format!(
            "{}.{}",
            self.contract_name,
            self.interner.lookup(decl.name)
        );

        let mut lowered_args = Vec::new();
        for (i, &arg) in args.iter().enumerate() {
            let param_ty = param_vars.get(i).map(|&p| self.ast.var(p).ty);
            let dynamic = param_ty
                .map(|ty| self.types.get(ty).is_dynamic())
                .unwrap_or(false);
            if dynamic {
                match self.visit_expr(arg)? {
                    Lowered::Buffer { ptr, len } => {
                        lowered_args.push(ptr);
                        lowered_args.push(len);
                    }
                    lowered => {
                        let arg_span = self.ast.expr(arg).span;
                        let ptr = self.read(lowered, IrType::Ptr, arg_span)?;
                        let zero = self.builder.const_int(IrType::I256, 0);
                        lowered_args.push(ptr);
                        lowered_args.push(zero);
                    }
                }
            } else {
                let mut value = self.visit_rvalue(arg)?;
                if let Some(ty) = param_ty {
                    let ir_ty = self.cache.ir_type(self.types, ty);
                    let signed = self.cache.is_signed(self.types, ty);
                    value = self.builder.build_int_resize(value, ir_ty, signed);
                }
                lowered_args.push(value);
            }
        }

        let ir_ret = match ret_ty {
            Some(ty) => self.cache.ir_type(self.types, ty),
            None => IrType::Void,
        };
        match self.builder.build_call(&symbol, lowered_args, ir_ret) {
            Some(value) => Ok(Lowered::Value(value)),
            None => Ok(Lowered::Unit),
        }
    }

    fn visit_index(
        &mut self,
        base: ExprId,
        index: Option<ExprId>,
        span: Span,
    ) -> Result<Lowered, CodeGenError> {
        let index = index.ok_or_else(|| self.error("index expression is missing", span))?;
        let base_ty = self.expr_ty(base)?;
        let base_lowered = self.visit_expr(base)?;

        match self.types.get(base_ty).clone() {
            Ty::Mapping { key, .. } => {
                let slot = match base_lowered {
                    Lowered::Slot(slot) => slot,
                    _ => return Err(self.error("mapping is not in storage", span)),
                };
                // Storage key: keccak256(key ++ slot).
                let signed = self.cache.is_signed(self.types, key);
                let key_value = self.visit_rvalue(index)?;
                let wide = self.builder.build_int_resize(key_value, IrType::I256, signed);
                let key_be = self
                    .builder
                    .build_call("bswap256", vec![wide], IrType::I256)
                    .expect("bswap256 returns a value");
                let slot_be = self
                    .builder
                    .build_call("bswap256", vec![slot], IrType::I256)
                    .expect("bswap256 returns a value");

                let two = self.builder.const_int(IrType::I32, 2);
                let buf = self.builder.build_array_alloca(IrType::I256, two);
                self.builder.build_store(key_be, buf);
                let thirty_two = self.builder.const_int(IrType::I256, 32);
                let second = self.builder.build_ptr_add(buf, thirty_two);
                self.builder.build_store(slot_be, second);
                let sixty_four = self.builder.const_int(IrType::I32, 64);
                let hashed = self
                    .builder
                    .build_call("keccak256", vec![buf, sixty_four], IrType::I256)
                    .expect("keccak256 returns a value");
                Ok(Lowered::Slot(hashed))
            }
            Ty::Array { .. } | Ty::Bytes => {
                let idx = self.visit_rvalue(index)?;
                match base_lowered {
                    Lowered::Slot(slot) => {
                        let idx = self.builder.build_int_resize(idx, IrType::I256, false);
                        let key = self.builder.build_binary(IrBinOp::Add, slot, idx);
                        Ok(Lowered::Slot(key))
                    }
                    Lowered::Addr(ptr) | Lowered::Value(ptr) | Lowered::Buffer { ptr, .. } => {
                        let stride = if matches!(self.types.get(base_ty), Ty::Bytes) {
                            1
                        } else {
                            32
                        };
                        let idx = self.builder.build_int_resize(idx, IrType::I256, false);
                        let stride = self.builder.const_int(IrType::I256, stride);
                        let offset = self.builder.build_binary(IrBinOp::Mul, idx, stride);
                        let elem = self.builder.build_ptr_add(ptr, offset);
                        Ok(Lowered::Addr(elem))
                    }
                    Lowered::Unit => Err(self.error("cannot index this value", span)),
                }
            }
            _ => Err(self.error("type does not support indexing", span)),
        }
    }

    fn visit_conditional(
        &mut self,
        expr: ExprId,
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
        span: Span,
    ) -> Result<Lowered, CodeGenError> {
        let ty = self.expr_ir_ty(expr)?;
        let signed = self.expr_signed(expr);
        let slot = self.builder.build_alloca(ty);

        let cond_value = self.visit_rvalue(cond)?;
        let cond_value = self.to_bool(cond_value, span)?;
        let then_bb = self.builder.create_block("cond.then");
        let else_bb = self.builder.create_block("cond.else");
        let merge_bb = self.builder.create_block("cond.end");
        self.builder.build_cond_br(cond_value, then_bb, else_bb);

        self.builder.position_at_end(then_bb);
        let then_value = self.visit_rvalue(then_expr)?;
        let then_value = self.builder.build_int_resize(then_value, ty, signed);
        self.builder.build_store(then_value, slot);
        self.builder.build_br(merge_bb);

        self.builder.position_at_end(else_bb);
        let else_value = self.visit_rvalue(else_expr)?;
        let else_value = self.builder.build_int_resize(else_value, ty, signed);
        self.builder.build_store(else_value, slot);
        self.builder.build_br(merge_bb);

        self.builder.position_at_end(merge_bb);
        Ok(Lowered::Value(self.builder.build_load(ty, slot)))
    }
}

fn comparison_pred(op: BinaryOp, signed: bool) -> IcmpPred {
    match (op, signed) {
        (BinaryOp::Eq, _) => IcmpPred::Eq,
        (BinaryOp::Ne, _) => IcmpPred::Ne,
        (BinaryOp::Lt, false) => IcmpPred::Ult,
        (BinaryOp::Lt, true) => IcmpPred::Slt,
        (BinaryOp::Le, false) => IcmpPred::Ule,
        (BinaryOp::Le, true) => IcmpPred::Sle,
        (BinaryOp::Gt, false) => IcmpPred::Ugt,
        (BinaryOp::Gt, true) => IcmpPred::Sgt,
        (BinaryOp::Ge, false) => IcmpPred::Uge,
        (BinaryOp::Ge, true) => IcmpPred::Sge,
        _ => IcmpPred::Eq,
    }
}
