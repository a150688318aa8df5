//! Single-pass code generator: walks the AST once and emits AT&T/GAS
//! assembly directly, with no intermediate representation. Targets the
//! Microsoft x64 convention: four register arguments, a 32-byte
//! caller-reserved shadow space, caller cleanup.
//!
//! `%rax` always holds the current expression's result. When that result is
//! an lvalue, `%rax` holds its *address* instead of its value — the
//! `collapse` methods below are the single place that turns one into the
//! other.

use crate::assembly::Assembly;
use crate::ast::{
    Application, BinaryOp, BlockItem, Expression, ExpressionKind, ForInit, Function, Statement,
    TopLevelItem, UnaryOp, VariableDeclaration,
};
use crate::optable::OperatorTable;
use crate::register::{Reg, Width, ARG_REGS};
use crate::scope::{FunctionTable, LoopKind, LoopScope, VariableScope};
use crate::types::{DataType, StructTable};
use std::rc::Rc;

/// Per-construct-kind monotonic label counters: every `if`, `while`, `do`,
/// `for`, `&&`/`||`, and ternary gets its own numbered label family so
/// nested and sibling constructs never collide.
#[derive(Default)]
struct LabelCounters {
    if_else: u32,
    while_loop: u32,
    do_loop: u32,
    for_loop: u32,
    logical: u32,
    ternary: u32,
}

pub struct CodeGenerator<'a> {
    structs: &'a StructTable,
    functions: &'a FunctionTable,
    operators: &'a OperatorTable,
    labels: LabelCounters,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(
        structs: &'a StructTable,
        functions: &'a FunctionTable,
        operators: &'a OperatorTable,
    ) -> Self {
        CodeGenerator {
            structs,
            functions,
            operators,
            labels: LabelCounters::default(),
        }
    }

    pub fn generate(&mut self, app: &Application) -> Assembly {
        let mut asm = Assembly::new();
        for item in &app.items {
            if let TopLevelItem::Function(func) = item {
                if func.body.is_some() {
                    self.generate_function(&mut asm, func);
                }
            }
        }
        asm
    }

    // ---- functions --------------------------------------------------------

    fn generate_function(&mut self, asm: &mut Assembly, func: &Function) {
        asm.add_line(format!(".globl\t{}", func.name));
        asm.add_label(&func.name);
        asm.add_reg("push", Reg::Rbp, Width::Quad);
        asm.add_reg_reg("mov", Width::Quad, Reg::Rsp, Reg::Rbp);

        let mut scope = VariableScope::new_function();
        for (i, param) in func.params.iter().enumerate() {
            let data_type = self.resolve_param_type(param);
            let offset = 16 + (i as i64) * 8;
            if i < ARG_REGS.len() {
                asm.add_reg_to_mem("mov", Width::Quad, ARG_REGS[i], offset, Reg::Rbp);
            }
            scope.declare_at(param.name.clone(), data_type, offset);
        }

        let body = func.body.as_ref().expect("caller only calls this for defined functions");
        for item in body {
            self.generate_block_item(asm, &mut scope, None, item);
        }

        // Fallback epilogue for a function that falls off the end without an
        // explicit `return` (undefined behavior in source, but the compiler
        // still has to emit *something*: zero and return, matching the
        // original's unconditional trailing `ret`).
        asm.add_imm_reg("mov", Width::Long, 0, Reg::Rax);
        self.emit_epilogue(asm);
    }

    fn resolve_param_type(&self, param: &crate::ast::Param) -> DataType {
        self.resolve_type_name(&param.type_name)
    }

    fn resolve_type_name(&self, type_name: &crate::ast::TypeName) -> DataType {
        use crate::lexer::TokenKind;
        let base = match type_name.base {
            TokenKind::Char => DataType::CHAR,
            TokenKind::Short => DataType::SHORT,
            TokenKind::Int => DataType::INT,
            TokenKind::Long => DataType::LONG,
            TokenKind::Struct => {
                let name = type_name.struct_name.as_deref().unwrap_or_default();
                match self.structs.by_name(name) {
                    Some(s) => DataType {
                        id: s.id,
                        pointers: 0,
                        size: s.size,
                        lvalue: false,
                    },
                    None => DataType::INT,
                }
            }
            _ => DataType::INT,
        };
        let mut resolved = base;
        for _ in 0..type_name.pointers {
            resolved = resolved.pointer_to();
        }
        resolved
    }

    fn emit_epilogue(&self, asm: &mut Assembly) {
        asm.add_reg_reg("mov", Width::Quad, Reg::Rbp, Reg::Rsp);
        asm.add_reg("pop", Reg::Rbp, Width::Quad);
        asm.add_line("\tret");
    }

    // ---- statements ---------------------------------------------------

    fn generate_block_item(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        loop_scope: Option<&Rc<LoopScope>>,
        item: &BlockItem,
    ) {
        match item {
            BlockItem::Statement(stmt) => self.generate_statement(asm, scope, loop_scope, stmt),
            BlockItem::VariableDeclaration(decl) => self.generate_var_decl(asm, scope, decl),
        }
    }

    fn generate_var_decl(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        decl: &VariableDeclaration,
    ) {
        let data_type = self.resolve_type_name(&decl.type_name);
        match &decl.init {
            Some(init) => {
                self.generate_rvalue(asm, scope, init);
            }
            None => {
                asm.add_imm_reg("mov", Width::Quad, 0, Reg::Rax);
            }
        }
        scope.declare(decl.name.clone(), data_type);
        asm.add_reg("push", Reg::Rax, Width::Quad);
    }

    /// Emits the `add $k,%rsp` that releases a block's pushed locals, where
    /// `k` is 8 times the number of locals the block declared.
    fn emit_block_cleanup(&self, asm: &mut Assembly, local_count: usize) {
        if local_count > 0 {
            asm.add_imm_reg("add", Width::Quad, (local_count * 8) as i64, Reg::Rsp);
        }
    }

    fn generate_statement(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        loop_scope: Option<&Rc<LoopScope>>,
        stmt: &Statement,
    ) {
        match stmt {
            Statement::Return(expr) => {
                self.generate_rvalue(asm, scope, expr);
                self.emit_epilogue(asm);
            }
            Statement::ExpressionStmt(Some(expr)) => {
                self.generate_rvalue(asm, scope, expr);
            }
            Statement::ExpressionStmt(None) => {}
            Statement::Block(items) => {
                scope.push_block();
                for item in items {
                    self.generate_block_item(asm, scope, loop_scope, item);
                }
                let local_count = scope.pop_block();
                self.emit_block_cleanup(asm, local_count);
            }
            Statement::If(cond, then_branch, else_branch) => {
                self.generate_if(asm, scope, loop_scope, cond, then_branch, else_branch.as_deref());
            }
            Statement::While(cond, body) => {
                self.generate_while(asm, scope, cond, body);
            }
            Statement::DoWhile(body, cond) => {
                self.generate_do_while(asm, scope, body, cond);
            }
            Statement::For {
                init,
                cond,
                post,
                body,
            } => {
                self.generate_for(asm, scope, init.as_deref(), cond.as_ref(), post.as_ref(), body);
            }
            Statement::Break => {
                let target = loop_scope
                    .expect("break outside a loop has nothing to target")
                    .break_label();
                asm.add_jump("jmp", &target);
            }
            Statement::Continue => {
                let target = loop_scope
                    .expect("continue outside a loop has nothing to target")
                    .continue_label();
                asm.add_jump("jmp", &target);
            }
        }
    }

    fn generate_if(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        loop_scope: Option<&Rc<LoopScope>>,
        cond: &Expression,
        then_branch: &Statement,
        else_branch: Option<&Statement>,
    ) {
        let id = self.labels.if_else;
        self.labels.if_else += 1;
        let else_label = format!("_if_{}", id);
        let end_label = format!("_post_conditional_if_{}", id);

        self.generate_rvalue(asm, scope, cond);
        asm.add_imm_reg("cmp", Width::Long, 0, Reg::Rax);
        asm.add_jump("je", if else_branch.is_some() { &else_label } else { &end_label });
        self.generate_statement(asm, scope, loop_scope, then_branch);
        if let Some(else_stmt) = else_branch {
            asm.add_jump("jmp", &end_label);
            asm.add_label(&else_label);
            self.generate_statement(asm, scope, loop_scope, else_stmt);
        }
        asm.add_label(&end_label);
    }

    fn generate_while(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        cond: &Expression,
        body: &Statement,
    ) {
        let id = self.labels.while_loop;
        self.labels.while_loop += 1;
        let loop_scope = LoopScope::new(LoopKind::While, id, None);
        let cond_label = loop_scope.continue_label();
        let end_label = loop_scope.break_label();

        asm.add_label(&cond_label);
        self.generate_rvalue(asm, scope, cond);
        asm.add_imm_reg("cmp", Width::Long, 0, Reg::Rax);
        asm.add_jump("je", &end_label);
        self.generate_statement(asm, scope, Some(&loop_scope), body);
        asm.add_jump("jmp", &cond_label);
        asm.add_label(&end_label);
    }

    fn generate_do_while(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        body: &Statement,
        cond: &Expression,
    ) {
        let id = self.labels.do_loop;
        self.labels.do_loop += 1;
        let loop_scope = LoopScope::new(LoopKind::DoWhile, id, None);
        let start_label = format!("_do_start_{}", id);
        let cond_label = loop_scope.continue_label();
        let end_label = loop_scope.break_label();

        asm.add_label(&start_label);
        self.generate_statement(asm, scope, Some(&loop_scope), body);
        asm.add_label(&cond_label);
        self.generate_rvalue(asm, scope, cond);
        asm.add_imm_reg("cmp", Width::Long, 0, Reg::Rax);
        asm.add_jump("jne", &start_label);
        asm.add_label(&end_label);
    }

    fn generate_for(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        init: Option<&ForInit>,
        cond: Option<&Expression>,
        post: Option<&Expression>,
        body: &Statement,
    ) {
        let id = self.labels.for_loop;
        self.labels.for_loop += 1;
        let loop_scope = LoopScope::new(LoopKind::For, id, None);
        let start_label = format!("_for_start_{}", id);
        let post_label = loop_scope.continue_label();
        let end_label = loop_scope.break_label();

        scope.push_block();
        match init {
            Some(ForInit::Declaration(decl)) => self.generate_var_decl(asm, scope, decl),
            Some(ForInit::Expression(expr)) => {
                self.generate_rvalue(asm, scope, expr);
            }
            None => {}
        }

        asm.add_label(&start_label);
        if let Some(cond) = cond {
            self.generate_rvalue(asm, scope, cond);
            asm.add_imm_reg("cmp", Width::Long, 0, Reg::Rax);
            asm.add_jump("je", &end_label);
        }
        self.generate_statement(asm, scope, Some(&loop_scope), body);
        asm.add_label(&post_label);
        if let Some(post) = post {
            self.generate_rvalue(asm, scope, post);
        }
        asm.add_jump("jmp", &start_label);
        asm.add_label(&end_label);
        let local_count = scope.pop_block();
        self.emit_block_cleanup(asm, local_count);
    }

    // ---- expressions ----------------------------------------------------

    /// Generates `expr` and, if the result came back as an lvalue (an
    /// address in `%rax`), collapses it to the value it addresses. This is
    /// the entry point every context that needs a *value* — operands,
    /// conditions, return expressions, call arguments — goes through.
    fn generate_rvalue(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        expr: &Expression,
    ) -> DataType {
        let data_type = self.generate_expression(asm, scope, expr);
        self.collapse(asm, data_type)
    }

    /// If `data_type` is an lvalue, emits the load that turns the address
    /// currently in `%rax` into the value it points to, and returns the
    /// rvalue type. Otherwise a no-op.
    fn collapse(&self, asm: &mut Assembly, data_type: DataType) -> DataType {
        if !data_type.lvalue {
            return data_type;
        }
        let width = Width::from_bytes(data_type.size.min(8));
        asm.add_indirect_load("mov", width, Reg::Rax, Reg::Rax);
        data_type.as_rvalue()
    }

    /// Generates `expr` for its *address*: valid only when `expr` is itself
    /// naturally an lvalue (a variable, a member access, or a dereference).
    /// Any other expression here is a malformed program with no assignable
    /// target; per the compiler's best-effort policy that case just falls
    /// through and treats whatever ends up in `%rax` as an address.
    fn generate_lvalue(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        expr: &Expression,
    ) -> DataType {
        self.generate_expression(asm, scope, expr)
    }

    fn generate_expression(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        expr: &Expression,
    ) -> DataType {
        let data_type = match &expr.kind {
            ExpressionKind::ConstantChar(v) => {
                asm.add_imm_reg("mov", Width::Byte, *v as i64, Reg::Rax);
                DataType::CHAR
            }
            ExpressionKind::ConstantShort(v) => {
                asm.add_imm_reg("mov", Width::Word, *v as i64, Reg::Rax);
                DataType::SHORT
            }
            ExpressionKind::ConstantInt(v) => {
                asm.add_imm_reg("mov", Width::Long, *v as i64, Reg::Rax);
                DataType::INT
            }
            ExpressionKind::ConstantLong(v) => {
                asm.add_imm_reg("mov", Width::Quad, *v, Reg::Rax);
                DataType::LONG
            }
            ExpressionKind::ConstantString(text) => self.generate_string_literal(asm, text),
            ExpressionKind::VariableRef(name) => self.generate_variable_ref(asm, scope, name),
            ExpressionKind::BinaryOp(op, left, right) => {
                self.generate_binary_op(asm, scope, *op, left, right)
            }
            ExpressionKind::UnaryOp(op, operand) => self.generate_unary_op(asm, scope, *op, operand),
            ExpressionKind::Ternary(cond, then_expr, else_expr) => {
                self.generate_ternary(asm, scope, cond, then_expr, else_expr)
            }
            ExpressionKind::FunctionCall(name, args) => {
                self.generate_function_call(asm, scope, name, args)
            }
            ExpressionKind::MemberAccess(base, field) => {
                self.generate_member_access(asm, scope, base, field)
            }
        };
        expr.set_return_type(data_type);
        data_type
    }

    /// String literals are heap-allocated at runtime rather than placed in
    /// static storage: a `malloc` call sized to the text plus its NUL
    /// terminator, followed by one `movb` per byte.
    fn generate_string_literal(&mut self, asm: &mut Assembly, text: &str) -> DataType {
        let bytes = text.as_bytes();
        asm.add_imm_reg("sub", Width::Quad, 32, Reg::Rsp);
        asm.add_imm_reg("mov", Width::Quad, bytes.len() as i64 + 1, Reg::Rcx);
        asm.add_jump("call", "malloc");
        asm.add_imm_reg("add", Width::Quad, 32, Reg::Rsp);
        for (i, byte) in bytes.iter().enumerate() {
            asm.add_imm_to_mem("mov", Width::Byte, *byte as i64, i as i64, Reg::Rax);
        }
        asm.add_imm_to_mem("mov", Width::Byte, 0, bytes.len() as i64, Reg::Rax);
        DataType::CHAR.pointer_to()
    }

    fn generate_variable_ref(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        name: &str,
    ) -> DataType {
        match scope.lookup(name) {
            Some(local) => {
                asm.add_line(format!("\tleaq\t{}(%rbp), %rax", local.offset));
                local.data_type.as_lvalue()
            }
            None => {
                // No diagnostics channel for an unresolved reference (best
                // effort per the compiler's silent-miss policy): fall back
                // to a zeroed rvalue rather than generating broken operands
                // for everything downstream.
                asm.add_imm_reg("mov", Width::Long, 0, Reg::Rax);
                DataType::INT
            }
        }
    }

    fn generate_member_access(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        base: &Expression,
        field: &str,
    ) -> DataType {
        let base_type = self.generate_lvalue(asm, scope, base);
        // `base` is the struct's address already (its own lvalue), or, if
        // `base` is a pointer-to-struct, its rvalue pointer value — either
        // way what's in `%rax` right now is the struct's base address.
        let collapsed = if base_type.is_pointer() {
            self.collapse(asm, base_type)
        } else {
            base_type
        };
        match self.structs.by_id(collapsed.id).and_then(|s| s.field(field)) {
            Some(f) => {
                if f.offset != 0 {
                    asm.add_line(format!("\taddq\t${}, %rax", f.offset));
                }
                f.data_type.as_lvalue()
            }
            None => DataType::INT.as_lvalue(),
        }
    }

    /// Evaluates `right`, pushes it, evaluates `left`, pops `right` into
    /// `%rcx` — the protocol `BinaryOperator::generateAssembly` established,
    /// generalized to every operator family. `=` and the compound
    /// assignments need lvalue access the table has no way to express, and
    /// `&&`/`||`/`,` short-circuit or sequence rather than compute a value
    /// from two already-evaluated operands, so all three are lowered
    /// directly instead of going through the table.
    fn generate_binary_op(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> DataType {
        match op {
            BinaryOp::Comma => {
                self.generate_rvalue(asm, scope, left);
                self.generate_rvalue(asm, scope, right)
            }
            BinaryOp::LogicalAnd => self.generate_logical(asm, scope, left, right, true),
            BinaryOp::LogicalOr => self.generate_logical(asm, scope, left, right, false),
            BinaryOp::Assign => self.generate_assign(asm, scope, left, right),
            _ if op.is_compound_assign() => self.generate_compound_assign(asm, scope, op, left, right),
            _ => self.generate_table_binary(asm, scope, op, left, right),
        }
    }

    fn generate_table_binary(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> DataType {
        let right_type = self.generate_rvalue(asm, scope, right);
        asm.add_reg("push", Reg::Rax, Width::Quad);
        let left_type = self.generate_rvalue(asm, scope, left);
        asm.add_reg("pop", Reg::Rcx, Width::Quad);

        match self.operators.lookup_binary(left_type, op, right_type) {
            Some((result_type, template)) => {
                asm.extend(template);
                *result_type
            }
            None => {
                // Pointer arithmetic falls outside the fixed integer table
                // (its scale depends on a dynamically-sized pointee), so
                // it's resolved here instead of through a table miss-retry.
                self.generate_pointer_arithmetic(asm, op, left_type, right_type)
                    .unwrap_or(left_type)
            }
        }
    }

    /// `pointer +/- integer`, scaled by the pointee's size. `%rax` holds
    /// the pointer, `%rcx` the integer offset, on entry — same convention
    /// the integer table uses.
    fn generate_pointer_arithmetic(
        &self,
        asm: &mut Assembly,
        op: BinaryOp,
        left_type: DataType,
        right_type: DataType,
    ) -> Option<DataType> {
        if !left_type.is_pointer() || right_type.is_pointer() {
            return None;
        }
        let pointee_size = self.pointee_size(left_type);
        if pointee_size > 1 {
            asm.add_imm_reg("imul", Width::Quad, pointee_size as i64, Reg::Rcx);
        }
        match op {
            BinaryOp::Add => {
                asm.add_reg_reg("add", Width::Quad, Reg::Rcx, Reg::Rax);
                Some(left_type)
            }
            BinaryOp::Sub => {
                asm.add_reg_reg("sub", Width::Quad, Reg::Rcx, Reg::Rax);
                Some(left_type)
            }
            _ => None,
        }
    }

    fn pointee_size(&self, pointer_type: DataType) -> u32 {
        if pointer_type.id <= crate::types::LONG_ID {
            match pointer_type.id {
                crate::types::CHAR_ID => 1,
                crate::types::SHORT_ID => 2,
                crate::types::INT_ID => 4,
                _ => 8,
            }
        } else {
            self.structs.by_id(pointer_type.id).map(|s| s.size).unwrap_or(8)
        }
    }

    fn generate_assign(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        left: &Expression,
        right: &Expression,
    ) -> DataType {
        self.generate_lvalue(asm, scope, left);
        asm.add_reg("push", Reg::Rax, Width::Quad);
        let value_type = self.generate_rvalue(asm, scope, right);
        asm.add_reg("pop", Reg::Rcx, Width::Quad);
        let width = Width::from_bytes(value_type.size.min(8));
        asm.add_indirect_store("mov", width, Reg::Rax, Reg::Rcx);
        value_type
    }

    /// `a op= b`: left is evaluated for its address, its current value is
    /// loaded and saved alongside that address, `b` is evaluated, then the
    /// underlying operator's table entry runs on (old value, `b`) before
    /// the result is stored back. The address is kept on the stack (not in
    /// a fixed scratch register) across the evaluation of `b`, since `b`
    /// may itself contain a call that clobbers any register not explicitly
    /// saved.
    fn generate_compound_assign(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> DataType {
        let underlying = op.underlying().expect("caller only calls this for compound-assign ops");

        let left_type = self.generate_lvalue(asm, scope, left);
        asm.add_reg("push", Reg::Rax, Width::Quad); // [addr]
        let width = Width::from_bytes(left_type.size.min(8));
        asm.add_indirect_load("mov", width, Reg::Rax, Reg::Rax); // current value
        asm.add_reg("push", Reg::Rax, Width::Quad); // [addr, old_value]

        let right_type = self.generate_rvalue(asm, scope, right);
        asm.add_reg_reg("mov", Width::Quad, Reg::Rax, Reg::Rcx); // rcx = right value
        asm.add_reg("pop", Reg::Rax, Width::Quad); // rax = old_value, stack: [addr]

        let result_type = match self
            .operators
            .lookup_binary(left_type.as_rvalue(), underlying, right_type)
        {
            Some((result_type, template)) => {
                asm.extend(template);
                *result_type
            }
            None => left_type.as_rvalue(),
        };

        asm.add_reg("pop", Reg::R9, Width::Quad); // r9 = addr
        let store_width = Width::from_bytes(result_type.size.min(8));
        asm.add_indirect_store("mov", store_width, Reg::Rax, Reg::R9);
        result_type
    }

    /// `a && b` / `a || b`: `a` is evaluated and tested; on a
    /// short-circuiting result the whole expression is `0`/`1` without
    /// touching `b`. Otherwise `b` is evaluated and its truthiness becomes
    /// the result.
    fn generate_logical(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        left: &Expression,
        right: &Expression,
        is_and: bool,
    ) -> DataType {
        let id = self.labels.logical;
        self.labels.logical += 1;
        let short_circuit_label = format!("_loc{}", id);
        let end_label = format!("_loc_end{}", id);

        self.generate_rvalue(asm, scope, left);
        asm.add_imm_reg("cmp", Width::Long, 0, Reg::Rax);
        if is_and {
            asm.add_jump("je", &short_circuit_label);
        } else {
            asm.add_jump("jne", &short_circuit_label);
        }

        self.generate_rvalue(asm, scope, right);
        asm.add_imm_reg("cmp", Width::Long, 0, Reg::Rax);
        asm.add_line("\tsetne\t%al");
        asm.add_line("\tmovzbl\t%al, %eax");
        asm.add_jump("jmp", &end_label);

        asm.add_label(&short_circuit_label);
        asm.add_imm_reg("mov", Width::Long, if is_and { 0 } else { 1 }, Reg::Rax);
        asm.add_label(&end_label);
        DataType::INT
    }

    fn generate_ternary(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        cond: &Expression,
        then_expr: &Expression,
        else_expr: &Expression,
    ) -> DataType {
        let id = self.labels.ternary;
        self.labels.ternary += 1;
        let else_label = format!("_ternary_else_{}", id);
        let end_label = format!("_ternary_end_{}", id);

        self.generate_rvalue(asm, scope, cond);
        asm.add_imm_reg("cmp", Width::Long, 0, Reg::Rax);
        asm.add_jump("je", &else_label);
        let then_type = self.generate_rvalue(asm, scope, then_expr);
        asm.add_jump("jmp", &end_label);
        asm.add_label(&else_label);
        self.generate_rvalue(asm, scope, else_expr);
        asm.add_label(&end_label);
        then_type
    }

    fn generate_unary_op(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        op: UnaryOp,
        operand: &Expression,
    ) -> DataType {
        match op {
            UnaryOp::AddressOf => {
                let operand_type = self.generate_lvalue(asm, scope, operand);
                operand_type.as_rvalue().pointer_to()
            }
            UnaryOp::Deref => {
                let operand_type = self.generate_rvalue(asm, scope, operand);
                let pointee_size = self.pointee_size(operand_type);
                operand_type.dereferenced(pointee_size).as_lvalue()
            }
            UnaryOp::PreIncrement | UnaryOp::PreDecrement => {
                self.generate_incdec(asm, scope, operand, op == UnaryOp::PreIncrement, true)
            }
            UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
                self.generate_incdec(asm, scope, operand, op == UnaryOp::PostIncrement, false)
            }
            UnaryOp::Negate | UnaryOp::BitwiseNot | UnaryOp::LogicalNot => {
                let operand_type = self.generate_rvalue(asm, scope, operand);
                match self.operators.lookup_unary(operand_type, op) {
                    Some((result_type, template)) => {
                        asm.extend(template);
                        *result_type
                    }
                    None => operand_type,
                }
            }
        }
    }

    /// `++a`/`--a`/`a++`/`a--`: load the address, bump the value by one,
    /// store it back, and return either the new value (prefix) or the one
    /// that was there before the bump (postfix).
    fn generate_incdec(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        operand: &Expression,
        is_increment: bool,
        is_prefix: bool,
    ) -> DataType {
        let operand_type = self.generate_lvalue(asm, scope, operand);
        let width = Width::from_bytes(operand_type.size.min(8));
        asm.add_reg_reg("mov", Width::Quad, Reg::Rax, Reg::Rcx); // rcx = addr
        asm.add_indirect_load("mov", width, Reg::Rcx, Reg::Rax); // rax = old value
        if !is_prefix {
            asm.add_reg("push", Reg::Rax, Width::Quad); // save old value for postfix
        }
        let step = if is_increment { "add" } else { "sub" };
        asm.add_imm_reg(step, width, 1, Reg::Rax);
        asm.add_indirect_store("mov", width, Reg::Rax, Reg::Rcx);
        if !is_prefix {
            asm.add_reg("pop", Reg::Rax, Width::Quad);
        }
        operand_type.as_rvalue()
    }

    /// Caller-side call sequence under the Microsoft x64 convention: the
    /// first four arguments go in `%rcx`/`%rdx`/`%r8`/`%r9`, everything past
    /// that is pushed right-to-left, and the caller always reserves 32
    /// bytes of shadow space below the arguments for the callee to spill
    /// into, whether or not it actually uses all four registers.
    fn generate_function_call(
        &mut self,
        asm: &mut Assembly,
        scope: &mut VariableScope,
        name: &str,
        args: &[Expression],
    ) -> DataType {
        let stack_arg_count = args.len().saturating_sub(ARG_REGS.len());
        let frame_size = 32 + stack_arg_count * 8;
        asm.add_imm_reg("sub", Width::Quad, frame_size as i64, Reg::Rsp);

        // Each argument is evaluated in source order and immediately
        // stashed in its final call-frame slot, register arguments
        // included — a later argument's evaluation can clobber any
        // register freely without disturbing one already computed. The
        // register arguments are reloaded from their slots right before
        // `call`, once nothing further can clobber them.
        for (i, arg) in args.iter().enumerate() {
            self.generate_rvalue(asm, scope, arg);
            let slot = if i < ARG_REGS.len() {
                (i as i64) * 8
            } else {
                32 + ((i - ARG_REGS.len()) as i64) * 8
            };
            asm.add_reg_to_mem("mov", Width::Quad, Reg::Rax, slot, Reg::Rsp);
        }
        for i in 0..args.len().min(ARG_REGS.len()) {
            asm.add_mem_to_reg("mov", Width::Quad, (i as i64) * 8, Reg::Rsp, ARG_REGS[i]);
        }

        asm.add_jump("call", name);
        asm.add_imm_reg("add", Width::Quad, frame_size as i64, Reg::Rsp);

        self.functions
            .get(name)
            .map(|_| DataType::INT)
            .unwrap_or(DataType::INT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::Parser;
    use crate::scope::FunctionTable;

    fn compile(src: &str) -> String {
        let mut structs = StructTable::new();
        let mut functions = FunctionTable::new();
        let app = Parser::new(tokenize(src), &mut structs, &mut functions)
            .parse_application()
            .unwrap();
        let operators = OperatorTable::build();
        let mut codegen = CodeGenerator::new(&structs, &functions, &operators);
        codegen.generate(&app).render()
    }

    #[test]
    fn returns_a_constant() {
        let asm = compile("int main() { return 42; }");
        assert!(asm.contains("movl\t$42, %eax"));
        assert!(asm.contains("ret"));
    }

    #[test]
    fn respects_arithmetic_precedence() {
        let asm = compile("int main() { return 1 + 2 * 3; }");
        assert!(asm.contains("imull"));
        assert!(asm.contains("addl"));
    }

    #[test]
    fn compound_assign_stores_back_through_the_lvalue() {
        let asm = compile("int main() { int x; x = 1; x += 2; return x; }");
        assert!(asm.contains("addl"));
        assert!(asm.matches("movq\t%rax, (%r9)").count() >= 1);
    }

    #[test]
    fn short_circuit_or_skips_the_right_operand_on_a_true_left() {
        let asm = compile("int main() { int x; x = 1; return x || x; }");
        assert!(asm.contains("_loc0"));
        assert!(asm.contains("jne\t_loc0"));
    }

    #[test]
    fn loop_with_break_emits_matching_labels() {
        let asm = compile("int main() { int i; i = 0; while (i < 10) { if (i == 5) break; i = i + 1; } return i; }");
        assert!(asm.contains("_while_end_0"));
        assert!(asm.contains("jmp\t_while_end_0"));
    }

    #[test]
    fn pointer_arithmetic_scales_by_pointee_size() {
        let asm = compile("int main() { long* p; p = 0; return *(p + 1); }");
        assert!(asm.contains("imulq\t$8, %rcx"));
    }
}
