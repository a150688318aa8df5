//! The typed operator dispatch table: every `(DataType, op, DataType)` triple
//! the generator can see is resolved once, at startup, to the result type
//! and the instruction template to emit, across all four integer widths.
//!
//! Logical `&&`/`||` short-circuit and are lowered directly by the code
//! generator with branches rather than a table entry. Assignment, the
//! compound assignments, comma, the increment/decrement operators, and
//! address-of/dereference all need lvalue access the table has no way to
//! express, so the generator lowers those directly too — compound
//! assignments reuse this table's entry for their underlying arithmetic
//! operator (see [`crate::ast::BinaryOp::underlying`]).

use crate::assembly::Assembly;
use crate::ast::{BinaryOp, UnaryOp};
use crate::register::Width;
use crate::types::DataType;
use std::collections::HashMap;

/// Resolves `(left, op, right)` -> `(result type, instruction template)`.
/// Built once by [`OperatorTable::build`] and shared read-only for the rest
/// of compilation, matching the original's "populate once in `initAST`,
/// read everywhere else" shape.
#[derive(Debug, Default)]
pub struct OperatorTable {
    binary: HashMap<(DataType, BinaryOp, DataType), (DataType, Assembly)>,
    unary: HashMap<(DataType, UnaryOp), (DataType, Assembly)>,
}

const INTEGER_TYPES: [DataType; 4] = [
    DataType::CHAR,
    DataType::SHORT,
    DataType::INT,
    DataType::LONG,
];

impl OperatorTable {
    /// Builds the table of same-width, same-type integer operators. Called
    /// once, before parsing, by the compiler driver.
    pub fn build() -> Self {
        let mut table = OperatorTable {
            binary: HashMap::new(),
            unary: HashMap::new(),
        };
        for &ty in &INTEGER_TYPES {
            table.add_arithmetic(ty);
            table.add_comparisons(ty);
            table.add_shifts(ty);
            table.add_bitwise(ty);
            table.add_unary(ty);
        }
        table
    }

    fn insert_binary(&mut self, left: DataType, op: BinaryOp, right: DataType, result: DataType, asm: Assembly) {
        self.binary.insert((left, op, right), (result, asm));
    }

    fn insert_unary(&mut self, operand: DataType, op: UnaryOp, result: DataType, asm: Assembly) {
        self.unary.insert((operand, op), (result, asm));
    }

    /// `left op right`: left arrives in `%rax`, right in `%rcx`, matching
    /// the generator's push-right/evaluate-left/pop-right protocol.
    /// Result is left in `%rax`.
    fn add_arithmetic(&mut self, ty: DataType) {
        let w = Width::from_bytes(ty.size);

        let mut add = Assembly::new();
        add.add_reg_reg("add", w, crate::register::Reg::Rcx, crate::register::Reg::Rax);
        self.insert_binary(ty, BinaryOp::Add, ty, ty, add);

        let mut sub = Assembly::new();
        sub.add_reg_reg("sub", w, crate::register::Reg::Rcx, crate::register::Reg::Rax);
        self.insert_binary(ty, BinaryOp::Sub, ty, ty, sub);

        let mut mul = Assembly::new();
        mul.add_reg_reg("imul", w, crate::register::Reg::Rcx, crate::register::Reg::Rax);
        self.insert_binary(ty, BinaryOp::Mul, ty, ty, mul);

        // Division/modulo need %rdx zeroed before `idiv` reads %edx:%eax (or
        // %rdx:%rax) as the dividend, and the divisor must not be %rax or
        // %rdx, so the table relies on the generator having left it in %rcx.
        let mut div = Assembly::new();
        div.add_zero_rdx(w);
        div.add_reg("idiv", crate::register::Reg::Rcx, w);
        self.insert_binary(ty, BinaryOp::Div, ty, ty, div);

        let mut rem = Assembly::new();
        rem.add_zero_rdx(w);
        rem.add_reg("idiv", crate::register::Reg::Rcx, w);
        rem.add_reg_reg("mov", w, crate::register::Reg::Rdx, crate::register::Reg::Rax);
        self.insert_binary(ty, BinaryOp::Mod, ty, ty, rem);
    }

    /// Comparisons always produce an `int` (there's no dedicated boolean
    /// type, so boolean results are plain `int`s): compare, then
    /// `set<cc> %al` and zero-extend into `%eax`.
    fn add_comparisons(&mut self, ty: DataType) {
        let w = Width::from_bytes(ty.size);
        let ops: [(BinaryOp, &str); 6] = [
            (BinaryOp::Eq, "sete"),
            (BinaryOp::Ne, "setne"),
            (BinaryOp::Lt, "setl"),
            (BinaryOp::Gt, "setg"),
            (BinaryOp::Le, "setle"),
            (BinaryOp::Ge, "setge"),
        ];
        for (op, setcc) in ops {
            let mut asm = Assembly::new();
            asm.add_reg_reg("cmp", w, crate::register::Reg::Rcx, crate::register::Reg::Rax);
            asm.add_setcc(setcc);
            self.insert_binary(ty, op, ty, DataType::INT, asm);
        }
    }

    /// The right operand ends up in `%rcx` by the time a binary operator's
    /// template runs, so a shift count is already sitting in `%cl` — no
    /// extra move needed before `sal`/`sar`.
    fn add_shifts(&mut self, ty: DataType) {
        let w = Width::from_bytes(ty.size);

        let mut shl = Assembly::new();
        shl.add_line(format!("\tsal{}\t%cl, %{}", w.suffix(), crate::register::register_name(crate::register::Reg::Rax, w)));
        self.insert_binary(ty, BinaryOp::Shl, ty, ty, shl);

        let mut shr = Assembly::new();
        shr.add_line(format!("\tsar{}\t%cl, %{}", w.suffix(), crate::register::register_name(crate::register::Reg::Rax, w)));
        self.insert_binary(ty, BinaryOp::Shr, ty, ty, shr);
    }

    fn add_bitwise(&mut self, ty: DataType) {
        let w = Width::from_bytes(ty.size);

        let mut and = Assembly::new();
        and.add_reg_reg("and", w, crate::register::Reg::Rcx, crate::register::Reg::Rax);
        self.insert_binary(ty, BinaryOp::BitAnd, ty, ty, and);

        let mut or = Assembly::new();
        or.add_reg_reg("or", w, crate::register::Reg::Rcx, crate::register::Reg::Rax);
        self.insert_binary(ty, BinaryOp::BitOr, ty, ty, or);

        let mut xor = Assembly::new();
        xor.add_reg_reg("xor", w, crate::register::Reg::Rcx, crate::register::Reg::Rax);
        self.insert_binary(ty, BinaryOp::BitXor, ty, ty, xor);
    }

    fn add_unary(&mut self, ty: DataType) {
        let w = Width::from_bytes(ty.size);

        let mut neg = Assembly::new();
        neg.add_reg("neg", crate::register::Reg::Rax, w);
        self.insert_unary(ty, UnaryOp::Negate, ty, neg);

        let mut not = Assembly::new();
        not.add_reg("not", crate::register::Reg::Rax, w);
        self.insert_unary(ty, UnaryOp::BitwiseNot, ty, not);

        let mut lnot = Assembly::new();
        lnot.add_imm_reg("cmp", w, 0, crate::register::Reg::Rax);
        lnot.add_setcc("sete");
        self.insert_unary(ty, UnaryOp::LogicalNot, DataType::INT, lnot);
    }

    pub fn lookup_binary(&self, left: DataType, op: BinaryOp, right: DataType) -> Option<&(DataType, Assembly)> {
        self.binary.get(&(left, op, right))
    }

    pub fn lookup_unary(&self, operand: DataType, op: UnaryOp) -> Option<&(DataType, Assembly)> {
        self.unary.get(&(operand, op))
    }
}

/// Small helpers `Assembly` doesn't need for its own general-purpose API but
/// the table's fixed instruction shapes do.
trait TableAssemblyExt {
    fn add_zero_rdx(&mut self, width: Width);
    fn add_setcc(&mut self, setcc: &str);
}

impl TableAssemblyExt for Assembly {
    fn add_zero_rdx(&mut self, width: Width) {
        // idivb reads %ax, not %dx:%al, so there's no %rdx to zero at byte
        // width — sign-extend %al into %ah instead.
        if width == Width::Byte {
            self.add_line("\tcbtw");
        } else {
            self.add_imm_reg("mov", width, 0, crate::register::Reg::Rdx);
        }
    }

    fn add_setcc(&mut self, setcc: &str) {
        self.add_line(format!("\t{}\t%al", setcc));
        self.add_line("\tmovzbl\t%al, %eax");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_resolves_per_width() {
        let table = OperatorTable::build();
        let (result, asm) = table
            .lookup_binary(DataType::INT, BinaryOp::Add, DataType::INT)
            .unwrap();
        assert_eq!(*result, DataType::INT);
        assert!(asm.lines()[0].contains("addl"));

        let (_, long_asm) = table
            .lookup_binary(DataType::LONG, BinaryOp::Add, DataType::LONG)
            .unwrap();
        assert!(long_asm.lines()[0].contains("addq"));
    }

    #[test]
    fn comparisons_return_int_regardless_of_operand_width() {
        let table = OperatorTable::build();
        let (result, _) = table
            .lookup_binary(DataType::CHAR, BinaryOp::Lt, DataType::CHAR)
            .unwrap();
        assert_eq!(*result, DataType::INT);
    }

    #[test]
    fn mismatched_types_miss_the_table() {
        let table = OperatorTable::build();
        assert!(table
            .lookup_binary(DataType::INT, BinaryOp::Add, DataType::LONG)
            .is_none());
    }

    #[test]
    fn shift_uses_cl_directly_with_no_extra_move() {
        let table = OperatorTable::build();
        let (_, asm) = table
            .lookup_binary(DataType::INT, BinaryOp::Shl, DataType::INT)
            .unwrap();
        assert_eq!(asm.lines()[0], "\tsall\t%cl, %eax");
    }

    #[test]
    fn unary_logical_not_produces_int() {
        let table = OperatorTable::build();
        let (result, _) = table.lookup_unary(DataType::LONG, UnaryOp::LogicalNot).unwrap();
        assert_eq!(*result, DataType::INT);
    }
}
