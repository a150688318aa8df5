//! Append-only assembly line buffer, with typed helpers that format AT&T
//! mnemonics. Each operand shape (register, immediate, memory) gets its own
//! distinctly-named method rather than one overloaded `add`.

use crate::register::{register_name, Reg, Width};
use std::fmt::Write as _;

/// An ordered sequence of assembler source lines: one instruction, label, or
/// directive per line. Owned by the driver and handed to the code generator
/// by reference.
#[derive(Debug, Default, Clone)]
pub struct Assembly {
    lines: Vec<String>,
}

impl Assembly {
    pub fn new() -> Self {
        Assembly { lines: Vec::new() }
    }

    /// Append one raw line verbatim (a label, directive, or a line built up
    /// by the other helpers).
    pub fn add_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    /// Append every line of `other`, in order.
    pub fn extend(&mut self, other: &Assembly) -> &mut Self {
        self.lines.extend(other.lines.iter().cloned());
        self
    }

    /// `<mnemonic><suffix> %<reg>`, e.g. `push %rbp` (width-suffixed: `pushq %rbp`
    /// when `suffixed` is set, bare `push %rbp` when it isn't — `push`/`pop`
    /// conventionally drop the suffix since they only ever operate on a
    /// full register).
    pub fn add_reg(&mut self, mnemonic: &str, reg: Reg, width: Width) -> &mut Self {
        self.lines.push(format!(
            "\t{}\t%{}",
            mnemonic,
            register_name(reg, width)
        ));
        self
    }

    /// `<mnemonic><suffix> %<src>, %<dst>`, e.g. `movl %ecx, %eax`.
    pub fn add_reg_reg(
        &mut self,
        mnemonic: &str,
        width: Width,
        src: Reg,
        dst: Reg,
    ) -> &mut Self {
        self.lines.push(format!(
            "\t{}{}\t%{}, %{}",
            mnemonic,
            width.suffix(),
            register_name(src, width),
            register_name(dst, width)
        ));
        self
    }

    /// `<mnemonic><suffix> $<imm>, %<dst>`, e.g. `movl $2, %eax`.
    pub fn add_imm_reg(
        &mut self,
        mnemonic: &str,
        width: Width,
        imm: i64,
        dst: Reg,
    ) -> &mut Self {
        self.lines.push(format!(
            "\t{}{}\t${}, %{}",
            mnemonic,
            width.suffix(),
            imm,
            register_name(dst, width)
        ));
        self
    }

    /// `<mnemonic><suffix> <offset>(%<base>), %<dst>`, e.g.
    /// `movq 16(%rbp), %rax` — a load from a memory operand addressed by a
    /// register plus a fixed displacement.
    pub fn add_mem_to_reg(
        &mut self,
        mnemonic: &str,
        width: Width,
        offset: i64,
        base: Reg,
        dst: Reg,
    ) -> &mut Self {
        self.lines.push(format!(
            "\t{}{}\t{}(%{}), %{}",
            mnemonic,
            width.suffix(),
            offset,
            register_name(base, Width::Quad),
            register_name(dst, width)
        ));
        self
    }

    /// `<mnemonic><suffix> %<src>, <offset>(%<base>)`, e.g.
    /// `movq %rax, -8(%rbp)` — a store to a memory operand.
    pub fn add_reg_to_mem(
        &mut self,
        mnemonic: &str,
        width: Width,
        src: Reg,
        offset: i64,
        base: Reg,
    ) -> &mut Self {
        self.lines.push(format!(
            "\t{}{}\t%{}, {}(%{})",
            mnemonic,
            width.suffix(),
            register_name(src, width),
            offset,
            register_name(base, Width::Quad)
        ));
        self
    }

    /// `<mnemonic><suffix> $<imm>, <offset>(%<base>)`, e.g.
    /// `movb $104, 0(%rax)` — stores an immediate into a memory operand.
    pub fn add_imm_to_mem(
        &mut self,
        mnemonic: &str,
        width: Width,
        imm: i64,
        offset: i64,
        base: Reg,
    ) -> &mut Self {
        self.lines.push(format!(
            "\t{}{}\t${}, {}(%{})",
            mnemonic,
            width.suffix(),
            imm,
            offset,
            register_name(base, Width::Quad)
        ));
        self
    }

    /// `<mnemonic><suffix> (%<reg>), %<reg>` / `%<reg>, (%<reg>)` — load or
    /// store through a register holding an address with no displacement,
    /// used for the lvalue-collapse dereference (`mov (%rcx), %rcx`) and
    /// pointer dereference.
    pub fn add_indirect_load(
        &mut self,
        mnemonic: &str,
        width: Width,
        addr: Reg,
        dst: Reg,
    ) -> &mut Self {
        self.lines.push(format!(
            "\t{}{}\t(%{}), %{}",
            mnemonic,
            width.suffix(),
            register_name(addr, Width::Quad),
            register_name(dst, width)
        ));
        self
    }

    pub fn add_indirect_store(
        &mut self,
        mnemonic: &str,
        width: Width,
        src: Reg,
        addr: Reg,
    ) -> &mut Self {
        self.lines.push(format!(
            "\t{}{}\t%{}, (%{})",
            mnemonic,
            width.suffix(),
            register_name(src, width),
            register_name(addr, Width::Quad)
        ));
        self
    }

    /// `label:`
    pub fn add_label(&mut self, label: &str) -> &mut Self {
        self.lines.push(format!("{}:", label));
        self
    }

    /// `<mnemonic> <label>`, e.g. `jmp _while_end_0`.
    pub fn add_jump(&mut self, mnemonic: &str, label: &str) -> &mut Self {
        self.lines.push(format!("\t{}\t{}", mnemonic, label));
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Render the buffer as a single assembly listing, one instruction per
    /// line, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            let _ = writeln!(out, "{}", line);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_basic_instructions() {
        let mut asm = Assembly::new();
        asm.add_imm_reg("mov", Width::Long, 2, Reg::Rax);
        assert_eq!(asm.lines()[0], "\tmovl\t$2, %eax");
    }

    #[test]
    fn extend_appends_in_order() {
        let mut a = Assembly::new();
        a.add_line("first");
        let mut b = Assembly::new();
        b.add_line("second");
        a.extend(&b);
        assert_eq!(a.lines(), &["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn render_joins_with_newlines() {
        let mut asm = Assembly::new();
        asm.add_label("main");
        asm.add_reg("push", Reg::Rbp, Width::Quad);
        assert_eq!(asm.render(), "main:\n\tpush\t%rbp\n");
    }
}
