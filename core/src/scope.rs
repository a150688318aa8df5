//! Lexical bookkeeping the parser and code generator share: variable scopes
//! (name -> stack offset/type), loop scopes (for `break`/`continue` label
//! targets), and the function table. `LoopScope` is `Rc`-linked, one node
//! per enclosing loop; `VariableScope` is a frame stack rather than
//! `Rc`-linked, since a block's lifetime already matches a Rust call-stack
//! frame.

use crate::types::DataType;
use std::collections::HashMap;
use std::rc::Rc;

/// A kind of loop, distinguishing `continue` targets: a `for` loop's
/// `continue` jumps to the post-expression, while `while`/`do` jump straight
/// back to the condition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopKind {
    While,
    DoWhile,
    For,
}

/// One nested loop's label identity. `id` is this loop's value from a
/// per-kind monotonic counter; `break`/`continue` read it back off the
/// innermost `LoopScope` to build the right label.
pub struct LoopScope {
    pub kind: LoopKind,
    pub id: u32,
    pub parent: Option<Rc<LoopScope>>,
}

impl LoopScope {
    pub fn new(kind: LoopKind, id: u32, parent: Option<Rc<LoopScope>>) -> Rc<Self> {
        Rc::new(LoopScope { kind, id, parent })
    }

    /// The label this loop's `break` jumps to.
    pub fn break_label(&self) -> String {
        format!("_{}_end_{}", self.kind_name(), self.id)
    }

    /// The label this loop's `continue` jumps to: the post-expression for a
    /// `for`, the condition re-check for `while`/`do`.
    pub fn continue_label(&self) -> String {
        match self.kind {
            LoopKind::For => format!("_for_continue_{}", self.id),
            LoopKind::While => format!("_while_start_{}", self.id),
            LoopKind::DoWhile => format!("_do_cond_{}", self.id),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            LoopKind::While => "while",
            LoopKind::DoWhile => "do",
            LoopKind::For => "for",
        }
    }
}

/// One declared local's stack slot: its offset from `%rbp` (negative, in
/// multiples of 8) and its type.
#[derive(Copy, Clone, Debug)]
pub struct Local {
    pub offset: i64,
    pub data_type: DataType,
}

/// A function's local variables, organized as a stack of block frames.
/// Entering a `{ }` pushes a frame, leaving it pops one; a lookup walks the
/// stack top-down so an inner block's declaration shadows an outer one's,
/// mirroring a C block's scoping rules.
///
/// Offsets are handed out from one counter shared across the whole
/// function rather than reclaimed when a block is popped — two sibling
/// blocks never alias the same stack slot. Simpler than reusing slots, at
/// the cost of a (bounded) few extra bytes of frame size for functions with
/// several non-overlapping blocks.
pub struct VariableScope {
    frames: Vec<HashMap<String, Local>>,
    next_offset: i64,
}

impl VariableScope {
    /// A fresh scope with one frame for the function's top-level block.
    /// Locals start immediately below the saved registers/shadow space the
    /// prologue reserves: `-8(%rbp)` is the first slot.
    pub fn new_function() -> Self {
        VariableScope {
            frames: vec![HashMap::new()],
            next_offset: -8,
        }
    }

    /// Enters a nested block, shadowing outer declarations of the same name
    /// for as long as the block is active.
    pub fn push_block(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Leaves the innermost active block, returning how many locals it
    /// declared — the caller uses this to size the `add $k,%rsp` that
    /// releases the pushed locals' stack space.
    pub fn pop_block(&mut self) -> usize {
        self.frames.pop().map(|frame| frame.len()).unwrap_or(0)
    }

    /// Declares `name` in the innermost active frame at the next free slot,
    /// returning its offset.
    pub fn declare(&mut self, name: String, data_type: DataType) -> i64 {
        let offset = self.next_offset;
        self.next_offset -= 8;
        self.current_frame().insert(name, Local { offset, data_type });
        offset
    }

    /// Declares `name` at a caller-chosen offset rather than the next free
    /// slot, without disturbing the free-slot sequence — used for function
    /// parameters, which land in the positive-offset shadow space instead
    /// of the locals area below `%rbp`.
    pub fn declare_at(&mut self, name: String, data_type: DataType, offset: i64) {
        self.current_frame().insert(name, Local { offset, data_type });
    }

    /// Looks `name` up starting from the innermost active frame outward.
    pub fn lookup(&self, name: &str) -> Option<Local> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .copied()
    }

    fn current_frame(&mut self) -> &mut HashMap<String, Local> {
        self.frames.last_mut().expect("a VariableScope always has at least its function-level frame")
    }
}

/// One function's signature, as recorded the first time it's declared or
/// defined. Later declarations of the same name are checked against this
/// for arity only.
#[derive(Clone, Debug)]
pub struct FunctionSignature {
    pub param_count: usize,
    pub has_body: bool,
}

/// Every function seen so far in the translation unit, keyed by name.
/// Populated during parsing, so a forward call to a function declared later
/// in the file still resolves.
#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: HashMap<String, FunctionSignature>,
}

impl FunctionTable {
    pub fn new() -> Self {
        FunctionTable {
            functions: HashMap::new(),
        }
    }

    /// Records a declaration or definition of `name`. A later definition
    /// (`has_body: true`) replaces an earlier prototype-only entry; a
    /// prototype seen after a definition does not erase the body flag.
    pub fn declare(&mut self, name: String, param_count: usize, has_body: bool) {
        self.functions
            .entry(name)
            .and_modify(|sig| {
                sig.param_count = param_count;
                sig.has_body = sig.has_body || has_body;
            })
            .or_insert(FunctionSignature {
                param_count,
                has_body,
            });
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_scope_shadows_outer_block() {
        let mut scope = VariableScope::new_function();
        scope.declare("x".into(), DataType::INT);
        scope.push_block();
        scope.declare("x".into(), DataType::LONG);
        assert_eq!(scope.lookup("x").unwrap().data_type, DataType::LONG);
        assert_eq!(scope.pop_block(), 1);
        assert_eq!(scope.lookup("x").unwrap().data_type, DataType::INT);
    }

    #[test]
    fn variable_scope_falls_through_to_outer_block() {
        let mut scope = VariableScope::new_function();
        scope.declare("a".into(), DataType::INT);
        scope.push_block();
        assert!(scope.lookup("a").is_some());
        assert!(scope.lookup("b").is_none());
    }

    #[test]
    fn offsets_descend_by_eight_and_continue_across_blocks() {
        let mut scope = VariableScope::new_function();
        let o1 = scope.declare("a".into(), DataType::INT);
        let o2 = scope.declare("b".into(), DataType::INT);
        assert_eq!(o1, -8);
        assert_eq!(o2, -16);

        scope.push_block();
        let o3 = scope.declare("c".into(), DataType::INT);
        assert_eq!(o3, -24);
    }

    #[test]
    fn loop_labels_differ_by_kind_and_id() {
        let while_loop = LoopScope::new(LoopKind::While, 0, None);
        let for_loop = LoopScope::new(LoopKind::For, 0, None);
        assert_eq!(while_loop.break_label(), "_while_end_0");
        assert_eq!(while_loop.continue_label(), "_while_start_0");
        assert_eq!(for_loop.continue_label(), "_for_continue_0");
    }

    #[test]
    fn function_table_definition_sticks_through_later_prototype() {
        let mut table = FunctionTable::new();
        table.declare("foo".into(), 2, true);
        table.declare("foo".into(), 2, false);
        assert!(table.get("foo").unwrap().has_body);
    }
}
