//! The typed abstract syntax tree the parser produces. There is no
//! functionality implemented here beyond small constructors — code
//! generation lives in `codegen.rs`.

use crate::lexer::TokenKind;
use crate::types::DataType;
use crate::util::Span;
use std::cell::Cell;

/// A binary operator, as produced by the parser. `Comma` and the compound
/// assignments are included here rather than desugared, since the operator
/// table is keyed on the concrete operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    Comma,
}

impl BinaryOp {
    /// The compound-assignment operator's underlying arithmetic/bitwise
    /// operator, e.g. `+=` -> `+`. Used by the code generator to look up
    /// the same template `+` uses before storing back through the lvalue.
    pub fn underlying(self) -> Option<BinaryOp> {
        use BinaryOp::*;
        Some(match self {
            AddAssign => Add,
            SubAssign => Sub,
            MulAssign => Mul,
            DivAssign => Div,
            ModAssign => Mod,
            ShlAssign => Shl,
            ShrAssign => Shr,
            AndAssign => BitAnd,
            OrAssign => BitOr,
            XorAssign => BitXor,
            _ => return None,
        })
    }

    pub fn is_compound_assign(self) -> bool {
        self.underlying().is_some()
    }
}

/// A unary, prefix or postfix, operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    BitwiseNot,
    LogicalNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    AddressOf,
    Deref,
}

/// An expression node. Every variant carries a `return_type` cell that
/// starts empty and is filled in during code generation — not at parse
/// time, since the generator needs to compute it after emitting
/// sub-expressions and after lvalue coercions.
#[derive(Clone, Debug)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
    pub return_type: Cell<Option<DataType>>,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Expression {
            kind,
            span,
            return_type: Cell::new(None),
        }
    }

    pub fn return_type(&self) -> DataType {
        self.return_type
            .get()
            .expect("return_type read before generateAssembly ran on this node")
    }

    pub fn set_return_type(&self, data_type: DataType) {
        self.return_type.set(Some(data_type));
    }
}

#[derive(Clone, Debug)]
pub enum ExpressionKind {
    ConstantChar(i8),
    ConstantShort(i16),
    ConstantInt(i32),
    ConstantLong(i64),
    ConstantString(String),
    VariableRef(String),
    BinaryOp(BinaryOp, Box<Expression>, Box<Expression>),
    UnaryOp(UnaryOp, Box<Expression>),
    Ternary(Box<Expression>, Box<Expression>, Box<Expression>),
    FunctionCall(String, Vec<Expression>),
    MemberAccess(Box<Expression>, String),
}

/// A declared type as written in source: a primitive keyword or a struct
/// name, plus a count of `*` indirections. Resolved to a concrete
/// [`DataType`] by the parser once the struct (if any) is looked up.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeName {
    pub base: TokenKind,
    pub struct_name: Option<String>,
    pub pointers: u32,
}

/// A local variable declaration: `T name [= init];`.
#[derive(Clone, Debug)]
pub struct VariableDeclaration {
    pub type_name: TypeName,
    pub name: String,
    pub init: Option<Expression>,
}

/// One item inside a block: either a statement or a local declaration.
#[derive(Clone, Debug)]
pub enum BlockItem {
    Statement(Statement),
    VariableDeclaration(VariableDeclaration),
}

/// `init` in a `for` loop's header is either a declaration or an expression.
#[derive(Clone, Debug)]
pub enum ForInit {
    Declaration(VariableDeclaration),
    Expression(Expression),
}

#[derive(Clone, Debug)]
pub enum Statement {
    Return(Expression),
    ExpressionStmt(Option<Expression>),
    Block(Vec<BlockItem>),
    If(Expression, Box<Statement>, Option<Box<Statement>>),
    For {
        init: Option<Box<ForInit>>,
        cond: Option<Expression>,
        post: Option<Expression>,
        body: Box<Statement>,
    },
    While(Expression, Box<Statement>),
    DoWhile(Box<Statement>, Expression),
    Break,
    Continue,
}

/// A function parameter: its name and declared type.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub type_name: TypeName,
}

/// A top-level function. `body` is `None` for a prototype-only declaration
/// (`int foo(int x);`).
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Option<Vec<BlockItem>>,
}

/// A top-level struct declaration.
#[derive(Clone, Debug)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<(String, TypeName)>,
}

/// A top-level item: either a struct declaration or a function.
#[derive(Clone, Debug)]
pub enum TopLevelItem {
    Struct(StructDecl),
    Function(Function),
}

/// The whole compiled unit: every top-level struct and function, in source
/// order.
#[derive(Clone, Debug)]
pub struct Application {
    pub items: Vec<TopLevelItem>,
}
