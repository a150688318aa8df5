//! Hand-rolled recursive-descent parser with precedence climbing over the
//! binary operators: each precedence level is its own function, each
//! peeking the stream's front token to decide whether to keep climbing.
//! Consumes a [`TokenStream`] rather than a raw queue of untyped tokens.

use crate::ast::{
    Application, BinaryOp, BlockItem, Expression, ExpressionKind, ForInit, Function, Param,
    Statement, StructDecl, TopLevelItem, TypeName, UnaryOp, VariableDeclaration,
};
use crate::error::CompileError;
use crate::lexer::{Token, TokenKind, TokenStream};
use crate::scope::FunctionTable;
use crate::types::{DataType, StructTable};
use crate::util::Span;

pub struct Parser<'a> {
    tokens: TokenStream,
    structs: &'a mut StructTable,
    functions: &'a mut FunctionTable,
}

type PResult<T> = Result<T, CompileError>;

impl<'a> Parser<'a> {
    pub fn new(
        tokens: TokenStream,
        structs: &'a mut StructTable,
        functions: &'a mut FunctionTable,
    ) -> Self {
        Parser {
            tokens,
            structs,
            functions,
        }
    }

    /// `<app> = { <struct-decl> | <function> }`
    pub fn parse_application(mut self) -> PResult<Application> {
        let mut items = Vec::new();
        while !self.tokens.is_empty() {
            if self.tokens.peek_kind() == Some(TokenKind::Struct) {
                items.push(TopLevelItem::Struct(self.parse_struct_decl()?));
            } else {
                items.push(TopLevelItem::Function(self.parse_function()?));
            }
        }
        Ok(Application { items })
    }

    // ---- token plumbing -------------------------------------------------

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.peek_kind()
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn advance(&mut self) -> Token {
        self.tokens.advance()
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        match self.tokens.peek() {
            Some(tok) if tok.kind == kind => Ok(self.advance()),
            Some(tok) => Err(CompileError::new(
                format!("{}", kind),
                tok.text.clone(),
                tok.span,
            )),
            None => Err(CompileError::new(
                format!("{}", kind),
                "end of input",
                Span::dummy(),
            )),
        }
    }

    fn expect_name(&mut self) -> PResult<Token> {
        self.expect(TokenKind::Name)
    }

    fn current_span(&self) -> Span {
        self.tokens.peek().map(|t| t.span).unwrap_or_else(Span::dummy)
    }

    // ---- types ------------------------------------------------------------

    fn is_type_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(TokenKind::Int)
                | Some(TokenKind::Long)
                | Some(TokenKind::Short)
                | Some(TokenKind::Char)
                | Some(TokenKind::Struct)
        )
    }

    /// `<type> = (INT | LONG | SHORT | CHAR | STRUCT NAME) { '*' }`
    fn parse_type_name(&mut self) -> PResult<TypeName> {
        let (base, struct_name) = if self.at(TokenKind::Struct) {
            self.advance();
            let name = self.expect_name()?.text;
            (TokenKind::Struct, Some(name))
        } else {
            let tok = self.advance();
            if !matches!(
                tok.kind,
                TokenKind::Int | TokenKind::Long | TokenKind::Short | TokenKind::Char
            ) {
                return Err(CompileError::new("a type", tok.text, tok.span));
            }
            (tok.kind, None)
        };

        let mut pointers = 0;
        while self.at(TokenKind::Star) {
            self.advance();
            pointers += 1;
        }
        Ok(TypeName {
            base,
            struct_name,
            pointers,
        })
    }

    /// Resolves a parsed [`TypeName`] to a concrete [`DataType`], looking up
    /// struct ids as needed.
    fn resolve_type(&self, type_name: &TypeName) -> PResult<DataType> {
        let base = match type_name.base {
            TokenKind::Char => DataType::CHAR,
            TokenKind::Short => DataType::SHORT,
            TokenKind::Int => DataType::INT,
            TokenKind::Long => DataType::LONG,
            TokenKind::Struct => {
                let name = type_name.struct_name.as_deref().unwrap_or_default();
                let s = self
                    .structs
                    .by_name(name)
                    .ok_or_else(|| CompileError::new("a declared struct", name, Span::dummy()))?;
                DataType {
                    id: s.id,
                    pointers: 0,
                    size: s.size,
                    lvalue: false,
                }
            }
            _ => unreachable!("parse_type_name only ever sets a type-keyword base"),
        };
        let mut resolved = base;
        for _ in 0..type_name.pointers {
            resolved = resolved.pointer_to();
        }
        Ok(resolved)
    }

    // ---- top level ----------------------------------------------------

    /// `<struct-decl> = STRUCT NAME '{' { <type> NAME ';' } '}' ';'`
    fn parse_struct_decl(&mut self) -> PResult<StructDecl> {
        self.expect(TokenKind::Struct)?;
        let name = self.expect_name()?.text;
        self.expect(TokenKind::OpenBrace)?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::CloseBrace) {
            let type_name = self.parse_type_name()?;
            let field_name = self.expect_name()?.text;
            self.expect(TokenKind::Semicolon)?;
            fields.push((field_name, type_name));
        }
        self.expect(TokenKind::CloseBrace)?;
        self.expect(TokenKind::Semicolon)?;

        let field_types: Vec<(String, DataType)> = fields
            .iter()
            .map(|(n, t)| Ok((n.clone(), self.resolve_type(t)?)))
            .collect::<PResult<_>>()?;
        self.structs.declare(name.clone(), field_types);

        Ok(StructDecl { name, fields })
    }

    /// `<function> = <type> NAME '(' [ <type> NAME { ',' <type> NAME } ] ')' ( ';' | <block> )`
    fn parse_function(&mut self) -> PResult<Function> {
        self.parse_type_name()?; // return type: not tracked past parsing
        let name = self.expect_name()?.text;
        self.expect(TokenKind::OpenParen)?;

        let mut params = Vec::new();
        if !self.at(TokenKind::CloseParen) {
            loop {
                let type_name = self.parse_type_name()?;
                let pname = self.expect_name()?.text;
                params.push(Param {
                    name: pname,
                    type_name,
                });
                if self.at(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::CloseParen)?;

        let body = if self.at(TokenKind::Semicolon) {
            self.advance();
            None
        } else {
            Some(self.parse_block_items()?)
        };

        self.functions
            .declare(name.clone(), params.len(), body.is_some());
        Ok(Function { name, params, body })
    }

    // ---- statements -----------------------------------------------------

    fn parse_block_items(&mut self) -> PResult<Vec<BlockItem>> {
        self.expect(TokenKind::OpenBrace)?;
        let mut items = Vec::new();
        while !self.at(TokenKind::CloseBrace) {
            items.push(self.parse_block_item()?);
        }
        self.expect(TokenKind::CloseBrace)?;
        Ok(items)
    }

    fn parse_block_item(&mut self) -> PResult<BlockItem> {
        if self.is_type_start() {
            Ok(BlockItem::VariableDeclaration(self.parse_var_decl()?))
        } else {
            Ok(BlockItem::Statement(self.parse_statement()?))
        }
    }

    /// `<var-decl> = <type> NAME [ '=' <expr> ] ';'`
    fn parse_var_decl(&mut self) -> PResult<VariableDeclaration> {
        let type_name = self.parse_type_name()?;
        let name = self.expect_name()?.text;
        let init = if self.at(TokenKind::Assign) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(VariableDeclaration {
            type_name,
            name,
            init,
        })
    }

    fn parse_statement(&mut self) -> PResult<Statement> {
        match self.peek_kind() {
            Some(TokenKind::Return) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Return(expr))
            }
            Some(TokenKind::OpenBrace) => Ok(Statement::Block(self.parse_block_items()?)),
            Some(TokenKind::If) => self.parse_if(),
            Some(TokenKind::While) => self.parse_while(),
            Some(TokenKind::Do) => self.parse_do_while(),
            Some(TokenKind::For) => self.parse_for(),
            Some(TokenKind::Break) => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Break)
            }
            Some(TokenKind::Continue) => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Continue)
            }
            Some(TokenKind::Semicolon) => {
                self.advance();
                Ok(Statement::ExpressionStmt(None))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::ExpressionStmt(Some(expr)))
            }
        }
    }

    /// `IF '(' <expr> ')' <stmt> [ ELSE <stmt> ]`, the dangling-else
    /// ambiguity resolved the usual way: an `else` binds to the nearest
    /// unmatched `if`, which falls out naturally here since this function
    /// greedily consumes a trailing `else` before returning.
    fn parse_if(&mut self) -> PResult<Statement> {
        self.advance();
        self.expect(TokenKind::OpenParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::CloseParen)?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.at(TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(cond, then_branch, else_branch))
    }

    fn parse_while(&mut self) -> PResult<Statement> {
        self.advance();
        self.expect(TokenKind::OpenParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::CloseParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(cond, body))
    }

    fn parse_do_while(&mut self) -> PResult<Statement> {
        self.advance();
        let body = Box::new(self.parse_statement()?);
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::OpenParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::CloseParen)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Statement::DoWhile(body, cond))
    }

    /// `FOR '(' [<for-init>] ';' [<expr>] ';' [<expr>] ')' <stmt>`
    fn parse_for(&mut self) -> PResult<Statement> {
        self.advance();
        self.expect(TokenKind::OpenParen)?;

        let init = if self.at(TokenKind::Semicolon) {
            None
        } else if self.is_type_start() {
            Some(Box::new(ForInit::Declaration(self.parse_var_decl_no_semi()?)))
        } else {
            Some(Box::new(ForInit::Expression(self.parse_expression()?)))
        };
        self.expect(TokenKind::Semicolon)?;

        let cond = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon)?;

        let post = if self.at(TokenKind::CloseParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::CloseParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For {
            init,
            cond,
            post,
            body,
        })
    }

    /// Like [`Parser::parse_var_decl`] but doesn't consume the trailing
    /// `;` — a `for` header's init clause shares that semicolon with the
    /// condition clause that follows it.
    fn parse_var_decl_no_semi(&mut self) -> PResult<VariableDeclaration> {
        let type_name = self.parse_type_name()?;
        let name = self.expect_name()?.text;
        let init = if self.at(TokenKind::Assign) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(VariableDeclaration {
            type_name,
            name,
            init,
        })
    }

    // ---- expressions: precedence climbing --------------------------------
    //
    // Lowest to highest binding: comma, assignment (right-assoc), ternary,
    // logical-or, logical-and, bitwise-or, bitwise-xor, bitwise-and,
    // equality, relational, shift, additive, multiplicative, unary,
    // postfix, primary.

    fn parse_expression(&mut self) -> PResult<Expression> {
        self.parse_comma()
    }

    fn parse_comma(&mut self) -> PResult<Expression> {
        let mut left = self.parse_assignment()?;
        while self.at(TokenKind::Comma) {
            let span = self.advance().span;
            let right = self.parse_assignment()?;
            left = Expression::new(
                ExpressionKind::BinaryOp(BinaryOp::Comma, Box::new(left), Box::new(right)),
                span,
            );
        }
        Ok(left)
    }

    /// Right-associative. Per DESIGN.md's Open Question decision, a chain
    /// like `a = b = c` is told apart from a comparison chain with a
    /// straightforward else-if on the token that follows the left operand:
    /// if it's one of the assignment operators, recurse on the right before
    /// building the node; otherwise fall through to the ternary level.
    fn parse_assignment(&mut self) -> PResult<Expression> {
        let left = self.parse_ternary()?;
        let op = match self.peek_kind() {
            Some(TokenKind::Assign) => Some(BinaryOp::Assign),
            Some(TokenKind::AddAssign) => Some(BinaryOp::AddAssign),
            Some(TokenKind::SubAssign) => Some(BinaryOp::SubAssign),
            Some(TokenKind::MulAssign) => Some(BinaryOp::MulAssign),
            Some(TokenKind::DivAssign) => Some(BinaryOp::DivAssign),
            Some(TokenKind::ModAssign) => Some(BinaryOp::ModAssign),
            Some(TokenKind::LeftShiftAssign) => Some(BinaryOp::ShlAssign),
            Some(TokenKind::RightShiftAssign) => Some(BinaryOp::ShrAssign),
            Some(TokenKind::AndAssign) => Some(BinaryOp::AndAssign),
            Some(TokenKind::OrAssign) => Some(BinaryOp::OrAssign),
            Some(TokenKind::XorAssign) => Some(BinaryOp::XorAssign),
            _ => None,
        };
        if let Some(op) = op {
            let span = self.advance().span;
            let right = self.parse_assignment()?;
            Ok(Expression::new(
                ExpressionKind::BinaryOp(op, Box::new(left), Box::new(right)),
                span,
            ))
        } else {
            Ok(left)
        }
    }

    fn parse_ternary(&mut self) -> PResult<Expression> {
        let cond = self.parse_logical_or()?;
        if self.at(TokenKind::Question) {
            let span = self.advance().span;
            let then_expr = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            let else_expr = self.parse_assignment()?;
            Ok(Expression::new(
                ExpressionKind::Ternary(
                    Box::new(cond),
                    Box::new(then_expr),
                    Box::new(else_expr),
                ),
                span,
            ))
        } else {
            Ok(cond)
        }
    }

    fn parse_logical_or(&mut self) -> PResult<Expression> {
        self.parse_left_assoc_binary(Self::parse_logical_and, &[(TokenKind::LogicalOr, BinaryOp::LogicalOr)])
    }

    fn parse_logical_and(&mut self) -> PResult<Expression> {
        self.parse_left_assoc_binary(Self::parse_bitwise_or, &[(TokenKind::LogicalAnd, BinaryOp::LogicalAnd)])
    }

    fn parse_bitwise_or(&mut self) -> PResult<Expression> {
        self.parse_left_assoc_binary(Self::parse_bitwise_xor, &[(TokenKind::Pipe, BinaryOp::BitOr)])
    }

    fn parse_bitwise_xor(&mut self) -> PResult<Expression> {
        self.parse_left_assoc_binary(Self::parse_bitwise_and, &[(TokenKind::Caret, BinaryOp::BitXor)])
    }

    fn parse_bitwise_and(&mut self) -> PResult<Expression> {
        self.parse_left_assoc_binary(Self::parse_equality, &[(TokenKind::Ampersand, BinaryOp::BitAnd)])
    }

    fn parse_equality(&mut self) -> PResult<Expression> {
        self.parse_left_assoc_binary(
            Self::parse_relational,
            &[(TokenKind::Eq, BinaryOp::Eq), (TokenKind::Ne, BinaryOp::Ne)],
        )
    }

    fn parse_relational(&mut self) -> PResult<Expression> {
        self.parse_left_assoc_binary(
            Self::parse_shift,
            &[
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::Le, BinaryOp::Le),
                (TokenKind::Ge, BinaryOp::Ge),
            ],
        )
    }

    fn parse_shift(&mut self) -> PResult<Expression> {
        self.parse_left_assoc_binary(
            Self::parse_additive,
            &[
                (TokenKind::LeftShift, BinaryOp::Shl),
                (TokenKind::RightShift, BinaryOp::Shr),
            ],
        )
    }

    fn parse_additive(&mut self) -> PResult<Expression> {
        self.parse_left_assoc_binary(
            Self::parse_multiplicative,
            &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
        )
    }

    fn parse_multiplicative(&mut self) -> PResult<Expression> {
        self.parse_left_assoc_binary(
            Self::parse_unary,
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Mod),
            ],
        )
    }

    /// Shared left-associative climbing step: parse one `next` level, then
    /// keep folding in `(op, next)` pairs for as long as the lookahead
    /// token matches one of `ops`.
    fn parse_left_assoc_binary(
        &mut self,
        next: fn(&mut Self) -> PResult<Expression>,
        ops: &[(TokenKind, BinaryOp)],
    ) -> PResult<Expression> {
        let mut left = next(self)?;
        loop {
            let matched = self
                .peek_kind()
                .and_then(|k| ops.iter().find(|(tk, _)| *tk == k));
            match matched {
                Some(&(_, op)) => {
                    let span = self.advance().span;
                    let right = next(self)?;
                    left = Expression::new(
                        ExpressionKind::BinaryOp(op, Box::new(left), Box::new(right)),
                        span,
                    );
                }
                None => break,
            }
        }
        Ok(left)
    }

    /// `<unary> = ('-' | '~' | '!' | '++' | '--' | '&' | '*') <unary> | <postfix>`
    fn parse_unary(&mut self) -> PResult<Expression> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => Some(UnaryOp::Negate),
            Some(TokenKind::Tilde) => Some(UnaryOp::BitwiseNot),
            Some(TokenKind::Not) => Some(UnaryOp::LogicalNot),
            Some(TokenKind::Increment) => Some(UnaryOp::PreIncrement),
            Some(TokenKind::Decrement) => Some(UnaryOp::PreDecrement),
            Some(TokenKind::Ampersand) => Some(UnaryOp::AddressOf),
            Some(TokenKind::Star) => Some(UnaryOp::Deref),
            _ => None,
        };
        match op {
            Some(op) => {
                let span = self.advance().span;
                let operand = self.parse_unary()?;
                Ok(Expression::new(
                    ExpressionKind::UnaryOp(op, Box::new(operand)),
                    span,
                ))
            }
            None => self.parse_postfix(),
        }
    }

    /// `<postfix> = <primary> { '++' | '--' | '.' NAME | '[' <expr> ']' }`
    fn parse_postfix(&mut self) -> PResult<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::Increment) => {
                    let span = self.advance().span;
                    expr = Expression::new(
                        ExpressionKind::UnaryOp(UnaryOp::PostIncrement, Box::new(expr)),
                        span,
                    );
                }
                Some(TokenKind::Decrement) => {
                    let span = self.advance().span;
                    expr = Expression::new(
                        ExpressionKind::UnaryOp(UnaryOp::PostDecrement, Box::new(expr)),
                        span,
                    );
                }
                Some(TokenKind::Dot) => {
                    let span = self.advance().span;
                    let field = self.expect_name()?.text;
                    expr = Expression::new(
                        ExpressionKind::MemberAccess(Box::new(expr), field),
                        span,
                    );
                }
                Some(TokenKind::OpenBracket) => {
                    let span = self.advance().span;
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::CloseBracket)?;
                    let sum = Expression::new(
                        ExpressionKind::BinaryOp(BinaryOp::Add, Box::new(expr), Box::new(index)),
                        span,
                    );
                    expr = Expression::new(ExpressionKind::UnaryOp(UnaryOp::Deref, Box::new(sum)), span);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// `<primary> = INT_LIT | LONG_LIT | SHORT_LIT | CHAR_LIT | STRING_LIT
    ///            | NAME ( '(' <args> ')' )? | '(' <expr> ')'`
    fn parse_primary(&mut self) -> PResult<Expression> {
        let span = self.current_span();
        match self.peek_kind() {
            Some(TokenKind::IntLiteral) => {
                let tok = self.advance();
                let val: i32 = tok.text.parse().unwrap_or(0);
                Ok(Expression::new(ExpressionKind::ConstantInt(val), tok.span))
            }
            Some(TokenKind::LongLiteral) => {
                let tok = self.advance();
                let digits: String = tok.text.chars().filter(|c| c.is_ascii_digit() || *c == '-').collect();
                let val: i64 = digits.parse().unwrap_or(0);
                Ok(Expression::new(ExpressionKind::ConstantLong(val), tok.span))
            }
            Some(TokenKind::ShortLiteral) => {
                let tok = self.advance();
                let digits: String = tok.text.chars().filter(|c| c.is_ascii_digit() || *c == '-').collect();
                let val: i16 = digits.parse().unwrap_or(0);
                Ok(Expression::new(ExpressionKind::ConstantShort(val), tok.span))
            }
            Some(TokenKind::CharLiteral) => {
                let tok = self.advance();
                let val = unescape_char_literal(&tok.text);
                Ok(Expression::new(ExpressionKind::ConstantChar(val), tok.span))
            }
            Some(TokenKind::StringLiteral) => {
                let tok = self.advance();
                Ok(Expression::new(
                    ExpressionKind::ConstantString(unescape_string_literal(&tok.text)),
                    tok.span,
                ))
            }
            Some(TokenKind::Name) => {
                let tok = self.advance();
                if self.at(TokenKind::OpenParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.at(TokenKind::CloseParen) {
                        loop {
                            args.push(self.parse_assignment()?);
                            if self.at(TokenKind::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::CloseParen)?;
                    Ok(Expression::new(
                        ExpressionKind::FunctionCall(tok.text, args),
                        tok.span,
                    ))
                } else {
                    Ok(Expression::new(ExpressionKind::VariableRef(tok.text), tok.span))
                }
            }
            Some(TokenKind::OpenParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(inner)
            }
            _ => {
                let found = self
                    .tokens
                    .peek()
                    .map(|t| t.text.clone())
                    .unwrap_or_else(|| "end of input".to_string());
                Err(CompileError::new("an expression", found, span))
            }
        }
    }
}

/// The lexer already resolves a char literal's escape (if any) down to the
/// single character it denotes, so this just takes its byte value.
fn unescape_char_literal(text: &str) -> i8 {
    text.chars().next().unwrap_or('\0') as i8
}

/// Strings, unlike char literals, come back from the lexer still quoted and
/// with escapes unresolved (it only recognizes them well enough to find the
/// closing quote), so those still need resolving here.
fn unescape_string_literal(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut out = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(resolve_escape(next));
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn resolve_escape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(src: &str) -> PResult<Application> {
        let mut structs = StructTable::new();
        let mut functions = FunctionTable::new();
        let parser = Parser::new(tokenize(src), &mut structs, &mut functions);
        parser.parse_application()
    }

    #[test]
    fn parses_minimal_function() {
        let app = parse("int main() { return 0; }").unwrap();
        assert_eq!(app.items.len(), 1);
        match &app.items[0] {
            TopLevelItem::Function(f) => assert_eq!(f.name, "main"),
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn additive_binds_looser_than_multiplicative() {
        let app = parse("int main() { return 1 + 2 * 3; }").unwrap();
        let body = match &app.items[0] {
            TopLevelItem::Function(f) => f.body.as_ref().unwrap(),
            _ => panic!(),
        };
        match &body[0] {
            BlockItem::Statement(Statement::Return(expr)) => match &expr.kind {
                ExpressionKind::BinaryOp(BinaryOp::Add, left, right) => {
                    assert!(matches!(left.kind, ExpressionKind::ConstantInt(1)));
                    assert!(matches!(right.kind, ExpressionKind::BinaryOp(BinaryOp::Mul, _, _)));
                }
                other => panic!("expected addition at the top, got {:?}", other),
            },
            other => panic!("expected a return statement, got {:?}", other),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        let app = parse("int main() { int a; int b; a = b = 3; }").unwrap();
        let body = match &app.items[0] {
            TopLevelItem::Function(f) => f.body.as_ref().unwrap(),
            _ => panic!(),
        };
        match &body[2] {
            BlockItem::Statement(Statement::ExpressionStmt(Some(expr))) => match &expr.kind {
                ExpressionKind::BinaryOp(BinaryOp::Assign, _, right) => {
                    assert!(matches!(
                        right.kind,
                        ExpressionKind::BinaryOp(BinaryOp::Assign, _, _)
                    ));
                }
                other => panic!("expected assignment, got {:?}", other),
            },
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn struct_declaration_registers_fields() {
        let mut structs = StructTable::new();
        let mut functions = FunctionTable::new();
        let parser = Parser::new(
            tokenize("struct Point { int x; int y; } int main() { return 0; }"),
            &mut structs,
            &mut functions,
        );
        parser.parse_application().unwrap();
        let point = structs.by_name("Point").unwrap();
        assert_eq!(point.fields.len(), 2);
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        let app = parse("int main() { if (1) if (0) return 1; else return 2; return 3; }").unwrap();
        let body = match &app.items[0] {
            TopLevelItem::Function(f) => f.body.as_ref().unwrap(),
            _ => panic!(),
        };
        match &body[0] {
            BlockItem::Statement(Statement::If(_, then_branch, None)) => {
                assert!(matches!(**then_branch, Statement::If(_, _, Some(_))));
            }
            other => panic!("expected outer if with no else, got {:?}", other),
        }
    }

    #[test]
    fn unclosed_paren_reports_compile_error() {
        let err = parse("int main() { return (1 + 2; }").unwrap_err();
        assert_eq!(err.expected, format!("{}", TokenKind::CloseParen));
    }
}
