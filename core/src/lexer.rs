//! Tokenizer: turns source text into a FIFO stream of tagged tokens. It
//! carries no parsing or type logic, just pattern matching over raw text.

use crate::util::Span;
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair},
    IResult, Offset,
};
use nom_locate::{position, LocatedSpan};
use std::collections::VecDeque;
use std::fmt;

type RawSpan<'a> = LocatedSpan<&'a str>;

/// The tag half of a [`Token`]. Carries no payload; the matched text lives
/// alongside it on `Token::text`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Int,
    Long,
    Short,
    Char,
    Struct,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,

    // Punctuation
    Semicolon,
    Comma,
    Colon,
    Dot,
    Question,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Increment,
    Decrement,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    LeftShiftAssign,
    RightShiftAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    LeftShift,
    RightShift,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Not,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    LogicalAnd,
    LogicalOr,

    // Literals
    IntLiteral,
    ShortLiteral,
    LongLiteral,
    CharLiteral,
    StringLiteral,
    Name,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A single lexical token: its kind, the source text it was matched from,
/// and the span that text occupies.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

/// A FIFO sequence of tokens. The parser only ever looks at the front, so
/// this is deliberately a thin wrapper around [`VecDeque`] rather than a
/// random-access slice.
#[derive(Debug, Default)]
pub struct TokenStream {
    tokens: VecDeque<Token>,
}

impl TokenStream {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Look at the next token without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    /// Consume and return the next token. Panics if the stream is empty;
    /// callers are expected to check `peek`/`peek_kind` (or `expect`) first,
    /// since running past the end of a well-formed program is a parser bug.
    pub fn advance(&mut self) -> Token {
        self.tokens
            .pop_front()
            .expect("advanced past the end of the token stream")
    }
}

fn keyword(kw: &str) -> Option<TokenKind> {
    Some(match kw {
        "int" => TokenKind::Int,
        "long" => TokenKind::Long,
        "short" => TokenKind::Short,
        "char" => TokenKind::Char,
        "struct" => TokenKind::Struct,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        _ => return None,
    })
}

/// Matches an identifier or, if the text happens to be a keyword, the
/// corresponding keyword kind.
fn lex_name_or_keyword(input: RawSpan) -> IResult<RawSpan, (TokenKind, String)> {
    map(
        recognize(pair(
            take_while1(|c: char| c.is_alphabetic() || c == '_' || c == '$'),
            take_while1_opt(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
        )),
        |s: RawSpan| {
            let text = s.fragment().to_string();
            let kind = keyword(&text).unwrap_or(TokenKind::Name);
            (kind, text)
        },
    )(input)
}

// `take_while1` requires at least one match; identifiers only need one
// leading character, so the remainder is allowed to be empty.
fn take_while1_opt(
    cond: impl Fn(char) -> bool + Copy,
) -> impl Fn(RawSpan) -> IResult<RawSpan, RawSpan> {
    move |input: RawSpan| {
        let (rest, matched) =
            nom::bytes::complete::take_while(cond)(input)?;
        Ok((rest, matched))
    }
}

fn escape_char(input: RawSpan) -> IResult<RawSpan, char> {
    alt((
        value('\n', tag("\\n")),
        value('\t', tag("\\t")),
        value('\r', tag("\\r")),
        value('\u{c}', tag("\\f")),
        map(
            nom::sequence::preceded(char('\\'), nom::character::complete::anychar),
            |c| c,
        ),
        nom::character::complete::anychar,
    ))(input)
}

fn lex_char_literal(input: RawSpan) -> IResult<RawSpan, (TokenKind, String)> {
    map(
        delimited(char('\''), escape_char, char('\'')),
        |c| (TokenKind::CharLiteral, c.to_string()),
    )(input)
}

fn lex_string_literal(input: RawSpan) -> IResult<RawSpan, (TokenKind, String)> {
    map(
        recognize(delimited(
            char('"'),
            many0(alt((
                recognize(pair(char('\\'), nom::character::complete::anychar)),
                is_not("\"\\"),
            ))),
            char('"'),
        )),
        |s: RawSpan| (TokenKind::StringLiteral, s.fragment().to_string()),
    )(input)
}

fn lex_number(input: RawSpan) -> IResult<RawSpan, (TokenKind, String)> {
    map(
        pair(recognize(digit1), opt(one_of("sSlL"))),
        |(digits, suffix): (RawSpan, Option<char>)| {
            let mut text = digits.fragment().to_string();
            let kind = match suffix {
                Some(c @ ('s' | 'S')) => {
                    text.push(c);
                    TokenKind::ShortLiteral
                }
                Some(c @ ('l' | 'L')) => {
                    text.push(c);
                    TokenKind::LongLiteral
                }
                _ => TokenKind::IntLiteral,
            };
            (kind, text)
        },
    )(input)
}

/// Multi-character operators, tried longest-prefix-first so that e.g. `<<=`
/// is recognized before `<<` before `<`.
fn lex_operator(input: RawSpan) -> IResult<RawSpan, (TokenKind, String)> {
    macro_rules! op {
        ($text:literal, $kind:expr) => {
            value(($kind, $text.to_string()), tag($text))
        };
    }
    alt((
        alt((
            op!("<<=", TokenKind::LeftShiftAssign),
            op!(">>=", TokenKind::RightShiftAssign),
        )),
        alt((
            op!("++", TokenKind::Increment),
            op!("--", TokenKind::Decrement),
            op!("+=", TokenKind::AddAssign),
            op!("-=", TokenKind::SubAssign),
            op!("*=", TokenKind::MulAssign),
            op!("/=", TokenKind::DivAssign),
            op!("%=", TokenKind::ModAssign),
            op!("&=", TokenKind::AndAssign),
            op!("|=", TokenKind::OrAssign),
            op!("^=", TokenKind::XorAssign),
            op!("<<", TokenKind::LeftShift),
            op!(">>", TokenKind::RightShift),
            op!("==", TokenKind::Eq),
            op!("!=", TokenKind::Ne),
            op!(">=", TokenKind::Ge),
            op!("<=", TokenKind::Le),
            op!("&&", TokenKind::LogicalAnd),
            op!("||", TokenKind::LogicalOr),
        )),
        alt((
            op!("+", TokenKind::Plus),
            op!("-", TokenKind::Minus),
            op!("*", TokenKind::Star),
            op!("/", TokenKind::Slash),
            op!("%", TokenKind::Percent),
            op!("=", TokenKind::Assign),
            op!(">", TokenKind::Gt),
            op!("<", TokenKind::Lt),
            op!("!", TokenKind::Not),
            op!("&", TokenKind::Ampersand),
            op!("|", TokenKind::Pipe),
            op!("^", TokenKind::Caret),
            op!("~", TokenKind::Tilde),
        )),
    ))(input)
}

fn lex_punctuation(input: RawSpan) -> IResult<RawSpan, (TokenKind, String)> {
    macro_rules! punc {
        ($text:literal, $kind:expr) => {
            value(($kind, $text.to_string()), tag($text))
        };
    }
    alt((
        punc!(";", TokenKind::Semicolon),
        punc!(",", TokenKind::Comma),
        punc!(":", TokenKind::Colon),
        punc!(".", TokenKind::Dot),
        punc!("?", TokenKind::Question),
        punc!("(", TokenKind::OpenParen),
        punc!(")", TokenKind::CloseParen),
        punc!("{", TokenKind::OpenBrace),
        punc!("}", TokenKind::CloseBrace),
        punc!("[", TokenKind::OpenBracket),
        punc!("]", TokenKind::CloseBracket),
    ))(input)
}

fn lex_one(input: RawSpan) -> IResult<RawSpan, (TokenKind, String)> {
    alt((
        lex_string_literal,
        lex_char_literal,
        lex_number,
        lex_name_or_keyword,
        lex_operator,
        lex_punctuation,
    ))(input)
}

fn skip_whitespace(input: RawSpan) -> IResult<RawSpan, ()> {
    value((), nom::character::complete::multispace0)(input)
}

/// Tokenize the whole of `source`, producing a token stream in source order.
/// Whitespace is skipped between tokens; there is no trailing "end of file"
/// token, callers check `TokenStream::is_empty`.
pub fn tokenize(source: &str) -> TokenStream {
    let mut input = RawSpan::new(source);
    let mut tokens = VecDeque::new();
    loop {
        let (rest, _) = skip_whitespace(input).expect("multispace0 never fails");
        input = rest;
        if input.fragment().is_empty() {
            break;
        }
        let start = input;
        match lex_one(input) {
            Ok((rest, (kind, text))) => {
                let (rest, end_position) =
                    position::<RawSpan, (RawSpan, nom::error::ErrorKind)>(rest)
                        .expect("position never fails");
                let span = Span {
                    offset: start.location_offset(),
                    length: start.offset(&rest),
                    start_line: start.location_line() as usize,
                    start_col: start.get_column(),
                    end_line: end_position.location_line() as usize,
                    end_col: end_position.get_column(),
                };
                tokens.push_back(Token { kind, text, span });
                input = rest;
            }
            Err(_) => {
                // A character that matches no pattern. Skip it so the parser
                // still gets a well-formed (if incomplete) stream to fail on.
                let result: IResult<RawSpan, char> =
                    nom::character::complete::anychar(input);
                if let Ok((rest, _)) = result {
                    input = rest;
                } else {
                    break;
                }
            }
        }
    }
    TokenStream { tokens }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut stream = tokenize(src);
        let mut out = Vec::new();
        while !stream.is_empty() {
            out.push(stream.advance().kind);
        }
        out
    }

    #[test]
    fn keywords_vs_names() {
        assert_eq!(kinds("int x"), vec![TokenKind::Int, TokenKind::Name]);
        assert_eq!(kinds("integer"), vec![TokenKind::Name]);
    }

    #[test]
    fn compound_assign_before_prefix() {
        assert_eq!(
            kinds("x <<= 1"),
            vec![TokenKind::Name, TokenKind::LeftShiftAssign, TokenKind::IntLiteral]
        );
        assert_eq!(
            kinds("x << 1"),
            vec![TokenKind::Name, TokenKind::LeftShift, TokenKind::IntLiteral]
        );
        assert_eq!(
            kinds("x < 1"),
            vec![TokenKind::Name, TokenKind::Lt, TokenKind::IntLiteral]
        );
    }

    #[test]
    fn literal_suffixes() {
        let mut stream = tokenize("123 123s 123L");
        let a = stream.advance();
        let b = stream.advance();
        let c = stream.advance();
        assert_eq!(a.kind, TokenKind::IntLiteral);
        assert_eq!(b.kind, TokenKind::ShortLiteral);
        assert_eq!(c.kind, TokenKind::LongLiteral);
    }

    #[test]
    fn string_and_char_escapes() {
        let mut stream = tokenize(r#" "a\nb" 'c' '\t' "#);
        let s = stream.advance();
        assert_eq!(s.kind, TokenKind::StringLiteral);
        assert_eq!(s.text, r#""a\nb""#);
        let c1 = stream.advance();
        assert_eq!(c1.text, "c");
        let c2 = stream.advance();
        assert_eq!(c2.text, "\t");
    }

    #[test]
    fn logical_vs_bitwise() {
        assert_eq!(kinds("&&"), vec![TokenKind::LogicalAnd]);
        assert_eq!(kinds("&"), vec![TokenKind::Ampersand]);
        assert_eq!(kinds("||"), vec![TokenKind::LogicalOr]);
        assert_eq!(kinds("|"), vec![TokenKind::Pipe]);
    }
}
