//! Front end and x86-64 code generator for a small C-like language. The
//! main entry point is [`Compiler::compile`], which takes a source string
//! and a [`CompilerOptions`] and returns the generated AT&T/GAS assembly, or
//! a [`WithSource`] error if the program doesn't parse.
//!
//! ```
//! use mxcc::{Compiler, CompilerOptions};
//!
//! let source = "int main() { return 2 + 2; }";
//! let asm = Compiler::compile(source, CompilerOptions::default()).unwrap();
//! assert!(asm.render().contains("main:"));
//! ```

#![deny(clippy::all, unused_must_use)]

pub mod assembly;
pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod optable;
pub mod parser;
pub mod register;
pub mod scope;
pub mod types;
pub mod util;

pub use assembly::Assembly;
pub use error::{CompileError, WithSource};

use ast::Application;
use codegen::CodeGenerator;
use optable::OperatorTable;
use parser::Parser;
use scope::FunctionTable;
use types::StructTable;

/// Knobs the driver exposes over the pipeline. Currently just whether a
/// future optimization pass runs; no such pass exists yet.
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    /// Reserved for a future optimization-level flag. No optimization
    /// passes exist yet, so this has no effect.
    pub optimize: bool,
}

/// Owns the pipeline stages that live for the whole compilation: the struct
/// and function tables populated during parsing, and the operator table
/// built once up front. By having this on a struct, each compile step can
/// take a `&self`/`&mut self` param and hand off to the next in order.
pub struct Compiler {
    structs: StructTable,
    functions: FunctionTable,
    operators: OperatorTable,
}

impl Compiler {
    fn new() -> Self {
        Compiler {
            structs: StructTable::new(),
            functions: FunctionTable::new(),
            operators: OperatorTable::build(),
        }
    }

    /// Runs the whole pipeline — tokenize, parse, generate — on `source`,
    /// returning the emitted assembly or the parse error it failed on.
    pub fn compile(source: &str, _options: CompilerOptions) -> Result<Assembly, WithSource> {
        let mut compiler = Compiler::new();

        let tokens = lexer::tokenize(source);
        debug!(eprintln!("tokens: {:?}", tokens));

        let app = compiler
            .parse(tokens)
            .map_err(|e| WithSource::new(e, source.to_string()))?;
        debug!(eprintln!("ast: {:?}", app));

        let asm = compiler.generate(&app);
        debug!(eprintln!("asm:\n{}", asm.render()));

        Ok(asm)
    }

    fn parse(&mut self, tokens: lexer::TokenStream) -> Result<Application, CompileError> {
        Parser::new(tokens, &mut self.structs, &mut self.functions).parse_application()
    }

    fn generate(&self, app: &Application) -> Assembly {
        CodeGenerator::new(&self.structs, &self.functions, &self.operators).generate(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_program() {
        let asm =
            Compiler::compile("int main() { return 0; }", CompilerOptions::default()).unwrap();
        assert!(asm.render().contains("main:"));
        assert!(asm.render().contains("ret"));
    }

    #[test]
    fn reports_a_parse_error_with_source_context() {
        let err =
            Compiler::compile("int main() { return", CompilerOptions::default()).unwrap_err();
        let rendered = format!("{:#}", err);
        assert!(rendered.contains("Error on line"));
    }
}
