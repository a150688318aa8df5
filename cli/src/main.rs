#![deny(clippy::all)]

use anyhow::Context;
use mxcc::{Compiler, CompilerOptions};
use std::{fs, path::PathBuf, process};
use structopt::StructOpt;

/// Command-line driver for the mxcc compiler: reads a source file, compiles
/// it to x86-64 AT&T/GAS assembly, and writes the result to an output file
/// (and echoes it to stdout).
#[derive(Debug, StructOpt)]
#[structopt(name = "mxcc")]
struct Opt {
    /// Path to the C-like source file to compile.
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Path to write the generated assembly to.
    #[structopt(parse(from_os_str), long = "output", short = "o", default_value = "a.s")]
    output: PathBuf,
}

fn run(opt: Opt) -> anyhow::Result<()> {
    let source = fs::read_to_string(&opt.input)
        .with_context(|| format!("failed to read {:?}", opt.input))?;

    let asm = Compiler::compile(&source, CompilerOptions::default())
        .map_err(|e| anyhow::anyhow!("{:#}", e))?;

    let rendered = asm.render();
    fs::write(&opt.output, &rendered)
        .with_context(|| format!("failed to write {:?}", opt.output))?;
    print!("{}", rendered);

    Ok(())
}

fn main() {
    let exit_code = match run(Opt::from_args()) {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("{:#}", err);
            1
        }
    };
    process::exit(exit_code);
}
