use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use log::LevelFilter;
use ls8_base::{
    loader::load_program,
    opcode::Disassembler,
    runner::{LS8Runner, LS8Signal},
};
use simple_logger::SimpleLogger;

#[derive(Parser)]
#[command(version, about, long_about, arg_required_else_help(true))]
struct Args {
    /// Program file, one binary literal per line
    file: PathBuf,

    /// Print machine state before every instruction (to stderr)
    #[arg(short, long)]
    trace: bool,

    /// Print disassembly instead of executing
    #[arg(short, long)]
    disassemble: bool,

    /// Do not execute file, only check that it loads
    #[arg(short, long)]
    no_exec: bool,
}

fn main() -> ExitCode {
    let Args {
        file,
        trace,
        disassemble,
        no_exec,
    } = Args::parse();

    let level = if trace {
        LevelFilter::Trace
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to set up logging: {e}");
    }

    let source = match fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read file {}: {e}", file.display());

            return ExitCode::FAILURE;
        }
    };
    let program = match load_program(&source) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");

            return ExitCode::FAILURE;
        }
    };
    log::info!("loaded {} bytes from {}", program.len(), file.display());

    if disassemble {
        for (addr, ins) in Disassembler::new(&program) {
            println!("{addr:02X}: {ins}");
        }
        return ExitCode::SUCCESS;
    }

    let mut ls8 = match LS8Runner::new(&program) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {e}");

            return ExitCode::FAILURE;
        }
    };

    if no_exec {
        return ExitCode::SUCCESS;
    }

    loop {
        match ls8.run_once() {
            Ok(LS8Signal::Continue) => continue,
            Ok(LS8Signal::Data(v)) => println!("{v}"),
            Ok(LS8Signal::Halt) => break,
            Err(e) => {
                eprintln!("Error: {e}");

                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
