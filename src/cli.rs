//! CLI surface for the LR(1)/LALR(1)/SLR(1) parser generator and VM.
//!
//! Ported in spirit from the teacher's stdin-driven interactive loop, but
//! restructured around [`clap`]'s derive API into the subcommands a
//! compiler/VM pair actually needs: `run` (source to result in one shot),
//! `compile` (source to a bytecode file), `exec` (run a compiled bytecode
//! file), and `legacy` (the original LL(1)/SLR(1) grammar-file tool, kept
//! verbatim for the small-alphabet grammars it was built for).

use crate::error::Error;
use clap::{Parser as ClapParser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "lr1vm", version, about = "LR(1) parser generator and bytecode VM for a small scripting language")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compile and immediately run a script, printing the result.
    Run {
        /// Path to a script source file.
        file: PathBuf,
    },
    /// Compile a script to a bytecode file without running it.
    Compile {
        /// Path to a script source file.
        file: PathBuf,
        /// Output bytecode path.
        #[arg(short, long, default_value = "a.out")]
        output: PathBuf,
    },
    /// Execute a previously compiled bytecode file.
    Exec {
        /// Path to a bytecode file produced by `compile`.
        file: PathBuf,
    },
    /// Run the legacy interactive LL(1)/SLR(1) grammar-file tool.
    Legacy,
}

pub fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { file } => run_script(&file),
        Command::Compile { file, output } => compile_script(&file, &output),
        Command::Exec { file } => exec_bytecode(&file),
        Command::Legacy => legacy::run().map_err(|e| Error::Grammar(e.to_string())),
    }
}

fn run_script(path: &PathBuf) -> Result<(), Error> {
    let src = fs::read_to_string(path)?;
    log::info!("running {}", path.display());
    match crate::pipeline::run(&src)? {
        Some(v) => println!("{v:?}"),
        None => log::info!("program produced no value"),
    }
    Ok(())
}

fn compile_script(path: &PathBuf, output: &PathBuf) -> Result<(), Error> {
    let src = fs::read_to_string(path)?;
    let (code, global_slots) = crate::pipeline::compile(&src)?;
    log::info!("compiled {} to {} bytes, {} global slots", path.display(), code.len(), global_slots);
    let mut out = Vec::with_capacity(4 + code.len());
    out.extend_from_slice(&(global_slots as u32).to_le_bytes());
    out.extend_from_slice(&code);
    fs::write(output, out)?;
    Ok(())
}

fn exec_bytecode(path: &PathBuf) -> Result<(), Error> {
    let bytes = fs::read(path)?;
    if bytes.len() < 4 {
        return Err(Error::Vm { ip: 0, opcode: "LOAD".to_string(), message: "bytecode file too short".to_string() });
    }
    let global_slots = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let code = bytes[4..].to_vec();
    let mut vm = crate::vm::Vm::new(code, global_slots);
    vm.run()?;
    if let Some(v) = vm.top() {
        println!("{v:?}");
    }
    Ok(())
}

/// The original LL(1)/SLR(1) grammar-analysis tool, preserved as a
/// subcommand: reads a grammar description and a batch of test strings from
/// stdin in the teacher's original wire format.
mod legacy {
    use crate::error::Result;
    use crate::first_follow::{compute_first_sets, compute_follow_sets};
    use crate::grammar::Grammar;
    use crate::ll1::LL1Parser;
    use crate::slr1::SLR1Parser;
    use super::{io, BufRead, Write};

    pub fn run() -> Result<()> {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();

        let grammar_lines = read_grammar(&mut lines)?;
        let grammar = Grammar::parse(&grammar_lines)?;

        let first_sets = compute_first_sets(&grammar);
        let follow_sets = compute_follow_sets(&grammar, &first_sets);

        let ll1_result = LL1Parser::build(grammar.clone(), first_sets.clone(), follow_sets.clone());
        let slr1_result = SLR1Parser::build(grammar, follow_sets);

        match (ll1_result, slr1_result) {
            (Ok(ll1_parser), Ok(slr1_parser)) => {
                interactive_mode(ll1_parser, slr1_parser, &mut lines)?;
            }
            (Ok(ll1_parser), Err(_)) => {
                println!("Grammar is LL(1).");
                parse_strings(|s| ll1_parser.parse(s), &mut lines)?;
            }
            (Err(_), Ok(slr1_parser)) => {
                println!("Grammar is SLR(1).");
                parse_strings(|s| slr1_parser.parse(s), &mut lines)?;
            }
            (Err(_), Err(_)) => {
                println!("Grammar is neither LL(1) nor SLR(1).");
            }
        }

        Ok(())
    }

    fn read_grammar<R: BufRead>(lines: &mut io::Lines<R>) -> Result<Vec<String>> {
        let mut grammar_lines = Vec::new();

        let n_str = lines
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "Expected number of nonterminals"))??;

        let n = n_str
            .trim()
            .parse::<usize>()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid number"))?;

        grammar_lines.push(n_str);

        for _ in 0..n {
            let line = lines
                .next()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "Expected production line"))??;
            grammar_lines.push(line);
        }

        Ok(grammar_lines)
    }

    fn parse_strings<F, R>(parse_fn: F, lines: &mut io::Lines<R>) -> Result<()>
    where
        F: Fn(&str) -> bool,
        R: BufRead,
    {
        while let Some(Ok(line)) = lines.next() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            let result = parse_fn(trimmed);
            println!("{}", if result { "yes" } else { "no" });
        }
        Ok(())
    }

    fn interactive_mode<R: BufRead>(
        ll1_parser: LL1Parser,
        slr1_parser: SLR1Parser,
        lines: &mut io::Lines<R>,
    ) -> Result<()> {
        loop {
            print!("Select a parser (T: for LL(1), B: for SLR(1), Q: quit):\n");
            io::stdout().flush()?;

            let choice = match lines.next() {
                Some(Ok(line)) => line.trim().to_string(),
                Some(Err(e)) => return Err(e.into()),
                None => break,
            };

            match choice.as_str() {
                "Q" | "q" => break,
                "T" | "t" => parse_strings(|s| ll1_parser.parse(s), lines)?,
                "B" | "b" => parse_strings(|s| slr1_parser.parse(s), lines)?,
                _ => continue,
            }
        }
        Ok(())
    }
}
