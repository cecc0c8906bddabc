//! LR(1)/LALR(1)/SLR(1) Parser Generator, Code Generator and Bytecode VM
//!
//! See `lib.rs` for the module map. This binary is a thin wrapper around
//! [`lr1vm::cli`].
//!
//! # Author
//! Juan Manuel Young Hoyos

use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = lr1vm::cli::main() {
        log::error!("{e}");
        process::exit(1);
    }
}
