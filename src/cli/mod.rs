//! CLI module - command-line interface
//!
//! Contains the transcript renderer and Ctrl-C handling used by the binary.

pub mod console;
pub mod interrupt;

pub use console::Console;
pub use interrupt::{InterruptAction, Interrupts};
