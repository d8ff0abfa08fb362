//! Display helpers shared by array and table pretty-printing.

use std::fmt::Display;

/// Maximum number of elements or rows rendered before eliding.
pub const MAX_PREVIEW: usize = 10;

/// Convenience print trait for anything `Display`.
pub trait Print: Display {
    /// Prints the value to stdout with a trailing newline.
    fn print(&self) {
        println!("{self}");
    }
}

impl<T: Display> Print for T {}
