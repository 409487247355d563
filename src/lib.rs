//! jam2rs converts Jam build scripts into standalone Rust programs.
//!
//! The pipeline: [`scanner`] turns source text into the whitespace- and
//! quote-sensitive token stream, [`parser`] builds the AST, and [`codegen`]
//! lowers it into a target program that either renders as Rust source
//! (depending only on the [`runtime`] list-model library) or runs directly
//! through [`eval`]. Both execution paths produce identical output for the
//! same script.

pub mod ast;
pub mod codegen;
pub mod eval;
pub mod parser;
pub mod runtime;
pub mod scanner;
pub mod token;

pub use codegen::{ConvertError, ConvertOptions, Converter, SourceUnit};

/// Converts a set of Jam units into one Rust source file with default
/// options. The first unit becomes the entry point.
pub fn convert_to_rust(units: &[SourceUnit]) -> Result<String, ConvertError> {
    Converter::new().convert_to_rust(units)
}
