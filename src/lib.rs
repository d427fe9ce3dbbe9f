//! Prescribe - an interpreter for the Lucid pseudocode language
//!
//! This library provides the core components for lexing, parsing, type
//! checking, and interpreting Prescribe programs:
//!
//! ```text
//! source → Lexer → tokens → Parser → Program<()> → Checker → Program<Type>
//!        → Interpreter → stdout transcript (or a Diagnostic)
//! ```
//!
//! Programs are deterministic: given the same source, stdin, and file
//! system, the transcript and diagnostic are bit-identical across runs.

pub mod ast;
pub mod date;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod loader;
pub mod num;
pub mod parser;
pub mod types;

pub use error::{Diagnostic, ErrorKind};
pub use interpreter::RunOutcome;

/// Type alias for a parsed program with no type information yet.
pub type ParsedProgram = ast::Program<()>;

/// Type alias for a checked, type-annotated program.
pub type CheckedProgram = ast::Program<types::Type>;

/// Run the front half of the pipeline: tokens, tree, annotations.
pub fn compile(source: &str) -> Result<CheckedProgram, Diagnostic> {
    let program = parser::parse_source(source)?;
    types::check_program(&program)
}

/// Compile and execute one program against the given stdin text.
///
/// Output buffered before a failure is preserved in the outcome.
pub fn run_source(source: &str, stdin: &str) -> RunOutcome {
    match compile(source) {
        Ok(program) => interpreter::run_program(&program, stdin),
        Err(error) => RunOutcome {
            output: String::new(),
            error: Some(error),
        },
    }
}

/// Execute every fenced block of a `.prsd` document in order, as
/// independent programs. Each block sees the full stdin stream.
/// Execution stops at the first block that fails; output produced
/// before the failure is kept.
pub fn run_document(document: &str, stdin: &str) -> RunOutcome {
    let mut output = String::new();
    for block in loader::extract_blocks(document) {
        let outcome = run_source(&block, stdin);
        output.push_str(&outcome.output);
        if outcome.error.is_some() {
            return RunOutcome {
                output,
                error: outcome.error,
            };
        }
    }
    RunOutcome {
        output,
        error: None,
    }
}
