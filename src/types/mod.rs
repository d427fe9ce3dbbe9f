//! Static semantics: semantic types, symbol table, constant folding,
//! and the type checker that annotates the AST.

pub mod check;
pub mod consteval;
pub mod symbols;
pub mod ty;

pub use check::check_program;
pub use consteval::ConstValue;
pub use ty::Type;
