//! Middle-end passes: semantic analysis over the AST, then lowering to
//! the three-address IR.

pub mod lower;
pub mod type_check;
