//! PowerShell source reading: tokens, a shallow syntax tree, parameter
//! blocks, signature introspection and comment-based help.

pub mod ast;
pub mod help;
pub mod lexer;
pub mod params;
pub mod syntax;
