//! Interactive shell over a virtual tree.
//!
//! A line is tokenized, parsed into a [`ShellCommand`] and run against a
//!  [`Session`], which owns the tree, the cursor and the sync target.

pub mod commands;
pub mod session;
pub mod tokenizer;

pub use commands::{ShellCommand, ShellLine, HELP};
pub use session::{Flow, Session, SessionError};
pub use tokenizer::{tokenize, TokenizeError};
