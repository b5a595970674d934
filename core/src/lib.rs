#![warn(clippy::expect_used)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::panic)]

mod classify;
pub use classify::AssertionKind;

#[cfg(feature = "clap")]
pub mod cli;

mod core;
pub use crate::core::{rewrite, Detestify, LightContext, Rewritten};

mod error;
pub use error::{Error, ErrorKind};

mod heuristics;

mod imports;

mod mocks;

mod parsing;

mod rewriter;

mod suite;

mod synthesize;

mod util;

mod visitor;
