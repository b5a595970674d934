use crate::Detestify;
use clap::{crate_version, Parser};
use std::path::PathBuf;

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Parser)]
#[clap(
    version = crate_version!(),
    about = "Rewrites testify-based Go tests into standard library testing code"
)]
#[remain::sorted]
pub struct Opts {
    #[clap(long, help = "Render a unified diff of each file that would change")]
    diff: bool,
    #[clap(
        long,
        help = "Do not emit rewritten sources; list the files that would change"
    )]
    dry_run: bool,
    #[clap(
        long,
        help = "Prepend literal assertion messages to the synthesized diagnostics"
    )]
    preserve_messages: bool,
    #[clap(
        long,
        help = "Always use the scalar equality form; never synthesize a structural diff"
    )]
    stdlib_only: bool,
    #[clap(long, help = "Emit a trace line for every rewritten call-site")]
    verbose: bool,
    #[clap(long, help = "Write rewritten sources back to the original files")]
    write: bool,
    #[clap(
        value_name = "PATHS",
        help = "Files or directories to rewrite (default: current directory)"
    )]
    zpaths: Vec<String>,
}

impl From<Opts> for Detestify {
    fn from(opts: Opts) -> Self {
        let Opts {
            diff,
            dry_run,
            preserve_messages,
            stdlib_only,
            verbose,
            write,
            zpaths,
        } = opts;
        let paths = zpaths.iter().map(PathBuf::from).collect::<Vec<_>>();
        Self {
            diff,
            dry_run,
            paths,
            preserve_messages,
            stdlib_only,
            verbose,
            write,
        }
    }
}
