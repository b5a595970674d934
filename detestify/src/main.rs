#![warn(clippy::expect_used)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::panic)]

use anyhow::{Context, Result};
use clap::Parser;
use detestify_core::{cli, rewrite, Detestify, LightContext, Rewritten};
use log::debug;
use similar::TextDiff;
use std::{
    env::args,
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    process::exit,
};

fn main() {
    env_logger::init();

    let opts = match cli::Opts::try_parse_from(args()) {
        Ok(opts) => opts,
        Err(error) => {
            // Exit code 1 is reserved for argument errors; clap's default of 2
            // means "parse error" here.
            error.print().ok();
            exit(1);
        }
    };
    let opts: Detestify = opts.into();

    exit(run(&opts));
}

fn run(opts: &Detestify) -> i32 {
    let println = |msg: &dyn AsRef<str>| {
        println!("{}", msg.as_ref());
    };
    let context = LightContext {
        opts,
        println: &println,
    };

    let paths = if opts.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        opts.paths.clone()
    };

    // A failed file must not disturb the rest; the first failure picks the
    // exit code.
    let mut code = 0;
    for path in paths {
        if path.is_dir() {
            for entry in walkdir::WalkDir::new(&path).sort_by_file_name() {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file()
                            && entry.path().to_string_lossy().ends_with("_test.go")
                        {
                            if let Err(error) = process(&context, entry.path()) {
                                report(&error, &mut code);
                            }
                        }
                    }
                    Err(error) => report(&error.into(), &mut code),
                }
            }
        } else if let Err(error) = process(&context, &path) {
            report(&error, &mut code);
        }
    }
    code
}

fn report(error: &anyhow::Error, code: &mut i32) {
    eprintln!("{error:#}");
    if *code == 0 {
        *code = error
            .downcast_ref::<detestify_core::Error>()
            .map_or(4, |error| error.kind().exit_code());
    }
}

fn process(context: &LightContext, path: &Path) -> Result<()> {
    debug!("processing {}", path.display());

    let contents = read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;

    let Rewritten {
        contents: rewritten,
        changed,
    } = rewrite(context, path, &contents)?;

    let opts = context.opts;
    if opts.dry_run {
        if changed {
            println!("{}", path.display());
        }
    } else if opts.diff {
        if changed {
            let text_diff = TextDiff::from_lines(&contents, &rewritten);
            print!(
                "{}",
                text_diff.unified_diff().context_radius(3).header(
                    &format!("a/{}", path.display()),
                    &format!("b/{}", path.display())
                )
            );
        }
    } else if opts.write {
        if changed {
            write(path, &rewritten)
                .with_context(|| format!("failed to write `{}`", path.display()))?;
        }
    } else {
        print!("{rewritten}");
    }
    Ok(())
}
