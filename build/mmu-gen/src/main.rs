mod config;
mod logger;

use std::ffi::OsString;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::{env, io, process};

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use short_descriptor::Arch;

/// Helper for passing VERSION to opt.
/// If `CARGO_VERSION_INFO` is set, use it, otherwise use `CARGO_PKG_VERSION`.
fn version() -> &'static str {
    option_env!("CARGO_VERSION_INFO").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Generates ARMv8 short-descriptor translation tables (TTB and SLTTB) as assembler data
/// directives on standard output.
#[derive(Debug, Parser)]
#[clap(version = version(), args_override_self = true)]
struct Options {
    /// The architecture to generate tables for, `-32` and `-64` are accepted as shorthands
    #[clap(long, value_enum, default_value_t = ArchArg::Aarch32)]
    arch: ArchArg,
    /// Path to a memory map description, in TOML. Defaults to the built-in map of the architecture
    #[clap(long, value_hint = ValueHint::FilePath)]
    map: Option<PathBuf>,
    /// Enables verbose logging
    #[clap(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,
    /// Only log warnings and errors
    #[clap(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ArchArg {
    /// AArch32 short-descriptor tables, ARM assembler syntax
    #[value(name = "32")]
    Aarch32,
    /// AArch64 tables, GNU assembler syntax (not implemented)
    #[value(name = "64")]
    Aarch64,
}

impl From<ArchArg> for Arch {
    fn from(arg: ArchArg) -> Self {
        match arg {
            ArchArg::Aarch32 => Arch::Arch32,
            ArchArg::Aarch64 => Arch::Arch64,
        }
    }
}

/// Rewrites the single-dash `-32`/`-64` architecture flags into `--arch` form.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-32") => OsString::from("--arch=32"),
            Some("-64") => OsString::from("--arch=64"),
            _ => arg,
        })
        .collect()
}

fn parse_options(args: impl IntoIterator<Item = OsString>) -> Result<Options, clap::Error> {
    Options::try_parse_from(normalize_args(args))
}

/// Renders a parse error or help text, with ANSI styling only when `color` is set.
fn render_error(err: &clap::Error, color: bool) -> String {
    let styled = err.render();
    if color {
        styled.ansi().to_string()
    } else {
        styled.to_string()
    }
}

fn main() {
    let opts = match parse_options(env::args_os()) {
        Ok(opts) => opts,
        Err(err) => {
            // help and usage errors alike go to stderr, stdout only ever carries tables
            eprint!("{}", render_error(&err, io::stderr().is_terminal()));
            process::exit(err.exit_code());
        }
    };

    logger::init(opts.verbose, opts.quiet);

    if let Err(err) = run(&opts) {
        log::error!("{err:?}");
        process::exit(1);
    }
}

fn run(opts: &Options) -> anyhow::Result<()> {
    let arch = Arch::from(opts.arch);

    let map = opts
        .map
        .as_deref()
        .map(config::load_memory_map)
        .transpose()?;

    let tables = short_descriptor::generate(arch, map.as_ref())
        .with_context(|| format!("failed to generate {arch} translation tables"))?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(tables.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write translation tables")?;

    log::info!(action = "Generated"; "{arch} translation tables");

    Ok(())
}
