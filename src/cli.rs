//! Shared plumbing for the command-line tools.

use std::ffi::OsString;

use clap::Parser;
use clap::error::{ContextKind, ContextValue, ErrorKind};

/// Parse the command line, or print `usage` and return `None` when the
/// positional arguments are missing or extra. Help, version, unknown flags
/// and malformed option values are left to clap.
pub fn parse_or_usage<T: Parser>(usage: &str) -> Option<T> {
    parse_or_usage_from(usage, std::env::args_os())
}

/// [`parse_or_usage`] over an explicit argument list (program name first).
pub fn parse_or_usage_from<T, I, A>(usage: &str, args: I) -> Option<T>
where
    T: Parser,
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Some(cli),
        Err(e) if is_usage_error(&e) => {
            println!("{usage}");
            None
        }
        Err(e) => e.exit(),
    }
}

/// A wrong number of positionals. clap reports a surplus positional as an
/// unknown argument, the same kind it uses for a misspelled flag, so the
/// offending argument tells the two apart.
fn is_usage_error(e: &clap::Error) -> bool {
    match e.kind() {
        ErrorKind::MissingRequiredArgument
        | ErrorKind::TooManyValues
        | ErrorKind::WrongNumberOfValues => true,
        ErrorKind::UnknownArgument => !matches!(
            e.get(ContextKind::InvalidArg),
            Some(ContextValue::String(arg)) if arg.starts_with('-')
        ),
        _ => false,
    }
}

/// Route `log` output to stderr. `-v` enables info, `-vv` debug, `-vvv`
/// trace; `RUST_LOG` overrides either way.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
