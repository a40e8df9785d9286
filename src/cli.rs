// Command line interface module
// The demo takes no options; arguments are accepted and ignored

use clap::Parser;
use log::debug;
use std::ffi::OsString;

/// keyswap - shows a different bitmap for each arrow key
#[derive(Parser, Debug)]
#[command(name = "keyswap")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Ignored
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        hide = true
    )]
    pub ignored: Vec<OsString>,
}

/// Parse arguments without ever aborting the program
pub fn parse_args() -> Args {
    parse_from(std::env::args_os())
}

fn parse_from<I, T>(args: I) -> Args
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Args::try_parse_from(args) {
        Ok(args) => {
            if !args.ignored.is_empty() {
                debug!("Ignoring {} command line argument(s)", args.ignored.len());
            }
            args
        }
        Err(e) => {
            debug!("Ignoring command line: {}", e.kind());
            Args {
                ignored: Vec::new(),
            }
        }
    }
}
