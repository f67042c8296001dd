//! Logging setup: the `log` facade with an `env_logger` backend on stderr.
//!
//! `RUST_LOG` wins when set. Otherwise `--quiet` keeps errors only, the
//! default shows warnings (unreadable files), and each `-v` goes one level
//! further: info, debug, trace.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;
use std::io::Write;

pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();
    builder.target(Target::Stderr);

    if env::var_os("RUST_LOG").is_some() {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
    });

    // Tests may initialise more than once.
    let _ = builder.try_init();
}

fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
