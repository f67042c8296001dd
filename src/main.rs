use clap::Parser;
use console::style;
use listdupes::app;
use listdupes::cli::Cli;
use listdupes::error::ExitCode;
use listdupes::logging::init_logging;
use listdupes::signal::install_handler;
use std::io;
use std::process;

fn main() {
    let args = Cli::parse();
    init_logging(args.verbose, args.quiet);

    let result = args.to_scan_config().and_then(|config| {
        let shutdown = install_handler()?;
        app::run(&config, &shutdown, io::stdin().lock(), io::stdout().lock())
    });

    let code = match result {
        Ok(outcome) => {
            if let Some(message) = outcome.message().filter(|_| !args.quiet) {
                eprintln!("{}", message);
            }
            ExitCode::Success
        }
        Err(e) => {
            let code = app::exit_code(&e);
            if code == ExitCode::Interrupted {
                eprintln!("You have quit the program.");
            } else {
                eprintln!("{} {:#}", style("Error:").red().bold(), e);
            }
            code
        }
    };

    process::exit(code.as_i32());
}
