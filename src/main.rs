mod args;
mod tally;

use clap::Parser;
use log::{debug, info};
use snafu::ErrorCompat;

use crate::args::Args;
use crate::tally::{describe_error, run_tally, settings_from_args, RunOutcome};

/// Exit code when the run ended without writing anything (no input file, nothing new).
const NOTHING_WRITTEN_EXIT_CODE: i32 = 3;

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
    debug!("args: {:?}", args);

    let res = settings_from_args(&args).and_then(|settings| run_tally(&settings));
    match res {
        Ok(RunOutcome::Written {
            participants,
            periods,
        }) => {
            info!(
                "Done: {} participants over {} periods",
                participants, periods
            );
        }
        Ok(outcome) => {
            info!("Nothing written ({:?})", outcome);
            std::process::exit(NOTHING_WRITTEN_EXIT_CODE);
        }
        Err(e) => {
            eprintln!("An error occured: {}", describe_error(&e));
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("trace: {}", bt);
            }
            std::process::exit(1);
        }
    }
}
