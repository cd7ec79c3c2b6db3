use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Keep the existing summary and add the new periods to it.
    Update,
    /// Ignore the existing summary and rebuild it from all the period files.
    Regenerate,
}

/// This program merges per-session score spreadsheets into one ranked summary.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. See the manual for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, default: current directory) Where to look for the period files.
    /// Setting this option overrides the directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input_dir: Option<String>,

    /// (default S) The prefix of the period files. It is also the prefix of the period labels.
    #[clap(long, value_parser)]
    pub prefix: Option<String>,

    /// (default .xlsx) The suffix of the period files, for example .csv
    #[clap(long, value_parser)]
    pub suffix: Option<String>,

    /// (file path) The summary file to read and write. Setting this option overrides the path
    /// that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (default update) update: add the new periods to the existing summary.
    /// regenerate: ignore the existing summary.
    #[clap(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// (file path or 'stdout') If specified, the summary will also be written in JSON format to the
    /// given location.
    #[clap(long, value_parser)]
    pub json_out: Option<String>,

    /// (file path) A reference file containing a summary in JSON format. If provided, scoretally
    /// will check that the summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
