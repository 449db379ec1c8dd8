use clap::{Args, Parser};

/// Pulls chapters of "Император Алхимии Божественного Пути" from ranobelib.me
/// into a single text file, in order, until three attempts in a row fail.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub pull: PullArgs,
}

#[derive(Debug, Args)]
pub struct PullArgs {
    /// Output text file (default: `<work title>.txt` in the working directory).
    #[arg(long)]
    pub out: Option<String>,

    /// Run Chrome without a visible window.
    #[arg(long)]
    pub headless: bool,

    /// Chrome/Chromium executable (default: auto-detected).
    #[arg(long)]
    pub chrome: Option<String>,
}
