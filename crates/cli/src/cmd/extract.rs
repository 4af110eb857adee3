use std::path::PathBuf;

use anyhow::{Context, Result};
use argp::FromArgs;
use ci_feedback_github::logs::extract_error_lines;

use crate::util::path_buf;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Extract the most relevant error lines from a local CI log file.
#[argp(subcommand, name = "extract")]
pub struct Args {
    #[argp(positional, from_str_fn(path_buf))]
    /// log file to analyze
    log: PathBuf,
    #[argp(option, short = 'o', from_str_fn(path_buf))]
    /// write the excerpt to an output file instead of stdout
    output: Option<PathBuf>,
}

pub fn run(args: Args) -> Result<()> {
    let raw = std::fs::read_to_string(&args.log)
        .with_context(|| format!("Failed to read {}", args.log.display()))?;
    let excerpt = extract_error_lines(&raw);
    if let Some(out_path) = &args.output {
        std::fs::write(out_path, excerpt)
            .with_context(|| format!("Failed to write output file '{}'", out_path.display()))?;
    } else {
        println!("{}", excerpt);
    }
    Ok(())
}
