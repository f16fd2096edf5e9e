use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use std::{
    env, fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};
use structopt::StructOpt;
use tally::{
    report::{self, Format},
    session::Session,
    ParseResult,
};

/// Count how many games each player appears in, from a log with one match per line like `Alice Bob 21-15 Carol Dave`.
#[derive(StructOpt)]
struct Options {
    /// Report format
    #[structopt(short, long, default_value = "text", possible_values = Format::VARIANTS, case_insensitive = true)]
    format: Format,
    /// Keep watching the input file and print a new report whenever it changes
    #[structopt(short, long)]
    watch: bool,
    /// How often to check the input file in watch mode, in milliseconds
    #[structopt(short, long, default_value = "500")]
    interval_ms: u64,
    /// Exit with an error if any line could not be parsed
    #[structopt(long, conflicts_with = "watch")]
    strict: bool,
    /// Game log to read. Defaults to $GAME_TALLY_INPUT, then stdin
    #[structopt(parse(from_os_str))]
    input: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Load from .env file if it is present
    dotenv::dotenv().ok();
    // Initialize logging
    env_logger::init();
    // Get command line arguments
    let options = Options::from_args();
    // Fall back to the input path from the environment
    let input = options.input.or_else(|| env::var_os("GAME_TALLY_INPUT").map(PathBuf::from));

    if options.watch {
        let path = input.ok_or_else(|| anyhow!("--watch needs an input file"))?;
        return watch(&path, options.format, Duration::from_millis(options.interval_ms));
    }

    // Read the whole log up front
    let text = match &input {
        Some(path) => read_log(path).with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut bytes = Vec::new();
            io::stdin().read_to_end(&mut bytes).context("failed to read stdin")?;
            decode(bytes)
        }
    };
    let mut session = Session::with_input(text);
    let result = session.refresh();
    render(result, options.format)?;
    if options.strict && !result.errors.is_empty() {
        bail!("{} line(s) could not be parsed", result.errors.len());
    }
    Ok(())
}

/// Print the error panel to stderr and the report to stdout.
fn render(result: &ParseResult, format: Format) -> Result<()> {
    if let Some(panel) = report::error_panel(&result.errors) {
        eprintln!("{}", panel);
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_report(result, format, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Bytes that aren't valid UTF-8 become U+FFFD, so a stray Latin-1 name only spoils its own line.
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => {
            warn!("input is not valid UTF-8, replacing invalid bytes: {}", error.utf8_error());
            String::from_utf8_lossy(error.as_bytes()).into_owned()
        }
    }
}

fn read_log(path: &Path) -> io::Result<String> {
    fs::read(path).map(decode)
}

/// Re-parse `path` every time its contents change. A missing file clears the input.
fn watch(path: &Path, format: Format, interval: Duration) -> Result<()> {
    let mut session = Session::new();
    info!("Watching {} every {:?}", path.display(), interval);
    loop {
        let polled = poll(&mut session, read_log(path)).with_context(|| format!("failed to read {}", path.display()))?;
        if let Some(result) = polled {
            render(result, format)?;
        }
        thread::sleep(interval);
    }
}

/// Feed one read of the watched file into the session. Returns the result to render, or `None` if nothing changed.
fn poll(session: &mut Session, read: io::Result<String>) -> Result<Option<&ParseResult>> {
    match read {
        // The first poll always renders, even if the file is empty
        Ok(text) if session.result().is_none() || text != session.input() => {
            let snapshot = session.set_input(text);
            info!("Input changed, parsing revision {}", snapshot.revision);
            let result = snapshot.parse();
            Ok(if session.publish(snapshot.revision, result) { session.result() } else { None })
        }
        Ok(_) => Ok(None),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            if session.result().is_none() || !session.input().is_empty() {
                warn!("Input file not found, clearing input");
                session.reset();
                Ok(Some(session.refresh()))
            } else {
                Ok(None)
            }
        }
        Err(error) => Err(error.into()),
    }
}
