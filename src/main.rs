use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use php_struct_tokens::{tokenize, Mapping, TokenKind};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "php-struct-tokens")]
#[command(about = "Emit the structural token stream of a PHP file as JSON", long_about = None)]
#[command(version)]
struct Cli {
    /// File to tokenize (`-` or `/dev/stdin` reads standard input)
    input: PathBuf,

    /// Print token catalog information instead of tokenizing
    #[arg(value_enum)]
    mode: Option<Mode>,

    /// Pretty-print the token array
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Number of token codes, including the reserved end-of-file code
    #[value(name = "AMOUNT")]
    Amount,
    /// JSON object mapping every token code to its name
    #[value(name = "MAPPING")]
    Mapping,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(1);
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.mode {
        Some(Mode::Amount) => cmd_amount(),
        Some(Mode::Mapping) => cmd_mapping(),
        None => cmd_tokenize(&cli.input, cli.pretty),
    }
}

fn cmd_amount() -> Result<()> {
    println!("{}", TokenKind::amount());
    Ok(())
}

fn cmd_mapping() -> Result<()> {
    let json = serde_json::to_string(&Mapping)?;
    write_stdout(&json)
}

fn cmd_tokenize(input: &Path, pretty: bool) -> Result<()> {
    let source = read_input(input)?;
    let result =
        tokenize(&source).with_context(|| format!("failed to tokenize {}", input.display()))?;

    eprintln!("{}", serde_json::to_string(&result.diagnostics)?);

    let json = if pretty {
        serde_json::to_string_pretty(&result.tokens)?
    } else {
        serde_json::to_string(&result.tokens)?
    };
    write_stdout(&json)
}

/// Helper: Read the whole input, from stdin for the `-` and `/dev/stdin`
/// sentinels.
///
/// Bytes that are not valid UTF-8 are replaced, which can shift columns on
/// the affected lines.
fn read_input(input: &Path) -> Result<String> {
    let bytes = if input == Path::new("-") || input == Path::new("/dev/stdin") {
        let mut buf = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("failed to read standard input")?;
        buf
    } else {
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?
    };

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            log::warn!(
                "{} is not valid UTF-8; invalid bytes replaced",
                input.display()
            );
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
