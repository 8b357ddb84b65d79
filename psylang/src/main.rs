//! PsyLang interpreter CLI.
//!
//! Runs a program headless against a real or virtual clock, feeding it timed
//! key presses, and prints the resulting frame.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use psylang::core::parser::{BracketMode, ParsedProgram, parse_source};
use psylang::exit_codes;
use psylang::io::clock::{Clock, SystemClock, VirtualClock};
use psylang::io::config::{RunConfig, load_config};
use psylang::io::input::{KeyPress, ScriptedInput, parse_secs};
use psylang::io::render::{OutputFormat, write_frame};
use psylang::io::source::load_source;
use psylang::logging;
use psylang::run::{Session, run_loop};

#[derive(Parser)]
#[command(
    name = "psylang",
    version,
    about = "Interpreter for the PsyLang grid language"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program and print the final frame.
    Run(RunArgs),
    /// Print how a source splits into flags, bindings, tasks and main program.
    Parse {
        /// Program source file.
        source: PathBuf,
        /// End task and binding bodies at the balancing `]`.
        #[arg(long)]
        balanced_brackets: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Program source file.
    source: PathBuf,
    /// TOML run configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stop after this many ticks.
    #[arg(long)]
    ticks: Option<u64>,
    /// Seed for `%[lo/hi]` draws.
    #[arg(long)]
    seed: Option<u64>,
    /// Ticks per second.
    #[arg(long)]
    fps: Option<u32>,
    /// Side length of the grid.
    #[arg(long)]
    grid_size: Option<usize>,
    /// End task and binding bodies at the balancing `]`.
    #[arg(long)]
    balanced_brackets: bool,
    /// Simulate time instead of sleeping between ticks.
    #[arg(long)]
    virtual_time: bool,
    /// Press a key at a point in time, e.g. `--press 1.5:a`. Repeatable.
    #[arg(long = "press", value_name = "SECS:KEY")]
    presses: Vec<KeyPress>,
    /// Request quit at this time.
    #[arg(long, value_name = "SECS", value_parser = parse_secs)]
    quit_at: Option<Duration>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Print every frame instead of only the last one.
    #[arg(long)]
    every_frame: bool,
}

impl RunArgs {
    /// Command-line values take precedence over the config file.
    fn apply_overrides(&self, cfg: &mut RunConfig) {
        if let Some(ticks) = self.ticks {
            cfg.max_ticks = Some(ticks);
        }
        if let Some(seed) = self.seed {
            cfg.seed = Some(seed);
        }
        if let Some(fps) = self.fps {
            cfg.fps = fps;
        }
        if let Some(grid_size) = self.grid_size {
            cfg.grid_size = grid_size;
        }
        if self.balanced_brackets {
            cfg.brackets = BracketMode::Balanced;
        }
    }
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Parse {
            source,
            balanced_brackets,
        } => cmd_parse(&source, balanced_brackets),
    }
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let mut cfg = load_config(args.config.as_deref())?;
    args.apply_overrides(&mut cfg);
    cfg.validate().context("invalid run options")?;

    let source = load_source(&args.source)?;
    let program = parse_source(&source, cfg.brackets);
    let mut input = ScriptedInput::new(args.presses, args.quit_at);
    let output = FrameOutput {
        format: args.format,
        every_frame: args.every_frame,
    };

    if args.virtual_time {
        drive(program, &cfg, &mut VirtualClock::new(), &mut input, output)
    } else {
        drive(program, &cfg, &mut SystemClock::start(), &mut input, output)
    }
}

#[derive(Clone, Copy)]
struct FrameOutput {
    format: OutputFormat,
    every_frame: bool,
}

fn drive<C: Clock>(
    program: ParsedProgram,
    cfg: &RunConfig,
    clock: &mut C,
    input: &mut ScriptedInput,
    output: FrameOutput,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut session = Session::new(program, cfg, clock.now());

    let outcome = run_loop(&mut session, clock, input, cfg, |frame| {
        if output.every_frame {
            write_frame(&mut out, frame, output.format)?;
        }
        Ok(())
    })?;
    if !output.every_frame {
        write_frame(&mut out, &session.frame(), output.format)?;
    }
    info!(ticks = outcome.ticks, stop = ?outcome.stop, "done");
    Ok(())
}

fn cmd_parse(path: &Path, balanced_brackets: bool) -> Result<()> {
    let source = load_source(path)?;
    let mode = if balanced_brackets {
        BracketMode::Balanced
    } else {
        BracketMode::Lazy
    };
    let program = parse_source(&source, mode);
    let mut payload = serde_json::to_string_pretty(&program).context("serialize parse result")?;
    payload.push('\n');
    io::stdout()
        .lock()
        .write_all(payload.as_bytes())
        .context("write parse result")?;
    Ok(())
}
