//! blockvm - CLI

use anyhow::{bail, Context, Result};
use blockvm::util::logger::{self, LogLevel};
use blockvm::{EngineConfig, Project, Runtime, VariableKind, NAME, VERSION};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

/// Run block-based visual programs headless
#[derive(Parser, Debug)]
#[command(name = "blockvm")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Log level: trace, debug, info, warn or error
    #[arg(short, long, default_value = "warn")]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a project, click the green flag and run it
    Run {
        /// Project file to run
        #[arg(value_name = "PROJECT")]
        project: PathBuf,

        /// Number of frames to step
        #[arg(short, long, default_value_t = 300)]
        frames: u32,

        /// Engine config (RON or JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Turbo mode: ignore redraws and run rounds until the work budget is spent
        #[arg(long)]
        turbo: bool,

        /// Sleep out each frame instead of stepping as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Broadcast this message right after the green flag
        #[arg(short, long, value_name = "NAME")]
        broadcast: Option<String>,
    },

    /// Load and validate a project without running it
    Check {
        /// Project file to check
        #[arg(value_name = "PROJECT")]
        project: PathBuf,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_with_level(args.log_level);

    match args.command {
        Commands::Run {
            project,
            frames,
            config,
            turbo,
            realtime,
            broadcast,
        } => {
            let config = match config {
                Some(path) => EngineConfig::load(&path)
                    .with_context(|| format!("Failed to load config: {}", path.display()))?,
                None => EngineConfig::default(),
            };
            run(&project, config, frames, turbo, realtime, broadcast.as_deref())
                .with_context(|| format!("Failed to run: {}", project.display()))?;
        }
        Commands::Check { project } => {
            check(&project).with_context(|| format!("Failed to check: {}", project.display()))?;
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}

fn run(
    path: &Path,
    mut config: EngineConfig,
    frames: u32,
    turbo: bool,
    realtime: bool,
    broadcast: Option<&str>,
) -> Result<()> {
    if turbo {
        config.turbo_mode = true;
        config.repeat_until_redraw = true;
    }
    let frame = config.frame_interval();
    let project = Project::from_file(path)?;
    let mut rt = Runtime::new(config);
    rt.load_project(&project)?;

    rt.green_flag();
    if let Some(message) = broadcast {
        rt.broadcast(message);
    }

    let mut ran = 0;
    for _ in 0..frames {
        let started = Instant::now();
        rt.step();
        ran += 1;
        if let Some(question) = rt.pending_question() {
            eprintln!("{} {}", "asked:".yellow(), question);
            rt.answer_question("");
        }
        if rt.threads().is_empty() {
            break;
        }
        if realtime {
            if let Some(rest) = frame.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
    }

    let faults = rt.take_faults();
    for fault in &faults {
        eprintln!(
            "{} thread {} on {} at {}: {}",
            "fault".red().bold(),
            fault.thread,
            fault.target,
            fault.opcode,
            fault.error
        );
    }
    print_state(&rt, ran);
    Ok(())
}

fn print_state(
    rt: &Runtime,
    frames: u32,
) {
    println!(
        "{} after {} frame(s), {} thread(s) still running",
        "stopped".green().bold(),
        frames,
        rt.threads().len()
    );
    for target in rt.targets() {
        let kind = if target.is_stage {
            "stage"
        } else if target.is_original {
            "sprite"
        } else {
            "clone"
        };
        println!("{} ({})", target.name.bold(), kind.dimmed());
        if !target.is_stage {
            println!("  position: ({}, {})", target.x, target.y);
        }
        for variable in target.variables.values() {
            let label = match variable.kind() {
                VariableKind::Scalar => "",
                VariableKind::List => " [list]",
            };
            println!("  {}{} = {}", variable.name.cyan(), label, variable.get());
        }
    }
}

fn check(path: &Path) -> Result<()> {
    let project = Project::from_file(path)?;
    let counts = project.script_counts();
    for (name, scripts) in &counts {
        println!("{}: {} script(s)", name.bold(), scripts);
    }
    if let Err(err) = project.validate() {
        bail!("{}", err);
    }
    println!("{}", "Check passed!".green());
    Ok(())
}
