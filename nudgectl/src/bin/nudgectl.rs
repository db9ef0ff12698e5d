use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dialoguer::Input;
use nudgectl::{
    default_notifier, resolve_goal, Config, ConsoleNotifier, CycleController, LlmClient,
    Notifier, ScreenCapturer, StopReason, StopSignal, Viewer,
};
use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nudgectl")]
#[command(about = "Capture the screen every few seconds and ask a vision model what to do next")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Seconds between captures, start to start (default 5.0, minimum 0.5)
    #[arg(long)]
    interval: Option<f64>,

    /// How long to show each capture in milliseconds (default 1000, minimum 100)
    #[arg(long)]
    display_ms: Option<u64>,

    /// Goal for the AI (prompted for on stdin when omitted)
    #[arg(long)]
    goal: Option<String>,

    /// Stop after this many cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Model name (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// API base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Image viewer program (overrides config)
    #[arg(long, conflicts_with = "no_viewer")]
    viewer: Option<String>,

    /// Don't open captures in a viewer
    #[arg(long)]
    no_viewer: bool,

    /// Print suggestions to the terminal instead of a dialog
    #[arg(long)]
    no_dialog: bool,

    /// Config file (default ~/.config/nudgectl/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and exit
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("nudgectl={},nudgectl_capture={}", level, level))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config_path = cli.config.clone().unwrap_or_else(Config::path);

    match cli.command {
        Some(Commands::InitConfig { force }) => init_config(&config_path, force),
        None => run(cli, &config_path),
    }
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Config::default()
        .save_to(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn run(cli: Cli, config_path: &Path) -> anyhow::Result<()> {
    let mut config = Config::load_from(config_path);

    if let Some(interval) = cli.interval {
        config.cycle.interval_seconds = interval;
    }
    if let Some(display_ms) = cli.display_ms {
        config.cycle.display_ms = display_ms;
    }
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    if let Some(base_url) = cli.base_url {
        config.llm.base_url = base_url;
    }
    if let Some(viewer) = cli.viewer {
        config.viewer.command = Some(viewer);
        config.viewer.args.clear();
    }
    if cli.no_viewer {
        config.viewer.enabled = false;
    }

    let cycle = config
        .cycle
        .to_cycle_config()
        .with_max_cycles(cli.max_cycles);
    let advisor = LlmClient::new(config.llm.to_llm_config())?;

    let goal = match cli.goal {
        Some(goal) => goal,
        None => prompt_goal()?,
    };
    let goal = resolve_goal(&goal);

    let viewer = Viewer::from_settings(&config.viewer);
    let notifier: Box<dyn Notifier> = if cli.no_dialog {
        Box::new(ConsoleNotifier)
    } else {
        default_notifier()
    };
    let capturer = ScreenCapturer::new();

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.stop())
        .context("Failed to install Ctrl+C handler")?;

    info!("Goal: {}", goal);
    info!(
        "Capturing screen every {} seconds.",
        cycle.interval().as_secs_f64()
    );
    info!(
        "Each capture is visible for {} ms in a temporary viewer.",
        cycle.display_duration().as_millis()
    );
    info!("Press Ctrl+C in the terminal to stop.");

    let controller =
        CycleController::new(&cycle, &capturer, &advisor, &viewer, notifier.as_ref(), stop);
    let outcome = controller.run(&goal)?;

    match outcome.reason {
        StopReason::Interrupted => info!("Stopped by user after {} cycle(s).", outcome.cycles),
        StopReason::CycleLimit => info!("Finished {} cycle(s).", outcome.cycles),
    }
    Ok(())
}

/// Ask for the goal interactively, or read one line when stdin is piped.
fn prompt_goal() -> anyhow::Result<String> {
    if io::stdin().is_terminal() {
        let goal: String = Input::new()
            .with_prompt(
                "Enter your goal/command for the AI \
                 (e.g. 'Get me into a Roblox match and ready to play')",
            )
            .allow_empty(true)
            .interact_text()?;
        Ok(goal)
    } else {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}
