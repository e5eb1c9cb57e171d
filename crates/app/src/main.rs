use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use keyframe_retime_core::{
    MemoryTimeline, RetimeReport, RetimeRequest, RetimeTool, SelectedRange, TimelineStore,
    ToolConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> keyframe_retime_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ToolConfig::load(path)?,
        None => ToolConfig::default(),
    };

    match cli.command {
        Commands::Show { timeline } => run_show(&timeline),
        Commands::Presets => run_presets(&config),
        Commands::Absolute { spacing, target } => {
            run_retime(config, &target, RetimeRequest::absolute(spacing))
        }
        Commands::Incremental { delta, target } => {
            run_retime(config, &target, RetimeRequest::incremental(delta))
        }
        Commands::Preset { label, target } => run_preset(config, &target, &label),
    }
}

fn run_show(path: &Path) -> keyframe_retime_core::Result<()> {
    let timeline = MemoryTimeline::load(path)?;
    let range = timeline.range();
    let keys: Vec<String> = timeline.keyframes().iter().map(|t| t.to_string()).collect();

    println!("keyframes: {}", keys.join(" "));
    println!("range:     {} .. {}", range.start(), range.end());
    println!("cursor:    {}", timeline.current_time()?);
    Ok(())
}

fn run_presets(config: &ToolConfig) -> keyframe_retime_core::Result<()> {
    let tool = RetimeTool::new(config.clone());
    for button in tool.buttons() {
        let mode = if button.incremental { "incremental" } else { "absolute" };
        println!("{:>6}  {mode} {}", button.label, button.magnitude);
    }
    Ok(())
}

fn run_retime(
    config: ToolConfig,
    target: &TargetArgs,
    request: RetimeRequest,
) -> keyframe_retime_core::Result<()> {
    let mut timeline = target.open()?;
    let mut tool = RetimeTool::new(config);
    tool.show();
    let move_to_next = target.move_to_next || tool.move_to_next();

    let report = tool
        .run(&mut timeline, &request.with_move_to_next(move_to_next))
        .map_err(|err| report_failure(&tool, err))?;
    print_report(&report);
    target.persist(&timeline)
}

fn run_preset(config: ToolConfig, target: &TargetArgs, label: &str) -> keyframe_retime_core::Result<()> {
    let mut timeline = target.open()?;
    let mut tool = RetimeTool::new(config);
    tool.show();
    if target.move_to_next {
        tool.set_move_to_next(true);
    }

    let report = tool
        .press(&mut timeline, label)
        .map_err(|err| report_failure(&tool, err))?;
    print_report(&report);
    target.persist(&timeline)
}

fn print_report(report: &RetimeReport) {
    for (from, to) in report.plan.changes() {
        println!("{from} -> {to}");
    }
    println!("cursor: {}", report.cursor);
}

fn report_failure(tool: &RetimeTool, err: keyframe_retime_core::RetimeError) -> keyframe_retime_core::RetimeError {
    if let Some(message) = tool.last_notification() {
        eprintln!("{message}");
    }
    err
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Retime keyframe spacing on a timeline", long_about = None)]
struct Cli {
    /// JSON file overriding the preset buttons and toggle defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the keyframes, selected range and cursor of a timeline file.
    Show {
        /// Path to the timeline JSON file.
        timeline: PathBuf,
    },
    /// List the configured preset buttons.
    Presets,
    /// Set every gap inside the range to a fixed number of frames.
    Absolute {
        /// Target spacing in frames.
        spacing: f64,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Grow or shrink every gap inside the range by a signed delta.
    Incremental {
        /// Frames added to each gap; negative values shrink it.
        #[arg(allow_hyphen_values = true)]
        delta: f64,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Run a preset button by its label, e.g. `2f` or `-1f`.
    Preset {
        #[arg(allow_hyphen_values = true)]
        label: String,
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Path to the timeline JSON file.
    #[arg(short, long)]
    timeline: PathBuf,
    /// Override the stored range start.
    #[arg(long, allow_hyphen_values = true)]
    start: Option<f64>,
    /// Override the stored range end.
    #[arg(long, allow_hyphen_values = true)]
    end: Option<f64>,
    /// Move the cursor to the keyframe after the range start once done.
    #[arg(short = 'n', long)]
    move_to_next: bool,
    /// Where to write the result. Defaults to the input file.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl TargetArgs {
    fn open(&self) -> keyframe_retime_core::Result<MemoryTimeline> {
        let mut timeline = MemoryTimeline::load(&self.timeline)?;
        if self.start.is_some() || self.end.is_some() {
            let stored = timeline.range();
            let range = SelectedRange::new(
                self.start.unwrap_or(stored.start()),
                self.end.unwrap_or(stored.end()),
            )?;
            timeline.set_range(range);
        }
        tracing::debug!(path = ?self.timeline, keyframes = timeline.keyframes().len(), "loaded timeline");
        Ok(timeline)
    }

    fn persist(&self, timeline: &MemoryTimeline) -> keyframe_retime_core::Result<()> {
        let path = self.output.as_ref().unwrap_or(&self.timeline);
        timeline.save(path)?;
        tracing::info!(?path, "wrote timeline");
        Ok(())
    }
}
