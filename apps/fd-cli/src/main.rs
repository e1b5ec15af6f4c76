use clap::{Parser, Subcommand};
use fd_app::{
    AppResult, ModelRegistry, RunOptions, RunProgressEvent, RunRequest, RunStage, case_service,
    run_service,
};
use fd_bus::BusValue;
use fd_sim::{HaltReason, TrimReport};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "fd-cli")]
#[command(about = "fdyn CLI - Real-time flight dynamics simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a case file and initialize it once
    Validate {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
    },
    /// List the models in a case and the model types available
    Models {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
    },
    /// List bus properties after initialization
    Catalog {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
        /// Only list paths starting with this prefix
        #[arg(short, long, default_value = "")]
        prefix: String,
    },
    /// Run a case and write the recorded series as CSV
    Run {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
        /// Simulated duration in seconds (overrides the case)
        #[arg(long)]
        duration: Option<f64>,
        /// Bus path to record; may be repeated (overrides the case)
        #[arg(short, long)]
        record: Vec<String>,
        /// Record every N frames (overrides the case)
        #[arg(long)]
        every: Option<u32>,
        /// Trim before running
        #[arg(long, conflicts_with = "no_trim")]
        trim: bool,
        /// Skip trim even if the case asks for it
        #[arg(long)]
        no_trim: bool,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Trim a case at its initial condition
    Trim {
        /// Path to the case YAML or JSON file
        case_path: PathBuf,
    },
}

fn main() -> AppResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = ModelRegistry::default();

    match cli.command {
        Commands::Validate { case_path } => cmd_validate(&case_path, &registry),
        Commands::Models { case_path } => cmd_models(&case_path, &registry),
        Commands::Catalog { case_path, prefix } => cmd_catalog(&case_path, &registry, &prefix),
        Commands::Run {
            case_path,
            duration,
            record,
            every,
            trim,
            no_trim,
            output,
        } => {
            let options = RunOptions {
                duration_s: duration,
                record: (!record.is_empty()).then_some(record),
                record_every: every,
                trim: match (trim, no_trim) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            cmd_run(&case_path, &registry, options, output.as_deref())
        }
        Commands::Trim { case_path } => cmd_trim(&case_path, &registry),
    }
}

fn cmd_validate(case_path: &Path, registry: &ModelRegistry) -> AppResult<()> {
    eprintln!("Validating case: {}", case_path.display());
    let case = case_service::load_case(case_path)?;
    run_service::check_case(&case, registry)?;
    eprintln!("✓ Case '{}' is valid", case.name);
    Ok(())
}

fn cmd_models(case_path: &Path, registry: &ModelRegistry) -> AppResult<()> {
    let case = case_service::load_case(case_path)?;
    println!("Models in case '{}' (execution order):", case.name);
    for m in case_service::list_models(&case) {
        println!("  {} - {} (every {} frame(s))", m.name, m.type_name, m.rate);
    }
    println!("\nAvailable model types:");
    for t in registry.types() {
        println!("  {t}");
    }
    Ok(())
}

fn cmd_catalog(case_path: &Path, registry: &ModelRegistry, prefix: &str) -> AppResult<()> {
    let case = case_service::load_case(case_path)?;
    let entries = case_service::catalog(&case, registry, prefix)?;
    for e in &entries {
        let access = if e.settable { "rw" } else { "ro" };
        let value = match e.value {
            BusValue::Bool(b) => b.to_string(),
            BusValue::Int(i) => i.to_string(),
            BusValue::Float(f) => format!("{f:.6}"),
        };
        println!(
            "{access}  {:<48} {:>16}  {}",
            e.path,
            value,
            e.writer.as_deref().unwrap_or("-")
        );
    }
    eprintln!("{} properties", entries.len());
    Ok(())
}

fn cmd_run(
    case_path: &Path,
    registry: &ModelRegistry,
    options: RunOptions,
    output: Option<&Path>,
) -> AppResult<()> {
    let case = case_service::load_case(case_path)?;
    eprintln!("Running case: {}", case.name);

    let request = RunRequest {
        case: &case,
        registry,
        options,
    };
    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let response = run_service::run_case_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now = event.stage != RunStage::Running
                || (event.fraction_complete - last_fraction).abs() >= 0.05
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_fraction = event.fraction_complete;
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if let Some(report) = &response.trim {
        print_trim_report(report);
    }
    for event in &response.events {
        eprintln!(
            "  event '{}' at frame {} (t={:.3}s)",
            event.name, event.frame, event.sim_time
        );
        for (path, value) in &event.notify {
            eprintln!("    {path} = {value}");
        }
    }
    match &response.halted {
        Some(HaltReason::Script { reason }) => eprintln!("✗ Halted by script: {reason}"),
        Some(HaltReason::NonFinite { what }) => eprintln!("✗ Halted: {what}"),
        None => eprintln!("✓ Simulation completed"),
    }
    eprintln!(
        "  Frames: {}  sim time: {:.3}s  degraded frames: {}",
        response.frames, response.final_time_s, response.degraded_frames
    );
    print_timing_summary(&response.timing);

    if let Some(path) = output {
        let file = std::fs::File::create(path)?;
        response.series.write_csv(io::BufWriter::new(file))?;
        eprintln!(
            "✓ Wrote {} samples to {}",
            response.series.samples.len(),
            path.display()
        );
    } else {
        response.series.write_csv(io::stdout().lock())?;
    }
    Ok(())
}

fn cmd_trim(case_path: &Path, registry: &ModelRegistry) -> AppResult<()> {
    let case = case_service::load_case(case_path)?;
    eprintln!("Trimming case: {}", case.name);
    let report = run_service::trim_case(&case, registry)?;
    print_trim_report(&report);
    Ok(())
}

fn print_trim_report(report: &TrimReport) {
    let mark = if report.converged() { "✓" } else { "✗" };
    println!(
        "{mark} Trim {:?} after {} iteration(s), residual {:.3e}",
        report.outcome, report.iterations, report.residual_norm
    );
    for (label, value) in &report.solution {
        println!("  {label:<32} {value:>14.6}");
    }
}

fn clear_progress_line() {
    eprint!("\r{}\r", " ".repeat(100));
    let _ = io::stderr().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match event.stage {
        RunStage::Running => {
            let width = 28usize;
            let filled = ((event.fraction_complete * width as f64).round() as usize).min(width);
            eprint!(
                "\r[{}{}] {:>6.2}%  t={:.3}s  elapsed={:.1}s",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled)),
                event.fraction_complete * 100.0,
                event.sim_time_s,
                event.elapsed_wall_s
            );
        }
        _ => {
            let mut line = format!("\r{:?}  elapsed={:.2}s", event.stage, event.elapsed_wall_s);
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {msg}"));
            }
            eprint!("{line}");
        }
    }
    let _ = io::stderr().flush();
}

fn print_timing_summary(timing: &fd_app::RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    eprintln!("\nTiming summary:");
    eprintln!(
        "  Compile: {:.3}s ({:.1}%)",
        timing.compile_time_s,
        100.0 * timing.compile_time_s / total
    );
    if timing.trim_time_s > 0.0 {
        eprintln!(
            "  Trim:    {:.3}s ({:.1}%)",
            timing.trim_time_s,
            100.0 * timing.trim_time_s / total
        );
    }
    eprintln!(
        "  Run:     {:.3}s ({:.1}%)",
        timing.run_time_s,
        100.0 * timing.run_time_s / total
    );
    eprintln!("  Total:   {:.3}s", timing.total_time_s);
}
