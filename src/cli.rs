use crate::config::config::PipelineConfig;
use crate::core::deps::check_toolchain;
use crate::core::pipeline::Pipeline;
use crate::core::types::{CompilationRequest, ViewKind};
use crate::kernel::signal;
use crate::safety::workspace::WorkspaceManager;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "jvmscope")]
#[command(about = "Show JVM bytecode, JIT and AOT machine code for a Java class")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./jvmscope.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append structured audit events to this file
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
pub struct SourceArgs {
    /// Name of the public class to compile
    #[arg(long = "class")]
    class_name: String,
    /// Read source from this file
    #[arg(long, conflicts_with = "code", required_unless_present = "code")]
    source: Option<PathBuf>,
    /// Source code as a string
    #[arg(long)]
    code: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print javap bytecode for the class
    Bytecode(SourceArgs),
    /// Print HotSpot JIT assembly (needs the hsdis plugin)
    Jit(SourceArgs),
    /// Print native-image machine code for the class
    Aot(SourceArgs),
    /// Check that the external tools are installed
    CheckDeps {
        /// Show version lines for every tool
        #[arg(long)]
        verbose: bool,
    },
    /// Remove leftover workspaces from crashed runs
    Reap {
        /// Only remove workspaces older than this (defaults to the configured age)
        #[arg(long)]
        max_age_secs: Option<u64>,
    },
}

pub fn run() -> Result<()> {
    env_logger::init();

    if let Err(e) = signal::install_interrupt_handlers() {
        log::warn!("Interrupt handlers not installed: {}", e);
    }

    let cli = Cli::parse();

    if let Some(path) = cli.audit_log.as_deref() {
        crate::observability::audit::init_audit_logger(path)
            .with_context(|| format!("failed to open audit log {}", path.display()))?;
    }

    let config = match cli.config.as_deref() {
        Some(path) => PipelineConfig::load_from_file(path)?,
        None => PipelineConfig::load_default()?,
    };

    match cli.command {
        Commands::Bytecode(args) => run_view(config, ViewKind::Bytecode, args),
        Commands::Jit(args) => run_view(config, ViewKind::Jit, args),
        Commands::Aot(args) => run_view(config, ViewKind::Aot, args),
        Commands::CheckDeps { verbose } => check_deps(&config, verbose),
        Commands::Reap { max_age_secs } => reap(&config, max_age_secs),
    }
}

fn run_view(config: PipelineConfig, kind: ViewKind, args: SourceArgs) -> Result<()> {
    let source = match (args.source, args.code) {
        (Some(path), _) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, Some(code)) => code,
        (None, None) => anyhow::bail!("either --source or --code is required"),
    };

    let request = CompilationRequest::new(&source, &args.class_name)?;
    let pipeline = Pipeline::new(config)?;
    let result = pipeline.run(kind, &request);

    println!("{}", result.to_json()?);

    if signal::interrupt_requested() {
        eprintln!("jvmscope: interrupted by signal {}", signal::received_signal());
        std::process::exit(130);
    }
    if !result.succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn check_deps(config: &PipelineConfig, verbose: bool) -> Result<()> {
    println!("Checking toolchain...");
    println!();

    let statuses = check_toolchain(&config.toolchain);
    let mut core_missing = Vec::new();
    let mut disassembler_found = false;

    for status in &statuses {
        let mark = if status.available { "OK     " } else { "MISSING" };
        println!("{} {:<18} {}", mark, status.role, status.program);
        if verbose {
            println!("        {}", status.detail);
        }

        if status.role == "disassembler" {
            disassembler_found |= status.available;
        } else if !status.available {
            core_missing.push(status.role.as_str());
        }
    }

    println!();
    if !disassembler_found {
        println!("No disassembler found: the aot view needs objdump (binutils).");
    }

    if core_missing.is_empty() && disassembler_found {
        println!("All tools are available.");
        Ok(())
    } else {
        if !core_missing.is_empty() {
            println!("Missing: {}", core_missing.join(", "));
        }
        std::process::exit(1);
    }
}

/// Requested reaper age, refused when it could catch an in-flight run
fn reap_age(config: &PipelineConfig, max_age_secs: Option<u64>) -> Result<Duration> {
    let max_age = max_age_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.orphan_max_age());
    config
        .check_orphan_age(max_age)
        .context("refusing to reap workspaces that may still be in use")?;
    Ok(max_age)
}

fn reap(config: &PipelineConfig, max_age_secs: Option<u64>) -> Result<()> {
    let max_age = reap_age(config, max_age_secs)?;
    let manager =
        WorkspaceManager::new(config.temp_root.clone(), config.workspace_prefix.clone())?;

    let count = manager.reap_orphans(max_age)?;
    if count > 0 {
        crate::observability::audit::events::orphans_reaped(count, manager.temp_root());
    }
    println!(
        "Removed {} workspace(s) older than {}s under {}",
        count,
        max_age.as_secs(),
        manager.temp_root().display()
    );
    Ok(())
}
