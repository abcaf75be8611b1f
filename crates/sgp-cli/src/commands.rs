use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use sgp_registry::{FileRegistry, TracingSink};

use crate::cli::{Cli, Command, RunArgs, TokenArgs};
use crate::config::CliConfig;
use crate::workbench::{CommandWorkbench, Workbench};

/// Token of the dataset directory that `download` fills.
pub const DATA_TOKEN: &str = "data.visual_genome.data";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = CliConfig::load(&cli.config)?;
    if let Some(overrides) = cli.overrides {
        config.registry.overrides = Some(overrides);
    }
    let workbench = CommandWorkbench::new(config.commands.clone());

    match cli.command {
        Command::Download(_) => cmd_download(&open_registry(&config)?, &workbench, &config.marker),
        Command::Train(args) => cmd_train(&workbench, &config.marker, &args),
        Command::Eval(args) => cmd_eval(&workbench, &config.marker, &args),
        Command::Path(args) => cmd_path(&open_registry(&config)?, &args),
        Command::Exists(args) => cmd_exists(&open_registry(&config)?, &args),
        Command::List(_) => cmd_list(&open_registry(&config)?),
    }
}

/// Only the commands that look files up build a registry.
fn open_registry(config: &CliConfig) -> anyhow::Result<FileRegistry> {
    let mut registry = FileRegistry::open(&config.registry).with_context(|| {
        format!(
            "opening file registry from {}",
            config.registry.descriptor().display()
        )
    })?;
    registry.install_logger(TracingSink);
    Ok(registry)
}

fn cmd_download(
    registry: &FileRegistry,
    workbench: &dyn Workbench,
    marker: &Path,
) -> anyhow::Result<()> {
    let dest = registry.path(DATA_TOKEN, None)?;
    std::fs::create_dir_all(&dest)
        .with_context(|| format!("creating {}", dest.display()))?;
    workbench.download(&dest)?;
    std::fs::File::create(marker)
        .with_context(|| format!("writing marker {}", marker.display()))?;
    println!("{} dataset ready in {}", "✓".green(), dest.display());
    Ok(())
}

fn cmd_train(workbench: &dyn Workbench, marker: &Path, args: &RunArgs) -> anyhow::Result<()> {
    require_data(marker)?;
    workbench.train(&args.name, &args.gpu)?;
    println!("{} trained {}", "✓".green(), args.name.bold());
    Ok(())
}

fn cmd_eval(workbench: &dyn Workbench, marker: &Path, args: &RunArgs) -> anyhow::Result<()> {
    require_data(marker)?;
    workbench.evaluate(&args.name, &args.gpu)?;
    println!("{} evaluated {}", "✓".green(), args.name.bold());
    Ok(())
}

fn cmd_path(registry: &FileRegistry, args: &TokenArgs) -> anyhow::Result<()> {
    let path = registry.path(&args.token, args.version)?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_exists(registry: &FileRegistry, args: &TokenArgs) -> anyhow::Result<()> {
    let path = registry.path(&args.token, args.version)?;
    if registry.exists(&args.token, args.version)? {
        println!("{} {}", "present".green(), path.display());
    } else {
        println!("{} {}", "missing".red(), path.display());
    }
    Ok(())
}

fn cmd_list(registry: &FileRegistry) -> anyhow::Result<()> {
    let tokens = registry.tree().tokens();
    for token in &tokens {
        println!("  {token}");
    }
    println!("{} tokens", tokens.len().to_string().bold());
    Ok(())
}

/// Training and evaluation need the downloaded dataset.
fn require_data(marker: &Path) -> anyhow::Result<()> {
    if !marker.is_file() {
        bail!("data wasn't downloaded yet; run `sgp download` first");
    }
    Ok(())
}
