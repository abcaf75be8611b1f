use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::config::Commands;

/// The long-running jobs the runner dispatches.
pub trait Workbench {
    /// Fetch and extract the dataset into `dest`.
    fn download(&self, dest: &Path) -> anyhow::Result<()>;
    fn train(&self, name: &str, gpu: &str) -> anyhow::Result<()>;
    fn evaluate(&self, name: &str, gpu: &str) -> anyhow::Result<()>;
}

/// Runs each job as an external process built from an argv template.
#[derive(Clone, Debug)]
pub struct CommandWorkbench {
    commands: Commands,
}

impl CommandWorkbench {
    pub fn new(commands: Commands) -> Self {
        Self { commands }
    }
}

impl Workbench for CommandWorkbench {
    fn download(&self, dest: &Path) -> anyhow::Result<()> {
        let dest = dest.display().to_string();
        run("download", &self.commands.download, &[("dest", &dest)])
    }

    fn train(&self, name: &str, gpu: &str) -> anyhow::Result<()> {
        run("train", &self.commands.train, &[("name", name), ("gpu", gpu)])
    }

    fn evaluate(&self, name: &str, gpu: &str) -> anyhow::Result<()> {
        run("eval", &self.commands.eval, &[("name", name), ("gpu", gpu)])
    }
}

/// Replace every `{key}` in `template` with its value.
pub(crate) fn substitute(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (key, value)| {
                acc.replace(&format!("{{{key}}}"), value)
            })
        })
        .collect()
}

fn run(job: &str, template: &[String], vars: &[(&str, &str)]) -> anyhow::Result<()> {
    let argv = substitute(template, vars);
    let Some((program, args)) = argv.split_first() else {
        bail!("no `{job}` command configured; set [commands].{job} in the runner config");
    };
    info!(job, program = %program, "starting");
    debug!(?args, "arguments");
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("failed to start `{program}`"))?;
    if !status.success() {
        bail!("`{job}` command exited with {status}");
    }
    Ok(())
}
