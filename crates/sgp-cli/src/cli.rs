use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sgp",
    about = "SGP runner: download data, train and evaluate scene graph modules",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Runner configuration file
    #[arg(long, global = true, default_value = "sgp.toml")]
    pub config: PathBuf,

    /// Override descriptor applied on top of the base file descriptor
    #[arg(long, global = true)]
    pub overrides: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download and extract the dataset (run once)
    Download(DownloadArgs),
    /// Train a module; the best validation weights are saved as <name>_best
    Train(RunArgs),
    /// Evaluate a trained module
    Eval(RunArgs),
    /// Print the absolute path behind a token
    Path(TokenArgs),
    /// Report whether the file behind a token exists
    Exists(TokenArgs),
    /// List every token that names a file
    List(ListArgs),
}

#[derive(Args)]
pub struct DownloadArgs {}

#[derive(Args)]
pub struct RunArgs {
    /// Module name
    pub name: String,
    /// GPU id handed to the module
    pub gpu: String,
}

#[derive(Args)]
pub struct TokenArgs {
    /// Dot-delimited token path, e.g. data.visual_genome.data
    pub token: String,
    #[arg(long)]
    pub version: Option<u32>,
}

#[derive(Args)]
pub struct ListArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_download() {
        let cli = Cli::try_parse_from(["sgp", "download"]).unwrap();
        assert!(matches!(cli.command, Command::Download(_)));
        assert_eq!(cli.config, PathBuf::from("sgp.toml"));
    }

    #[test]
    fn parse_train() {
        let cli = Cli::try_parse_from(["sgp", "train", "gpi_ling", "0"]).unwrap();
        if let Command::Train(args) = cli.command {
            assert_eq!(args.name, "gpi_ling");
            assert_eq!(args.gpu, "0");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_eval() {
        let cli = Cli::try_parse_from(["sgp", "eval", "gpi_ling_orig_best", "1"]).unwrap();
        assert!(matches!(cli.command, Command::Eval(_)));
    }

    #[test]
    fn train_requires_gpu() {
        assert!(Cli::try_parse_from(["sgp", "train", "gpi_ling"]).is_err());
    }

    #[test]
    fn parse_path_with_version() {
        let cli = Cli::try_parse_from(["sgp", "path", "data.blob", "--version", "2"]).unwrap();
        if let Command::Path(args) = cli.command {
            assert_eq!(args.token, "data.blob");
            assert_eq!(args.version, Some(2));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "sgp", "list", "--verbose", "--config", "/etc/sgp.toml", "--overrides", "local.yaml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("/etc/sgp.toml"));
        assert_eq!(cli.overrides, Some(PathBuf::from("local.yaml")));
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(Cli::try_parse_from(["sgp", "serve"]).is_err());
    }
}
