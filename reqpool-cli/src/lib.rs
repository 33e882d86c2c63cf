use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

/// How the runtime should behave. Dictated by the flags and subcommand
/// provided to `Cli`
#[derive(Debug, PartialEq)]
pub enum RuntimeBehavior {
    /// will print every location `reqpool` looks for a configuration file in
    PrintConfigPath,
    /// will print the directory logs are written to
    PrintDataPath,
    /// will dump the default configuration to stdout
    DumpDefaultConfig,
    /// polls a single target until it answers successfully
    Poll(PollArgs),
    /// runs every request of a batch file, one after the other
    Dispatch(DispatchArgs),
    /// uploads a file as multipart form data
    Upload(UploadArgs),
    /// nothing to do, print usage
    Help,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct PollArgs {
    /// full url of the target, e.g. https://example.com/health
    pub target: String,
    /// delay between failed attempts, overrides the configuration file
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// total attempts before giving up, 0 retries forever
    #[arg(long)]
    pub max_attempts: Option<u32>,
    /// keep running until the target recovers instead of exiting after the
    /// first attempt
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct DispatchArgs {
    /// JSON file containing the list of requests
    pub batch_file: PathBuf,
    /// base url every request path is appended to, overrides `base_target`
    #[arg(long)]
    pub base: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct UploadArgs {
    pub url: String,
    pub file: PathBuf,
    /// content type of the file being sent
    #[arg(long)]
    pub content_type: String,
    /// accepted content types, may be repeated
    #[arg(long = "allow")]
    pub allowed: Vec<String>,
    /// rejected content types, may be repeated
    #[arg(long = "deny")]
    pub not_allowed: Vec<String>,
    #[arg(long)]
    pub max_size_mb: Option<u64>,
    #[arg(long)]
    pub min_size_mb: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Poll(PollArgs),
    Dispatch(DispatchArgs),
    Upload(UploadArgs),
}

#[derive(Parser, Debug)]
#[command(version, about = "poll endpoints and run request pools")]
pub struct Cli {
    /// prints the directory in which the config file is being loaded from
    #[arg(long)]
    config_dir: bool,
    /// dumps the default configuration to stdout.
    #[arg(long)]
    config_dump: bool,
    /// prints the directory in which logs are being stored
    #[arg(long)]
    data_dir: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn parse_args() -> RuntimeBehavior {
        Cli::parse().into_behavior()
    }

    fn into_behavior(self) -> RuntimeBehavior {
        if self.config_dir {
            return RuntimeBehavior::PrintConfigPath;
        }
        if self.data_dir {
            return RuntimeBehavior::PrintDataPath;
        }
        if self.config_dump {
            return RuntimeBehavior::DumpDefaultConfig;
        }

        match self.command {
            Some(Command::Poll(args)) => RuntimeBehavior::Poll(args),
            Some(Command::Dispatch(args)) => RuntimeBehavior::Dispatch(args),
            Some(Command::Upload(args)) => RuntimeBehavior::Upload(args),
            None => RuntimeBehavior::Help,
        }
    }

    pub fn print_data_path<P>(data_path: P)
    where
        P: AsRef<Path>,
    {
        println!("logs are being stored at: {}", data_path.as_ref().to_string_lossy());
        println!("you can change this by setting `XDG_DATA_HOME`");
    }

    pub fn print_config_path<P>(maybe_path: Option<P>, usual_path: P)
    where
        P: AsRef<Path>,
    {
        match maybe_path {
            Some(config_dir) => {
                println!("config is being loaded from: {}", config_dir.as_ref().to_string_lossy());
            }
            None => {
                println!("no config file was found, the default one is being used");
                println!("the usual path for the configuration file is at:\n");
                println!("{}", usual_path.as_ref().to_string_lossy());
            }
        }
    }

    pub fn print_default_config(config_as_str: &str) {
        println!("{}", config_as_str)
    }

    pub fn print_help() {
        use clap::CommandFactory;
        _ = Cli::command().print_help();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn behavior(args: &[&str]) -> RuntimeBehavior {
        Cli::try_parse_from(args).unwrap().into_behavior()
    }

    #[test]
    fn test_flags_take_precedence() {
        assert_eq!(behavior(&["reqpool", "--config-dir"]), RuntimeBehavior::PrintConfigPath);
        assert_eq!(behavior(&["reqpool", "--data-dir"]), RuntimeBehavior::PrintDataPath);
        assert_eq!(behavior(&["reqpool", "--config-dump"]), RuntimeBehavior::DumpDefaultConfig);
        assert_eq!(behavior(&["reqpool"]), RuntimeBehavior::Help);
    }

    #[test]
    fn test_poll_subcommand() {
        let expected = PollArgs {
            target: "https://example.com/health".into(),
            interval_ms: Some(500),
            max_attempts: Some(4),
            wait: true,
        };

        assert_eq!(
            behavior(&[
                "reqpool",
                "poll",
                "https://example.com/health",
                "--interval-ms",
                "500",
                "--max-attempts",
                "4",
                "--wait",
            ]),
            RuntimeBehavior::Poll(expected)
        );
    }

    #[test]
    fn test_dispatch_subcommand() {
        let argv = ["reqpool", "dispatch", "batch.json", "--base", "https://example.com"];
        let RuntimeBehavior::Dispatch(args) = behavior(&argv) else {
            panic!("expected dispatch");
        };
        assert_eq!(args.batch_file, PathBuf::from("batch.json"));
        assert_eq!(args.base.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_upload_subcommand_collects_repeated_types() {
        let RuntimeBehavior::Upload(args) = behavior(&[
            "reqpool",
            "upload",
            "https://example.com/upload",
            "report.pdf",
            "--content-type",
            "application/pdf",
            "--allow",
            "application/pdf",
            "--allow",
            "image/jpeg",
            "--max-size-mb",
            "10",
        ]) else {
            panic!("expected upload");
        };

        assert_eq!(args.allowed, vec!["application/pdf", "image/jpeg"]);
        assert!(args.not_allowed.is_empty());
        assert_eq!(args.max_size_mb, Some(10));
        assert_eq!(args.min_size_mb, None);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
