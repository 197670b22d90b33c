//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the consultation mesh.

use clap::{Parser, Subcommand};

/// Consult Mesh - peer-consulting worker mesh
///
/// Submits a task to one worker. The worker drafts an answer and may hand
/// the draft to a randomly chosen peer for refinement, which may in turn
/// consult another peer, until the chain settles on a final answer.
#[derive(Parser, Debug)]
#[command(name = "consult-mesh")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a task to a worker and print the final answer
    Submit {
        /// Worker that receives the task
        #[arg(short, long)]
        worker: String,

        /// Path to configuration file
        #[arg(short, long, env = "CONSULT_MESH_CONFIG")]
        config: Option<String>,

        /// End-to-end chain timeout in milliseconds (0 = unbounded)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Maximum nested consultations for this chain
        #[arg(long)]
        max_depth: Option<u32>,

        /// Seed for reproducible peer selection
        #[arg(long)]
        seed: Option<u64>,

        /// Print the answer and chain statistics as JSON
        #[arg(long)]
        json: bool,

        /// Task text
        #[arg(required = true, trailing_var_arg = true)]
        task: Vec<String>,
    },

    /// List the configured workers
    Workers {
        /// Path to configuration file
        #[arg(short, long, env = "CONSULT_MESH_CONFIG")]
        config: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_submit_command() {
        let cli = Cli::parse_from(["consult-mesh", "submit", "--worker", "chef", "plan", "a", "menu"]);
        match cli.command {
            Commands::Submit {
                worker,
                config,
                timeout_ms,
                task,
                ..
            } => {
                assert_eq!(worker, "chef");
                assert!(config.is_none());
                assert!(timeout_ms.is_none());
                assert_eq!(task.join(" "), "plan a menu");
            }
            _ => panic!("Expected Submit command"),
        }
    }

    #[test]
    fn test_submit_with_options() {
        let cli = Cli::parse_from([
            "consult-mesh",
            "submit",
            "-w",
            "engineer",
            "--timeout-ms",
            "2500",
            "--max-depth",
            "3",
            "--seed",
            "9",
            "build a bridge",
        ]);
        match cli.command {
            Commands::Submit {
                timeout_ms,
                max_depth,
                seed,
                json,
                ..
            } => {
                assert_eq!(timeout_ms, Some(2500));
                assert_eq!(max_depth, Some(3));
                assert_eq!(seed, Some(9));
                assert!(!json);
            }
            _ => panic!("Expected Submit command"),
        }
    }

    #[test]
    fn test_submit_requires_task() {
        assert!(Cli::try_parse_from(["consult-mesh", "submit", "--worker", "chef"]).is_err());
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["consult-mesh", "-vv", "workers"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["consult-mesh", "--quiet", "workers"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["consult-mesh", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
