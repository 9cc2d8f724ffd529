//! CLI arguments for dsutil
//!
//! Defines the argument surface of every subcommand. Subcommand names
//! mirror the entry points of the original utility suite: submit, kinit,
//! memory, logf, plus the hdfs/text/fs utility groups.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// dsutil - cluster and developer utilities
#[derive(Parser, Debug, Clone)]
#[command(name = "dsutil")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cluster and developer utilities")]
#[command(long_about = r#"
Utilities for working on Hadoop/Spark gateway hosts.

Examples:
  dsutil submit -c submit.yaml job.py --date 2024-03-01
  dsutil kinit -p secret -m 60 -c email.yaml
  dsutil memory match -g 200
  dsutil logf fetch application_1700000000000_12345
  dsutil hdfs du /user/alice --depth 2
  dsutil text merge part-* -o merged.csv
  dsutil fs remove-empty /scratch/alice
"#)]
pub struct CliArgs {
    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Submit a Spark application
    #[command(name = "submit")]
    Submit(SubmitArgs),

    /// Authenticate with kinit using a saved password
    #[command(name = "kinit")]
    Kinit(KinitArgs),

    /// Inspect or shape per-user memory usage
    #[command(name = "memory")]
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Fetch and summarize YARN application logs
    #[command(name = "logf")]
    Logf {
        #[command(subcommand)]
        command: LogfCommands,
    },

    /// HDFS command wrappers
    #[command(name = "hdfs")]
    Hdfs {
        /// hdfs binary path
        #[arg(long, default_value = crate::hdfs::HDFS_BIN, value_name = "PATH", global = true)]
        bin: String,
        #[command(subcommand)]
        command: HdfsCommands,
    },

    /// Delimited text-file helpers
    #[command(name = "text")]
    Text {
        #[command(subcommand)]
        command: TextCommands,
    },

    /// Filesystem hygiene helpers
    #[command(name = "fs")]
    Fs {
        #[command(subcommand)]
        command: FsCommands,
    },
}

/// Arguments of `dsutil submit`
#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    /// The submission configuration file
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Local spark-submit path, overriding the config
    #[arg(long = "spark-submit-local", alias = "ssl", value_name = "PATH")]
    pub spark_submit_local: Option<String>,

    /// Local python path, overriding the config
    #[arg(long = "python-local", alias = "pl", value_name = "PATH")]
    pub python_local: Option<String>,

    /// Write an example configuration to the given path and exit
    #[arg(short = 'g', long = "gen-config", value_name = "PATH")]
    pub gen_config: Option<PathBuf>,

    /// The command to submit to Spark
    #[arg(value_name = "CMD", trailing_var_arg = true, allow_hyphen_values = true)]
    pub cmd: Vec<String>,
}

/// Arguments of `dsutil kinit`
#[derive(Args, Debug, Clone)]
pub struct KinitArgs {
    /// The user to authenticate; the current user when omitted
    #[arg(short = 'u', long, default_value = "", value_name = "USER")]
    pub user: String,

    /// The password; saved into the profile for later runs
    #[arg(short = 'p', long, default_value = "", value_name = "PASSWORD")]
    pub password: String,

    /// Keep re-authenticating with the given frequency, in minutes
    #[arg(short = 'm', long, value_name = "MINUTES")]
    pub minute: Option<u64>,

    /// YAML config file carrying the email block
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Subcommands of `dsutil memory`
#[derive(Subcommand, Debug, Clone)]
pub enum MemoryCommands {
    /// Hold ballast until the user's memory usage matches a target
    Match {
        /// Target memory in gigabytes
        #[arg(short = 'g', value_name = "GIB", conflicts_with = "mib")]
        gib: Option<u64>,
        /// Target memory in megabytes
        #[arg(short = 'm', value_name = "MIB", required_unless_present = "gib")]
        mib: Option<u64>,
    },
    /// Print the user's current memory usage
    Usage {
        /// The user to measure; the current user when omitted
        #[arg(short = 'u', long, default_value = "", value_name = "USER")]
        user: String,
    },
    /// Log the user's memory usage periodically
    Monitor {
        /// Seconds between measurements
        #[arg(short = 'i', long, default_value = "1", value_name = "SECS")]
        interval: u64,
        /// The user to measure; the current user when omitted
        #[arg(short = 'u', long, default_value = "", value_name = "USER")]
        user: String,
    },
}

/// Subcommands of `dsutil logf`
#[derive(Subcommand, Debug, Clone)]
pub enum LogfCommands {
    /// Fetch the aggregated log of an application and summarize it
    Fetch {
        /// The YARN application id
        #[arg(value_name = "APP_ID")]
        app_id: String,
        /// yarn binary path
        #[arg(long, default_value = crate::logf::YARN_BIN, value_name = "PATH")]
        bin: String,
        /// Directory to write the dump and summary into
        #[arg(short = 'o', long, default_value = ".", value_name = "DIR")]
        output_dir: PathBuf,
        /// Context lines kept after each match
        #[arg(long, default_value = "2", value_name = "NUM")]
        context: usize,
    },
    /// Summarize an already fetched log dump
    Filter {
        /// The log dump to summarize
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Context lines kept after each match
        #[arg(long, default_value = "2", value_name = "NUM")]
        context: usize,
    },
}

/// Subcommands of `dsutil hdfs`
#[derive(Subcommand, Debug, Clone)]
pub enum HdfsCommands {
    /// List a path
    Ls {
        #[arg(value_name = "PATH")]
        path: String,
        /// Recurse into subdirectories
        #[arg(short = 'R', long)]
        recursive: bool,
    },
    /// Disk usage below a path
    Du {
        #[arg(value_name = "PATH")]
        path: String,
        /// Depth of the paths to report sizes for
        #[arg(long, default_value = "1", value_name = "NUM")]
        depth: usize,
    },
    /// Quota and usage counters
    Count {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Check whether a path exists (exit status reports the answer)
    Exists {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Remove a path recursively
    Rm {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Create a path, with parents
    Mkdir {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Upload a local path into HDFS
    Put {
        #[arg(value_name = "LOCAL")]
        local: PathBuf,
        #[arg(value_name = "HDFS_PATH")]
        hdfs_path: String,
        /// Create the HDFS path first
        #[arg(long)]
        create: bool,
    },
    /// Download a path into a local directory
    Get {
        #[arg(value_name = "HDFS_PATH")]
        hdfs_path: String,
        #[arg(value_name = "LOCAL_DIR", default_value = ".")]
        local_dir: PathBuf,
        /// The HDFS path is a single file
        #[arg(long)]
        file: bool,
    },
    /// Count the part files under a path
    Partitions {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Sizes of every directory and file below a path, largest first
    Sizes {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Frequency of parent prefixes among the paths below a path
    CountPath {
        #[arg(value_name = "PATH")]
        path: String,
    },
}

/// Subcommands of `dsutil text`
#[derive(Subcommand, Debug, Clone)]
pub enum TextCommands {
    /// Merge files, keeping a single header when they share one
    Merge {
        /// Files to merge, or a single directory
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
        /// Output file (stdout when omitted)
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Non-empty files probed for a shared header
        #[arg(short = 'n', long, default_value = "5", value_name = "NUM")]
        probe: usize,
    },
    /// Drop header lines repeated mid-file
    DedupHeader {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Project named columns out of a delimited file
    Select {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Columns to keep
        #[arg(short = 'c', long, value_name = "NAME", required = true)]
        columns: Vec<String>,
        /// Field delimiter
        #[arg(short = 'd', long, default_value = ",", value_name = "DELIM")]
        delimiter: String,
        /// Output file (stdout when omitted)
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Remove value_counts blocks from a JSON profiling dump
    PruneJson {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output file (<stem>_prune.json when omitted)
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Subcommands of `dsutil fs`
#[derive(Subcommand, Debug, Clone)]
pub enum FsCommands {
    /// Move files of immediate subdirectories up one level
    Flatten {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
    /// Partition the files of a directory into numbered batch subdirs
    Split {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        /// Files per batch
        #[arg(short = 's', long, value_name = "NUM")]
        batch_size: usize,
        /// Wildcard selecting the files to move
        #[arg(short = 'w', long, default_value = "*", value_name = "GLOB")]
        wildcard: String,
    },
    /// List essentially empty directories
    FindEmpty {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
    /// Remove essentially empty directories
    RemoveEmpty {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_submit() {
        let args = CliArgs::parse_from([
            "dsutil", "submit", "-c", "submit.yaml", "job.py", "--date", "2024-03-01",
        ]);
        match args.command {
            Commands::Submit(submit) => {
                assert_eq!(submit.config.unwrap(), PathBuf::from("submit.yaml"));
                assert_eq!(submit.cmd, vec!["job.py", "--date", "2024-03-01"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_memory_match_units() {
        let args = CliArgs::parse_from(["dsutil", "memory", "match", "-g", "200"]);
        match args.command {
            Commands::Memory {
                command: MemoryCommands::Match { gib, mib },
            } => {
                assert_eq!(gib, Some(200));
                assert_eq!(mib, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        // -g and -m are mutually exclusive.
        assert!(
            CliArgs::try_parse_from(["dsutil", "memory", "match", "-g", "1", "-m", "1"]).is_err()
        );
        // One of them is required.
        assert!(CliArgs::try_parse_from(["dsutil", "memory", "match"]).is_err());
    }

    #[test]
    fn test_parse_hdfs_du_depth() {
        let args = CliArgs::parse_from(["dsutil", "hdfs", "du", "/user/alice", "--depth", "2"]);
        match args.command {
            Commands::Hdfs {
                command: HdfsCommands::Du { path, depth },
                ..
            } => {
                assert_eq!(path, "/user/alice");
                assert_eq!(depth, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
