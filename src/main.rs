//! dsutil CLI - cluster and developer utilities
//!
//! Subcommands mirror the entry points of the utility suite: submit,
//! kinit, memory, logf, plus hdfs/text/fs helper groups.

use clap::Parser;
use dsutil::config::{
    CliArgs, Commands, FsCommands, HdfsCommands, KinitArgs, LogfCommands, MemoryCommands,
    SubmitArgs, TextCommands,
};
use dsutil::error::{DsutilError, Result};
use dsutil::hdfs::HdfsClient;
use dsutil::kerberos::{self, Authenticator};
use dsutil::logf::{filter_log_file, LogFetcher, SummaryOptions};
use dsutil::memory::{self, MatcherConfig};
use dsutil::notify::EmailConfig;
use dsutil::spark::{self, SubmitConfig};
use dsutil::{fsops, text};
use humansize::{format_size, BINARY};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = CliArgs::parse();

    // Initialize logging; -v raises the default level
    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Commands::Submit(submit) => cmd_submit(submit),
        Commands::Kinit(kinit) => cmd_kinit(kinit),
        Commands::Memory { command } => cmd_memory(command),
        Commands::Logf { command } => cmd_logf(command),
        Commands::Hdfs { bin, command } => cmd_hdfs(HdfsClient::new(bin), command),
        Commands::Text { command } => cmd_text(command),
        Commands::Fs { command } => cmd_fs(command),
    }
}

fn cmd_submit(args: SubmitArgs) -> Result<()> {
    if let Some(path) = &args.gen_config {
        fs::write(path, spark::CONFIG_TEMPLATE).map_err(|e| DsutilError::io(path, e))?;
        println!("An example configuration is generated at {}", path.display());
        return Ok(());
    }
    if args.cmd.is_empty() {
        return Err(DsutilError::config("no command to submit"));
    }
    let mut config = match &args.config {
        Some(path) => SubmitConfig::load(path)?,
        None => SubmitConfig::default(),
    };
    if let Some(local) = args.spark_submit_local {
        config.spark_submit_local = local;
    }
    if let Some(python) = args.python_local {
        config.python_local = dsutil::spark::StringOrList::One(python);
    }
    let ok = spark::submit_job(&config, &args.cmd, &HdfsClient::default())?;
    if !ok {
        std::process::exit(2);
    }
    Ok(())
}

fn cmd_kinit(args: KinitArgs) -> Result<()> {
    let profile = kerberos::profile_path();
    if !args.password.is_empty() {
        kerberos::save_passwd(&profile, &args.password)?;
    }
    let password = kerberos::read_passwd(&profile)?;
    if password.is_empty() {
        return Err(DsutilError::NoPassword);
    }
    let email = args.config.as_deref().map(load_email_config).transpose()?;
    let auth = Authenticator::new(args.user, email);
    auth.authenticate(&password)?;
    if let Some(minute) = args.minute {
        auth.run_daemon(Duration::from_secs(minute * 60), &profile)?;
    }
    Ok(())
}

/// Load the `email` block of a YAML config file
fn load_email_config(path: &std::path::Path) -> Result<EmailConfig> {
    #[derive(serde::Deserialize)]
    struct EmailFile {
        email: EmailConfig,
    }
    let text = fs::read_to_string(path).map_err(|e| DsutilError::io(path, e))?;
    let parsed: EmailFile = serde_yaml::from_str(&text)?;
    Ok(parsed.email)
}

fn cmd_memory(command: MemoryCommands) -> Result<()> {
    match command {
        MemoryCommands::Match { gib, mib } => {
            let target = gib.map(|g| g << 30).or(mib.map(|m| m << 20)).unwrap_or(0);
            memory::match_memory_usage(&MatcherConfig::new(target));
        }
        MemoryCommands::Usage { user } => {
            let user = resolve_user(user);
            let used = memory::memory_usage(&user);
            println!("Memory used by {}: {}", user, format_size(used, BINARY));
            Ok(())
        }
        MemoryCommands::Monitor { interval, user } => {
            let user = resolve_user(user);
            memory::monitor_memory_usage(Duration::from_secs(interval), &user);
        }
    }
}

fn resolve_user(user: String) -> String {
    if user.is_empty() {
        memory::current_user()
    } else {
        user
    }
}

fn cmd_logf(command: LogfCommands) -> Result<()> {
    match command {
        LogfCommands::Fetch {
            app_id,
            bin,
            output_dir,
            context,
        } => {
            let fetcher = LogFetcher { bin, output_dir };
            let (dump, summary) = fetcher.fetch(
                &app_id,
                SummaryOptions {
                    context_after: context,
                },
            )?;
            println!("Raw log:  {}", dump.display());
            println!("Summary:  {}", summary.display());
            Ok(())
        }
        LogfCommands::Filter { file, context } => {
            let summary = filter_log_file(
                &file,
                SummaryOptions {
                    context_after: context,
                },
            )?;
            println!("Summary:  {}", summary.display());
            Ok(())
        }
    }
}

fn cmd_hdfs(client: HdfsClient, command: HdfsCommands) -> Result<()> {
    match command {
        HdfsCommands::Ls { path, recursive } => {
            for entry in client.ls(&path, recursive)? {
                let mtime = entry
                    .mtime
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{} {:>12} {:>16} {}",
                    entry.permissions, entry.bytes, mtime, entry.path
                );
            }
            Ok(())
        }
        HdfsCommands::Du { path, depth } => {
            for entry in client.du_depth(&path, depth)? {
                println!("{:>14}  {:>10}  {}", entry.size, format_size(entry.size, BINARY), entry.path);
            }
            Ok(())
        }
        HdfsCommands::Count { path } => {
            let table = client.count(&path)?;
            println!("{}", table.columns.join("\t"));
            for row in &table.rows {
                println!("{}", row.join("\t"));
            }
            Ok(())
        }
        HdfsCommands::Exists { path } => {
            if client.exists(&path)? {
                println!("{path} exists");
                Ok(())
            } else {
                println!("{path} does not exist");
                std::process::exit(1);
            }
        }
        HdfsCommands::Rm { path } => client.remove(&path),
        HdfsCommands::Mkdir { path } => client.mkdir(&path),
        HdfsCommands::Put {
            local,
            hdfs_path,
            create,
        } => client.put(&local, &hdfs_path, create),
        HdfsCommands::Get {
            hdfs_path,
            local_dir,
            file,
        } => client.get(&hdfs_path, &local_dir, file),
        HdfsCommands::Partitions { path } => {
            println!("{}", client.num_partitions(&path)?);
            Ok(())
        }
        HdfsCommands::Sizes { path } => {
            for entry in client.sizes(&path)? {
                println!("{:>14}  {:>10}  {}", entry.size, format_size(entry.size, BINARY), entry.path);
            }
            Ok(())
        }
        HdfsCommands::CountPath { path } => {
            for (prefix, count) in client.count_path(&path)? {
                println!("{count:>8}  {prefix}");
            }
            Ok(())
        }
    }
}

fn cmd_text(command: TextCommands) -> Result<()> {
    match command {
        TextCommands::Merge {
            files,
            output,
            probe,
        } => {
            if files.len() == 1 && files[0].is_dir() {
                text::merge_dir(&files[0], output.as_deref(), probe)
            } else {
                text::merge(&files, output.as_deref(), probe)
            }
        }
        TextCommands::DedupHeader { file, output } => text::dedup_header(&file, output.as_deref()),
        TextCommands::Select {
            file,
            columns,
            delimiter,
            output,
        } => text::select(&file, &columns, &delimiter, output.as_deref()),
        TextCommands::PruneJson { file, output } => {
            let out = text::prune_json_file(&file, output.as_deref())?;
            println!("The pruned JSON file is written to {}", out.display());
            Ok(())
        }
    }
}

fn cmd_fs(command: FsCommands) -> Result<()> {
    match command {
        FsCommands::Flatten { dir } => fsops::flatten_dir(&dir),
        FsCommands::Split {
            dir,
            batch_size,
            wildcard,
        } => {
            let batches = fsops::split_dir(&dir, batch_size, &wildcard)?;
            println!("{batches} batch directories created under {}", dir.display());
            Ok(())
        }
        FsCommands::FindEmpty { dir } => {
            for path in fsops::find_ess_empty(&dir)? {
                println!("{}", path.display());
            }
            Ok(())
        }
        FsCommands::RemoveEmpty { dir } => {
            let failed: Vec<PathBuf> = fsops::remove_ess_empty(&dir)?;
            for path in &failed {
                eprintln!("Could not remove {}", path.display());
            }
            if !failed.is_empty() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
