//! The YAML submission config

use crate::error::{DsutilError, Result};
use crate::hdfs::HdfsClient;
use crate::notify::EmailConfig;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Example submission config written by `dsutil submit --gen-config`
pub const CONFIG_TEMPLATE: &str = include_str!("template.yaml");

/// A YAML value that may be written as a scalar or a list of scalars
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    #[default]
    #[serde(skip)]
    Empty,
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// The values as a list
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Empty => Vec::new(),
            Self::One(value) => vec![value.clone()],
            Self::Many(values) => values.clone(),
        }
    }

    /// The values joined with commas (the spark list syntax)
    pub fn join(&self) -> String {
        self.to_vec().join(",")
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::One(value) => value.is_empty(),
            Self::Many(values) => values.is_empty(),
        }
    }
}

/// Submission parameters, deserialized from the YAML template
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SubmitConfig {
    /// spark-submit binary on the cluster gateway
    pub spark_submit: String,
    /// spark-submit binary for a local trial run, empty to skip
    pub spark_submit_local: String,
    /// Candidate local python executables, first existing one wins
    pub python_local: StringOrList,
    #[serde(deserialize_with = "de_opt_scalar")]
    pub master: Option<String>,
    #[serde(deserialize_with = "de_opt_scalar")]
    pub deploy_mode: Option<String>,
    #[serde(deserialize_with = "de_opt_scalar")]
    pub queue: Option<String>,
    #[serde(deserialize_with = "de_opt_scalar")]
    pub num_executors: Option<String>,
    #[serde(deserialize_with = "de_opt_scalar")]
    pub executor_memory: Option<String>,
    #[serde(deserialize_with = "de_opt_scalar")]
    pub driver_memory: Option<String>,
    #[serde(deserialize_with = "de_opt_scalar")]
    pub executor_cores: Option<String>,
    #[serde(deserialize_with = "de_opt_scalar")]
    pub archives: Option<String>,
    /// Config files to ship: logical name to candidate URIs, first existing
    /// candidate wins
    pub files: BTreeMap<String, Vec<String>>,
    /// Jars to ship
    pub jars: StringOrList,
    /// Extra `--conf key=value` pairs
    pub conf: BTreeMap<String, serde_yaml::Value>,
    /// Notification relay
    pub email: Option<EmailConfig>,
}

/// Accept YAML scalars of any type (10, 10g, true) as strings
fn de_opt_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    Ok(value.map(|v| scalar_to_string(&v)))
}

/// Render a YAML scalar the way it reads in the file
pub fn scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}

impl SubmitConfig {
    /// Load the config from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| DsutilError::io(path, e))?;
        let config: SubmitConfig = serde_yaml::from_str(&text)?;
        Ok(config)
    }

    /// Command-line option pairs in spark-submit order, skipping absent
    /// settings
    pub fn option_lines(&self, files: &str) -> Vec<String> {
        let mut lines = Vec::new();
        if !files.is_empty() {
            lines.push(format!("--files {files}"));
        }
        let opts: [(&str, &Option<String>); 8] = [
            ("master", &self.master),
            ("deploy-mode", &self.deploy_mode),
            ("queue", &self.queue),
            ("num-executors", &self.num_executors),
            ("executor-memory", &self.executor_memory),
            ("driver-memory", &self.driver_memory),
            ("executor-cores", &self.executor_cores),
            ("archives", &self.archives),
        ];
        for (name, value) in opts {
            if let Some(value) = value {
                lines.push(format!("--{name} {value}"));
            }
        }
        for (key, value) in &self.conf {
            lines.push(format!("--conf {key}={}", scalar_to_string(value)));
        }
        lines
    }

    /// Resolve the `files` map: the first existing candidate of each
    /// logical name, joined with commas. Local candidates (`file://`) are
    /// checked on disk, `hdfs://` and `viewfs://` candidates through the
    /// hdfs client. A logical name with no existing candidate is skipped
    /// with a warning.
    pub fn resolve_files(&self, hdfs: &HdfsClient) -> String {
        let mut resolved = Vec::new();
        for (name, candidates) in &self.files {
            let winner = candidates.iter().find(|uri| uri_exists(hdfs, uri));
            match winner {
                Some(uri) => resolved.push(uri.clone()),
                None => warn!(
                    "None of the configured files for {name} exists:\n{}",
                    candidates
                        .iter()
                        .map(|c| format!("    {c}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                ),
            }
        }
        resolved.join(",")
    }

    /// First existing local python executable; bare names are looked up on
    /// PATH
    pub fn resolve_python(&self) -> Result<String> {
        let candidates = if self.python_local.is_empty() {
            vec!["python3".to_string(), "python".to_string()]
        } else {
            self.python_local.to_vec()
        };
        for candidate in &candidates {
            let path = if candidate.contains('/') {
                Some(candidate.clone())
            } else {
                which(candidate)
            };
            if let Some(path) = path {
                if Path::new(&path).is_file() {
                    return Ok(path);
                }
            }
        }
        Err(DsutilError::NoLocalPython(candidates.join(", ")))
    }
}

/// Look up an executable on PATH
fn which(name: &str) -> Option<String> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
        .map(|path| path.display().to_string())
}

fn uri_exists(hdfs: &HdfsClient, uri: &str) -> bool {
    if let Some(local) = uri.strip_prefix("file://") {
        return Path::new(local).is_file();
    }
    if uri.starts_with("hdfs://") || uri.starts_with("viewfs://") {
        return hdfs.exists_file(uri).unwrap_or(false);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const YAML: &str = r#"
spark-submit: /apache/spark/bin/spark-submit
master: yarn
deploy-mode: cluster
queue: analytics
num-executors: 100
executor-memory: 10g
driver-memory: 15g
executor-cores: 4
jars:
  - viewfs:///lib/a.jar
  - viewfs:///lib/b.jar
conf:
  spark.yarn.maxAppAttempts: 2
  spark.speculation: true
email:
  from: me@example.com
  to: me@example.com
  host: relay.example.com
"#;

    #[test]
    fn test_load_yaml() {
        let config: SubmitConfig = serde_yaml::from_str(YAML).unwrap();
        assert_eq!(config.spark_submit, "/apache/spark/bin/spark-submit");
        assert_eq!(config.num_executors.as_deref(), Some("100"));
        assert_eq!(config.jars.join(), "viewfs:///lib/a.jar,viewfs:///lib/b.jar");
        assert_eq!(config.email.unwrap().host, "relay.example.com");
    }

    #[test]
    fn test_option_lines_order_and_scalars() {
        let config: SubmitConfig = serde_yaml::from_str(YAML).unwrap();
        let lines = config.option_lines("a.xml,b.xml");
        assert_eq!(lines[0], "--files a.xml,b.xml");
        assert_eq!(lines[1], "--master yarn");
        assert_eq!(lines[2], "--deploy-mode cluster");
        assert!(lines.contains(&"--conf spark.yarn.maxAppAttempts=2".to_string()));
        assert!(lines.contains(&"--conf spark.speculation=true".to_string()));
    }

    #[test]
    fn test_empty_config_defaults() {
        let config: SubmitConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.spark_submit.is_empty());
        assert!(config.option_lines("").is_empty());
        assert!(config.jars.is_empty());
    }

    #[test]
    fn test_scalar_jars() {
        let config: SubmitConfig = serde_yaml::from_str("jars: /lib/one.jar").unwrap();
        assert_eq!(config.jars.join(), "/lib/one.jar");
    }

    #[test]
    fn test_resolve_python_default_candidates() {
        let config = SubmitConfig::default();
        // Any test host has python3 or python on PATH, or neither; both
        // outcomes are well-formed.
        match config.resolve_python() {
            Ok(path) => assert!(Path::new(&path).is_file()),
            Err(e) => assert!(matches!(e, DsutilError::NoLocalPython(_))),
        }
    }

    #[test]
    fn test_template_parses() {
        let config: SubmitConfig = serde_yaml::from_str(CONFIG_TEMPLATE).unwrap();
        assert!(config.spark_submit.ends_with("spark-submit"));
        assert_eq!(config.files.len(), 2);
        assert!(config.email.is_some());
    }

    #[test]
    fn test_resolve_files_local_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let existing = dir.path().join("core-site.xml");
        std::fs::write(&existing, b"<xml/>").unwrap();
        let yaml = format!(
            "files:\n  core-site:\n    - file://{}\n  missing:\n    - file:///no/such.xml\n",
            existing.display()
        );
        let config: SubmitConfig = serde_yaml::from_str(&yaml).unwrap();
        let resolved = config.resolve_files(&HdfsClient::default());
        assert_eq!(resolved, format!("file://{}", existing.display()));
    }
}
