//! `hashcatdict`: dictionary attacks (`-a 0`) through a local hashcat.
//!
//! Each task gets its own directory under `work_dir` holding the hash list
//! and hashcat's outfile. The directory is removed when the task ends.

mod config;

pub use config::HashcatConfig;

use std::path::{Path, PathBuf};
use std::process::Stdio;

use rn_tools::{TaskContext, Tool, ToolError, ToolInfo, ToolResult};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::catalog::PluginError;

pub const PLUGIN_NAME: &str = "hashcatdict";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrackParams {
    /// hashcat `-m` value (0 = MD5, 1000 = NTLM, ...).
    pub hash_mode: u32,
    /// Name of a configured dictionary.
    pub dictionary: String,
    /// Name of a configured rule file.
    #[serde(default)]
    pub rule: Option<String>,
    pub hashes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cracked {
    pub hash: String,
    pub plain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrackReport {
    pub cracked: Vec<Cracked>,
    pub total: usize,
    pub recovered: usize,
    /// hashcat ran through the whole keyspace without cracking everything.
    pub exhausted: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct HashcatDict {
    config: HashcatConfig,
}

impl HashcatDict {
    /// Plugin setup: `value` is the path of the plugin's config file.
    pub fn setup(value: &str) -> Result<Self, PluginError> {
        Ok(Self::new(HashcatConfig::load(value.trim())?))
    }

    pub fn new(config: HashcatConfig) -> Self {
        Self { config }
    }

    fn parse_params(&self, params: &serde_json::Value) -> Result<CrackParams, ToolError> {
        let parsed: CrackParams = serde_json::from_value(params.clone())
            .map_err(|e| ToolError::InvalidArgs(e.to_string()))?;

        if !self.config.dictionaries.contains_key(&parsed.dictionary) {
            return Err(ToolError::InvalidArgs(format!(
                "unknown dictionary {:?}",
                parsed.dictionary
            )));
        }
        if let Some(rule) = &parsed.rule {
            if !self.config.rules.contains_key(rule) {
                return Err(ToolError::InvalidArgs(format!("unknown rule {rule:?}")));
            }
        }
        if parsed.hashes.is_empty() {
            return Err(ToolError::InvalidArgs("hashes must not be empty".into()));
        }
        if parsed
            .hashes
            .iter()
            .any(|h| h.trim().is_empty() || h.contains(['\n', '\r']))
        {
            return Err(ToolError::InvalidArgs(
                "each hash must be a single non-empty line".into(),
            ));
        }
        Ok(parsed)
    }

    fn command(&self, params: &CrackParams, hash_file: &Path, out_file: &Path) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("-a")
            .arg("0")
            .arg("-m")
            .arg(params.hash_mode.to_string())
            .arg("--potfile-disable")
            .arg("--quiet")
            .arg("--outfile-format")
            .arg("1,2")
            .arg("-o")
            .arg(out_file)
            .arg(hash_file)
            .arg(&self.config.dictionaries[&params.dictionary]);
        if let Some(rule) = &params.rule {
            cmd.arg("-r").arg(&self.config.rules[rule]);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait::async_trait]
impl Tool for HashcatDict {
    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: PLUGIN_NAME.into(),
            kind: "cracker".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: "Dictionary attack with hashcat".into(),
            parameters: serde_json::json!({
                "type": "object",
                "required": ["hash_mode", "dictionary", "hashes"],
                "properties": {
                    "hash_mode": { "type": "integer", "minimum": 0 },
                    "dictionary": {
                        "type": "string",
                        "enum": self.config.dictionaries.keys().collect::<Vec<_>>(),
                    },
                    "rule": {
                        "type": "string",
                        "enum": self.config.rules.keys().collect::<Vec<_>>(),
                    },
                    "hashes": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                },
            }),
        }
    }

    fn validate(&self, params: &serde_json::Value) -> Result<(), ToolError> {
        self.parse_params(params).map(|_| ())
    }

    async fn run(&self, ctx: TaskContext, params: serde_json::Value) -> ToolResult {
        let params = self.parse_params(&params)?;

        let task_dir = self.config.work_dir.join(&ctx.task_id);
        tokio::fs::create_dir_all(&task_dir)
            .await
            .map_err(|e| ToolError::Failed(format!("creating {}: {e}", task_dir.display())))?;
        let task_dir = TaskDir(task_dir);

        crack(self, &ctx, &params, &task_dir.0).await
    }
}

/// Removes the per-task directory when dropped, which also covers a run
/// future dropped on quit.
struct TaskDir(PathBuf);

impl Drop for TaskDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %self.0.display(), error = %e, "failed to clean task dir");
            }
        }
    }
}

async fn crack(
    tool: &HashcatDict,
    ctx: &TaskContext,
    params: &CrackParams,
    task_dir: &Path,
) -> ToolResult {
    let hash_file = task_dir.join("hashes.txt");
    let out_file = task_dir.join("cracked.txt");

    let mut body = params.hashes.join("\n");
    body.push('\n');
    tokio::fs::write(&hash_file, body)
        .await
        .map_err(|e| ToolError::Failed(format!("writing hash list: {e}")))?;

    let child = tool
        .command(params, &hash_file, &out_file)
        .spawn()
        .map_err(|e| ToolError::Failed(format!("failed to spawn hashcat: {e}")))?;

    tracing::debug!(
        task_id = %ctx.task_id,
        hash_mode = params.hash_mode,
        dictionary = %params.dictionary,
        hashes = params.hashes.len(),
        "hashcat started"
    );

    let output = tokio::select! {
        out = child.wait_with_output() => {
            out.map_err(|e| ToolError::Failed(format!("waiting for hashcat: {e}")))?
        }
        // Dropping the child future kills hashcat (kill_on_drop).
        _ = ctx.cancel.cancelled() => {
            return Err(ToolError::Cancelled("task quit".into()));
        }
    };

    // 0 = cracked, 1 = exhausted; anything else is an error.
    let exhausted = match output.status.code() {
        Some(0) => false,
        Some(1) => true,
        code => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::Failed(format!(
                "hashcat exited with {}: {}",
                code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr.trim()
            )));
        }
    };

    let cracked = match tokio::fs::read_to_string(&out_file).await {
        Ok(raw) => parse_outfile(&raw, &params.hashes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(ToolError::Failed(format!("reading outfile: {e}"))),
    };

    let report = CrackReport {
        total: params.hashes.len(),
        recovered: cracked.len(),
        cracked,
        exhausted,
    };
    serde_json::to_value(report).map_err(|e| ToolError::Failed(e.to_string()))
}

/// Parse `hash:plain` outfile lines.
///
/// Hashes and plains may both contain `:`, so each line is matched against
/// the submitted hashes rather than split blindly.
fn parse_outfile(raw: &str, submitted: &[String]) -> Vec<Cracked> {
    let mut cracked: Vec<Cracked> = Vec::new();
    for line in raw.lines().filter(|l| !l.is_empty()) {
        // hashcat prints hex digests lowercase whatever case was submitted.
        let hit = submitted.iter().find_map(|hash| {
            line.get(..hash.len())
                .filter(|prefix| prefix.eq_ignore_ascii_case(hash))
                .and_then(|_| line[hash.len()..].strip_prefix(':'))
                .map(|plain| (hash, plain))
        });
        match hit {
            Some((hash, plain)) => {
                if !cracked.iter().any(|c| &c.hash == hash) {
                    cracked.push(Cracked {
                        hash: hash.clone(),
                        plain: plain.to_owned(),
                    });
                }
            }
            None => tracing::debug!(line = %line, "outfile line matches no submitted hash"),
        }
    }
    cracked
}
