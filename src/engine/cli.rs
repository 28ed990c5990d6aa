//! CLI-backed extraction engine driving the yt-dlp binary
//!
//! Progress reporting uses a custom `--progress-template` so the child's
//! stdout becomes a line protocol: marker-prefixed progress lines during
//! transfer, plus a single marker-prefixed final-path line printed by the
//! engine after its postprocessing/move step.

use super::types::{
    DownloadSpec, EngineOutcome, MediaProbe, PostProcessing, ProgressHook, TransferProgress,
};
use super::MediaEngine;
use crate::error::EngineError;
use crate::types::TransferPhase;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Binary name searched on PATH when no explicit path is configured
const DEFAULT_BINARY: &str = "yt-dlp";

/// Prefix for progress lines emitted via `--progress-template`
const PROGRESS_MARKER: &str = "__progress__";

/// Prefix for the final-path line emitted via `--print after_move:`
const FINAL_PATH_MARKER: &str = "__final__";

/// Number of trailing stderr lines preserved in engine failure detail
const STDERR_TAIL_LINES: usize = 8;

/// Extraction engine implementation that shells out to yt-dlp
pub struct CliMediaEngine {
    binary: PathBuf,
}

impl CliMediaEngine {
    /// Create an engine around an explicit binary path
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// Locate the engine binary on PATH
    ///
    /// Returns `None` if no yt-dlp binary is found.
    pub fn from_path() -> Option<Self> {
        which::which(DEFAULT_BINARY).ok().map(Self::new)
    }

    /// The binary this engine invokes
    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["--no-warnings", "--no-cache-dir"]);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl MediaEngine for CliMediaEngine {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<MediaProbe, EngineError> {
        let mut cmd = self.base_command();
        cmd.arg("--dump-single-json").arg(url);

        tracing::debug!(binary = %self.binary.display(), url, "probing media metadata");

        let output = cmd.output().await.map_err(|source| EngineError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                status: output.status.code().unwrap_or(-1),
                detail: stderr_tail(&String::from_utf8_lossy(&output.stderr)),
            });
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::InvalidMetadata(e.to_string()))
    }

    async fn download(
        &self,
        spec: &DownloadSpec,
        on_progress: ProgressHook,
    ) -> Result<EngineOutcome, EngineError> {
        let mut cmd = self.base_command();
        cmd.args(build_download_args(spec));

        tracing::info!(
            binary = %self.binary.display(),
            url = %spec.url,
            format = %spec.format,
            "starting engine download"
        );

        let mut child = cmd.spawn().map_err(|source| EngineError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Io(std::io::Error::other("engine stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Io(std::io::Error::other("engine stderr not captured")))?;

        // Drain stderr concurrently so the child never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            BufReader::new(stderr).read_to_string(&mut buf).await.ok();
            buf
        });

        let mut final_path: Option<PathBuf> = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(progress) = parse_progress_line(&line) {
                on_progress(progress);
            } else if let Some(path) = parse_final_path_line(&line) {
                final_path = Some(path);
            }
        }

        let status = child.wait().await?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(EngineError::Failed {
                status: status.code().unwrap_or(-1),
                detail: stderr_tail(&stderr_text),
            });
        }

        Ok(EngineOutcome { final_path })
    }
}

/// Build the full download argument list for a spec
fn build_download_args(spec: &DownloadSpec) -> Vec<String> {
    let mut args = vec![
        "--newline".to_string(),
        "--progress".to_string(),
        "--progress-template".to_string(),
        format!(
            "download:{PROGRESS_MARKER} %(progress.status)s %(progress.downloaded_bytes)s \
             %(progress.total_bytes)s %(progress.total_bytes_estimate)s %(progress.speed)s \
             %(progress.eta)s"
        ),
        "--print".to_string(),
        format!("after_move:{FINAL_PATH_MARKER} %(filepath)s"),
        "-f".to_string(),
        spec.format.clone(),
        "-o".to_string(),
        spec.output_template.clone(),
    ];

    match &spec.post {
        PostProcessing::Remux { container } => {
            args.push("--merge-output-format".to_string());
            args.push(container.clone());
        }
        PostProcessing::ExtractAudio { codec, quality } => {
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push(codec.clone());
            args.push("--audio-quality".to_string());
            args.push(quality.clone());
        }
    }

    args.push(spec.url.clone());
    args
}

/// Parse one marker-prefixed progress line into a callback payload
///
/// Unknown fields arrive as the literal "NA" and map to `None`.
fn parse_progress_line(line: &str) -> Option<TransferProgress> {
    let rest = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let mut fields = rest.split_whitespace();

    let phase = match fields.next()? {
        "downloading" => TransferPhase::Downloading,
        "finished" => TransferPhase::Finished,
        _ => return None,
    };

    let downloaded_bytes = parse_field(fields.next()).map(|v| v as u64);
    let total_bytes = parse_field(fields.next()).map(|v| v as u64);
    let total_estimate = parse_field(fields.next()).map(|v| v as u64);
    let speed = parse_field(fields.next());
    let eta = parse_field(fields.next()).map(|v| v as u64);

    Some(TransferProgress {
        phase,
        downloaded_bytes,
        total_bytes: total_bytes.or(total_estimate),
        speed,
        eta,
    })
}

/// Parse the marker-prefixed final-path line
fn parse_final_path_line(line: &str) -> Option<PathBuf> {
    let rest = line.trim().strip_prefix(FINAL_PATH_MARKER)?.trim();
    if rest.is_empty() {
        return None;
    }
    Some(PathBuf::from(rest))
}

/// Numeric template field: "NA" and unparseable values are unknown
fn parse_field(field: Option<&str>) -> Option<f64> {
    let field = field?;
    if field == "NA" || field == "N/A" {
        return None;
    }
    field.parse().ok().filter(|v: &f64| v.is_finite() && *v >= 0.0)
}

/// Keep only the last few stderr lines for error detail
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
