use crate::api::types::FixFile;
use crate::task::TaskKind;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioTrack {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub channels: Option<u32>,
    #[serde(default)]
    pub title: Option<String>,
}

impl AudioTrack {
    /// e.g. `#1 eac3 (eng) 6ch 'Commentary'`
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(index) = self.index {
            parts.push(format!("#{}", index));
        }
        parts.push(self.codec.clone().unwrap_or_else(|| "?".to_string()));
        if let Some(lang) = self.language.as_deref().filter(|l| *l != "und" && !l.is_empty()) {
            parts.push(format!("({})", lang));
        }
        if let Some(channels) = self.channels.filter(|c| *c > 0) {
            parts.push(format!("{}ch", channels));
        }
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            parts.push(format!("'{}'", title));
        }
        parts.join(" ")
    }
}

/// Per-file outcome of a compatibility scan
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanRow {
    pub relative_path: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub video_details: Option<String>,
    #[serde(default)]
    pub audio_tracks: Vec<AudioTrack>,
    #[serde(default)]
    pub subtitle_codecs: Vec<String>,
    #[serde(default)]
    pub is_compatible: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScanRow {
    pub fn is_errored(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Incompatible and probed cleanly, i.e. a remediation candidate
    pub fn needs_attention(&self) -> bool {
        !self.is_compatible && !self.is_errored()
    }

    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.relative_path)
    }

    /// Reason column text
    pub fn note(&self) -> String {
        match (&self.reason, &self.error) {
            (Some(reason), _) if !reason.is_empty() => reason.clone(),
            (_, Some(error)) if !error.is_empty() => error.clone(),
            _ if self.is_compatible => "Direct Play OK".to_string(),
            _ => String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FixOutcome {
    Success,
    Failed,
    Skipped,
}

impl FixOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixOutcome::Success => "SUCCESS",
            FixOutcome::Failed => "FAILED",
            FixOutcome::Skipped => "SKIPPED",
        }
    }
}

/// Per-file outcome of a fix run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FixRow {
    /// Missing when the server had no path to report for the input
    #[serde(default)]
    pub relative_path: Option<String>,
    pub status: FixOutcome,
    #[serde(default)]
    pub message: String,
}

impl FixRow {
    pub fn path(&self) -> &str {
        self.relative_path.as_deref().unwrap_or("N/A")
    }
}

/// Classified `result` payload. Rows are always homogeneous.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResultSet {
    #[default]
    Empty,
    /// Singleton message instead of per-file rows
    Informational(String),
    Scan(Vec<ScanRow>),
    Fix(Vec<FixRow>),
}

impl ResultSet {
    /// Classify a raw payload for a task of `kind`.
    ///
    /// `null` means "nothing new" and yields `None`; malformed rows are
    /// dropped with a warning.
    pub fn classify(raw: &Value, kind: TaskKind) -> Option<ResultSet> {
        match raw {
            Value::Null => None,
            Value::Object(_) => Some(
                informational_message(raw)
                    .map(ResultSet::Informational)
                    .unwrap_or(ResultSet::Empty),
            ),
            Value::Array(items) => {
                if items.is_empty() {
                    return Some(ResultSet::Empty);
                }
                if items.len() == 1 {
                    if let Some(msg) = informational_message(&items[0]) {
                        return Some(ResultSet::Informational(msg));
                    }
                }
                Some(match kind {
                    TaskKind::Scan => ResultSet::Scan(parse_rows(items)),
                    TaskKind::Fix => ResultSet::Fix(parse_rows(items)),
                })
            }
            other => {
                tracing::warn!("Ignoring unexpected result payload: {}", other);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResultSet::Empty => 0,
            ResultSet::Informational(_) => 1,
            ResultSet::Scan(rows) => rows.len(),
            ResultSet::Fix(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of per-file rows; informational messages do not count
    pub fn row_count(&self) -> usize {
        match self {
            ResultSet::Scan(rows) => rows.len(),
            ResultSet::Fix(rows) => rows.len(),
            ResultSet::Empty | ResultSet::Informational(_) => 0,
        }
    }

    pub fn has_file_rows(&self) -> bool {
        self.row_count() > 0
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ResultSet::Informational(msg) => Some(msg),
            _ => None,
        }
    }

    /// Rows eligible for remediation, in result order
    pub fn remediation_candidates(&self) -> Vec<FixFile> {
        match self {
            ResultSet::Scan(rows) => rows
                .iter()
                .filter(|row| row.needs_attention())
                .map(|row| FixFile {
                    file_path: row.file_path.clone(),
                    relative_path: row.relative_path.clone(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn needs_attention_count(&self) -> usize {
        match self {
            ResultSet::Scan(rows) => rows.iter().filter(|r| r.needs_attention()).count(),
            ResultSet::Fix(rows) => rows
                .iter()
                .filter(|r| r.status == FixOutcome::Failed)
                .count(),
            ResultSet::Empty | ResultSet::Informational(_) => 0,
        }
    }

    /// Apply a view filter. For fix results "needs attention" means failed;
    /// messages pass through unchanged.
    pub fn filtered(&self, filter: ResultFilter) -> ResultSet {
        match (self, filter) {
            (ResultSet::Scan(rows), ResultFilter::NeedsAttention) => ResultSet::Scan(
                rows.iter()
                    .filter(|r| r.needs_attention())
                    .cloned()
                    .collect(),
            ),
            (ResultSet::Fix(rows), ResultFilter::NeedsAttention) => ResultSet::Fix(
                rows.iter()
                    .filter(|r| r.status == FixOutcome::Failed)
                    .cloned()
                    .collect(),
            ),
            _ => self.clone(),
        }
    }

    pub fn summarize(&self, kind: TaskKind) -> Summary {
        match kind {
            TaskKind::Scan => {
                let mut summary = ScanSummary::default();
                if let ResultSet::Scan(rows) = self {
                    for row in rows {
                        if row.is_errored() {
                            summary.errors += 1;
                        } else if row.is_compatible {
                            summary.compatible += 1;
                        } else {
                            summary.incompatible += 1;
                        }
                    }
                    summary.total = rows.len();
                }
                Summary::Scan(summary)
            }
            TaskKind::Fix => {
                let mut summary = FixSummary::default();
                if let ResultSet::Fix(rows) = self {
                    for row in rows {
                        match row.status {
                            FixOutcome::Success => summary.success += 1,
                            FixOutcome::Failed => summary.failed += 1,
                            FixOutcome::Skipped => summary.skipped += 1,
                        }
                    }
                    summary.total = rows.len();
                }
                Summary::Fix(summary)
            }
        }
    }

    /// Write the held rows as CSV, one header row first
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        match self {
            ResultSet::Empty => {
                csv.write_record(["Message"])?;
            }
            ResultSet::Informational(msg) => {
                csv.write_record(["Message"])?;
                csv.write_record([msg.as_str()])?;
            }
            ResultSet::Scan(rows) => {
                csv.write_record([
                    "File",
                    "Container",
                    "Video",
                    "Audio",
                    "Subtitles",
                    "Direct Play",
                    "Reason",
                ])?;
                for row in rows {
                    let audio = row
                        .audio_tracks
                        .iter()
                        .map(AudioTrack::describe)
                        .collect::<Vec<_>>()
                        .join("; ");
                    csv.write_record([
                        row.relative_path.as_str(),
                        row.container.as_deref().unwrap_or("N/A"),
                        row.video_details.as_deref().unwrap_or("N/A"),
                        audio.as_str(),
                        row.subtitle_codecs.join(", ").as_str(),
                        if row.is_compatible { "Yes" } else { "No" },
                        row.note().as_str(),
                    ])?;
                }
            }
            ResultSet::Fix(rows) => {
                csv.write_record(["File", "Status", "Message"])?;
                for row in rows {
                    csv.write_record([
                        row.path(),
                        row.status.as_str(),
                        row.message.as_str(),
                    ])?;
                }
            }
        }
        csv.flush()?;
        Ok(())
    }
}

fn informational_message(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    if obj.contains_key("relative_path") || obj.contains_key("status") {
        return None;
    }
    obj.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_rows<T: serde::de::DeserializeOwned>(items: &[Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!("Dropping malformed result row: {}", e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultFilter {
    #[default]
    All,
    NeedsAttention,
}

impl ResultFilter {
    pub fn toggle(self) -> Self {
        match self {
            ResultFilter::All => ResultFilter::NeedsAttention,
            ResultFilter::NeedsAttention => ResultFilter::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub compatible: usize,
    pub incompatible: usize,
    pub errors: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixSummary {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summary {
    Scan(ScanSummary),
    Fix(FixSummary),
}

impl Summary {
    pub fn total(&self) -> usize {
        match self {
            Summary::Scan(s) => s.total,
            Summary::Fix(s) => s.total,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Summary::Scan(s) => format!(
                "Scan Summary - Direct Play: {}, Needs Attention: {}, Errors: {} (Total Processed: {})",
                s.compatible, s.incompatible, s.errors, s.total
            ),
            Summary::Fix(s) => format!(
                "Fix Summary - Success: {}, Failed: {}, Skipped: {} (Total Attempted: {})",
                s.success, s.failed, s.skipped, s.total
            ),
        }
    }
}

/// Holds the last rendered ResultSet and decides whether a poll payload
/// warrants a re-render.
#[derive(Debug, Default)]
pub struct ResultReconciler {
    current: ResultSet,
    received: bool,
}

impl ResultReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &ResultSet {
        &self.current
    }

    /// True once any payload has been accepted since the last reset
    pub fn has_received(&self) -> bool {
        self.received
    }

    /// Classify `raw` and replace the held set if it differs.
    /// Returns true when downstream views must refresh.
    pub fn reconcile(&mut self, raw: Option<&Value>, kind: TaskKind) -> bool {
        let Some(candidate) = raw.and_then(|value| ResultSet::classify(value, kind)) else {
            return false;
        };

        if self.received && candidate == self.current {
            return false;
        }

        tracing::debug!(
            "Result set changed: {} -> {} rows",
            self.current.len(),
            candidate.len()
        );
        self.current = candidate;
        self.received = true;
        true
    }

    pub fn reset(&mut self) {
        self.current = ResultSet::Empty;
        self.received = false;
    }
}
