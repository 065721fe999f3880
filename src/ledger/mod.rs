//! Persistent search ledger
//!
//! Two files back a run: the append-only result file and a small
//! checkpoint overwritten in place. The checkpoint names the next
//! candidate to check, so a resumed run replays exactly the remaining
//! trace of an uninterrupted one.

mod results;

pub use results::{
    format_candidate, parse_candidate, read_results, ResultFile, ResultFileName, ResultLog,
};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::algebra::{Element, Poly};
use crate::search::{Coefficients, Phase};

/// First line of a finished checkpoint.
pub const COMPLETE_MARKER: &str = "complete";

/// Errors reading or writing ledger files.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Underlying file operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Cause.
        #[source]
        source: io::Error,
    },

    /// The checkpoint does not describe a valid sweep position.
    #[error("corrupt checkpoint at line {line}: {reason}")]
    CorruptCheckpoint {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// A result line could not be parsed.
    #[error("corrupt result file at line {line}: {reason}")]
    CorruptResults {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}

impl LedgerError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn checkpoint(line: usize, reason: impl Into<String>) -> Self {
        LedgerError::CorruptCheckpoint {
            line,
            reason: reason.into(),
        }
    }
}

/// The next candidate of an unfinished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    /// Candidates accounted for before this one.
    pub count: u64,
    /// Mask pair text, `"<f bits> / <g bits>"`.
    pub masks: String,
    /// Numerator to check next.
    pub f: Poly,
    /// Denominator to check next.
    pub g: Poly,
    /// Cursor into the locked position's representative set.
    pub lock_cursor: usize,
    /// Mask family of the pair.
    pub phase: Phase,
}

/// Contents of a checkpoint file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointState {
    /// Resume from this record.
    InProgress(CheckpointRecord),
    /// The search finished.
    Complete,
}

/// Checkpoint file handle.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Checkpoint at `path`; nothing is touched until a read or write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the checkpoint; `None` if there is none.
    pub fn load(&self) -> Result<Option<CheckpointState>, LedgerError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(LedgerError::io(&self.path)(err)),
        };
        parse_checkpoint(&text).map(Some)
    }

    /// Overwrite with `record`.
    pub fn save(&self, record: &CheckpointRecord) -> Result<(), LedgerError> {
        let text = format!(
            "{}\n{}\n{} / {}\n{}\n{}\n",
            record.count,
            record.masks,
            Coefficients(&record.f),
            Coefficients(&record.g),
            record.lock_cursor,
            record.phase.as_flag()
        );
        self.replace(&text)?;
        debug!(count = record.count, masks = %record.masks, "checkpoint written");
        Ok(())
    }

    /// Mark the search finished.
    pub fn mark_complete(&self) -> Result<(), LedgerError> {
        self.replace(&format!("{COMPLETE_MARKER}\n"))
    }

    /// Write to a sibling temp file and rename it over the checkpoint.
    fn replace(&self, text: &str) -> Result<(), LedgerError> {
        let mut tmp_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        let file = File::create(&tmp).map_err(LedgerError::io(&tmp))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(text.as_bytes())
            .map_err(LedgerError::io(&tmp))?;
        writer.flush().map_err(LedgerError::io(&tmp))?;
        drop(writer);
        fs::rename(&tmp, &self.path).map_err(LedgerError::io(&self.path))
    }
}

fn parse_coeffs(text: &str, line: usize) -> Result<Poly, LedgerError> {
    let coeffs = text
        .split_whitespace()
        .map(|c| {
            c.parse::<Element>()
                .map_err(|_| LedgerError::checkpoint(line, format!("bad coefficient {c:?}")))
        })
        .collect::<Result<Poly, _>>()?;
    if coeffs.is_empty() {
        return Err(LedgerError::checkpoint(line, "empty polynomial"));
    }
    Ok(coeffs)
}

fn parse_checkpoint(text: &str) -> Result<CheckpointState, LedgerError> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    match lines.first() {
        None => return Err(LedgerError::checkpoint(1, "empty checkpoint")),
        Some(&COMPLETE_MARKER) => return Ok(CheckpointState::Complete),
        Some(_) => {}
    }
    if lines.len() < 5 {
        return Err(LedgerError::checkpoint(
            lines.len() + 1,
            format!("expected 5 lines, found {}", lines.len()),
        ));
    }

    let count = lines[0]
        .parse::<u64>()
        .map_err(|_| LedgerError::checkpoint(1, format!("bad count {:?}", lines[0])))?;
    let masks = lines[1].to_string();
    let (f, g) = lines[2]
        .split_once('/')
        .ok_or_else(|| LedgerError::checkpoint(3, "expected \"f / g\""))?;
    let f = parse_coeffs(f, 3)?;
    let g = parse_coeffs(g, 3)?;
    let lock_cursor = lines[3]
        .parse::<usize>()
        .map_err(|_| LedgerError::checkpoint(4, format!("bad lock cursor {:?}", lines[3])))?;
    let phase = lines[4]
        .parse::<bool>()
        .map(Phase::from_flag)
        .map_err(|_| LedgerError::checkpoint(5, format!("bad phase flag {:?}", lines[4])))?;

    Ok(CheckpointState::InProgress(CheckpointRecord {
        count,
        masks,
        f,
        g,
        lock_cursor,
        phase,
    }))
}
