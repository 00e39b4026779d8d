//! Line-oriented diagnostics protocol shared by the discovery process and its caller.
//!
//! Every line has the form `[<Flag>] <message>`. The producer side writes lines with
//! [`Diagnostics`]; the consumer side folds captured output into a [`DiagnosticReport`]
//! that keeps the last message seen per flag.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, warn};

/// Classification flag carried by a diagnostics line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    Debug,
    Info,
    FileCount,
    ValidPath,
    InvalidPathError,
    MaxFileError,
    ZeroFileError,
    NoTargetFiles,
    MetadataError,
    ImageFileNotFoundError,
    WriteDataError,
    DataPath,
    SubprocessError,
    /// Flag not known to this version; kept verbatim.
    Other(String),
}

impl Flag {
    pub fn as_str(&self) -> &str {
        match self {
            Flag::Debug => "DEBUG",
            Flag::Info => "INFO",
            Flag::FileCount => "FileCount",
            Flag::ValidPath => "ValidPath",
            Flag::InvalidPathError => "InvalidPathError",
            Flag::MaxFileError => "MaxFileError",
            Flag::ZeroFileError => "ZeroFileError",
            Flag::NoTargetFiles => "NoTargetFiles",
            Flag::MetadataError => "MetadataError",
            Flag::ImageFileNotFoundError => "ImageFileNotFoundError",
            Flag::WriteDataError => "WriteDataError",
            Flag::DataPath => "DataPath",
            Flag::SubprocessError => "SubprocessError",
            Flag::Other(s) => s,
        }
    }

    /// Informational flags never enter a [`DiagnosticReport`].
    pub fn is_informational(&self) -> bool {
        matches!(self, Flag::Debug | Flag::Info)
    }

    /// Flags that end a run as failed when seen by the caller.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Flag::InvalidPathError
                | Flag::NoTargetFiles
                | Flag::MaxFileError
                | Flag::ZeroFileError
                | Flag::MetadataError
        )
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(());
        }
        Ok(match s {
            "DEBUG" => Flag::Debug,
            "INFO" => Flag::Info,
            "FileCount" => Flag::FileCount,
            "ValidPath" => Flag::ValidPath,
            "InvalidPathError" => Flag::InvalidPathError,
            "MaxFileError" => Flag::MaxFileError,
            "ZeroFileError" => Flag::ZeroFileError,
            "NoTargetFiles" => Flag::NoTargetFiles,
            "MetadataError" => Flag::MetadataError,
            "ImageFileNotFoundError" => Flag::ImageFileNotFoundError,
            "WriteDataError" => Flag::WriteDataError,
            "DataPath" => Flag::DataPath,
            "SubprocessError" => Flag::SubprocessError,
            other => Flag::Other(other.to_string()),
        })
    }
}

/// One protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticLine {
    pub flag: Flag,
    pub message: String,
}

impl DiagnosticLine {
    pub fn new(flag: Flag, message: impl Into<String>) -> Self {
        Self {
            flag,
            message: message.into(),
        }
    }

    /// Parses `[<Flag>] <message>`. Returns `None` for lines outside the protocol.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim_end_matches(['\r', '\n']).strip_prefix('[')?;
        let (flag, message) = rest.split_once(']')?;
        let flag = flag.parse().ok()?;
        // `[DataPath] ` with nothing after it is a valid line with an empty message.
        Some(Self::new(flag, message.strip_prefix(' ').unwrap_or(message)))
    }
}

impl fmt::Display for DiagnosticLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.flag, self.message)
    }
}

/// Producer side: writes protocol lines to a sink and mirrors them into `tracing`.
pub struct Diagnostics<W: Write> {
    sink: W,
    emitted: Vec<DiagnosticLine>,
}

impl<W: Write> Diagnostics<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            emitted: Vec::new(),
        }
    }

    pub fn emit(&mut self, flag: Flag, message: impl Into<String>) {
        let line = DiagnosticLine::new(flag, message);
        debug!(flag = %line.flag, message = %line.message, "diagnostic");
        // Protocol output is best-effort; a closed pipe must not abort the scan.
        if let Err(e) = writeln!(self.sink, "{line}").and_then(|_| self.sink.flush()) {
            warn!(error = %e, "failed to write diagnostic line");
        }
        self.emitted.push(line);
    }

    /// Lines emitted so far, in order.
    pub fn lines(&self) -> &[DiagnosticLine] {
        &self.emitted
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Consumer side: last message per flag, informational flags filtered out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    entries: BTreeMap<Flag, String>,
}

impl DiagnosticReport {
    pub fn parse(output: &str) -> Self {
        let mut entries = BTreeMap::new();
        for raw in output.trim().lines() {
            let Some(line) = DiagnosticLine::parse(raw) else {
                debug!(line = raw, "ignoring non-protocol output");
                continue;
            };
            if line.flag.is_informational() {
                continue;
            }
            entries.insert(line.flag, line.message);
        }
        Self { entries }
    }

    pub fn get(&self, flag: &Flag) -> Option<&str> {
        self.entries.get(flag).map(String::as_str)
    }

    pub fn contains(&self, flag: &Flag) -> bool {
        self.entries.contains_key(flag)
    }

    /// First terminal flag present (in flag order) with its message.
    pub fn terminal_failure(&self) -> Option<(&Flag, &str)> {
        self.entries
            .iter()
            .find(|(flag, _)| flag.is_terminal())
            .map(|(flag, msg)| (flag, msg.as_str()))
    }

    pub fn data_path(&self) -> Option<PathBuf> {
        self.get(&Flag::DataPath)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    pub fn file_count(&self) -> Option<usize> {
        self.get(&Flag::FileCount)
            .and_then(|m| m.trim().parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Flag, &str)> {
        self.entries.iter().map(|(f, m)| (f, m.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
