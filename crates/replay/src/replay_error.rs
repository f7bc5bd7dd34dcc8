// ---------------------------------------------------------------------------
// ReplayError: failures of the cache, codec and playback validation
// ---------------------------------------------------------------------------

use std::fmt;

/// Errors produced while persisting, decoding or binding a replay session.
///
/// None of these cross the `ReplayWorldExt` boundary: operations log them and
/// return `false`/`None` instead.
#[derive(Debug)]
pub enum ReplayError {
    /// I/O error while reading, writing or deleting the cache file.
    Io(std::io::Error),
    /// No cache file exists.
    NoCache,
    /// The first four bytes are not the replay magic.
    BadMagic { found: [u8; 4] },
    /// The file was written by a different format version.
    VersionMismatch { expected: u32, found: u32 },
    /// The buffer ended before `context` could be read.
    Truncated { context: &'static str },
    /// An identifier entry is not valid UTF-8.
    InvalidUtf8 { index: usize },
    /// Structurally inconsistent contents (array lengths, counts, step).
    Malformed(String),
    /// A decoded session is not playable (e.g. zero tracks or frames).
    InvalidSession(String),
}

impl ReplayError {
    /// Whether this error means the cache file is unusable and should be
    /// treated exactly like a missing cache.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            ReplayError::BadMagic { .. }
                | ReplayError::VersionMismatch { .. }
                | ReplayError::Truncated { .. }
                | ReplayError::InvalidUtf8 { .. }
                | ReplayError::Malformed(_)
        )
    }
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Io(e) => write!(f, "I/O error: {e}"),
            ReplayError::NoCache => write!(f, "No replay cache available"),
            ReplayError::BadMagic { found } => {
                write!(f, "Corrupt replay cache: bad magic bytes {found:02X?}")
            }
            ReplayError::VersionMismatch { expected, found } => write!(
                f,
                "Corrupt replay cache: format version {found}, this build reads version {expected}"
            ),
            ReplayError::Truncated { context } => {
                write!(f, "Corrupt replay cache: truncated while reading {context}")
            }
            ReplayError::InvalidUtf8 { index } => {
                write!(f, "Corrupt replay cache: identifier {index} is not valid UTF-8")
            }
            ReplayError::Malformed(msg) => write!(f, "Corrupt replay cache: {msg}"),
            ReplayError::InvalidSession(msg) => write!(f, "Invalid replay session: {msg}"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplayError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ReplayError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            ReplayError::NoCache
        } else {
            ReplayError::Io(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_version_mismatch() {
        let err = ReplayError::VersionMismatch {
            expected: 1,
            found: 7,
        };
        let msg = format!("{err}");
        assert!(msg.contains("version 7"), "got: {msg}");
        assert!(msg.contains("version 1"), "got: {msg}");
    }

    #[test]
    fn not_found_maps_to_no_cache() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ReplayError = io_err.into();
        assert!(matches!(err, ReplayError::NoCache));
        assert!(!err.is_corrupt());
    }

    #[test]
    fn other_io_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ReplayError = io_err.into();
        assert!(matches!(err, ReplayError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn corruption_classification() {
        assert!(ReplayError::BadMagic { found: [0; 4] }.is_corrupt());
        assert!(ReplayError::Truncated { context: "times" }.is_corrupt());
        assert!(ReplayError::Malformed("x".into()).is_corrupt());
        assert!(!ReplayError::InvalidSession("x".into()).is_corrupt());
    }
}
