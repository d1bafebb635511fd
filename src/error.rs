use crate::transfer::helpers::display_path;

/// Errors raised while assembling a single archive. Always scoped to one group.
#[derive(Debug, Clone)]
pub enum ArchiveError {
    /// Reading a source file failed (path, io error).
    ReadFailed(std::path::PathBuf, String),
    /// Writing or compressing one entry failed (entry path, error).
    CompressFailed(String, String),
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveError::ReadFailed(p, msg) => {
                write!(f, "failed to read {}: {}", display_path(p), msg)
            }
            ArchiveError::CompressFailed(entry, msg) => {
                write!(f, "failed to compress entry '{}': {}", entry, msg)
            }
        }
    }
}

impl std::error::Error for ArchiveError {}

/// Push-level errors. Pre-flight variants surface to the caller; the per-group
/// variants are only ever recorded as outcomes and written to the failure log.
#[derive(Debug, Clone)]
pub enum UploadError {
    SelectionEmpty(String),
    SourceNotDir(String),
    SourceUnreadable(String, String),
    MissingEndpoint,
    MissingCsrfToken(String),
    ClientBuildFailed(String),
    // per-group
    ArchiveBuildFailed(String, String),
    TransportFailed(String, String),
    NetworkFault(String),
    // user / generic
    Cancelled,
    OperationFailed(String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use UploadError::*;
        match self {
            SelectionEmpty(root) => write!(
                f,
                "no eligible video files found in '{}' (accepted: {})",
                root,
                crate::transfer::MEDIA_EXTENSIONS.join(", ")
            ),
            SourceNotDir(p) => write!(f, "source must be an existing directory: {}", p),
            SourceUnreadable(p, msg) => write!(f, "cannot read source folder {}: {}", p, msg),
            MissingEndpoint => write!(
                f,
                "no upload endpoint configured; pass --endpoint, --form or run `rp set --endpoint`"
            ),
            MissingCsrfToken(cookie_name) => write!(
                f,
                "no anti-forgery token found (cookie '{}', --csrf-token or --form)",
                cookie_name
            ),
            ClientBuildFailed(msg) => write!(f, "failed to build http client: {}", msg),
            ArchiveBuildFailed(group, msg) => {
                write!(f, "archive for '{}' could not be built: {}", group, msg)
            }
            TransportFailed(group, msg) => write!(f, "upload of '{}' failed: {}", group, msg),
            NetworkFault(msg) => write!(f, "network error: {}", msg),
            Cancelled => write!(f, "upload cancelled"),
            OperationFailed(s) => write!(f, "operation failed: {}", s),
        }
    }
}

impl std::error::Error for UploadError {}

impl UploadError {
    /// Only transport-level faults (no HTTP response at all) are worth another
    /// attempt; anything the server answered is final.
    pub fn is_retriable(&self) -> bool {
        matches!(self, UploadError::NetworkFault(_))
    }

    /// Variant tag used in the structured failure log.
    pub fn variant(&self) -> &'static str {
        use UploadError::*;
        match self {
            SelectionEmpty(_) => "SelectionEmpty",
            SourceNotDir(_) => "SourceNotDir",
            SourceUnreadable(_, _) => "SourceUnreadable",
            MissingEndpoint => "MissingEndpoint",
            MissingCsrfToken(_) => "MissingCsrfToken",
            ClientBuildFailed(_) => "ClientBuildFailed",
            ArchiveBuildFailed(_, _) => "ArchiveBuildFailed",
            TransportFailed(_, _) => "TransportFailed",
            NetworkFault(_) => "NetworkFault",
            Cancelled => "Cancelled",
            OperationFailed(_) => "OperationFailed",
        }
    }
}
