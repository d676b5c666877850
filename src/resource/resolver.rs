use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use url::Url;

use crate::config::Config;
use crate::http::error::HttpError;
use crate::http::header;
use crate::http::mime;
use crate::http::request::Request;
use crate::resource::conditional;

/// Snapshot of a resource taken while resolving one request.
///
/// Never cached: every request reads the file metadata again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// `If-Match` passed (true when the header is absent)
    pub valid: bool,
    /// `If-None-Match` / `If-Modified-Since` say the client copy is stale
    /// (true when neither header is present)
    pub modified: bool,
    pub content_type: String,
    /// RFC 1123 formatted modification time
    pub last_modified: String,
    pub path: PathBuf,
}

/// Maps request paths onto files below the document root.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    document_root: PathBuf,
    root_resource: String,
}

impl ResourceResolver {
    pub fn new(document_root: impl Into<PathBuf>, root_resource: impl Into<String>) -> Self {
        Self {
            document_root: document_root.into(),
            root_resource: root_resource.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.document_root(), config.root_resource.clone())
    }

    /// Resolves the request to a file and evaluates its conditional headers.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the path is missing, a directory, or outside the root
    /// * `BadRequest` if the target cannot be parsed or a date is malformed
    /// * `InternalServerError` if the file metadata or contents cannot be read
    pub fn resolve(&self, request: &Request) -> Result<FileInfo, HttpError> {
        let requested = if request.path == "/" {
            self.root_resource.as_str()
        } else {
            request.path.as_str()
        };

        let not_found = || HttpError::NotFound(format!("Resource {requested} can not be found"));

        let path = self.file_path(requested)?.ok_or_else(not_found)?;
        if !path.exists() || path.is_dir() {
            return Err(not_found());
        }

        let metadata = fs::metadata(&path).map_err(|e| internal_error(&path, e))?;
        let last_modified: DateTime<Utc> = metadata
            .modified()
            .map_err(|e| internal_error(&path, e))?
            .into();

        let if_match = request.header(header::IF_MATCH);
        let if_none_match = request.header(header::IF_NONE_MATCH);

        let etag = if if_match.is_some() || if_none_match.is_some() {
            let contents = fs::read(&path).map_err(|e| internal_error(&path, e))?;
            conditional::compute_etag(&contents)
        } else {
            String::new()
        };

        let valid = if_match.is_none_or(|criteria| conditional::if_match(criteria, &etag));

        // If-None-Match wins; If-Modified-Since is then not even parsed
        let modified = match (if_none_match, request.header(header::IF_MODIFIED_SINCE)) {
            (Some(criteria), _) => conditional::if_none_match(criteria, &etag),
            (None, Some(since)) => conditional::if_modified_since(since, last_modified)
                .map_err(|e| HttpError::BadRequest(format!("Invalid If-Modified-Since date {since:?}: {e}")))?,
            (None, None) => true,
        };

        Ok(FileInfo {
            valid,
            modified,
            content_type: mime::content_type(&path).to_string(),
            last_modified: conditional::format_http_date(last_modified),
            path,
        })
    }

    /// Joins the request target onto the document root.
    ///
    /// The target is normalised as a URL (dot segments, absolute-form) and
    /// percent-decoded. Returns `None` if the decoded path would step out of
    /// the root.
    fn file_path(&self, target: &str) -> Result<Option<PathBuf>, HttpError> {
        let base = Url::parse("http://localhost/")
            .map_err(|e| HttpError::BadRequest(format!("Invalid request target {target:?}: {e}")))?;
        let url = base
            .join(target)
            .map_err(|e| HttpError::BadRequest(format!("Invalid request target {target:?}: {e}")))?;
        let decoded = urlencoding::decode(url.path())
            .map_err(|e| HttpError::BadRequest(format!("Invalid request target {target:?}: {e}")))?;

        let mut path = self.document_root.clone();
        for component in Path::new(decoded.as_ref()).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => return Ok(None),
            }
        }

        Ok(Some(path))
    }
}

fn internal_error(path: &Path, err: io::Error) -> HttpError {
    tracing::error!(path = %path.display(), error = %err, "Unable to read requested file");
    HttpError::InternalServerError(err)
}
