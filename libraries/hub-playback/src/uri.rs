//! URI admission checks
//!
//! A client-supplied URI is admitted only if it parses, uses an allowed
//! scheme and, for local files, names something that exists.

use crate::error::{Result, TrackListError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Admission configuration
///
/// Loaded from the `[admission]` section of the broker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Require local files to exist (default: true)
    #[serde(default = "default_check_local_files")]
    pub check_local_files: bool,

    /// Accepted URI schemes (default: file, http, https)
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: Vec<String>,
}

fn default_check_local_files() -> bool {
    true
}

fn default_allowed_schemes() -> Vec<String> {
    vec!["file".to_string(), "http".to_string(), "https".to_string()]
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            check_local_files: default_check_local_files(),
            allowed_schemes: default_allowed_schemes(),
        }
    }
}

impl AdmissionConfig {
    /// Run the syntactic and scheme checks, then the file existence check
    ///
    /// # Errors
    /// `InvalidUri` naming the failed check
    pub fn check(&self, uri: &str) -> Result<UriCheck> {
        let check = UriCheck::parse(uri)?;

        if !self
            .allowed_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(check.scheme()))
        {
            return Err(TrackListError::invalid_uri(
                uri,
                format!("scheme '{}' is not allowed", check.scheme()),
            ));
        }

        if self.check_local_files && check.is_local_file() && !check.file_exists() {
            return Err(TrackListError::invalid_uri(uri, "file not found"));
        }

        Ok(check)
    }
}

/// A parsed client URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriCheck {
    scheme: String,
    local_path: Option<PathBuf>,
}

impl UriCheck {
    /// Parse a URI or an absolute filesystem path
    ///
    /// # Errors
    /// `InvalidUri` for empty input, relative paths and malformed URIs
    pub fn parse(uri: &str) -> Result<Self> {
        if uri.trim().is_empty() {
            return Err(TrackListError::invalid_uri(uri, "empty URI"));
        }

        match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| TrackListError::invalid_uri(uri, "not a local path"))?;
                Ok(Self {
                    scheme: "file".to_string(),
                    local_path: Some(path),
                })
            }
            Ok(url) => Ok(Self {
                scheme: url.scheme().to_ascii_lowercase(),
                local_path: None,
            }),
            Err(url::ParseError::RelativeUrlWithoutBase) if Path::new(uri).is_absolute() => {
                Ok(Self {
                    scheme: "file".to_string(),
                    local_path: Some(PathBuf::from(uri)),
                })
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Err(TrackListError::invalid_uri(uri, "relative paths are not accepted"))
            }
            Err(e) => Err(TrackListError::invalid_uri(uri, e.to_string())),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn is_local_file(&self) -> bool {
        self.local_path.is_some()
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn file_exists(&self) -> bool {
        self.local_path.as_deref().is_some_and(Path::exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_core::ErrorKind;
    use std::io::Write;

    #[test]
    fn parses_file_urls_and_bare_paths() {
        let check = UriCheck::parse("file:///music/a.ogg").unwrap();
        assert!(check.is_local_file());
        assert_eq!(check.local_path(), Some(Path::new("/music/a.ogg")));

        let bare = UriCheck::parse("/music/b.ogg").unwrap();
        assert_eq!(bare.scheme(), "file");
        assert!(bare.is_local_file());
    }

    #[test]
    fn remote_urls_are_not_local() {
        let check = UriCheck::parse("https://example.com/stream.mp3").unwrap();
        assert_eq!(check.scheme(), "https");
        assert!(!check.is_local_file());
        assert!(!check.file_exists());
    }

    #[test]
    fn rejects_relative_and_empty() {
        assert!(UriCheck::parse("music/a.ogg").is_err());
        assert!(UriCheck::parse("  ").is_err());
    }

    #[test]
    fn missing_local_file_is_invalid_uri() {
        let config = AdmissionConfig::default();
        let err = config.check("file:///definitely/not/here.ogg").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUri);
    }

    #[test]
    fn existing_local_file_is_admitted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not really audio").unwrap();

        let config = AdmissionConfig::default();
        let path = file.path().to_str().unwrap();
        assert!(config.check(path).is_ok());
        assert!(config.check(&format!("file://{path}")).is_ok());
    }

    #[test]
    fn existence_check_can_be_disabled() {
        let config = AdmissionConfig {
            check_local_files: false,
            ..AdmissionConfig::default()
        };
        assert!(config.check("/not/here.ogg").is_ok());
    }

    #[test]
    fn disallowed_scheme_is_invalid_uri() {
        let config = AdmissionConfig::default();
        let err = config.check("rtsp://camera.local/feed").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUri);
    }
}
