// src/github/location.rs
// =============================================================================
// Turns a GitHub web URL pointing at a folder into its three components.
//
//   https://github.com/<owner>/<repo>/tree/<branch>/<subfolder...>
//     -> repository = "<owner>/<repo>"
//     -> branch     = "<branch>"
//     -> subfolder  = "<subfolder...>" (may be empty)
//
// Segments are percent-decoded ("my%20docs" -> "my docs") because tree
// listing paths are plain text.
//
// The host and the literal "tree" segment are not checked, so mirrors and
// copy-pasted "blob" URLs decompose the same way.
// =============================================================================

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum UrlError {
    #[error("error parsing URL '{input}'")]
    Invalid {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL segment '{segment}' is not valid UTF-8 once decoded")]
    Encoding {
        segment: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("invalid GitHub URL format '{0}': expected https://github.com/<owner>/<repo>/tree/<branch>/<subfolder>")]
    TooShort(String),
}

/// Where a subfolder lives inside a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    pub repository: String,
    pub branch: String,
    pub subfolder: String,
}

// Parses a GitHub tree URL
//
// Example:
//   "https://github.com/kubernetes/kubernetes/tree/master/staging/src/k8s.io/api"
//   -> ("kubernetes/kubernetes", "master", "staging/src/k8s.io/api")
pub fn parse_tree_url(input: &str) -> Result<RepoLocation, UrlError> {
    let parsed = Url::parse(input).map_err(|source| UrlError::Invalid {
        input: input.to_string(),
        source,
    })?;

    // url keeps the path percent-encoded; decode each segment on its own
    let parts = parsed
        .path()
        .trim_matches('/')
        .split('/')
        .map(decode_segment)
        .collect::<Result<Vec<String>, UrlError>>()?;

    // parts[2] is "tree"
    if parts.len() < 4 {
        return Err(UrlError::TooShort(input.to_string()));
    }

    Ok(RepoLocation {
        repository: format!("{}/{}", parts[0], parts[1]),
        branch: parts[3].clone(),
        subfolder: parts[4..].join("/"),
    })
}

fn decode_segment(segment: &str) -> Result<String, UrlError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|source| UrlError::Encoding {
            segment: segment.to_string(),
            source,
        })
}
