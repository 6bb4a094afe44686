use super::SourceError;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads a path-or-url. An existing local path wins; anything else must
/// parse as a `file`, `http` or `https` url.
pub fn read_location(location: &str) -> Result<String, SourceError> {
    let path = Path::new(location);
    if path.exists() {
        return read_file(location, path);
    }

    let url = Url::parse(location).map_err(|err| SourceError::InvalidUrl {
        location: location.to_string(),
        reason: err.to_string(),
    })?;

    match url.scheme() {
        "file" => {
            let path = url.to_file_path().map_err(|()| SourceError::InvalidUrl {
                location: location.to_string(),
                reason: "file url does not name a local path".to_string(),
            })?;
            read_file(location, &path)
        }
        "http" | "https" => read_http(location, &url),
        other => Err(SourceError::UnsupportedScheme {
            location: location.to_string(),
            scheme: other.to_string(),
        }),
    }
}

fn read_file(location: &str, path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|err| SourceError::Fetch {
        location: location.to_string(),
        reason: err.to_string(),
    })
}

fn read_http(location: &str, url: &Url) -> Result<String, SourceError> {
    tracing::debug!(url = %url, "fetching remote source");
    let response = ureq::get(url.as_str())
        .timeout(HTTP_TIMEOUT)
        .set(
            "user-agent",
            concat!("choiceparam/", env!("CARGO_PKG_VERSION")),
        )
        .call()
        .map_err(|err| SourceError::Fetch {
            location: location.to_string(),
            reason: err.to_string(),
        })?;

    let status = response.status();
    if status != 200 {
        return Err(SourceError::Fetch {
            location: location.to_string(),
            reason: format!("unexpected status {status}"),
        });
    }

    response.into_string().map_err(|err| SourceError::Fetch {
        location: location.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn existing_path_is_read_directly() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("values.txt");
        fs::write(&path, "x=1\n").expect("write");
        let body = read_location(path.to_str().expect("utf8 path")).expect("read");
        assert_eq!(body, "x=1\n");
    }

    #[test]
    fn file_url_is_read() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("values.txt");
        fs::write(&path, "y=2\n").expect("write");
        let url = Url::from_file_path(&path).expect("file url");
        assert_eq!(read_location(url.as_str()).expect("read"), "y=2\n");
    }

    #[test]
    fn missing_path_that_is_not_a_url_is_invalid() {
        let err = read_location("/definitely/not/here.properties").expect_err("invalid");
        assert!(matches!(err, SourceError::InvalidUrl { .. }));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = read_location("ftp://example.com/values").expect_err("scheme");
        match err {
            SourceError::UnsupportedScheme { scheme, .. } => assert_eq!(scheme, "ftp"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
