//! File transfer to and from hosts, plus archive download and extraction
//!
//! Failures here are not caught: they propagate to the caller as
//! `Transfer`, `Download` or `Extract` errors.

use crate::constants::{DOWNLOAD_TIMEOUT_SECS, FALLBACK_ARCHIVE_NAME};
use crate::core::executor::execute;
use crate::core::session::Transport;
use crate::models::{Credential, ExecutionResult, Interface};
use crate::utils::{FleetError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zip::ZipArchive;

/// Escape spaces for use in a remote shell command line
pub fn sanitize_path(path: &str) -> String {
    path.replace(' ', "\\ ")
}

/// Copy a local file or directory onto the host
pub async fn push(
    transport: &dyn Transport,
    local: &Path,
    remote: &str,
    interface: &Interface,
    credential: &Credential,
) -> Result<()> {
    tracing::info!(
        "copying {} to {}:{}",
        local.display(),
        interface.address,
        remote
    );
    transport
        .copy_to_host(local, remote, interface, credential)
        .await
}

/// Copy a remote file or directory from the host
pub async fn pull(
    transport: &dyn Transport,
    remote: &str,
    local: &Path,
    interface: &Interface,
    credential: &Credential,
) -> Result<()> {
    tracing::info!(
        "copying {}:{} to {}",
        interface.address,
        remote,
        local.display()
    );
    transport
        .copy_from_host(remote, local, interface, credential)
        .await
}

/// `mkdir -p` on the host
pub async fn make_remote_dir(
    transport: &dyn Transport,
    dir: &str,
    interface: &Interface,
    credential: &Credential,
) -> Result<ExecutionResult> {
    let command = format!("mkdir -p {}", sanitize_path(dir));
    execute(transport, &[command], interface, credential, None, None).await
}

/// Last path segment of `url`, which names the downloaded archive
fn archive_file_name(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_ARCHIVE_NAME)
        .to_string()
}

/// Extract the zip archive at `archive` into `dest_dir`
pub fn unpack_archive(archive: &Path, dest_dir: &Path) -> Result<()> {
    let extract_error = |reason: String| FleetError::Extract {
        archive: archive.display().to_string(),
        reason,
    };

    let file = std::fs::File::open(archive).map_err(|e| extract_error(e.to_string()))?;
    let mut zip = ZipArchive::new(file).map_err(|e| extract_error(e.to_string()))?;
    zip.extract(dest_dir)
        .map_err(|e| extract_error(e.to_string()))?;

    tracing::debug!(
        "extracted {} entries from {} into {}",
        zip.len(),
        archive.display(),
        dest_dir.display()
    );
    Ok(())
}

async fn download(url: &str, target: &Path) -> Result<()> {
    let download_error = |reason: String| FleetError::Download {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .user_agent(format!("fleetprobe/{}", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()
        .map_err(|e| download_error(format!("http client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| download_error(e.to_string()))?;

    if !response.status().is_success() {
        return Err(download_error(format!("status {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_error(e.to_string()))?;

    tokio::fs::write(target, &bytes)
        .await
        .map_err(|e| download_error(format!("write {}: {e}", target.display())))?;

    tracing::debug!("downloaded {} bytes from {}", bytes.len(), url);
    Ok(())
}

/// Download the zip archive at `url`, extract it into `dest_dir` and delete
/// the downloaded file.
///
/// The archive is stored next to its contents as `<uuid>_<file name>` so
/// concurrent fetches never collide. It is removed whether or not
/// extraction succeeds.
pub async fn fetch_and_unpack(url: &str, dest_dir: &Path) -> Result<()> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FleetError::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    tokio::fs::create_dir_all(dest_dir).await?;

    let archive: PathBuf = dest_dir.join(format!(
        "{}_{}",
        uuid::Uuid::new_v4(),
        archive_file_name(&parsed)
    ));

    tracing::info!("fetching {} into {}", url, dest_dir.display());

    let outcome = match download(url, &archive).await {
        Ok(()) => {
            let archive = archive.clone();
            let dest = dest_dir.to_path_buf();
            tokio::task::spawn_blocking(move || unpack_archive(&archive, &dest))
                .await
                .map_err(|e| FleetError::Extract {
                    archive: url.to_string(),
                    reason: format!("extract task failed: {e}"),
                })
                .and_then(|result| result)
        }
        Err(e) => Err(e),
    };

    if let Err(e) = tokio::fs::remove_file(&archive).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("couldn't remove {}: {}", archive.display(), e);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock_transport::MockTransport;
    use crate::models::Username;
    use crate::utils::{ErrorKind, TransferDirection};
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn cred() -> Credential {
        Credential::new(Username::new("pi").unwrap(), "/keys/pi")
    }

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, contents) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_sanitize_path_escapes_spaces() {
        assert_eq!(sanitize_path("/home/pi/my ws/src"), "/home/pi/my\\ ws/src");
        assert_eq!(sanitize_path("/opt/plain"), "/opt/plain");
    }

    #[test]
    fn test_archive_file_name() {
        let url = reqwest::Url::parse("https://example.com/libs/ros-lib.zip?x=1").unwrap();
        assert_eq!(archive_file_name(&url), "ros-lib.zip");

        let url = reqwest::Url::parse("https://example.com/").unwrap();
        assert_eq!(archive_file_name(&url), FALLBACK_ARCHIVE_NAME);
    }

    #[test]
    fn test_unpack_archive() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("lib.zip");
        write_zip(
            &archive,
            &[("lib/CMakeLists.txt", "project(lib)\n"), ("lib/README", "hi")],
        );

        let dest = dir.path().join("out");
        unpack_archive(&archive, &dest).unwrap();

        assert_eq!(
            std::fs::read_to_string(dest.join("lib/CMakeLists.txt")).unwrap(),
            "project(lib)\n"
        );
        assert!(dest.join("lib/README").exists());
    }

    #[test]
    fn test_unpack_rejects_non_zip() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        std::fs::write(&archive, b"definitely not a zip").unwrap();

        let err = unpack_archive(&archive, dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extract);
        assert!(err.to_string().contains("broken.zip"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_url() {
        let dir = tempdir().unwrap();
        let err = fetch_and_unpack("not a url", dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Download);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        // nothing listens on port 1
        let err = fetch_and_unpack("http://127.0.0.1:1/lib.zip", dir.path())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Download);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_push_and_pull_go_through_transport() {
        let transport = MockTransport::new().accept("10.0.0.2", "pi");
        let intf = Interface::new("10.0.0.2");

        push(&transport, Path::new("/tmp/bundle"), "/home/pi/bundle", &intf, &cred())
            .await
            .unwrap();
        pull(&transport, "/home/pi/logs dir", Path::new("/tmp/logs"), &intf, &cred())
            .await
            .unwrap();

        let copies = transport.copies();
        assert_eq!(copies.len(), 2);
        assert_eq!(copies[0].direction, TransferDirection::ToHost);
        assert_eq!(copies[0].remote, "/home/pi/bundle");
        assert_eq!(copies[1].direction, TransferDirection::FromHost);
        assert_eq!(copies[1].local, PathBuf::from("/tmp/logs"));
    }

    #[tokio::test]
    async fn test_push_failure_is_transfer_error() {
        let transport = MockTransport::new();
        let err = push(
            &transport,
            Path::new("/tmp/bundle"),
            "/home/pi/bundle",
            &Interface::new("10.0.0.2"),
            &cred(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert!(err.to_string().starts_with("copy to 10.0.0.2 failed"));
    }

    #[tokio::test]
    async fn test_make_remote_dir_sanitizes() {
        let transport = MockTransport::new().accept("10.0.0.2", "pi");
        make_remote_dir(&transport, "/home/pi/my ws", &Interface::new("10.0.0.2"), &cred())
            .await
            .unwrap();

        assert_eq!(
            transport.executed()[0].batch,
            "mkdir -p /home/pi/my\\ ws\nexit\n"
        );
    }
}
