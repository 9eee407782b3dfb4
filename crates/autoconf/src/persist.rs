//! On-disk copy of the last auto-config response.

use std::io::Write;
use std::path::{Path, PathBuf};

use autoconf_core::{AutoConfigError, AutoConfigResponse, Result, AUTO_CONFIG_SOURCE_NAME};

/// Location of the persisted response inside `data_dir`
pub(crate) fn response_path(data_dir: &Path) -> PathBuf {
    data_dir.join(AUTO_CONFIG_SOURCE_NAME)
}

/// Write `resp` as JSON, readable only by the owner.
///
/// The content goes to a temporary file in `data_dir` which is then renamed
/// over the previous response, so readers never see a partial write.
pub(crate) fn write_response(data_dir: &Path, resp: &AutoConfigResponse) -> Result<()> {
    let content = serde_json::to_vec(resp)?;
    let path = response_path(data_dir);
    let persistence =
        |e: std::io::Error| AutoConfigError::Persistence(format!("{}: {e}", path.display()));

    let mut tmp = tempfile::NamedTempFile::new_in(data_dir).map_err(persistence)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(persistence)?;
    }
    tmp.write_all(&content)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(persistence)?;
    tmp.persist(&path).map_err(|e| persistence(e.error))?;
    Ok(())
}

/// Read a previously persisted response. A missing file is not an error.
pub(crate) fn read_response(data_dir: &Path) -> Result<Option<AutoConfigResponse>> {
    let content = match std::fs::read(response_path(data_dir)) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(serde_json::from_slice(&content)?))
}
