//! Locates and parses the deployment descriptor in a workspace

use std::io;

use marathon_api::App;
use tracing::debug;

use crate::errors::DeployError;
use crate::filesys::dir::Dir;

/// Descriptor filename used when the step does not name one
pub const DEFAULT_FILENAME: &str = "marathon.json";

/// Read the descriptor `filename` (or [`DEFAULT_FILENAME`]) from `workspace`
pub async fn read_descriptor(workspace: &Dir, filename: Option<&str>) -> Result<App, DeployError> {
    let name = filename
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FILENAME);
    let file = workspace.file(name);
    let path = file.path().display().to_string();

    match file.metadata().await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(DeployError::FileInvalid(format!("'{}' is not a file", path))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DeployError::FileMissing(format!("'{}' does not exist", path)));
        }
        Err(e) => {
            return Err(DeployError::FileInvalid(format!("unable to access '{}': {}", path, e)));
        }
    }

    let contents = file
        .read_string()
        .await
        .map_err(|e| DeployError::FileInvalid(format!("unable to read '{}': {}", path, e)))?;

    let app = App::from_json(&contents).map_err(|e| {
        DeployError::FileInvalid(format!("'{}' is not a valid app definition: {}", path, e))
    })?;

    debug!("Read descriptor {} for app '{}'", path, app.id);
    Ok(app)
}
