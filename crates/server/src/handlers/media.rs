use std::path::{Path, PathBuf};

use salvo::prelude::*;
use tokio::fs;

use crate::error::ApiError;
use crate::state::AppState;

/// Resolves `requested` below `root`. Paths that do not exist, are not regular files
/// or escape the root through `..` or symlinks resolve to nothing.
async fn resolve(root: &Path, requested: &str) -> Option<PathBuf> {
    let root = fs::canonicalize(root).await.ok()?;
    let path = fs::canonicalize(root.join(requested)).await.ok()?;
    if !path.starts_with(&root) {
        return None;
    }
    fs::metadata(&path)
        .await
        .ok()
        .filter(|meta| meta.is_file())
        .map(|_| path)
}

#[handler]
pub(crate) async fn serve(req: &mut Request, depot: &mut Depot, res: &mut Response) -> Result<(), ApiError> {
    let state = AppState::from_depot(depot)?;
    let requested = req.param::<String>("path").unwrap_or_default();
    let root = &state.config.media_root;
    match resolve(root, &requested).await {
        Some(path) => {
            res.send_file(path, req.headers()).await;
            Ok(())
        }
        None => {
            tracing::warn!(root = %root.display(), path = %requested, "media file not found");
            Err(ApiError::not_found())
        }
    }
}
