use std::path::PathBuf;

use miette::{Context, IntoDiagnostic, Result};

pub const DATA_DIR_ENV: &str = "WALLTEXT_DATA_DIR";

/// Wall text data directory
/// We will read a path from env `WALLTEXT_DATA_DIR` or use data_local_dir/walltext, where data_local_dir is platform specific.
/// Configuration, the sqlite file, the legacy `maps` folder and the logs live inside it.
pub fn get_walltext_path() -> Result<PathBuf> {
    let path = if let Ok(env_dir) = std::env::var(DATA_DIR_ENV) {
        PathBuf::from(env_dir)
    } else if let Some(project_dir) =
        directories_next::ProjectDirs::from("com.walltext", "", "walltext")
    {
        project_dir.data_local_dir().to_path_buf()
    } else {
        return Err(miette::miette!(
            "getting project path failed for some reason"
        ));
    };
    std::fs::create_dir_all(&path)
        .into_diagnostic()
        .wrap_err(path.display().to_string())
        .wrap_err("failed to create walltext data directory")?;
    Ok(path)
}
