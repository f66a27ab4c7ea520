pub(crate) mod json;
pub(crate) mod sql;

use walltext_core::{Result, WallTextError};

/// Map names end up in file names and sql parameters. Refuse anything that could walk out of the
/// maps directory.
pub(crate) fn check_map_name(map_name: &str) -> Result<()> {
    if map_name.is_empty()
        || map_name.contains(['/', '\\'])
        || map_name == "."
        || map_name == ".."
    {
        return Err(WallTextError::Storage(format!(
            "invalid map name {map_name:?}"
        )));
    }
    Ok(())
}
