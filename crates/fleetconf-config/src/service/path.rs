//! Storage path planning

use std::path::Path;

/// Paths a config file occupies under every deployment root, in root order,
/// plus the same paths joined with `;`. The first path is canonical.
pub fn resolve_paths(dirs: &[String], app_name: &str, file_name: &str) -> (Vec<String>, String) {
    let paths: Vec<String> = dirs
        .iter()
        .map(|dir| {
            Path::new(dir)
                .join(app_name)
                .join("config")
                .join(file_name)
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    let joined = paths.join(";");

    (paths, joined)
}
