use std::path::Path;

use super::{Project, Vault, PROJECTS_DIR};
use crate::error::CollaboratorError;

impl Vault {
    /// Every project folder, sorted by name.
    ///
    /// Returns an empty list when the vault has no projects directory.
    pub fn scan_projects(&self) -> Result<Vec<Project>, CollaboratorError> {
        let projects_dir = self.root().join(PROJECTS_DIR);
        if !projects_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&projects_dir)
            .map_err(|e| CollaboratorError::vault_io(&projects_dir, e))?;

        let mut projects = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CollaboratorError::vault_io(&projects_dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let folder = format!("{PROJECTS_DIR}/{name}");
            let readme_path = match find_readme(&path, &name) {
                Some(file) => format!("{folder}/{file}"),
                None => format!("{folder}/"),
            };
            projects.push(Project {
                display_name: name.clone(),
                name,
                path: folder,
                readme_path,
            });
        }

        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }
}

/// `{short}.README.md` where `short` follows the last `-` of the folder
/// name, else the first `*.README.md` in the folder.
fn find_readme(dir: &Path, folder_name: &str) -> Option<String> {
    let short = folder_name.rsplit('-').next().unwrap_or(folder_name);
    let preferred = format!("{short}.README.md");
    if dir.join(&preferred).is_file() {
        return Some(preferred);
    }

    let mut candidates: Vec<String> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|f| f.file_name().to_string_lossy().into_owned())
        .filter(|f| f.ends_with(".README.md"))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}
