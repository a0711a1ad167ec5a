use regex::Regex;
use walkdir::WalkDir;

use super::{Vault, VaultTask, AREAS_DIR, PERIODIC_DIR, PROJECTS_DIR};
use crate::error::CollaboratorError;

/// Unchecked (`[ ]`) or in-progress (`[/]`) list items.
const TASK_PATTERN: &str = r"^\s*[-*]\s+\[([ /])\]\s+(.+)$";
/// `#area/project`
const TAG_PATTERN: &str = r"#([^/\s]+/[^\s]+)";

impl Vault {
    /// Open tasks from the project, periodic-note and area folders.
    ///
    /// Files under any `Templates` folder are skipped, as are unreadable
    /// files. Results are in walk order, which is stable for one vault.
    pub fn scan_tasks(&self) -> Result<Vec<VaultTask>, CollaboratorError> {
        let task_re = Regex::new(TASK_PATTERN)?;
        let tag_re = Regex::new(TAG_PATTERN)?;

        let mut tasks = Vec::new();
        for dir in [PROJECTS_DIR, PERIODIC_DIR, AREAS_DIR] {
            let scan_dir = self.root().join(dir);
            if !scan_dir.is_dir() {
                continue;
            }

            let notes = WalkDir::new(&scan_dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
                .filter(|e| !e.path().to_string_lossy().contains("Templates"));

            for note in notes {
                let Ok(content) = std::fs::read_to_string(note.path()) else {
                    continue;
                };
                let file_path = self.relative(note.path());

                for (idx, line) in content.lines().enumerate() {
                    let Some(caps) = task_re.captures(line) else {
                        continue;
                    };
                    let text = caps[2].to_string();
                    let project_tag = tag_re.captures(&text).map(|c| c[1].to_string());
                    let project_name = project_tag
                        .as_deref()
                        .and_then(|tag| tag.rsplit('/').next())
                        .map(str::to_string);

                    tasks.push(VaultTask {
                        text,
                        file_path: file_path.clone(),
                        line_number: idx + 1,
                        project_tag,
                        project_name,
                    });
                }
            }
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use crate::vault::fixture;

    #[test]
    fn finds_open_tasks_with_tags() {
        let dir = tempfile::tempdir().unwrap();
        let vault = fixture::vault(dir.path());
        fixture::write(
            dir.path(),
            "1. 项目/Alpha/todo.md",
            "# Todo\n- [ ] write intro #研究/Alpha\n- [x] done already\n  * [/] half way\n",
        );
        fixture::write(dir.path(), "2. 领域/health.md", "- [ ] stretch");
        fixture::write(dir.path(), "0. 周期笔记/Templates/daily.md", "- [ ] template task");
        fixture::write(dir.path(), "3. 资源/other.md", "- [ ] outside scan dirs");
        fixture::write(dir.path(), "1. 项目/Alpha/data.txt", "- [ ] not markdown");

        let tasks = vault.scan_tasks().unwrap();
        assert_eq!(tasks.len(), 3);

        assert_eq!(tasks[0].text, "write intro #研究/Alpha");
        assert_eq!(tasks[0].file_path, "1. 项目/Alpha/todo.md");
        assert_eq!(tasks[0].line_number, 2);
        assert_eq!(tasks[0].project_tag.as_deref(), Some("研究/Alpha"));
        assert_eq!(tasks[0].project_name.as_deref(), Some("Alpha"));

        assert_eq!(tasks[1].text, "half way");
        assert_eq!(tasks[1].line_number, 4);
        assert!(tasks[1].project_tag.is_none());

        assert_eq!(tasks[2].file_path, "2. 领域/health.md");
        assert_eq!(tasks[2].line_number, 1);
    }

    #[test]
    fn empty_vault_has_no_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let vault = fixture::vault(dir.path());
        assert!(vault.scan_tasks().unwrap().is_empty());
    }
}
