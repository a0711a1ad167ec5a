//! Daily-note bookkeeping: per-project time under `## 项目列表` and the
//! pomodoro habit checkbox.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use tracing::debug;

use super::{write_atomic, Vault, PERIODIC_DIR};
use crate::display::{format_minutes, parse_minutes};
use crate::error::CollaboratorError;

const PROJECT_SECTION: &str = "## 项目列表";
const HABIT_PATTERN: &str = r"([-*])\s+\[ \]\s+使用番茄钟";
const WRITE_ATTEMPTS: usize = 3;

/// `0. 周期笔记/YYYY/Daily/MM/YYYY-MM-DD.md` under `root`.
pub fn daily_note_path(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(PERIODIC_DIR)
        .join(date.format("%Y").to_string())
        .join("Daily")
        .join(date.format("%m").to_string())
        .join(format!("{}.md", date.format("%Y-%m-%d")))
}

/// Add `added_minutes` to the project's entry in the day's note.
///
/// Returns `Ok(false)` when the note does not exist. If the note changes on
/// disk while being rewritten, the update is recomputed from the new content.
pub fn update_project_time(
    vault: &Vault,
    date: NaiveDate,
    project_path: &str,
    display_name: &str,
    added_minutes: u32,
) -> Result<bool, CollaboratorError> {
    let path = daily_note_path(vault.root(), date);
    if !path.is_file() {
        debug!(path = %path.display(), "no daily note to update");
        return Ok(false);
    }

    for attempt in 1..=WRITE_ATTEMPTS {
        let before = modified(&path)?;
        let content =
            std::fs::read_to_string(&path).map_err(|e| CollaboratorError::vault_io(&path, e))?;
        let updated = update_project_section(&content, project_path, display_name, added_minutes)?
            .ok_or_else(|| CollaboratorError::MissingSection {
                path: path.clone(),
                section: PROJECT_SECTION.to_string(),
            })?;

        if modified(&path)? != before && attempt < WRITE_ATTEMPTS {
            debug!(attempt, "daily note changed while updating; retrying");
            continue;
        }
        write_atomic(&path, updated.as_bytes())?;
        break;
    }
    Ok(true)
}

/// Rewrite the `## 项目列表` section of `content`.
///
/// An existing entry for the project gains the minutes; a bare README link
/// (`N. [[Short.README|Name]]`) becomes a timed entry; otherwise a new
/// numbered entry is added. The section's standalone total line is then
/// recomputed from every timed entry. Returns `None` when the section is
/// missing.
pub fn update_project_section(
    content: &str,
    project_path: &str,
    display_name: &str,
    added_minutes: u32,
) -> Result<Option<String>, CollaboratorError> {
    let lines: Vec<&str> = content.lines().collect();
    let Some(start) = lines.iter().position(|l| l.trim() == PROJECT_SECTION) else {
        return Ok(None);
    };
    let end = lines[start + 1..]
        .iter()
        .position(|l| l.starts_with("## "))
        .map_or(lines.len(), |i| start + 1 + i);

    let short_name = project_path
        .rsplit('/')
        .next()
        .and_then(|s| s.strip_suffix(".md"))
        .and_then(|s| s.strip_suffix(".README"))
        .unwrap_or("");
    let timed = Regex::new(&format!(
        r"^(\d+)\.\s+\[\[{}\|{}\]\]\s+(\d+hr\d+)",
        regex::escape(project_path),
        regex::escape(display_name)
    ))?;
    let bare = Regex::new(&format!(
        r"^(\d+)\.\s+\[\[{}\.README\|{}\]\]\s*$",
        regex::escape(short_name),
        regex::escape(display_name)
    ))?;
    let any_timed = Regex::new(r"\]\]\s+(\d+hr\d+)")?;

    let timed_entry = |num: &str, minutes: u32| {
        format!(
            "{num}. [[{project_path}|{display_name}]] {}",
            format_minutes(minutes)
        )
    };

    let mut section: Vec<String> = Vec::with_capacity(end - start + 2);
    let mut found = false;
    let mut total_idx = None;
    let mut max_num = 0;

    for line in &lines[start + 1..end] {
        if let Some(n) = list_number(line) {
            max_num = max_num.max(n);
        }
        if let Some(time) = timed.captures(line).and_then(|c| c.get(2)) {
            let minutes = parse_minutes(time.as_str())
                .unwrap_or(0)
                .saturating_add(added_minutes);
            section.push(format!(
                "{}{}{}",
                &line[..time.start()],
                format_minutes(minutes),
                &line[time.end()..]
            ));
            found = true;
        } else if let Some(num) = bare.captures(line).and_then(|c| c.get(1)) {
            section.push(timed_entry(num.as_str(), added_minutes));
            found = true;
        } else {
            if is_total_line(line) {
                total_idx = Some(section.len());
            }
            section.push(line.to_string());
        }
    }

    if !found {
        let entry = timed_entry(&(max_num + 1).to_string(), added_minutes);
        match total_idx {
            Some(idx) => {
                let mut at = idx;
                while at > 0 && section[at - 1].trim().is_empty() {
                    at -= 1;
                }
                section.insert(at, entry);
                total_idx = Some(idx + 1);
            }
            None => {
                let at = last_content_line(&section).map_or(0, |i| i + 1);
                section.insert(at, entry);
            }
        }
    }

    let total = section
        .iter()
        .filter_map(|l| any_timed.captures(l))
        .filter_map(|c| parse_minutes(&c[1]))
        .fold(0u32, u32::saturating_add);
    match total_idx {
        Some(idx) => section[idx] = format_minutes(total),
        None => {
            let at = last_content_line(&section).map_or(0, |i| i + 1);
            section.insert(at, String::new());
            section.insert(at + 1, format_minutes(total));
        }
    }

    let mut out: Vec<Cow<'_, str>> = Vec::with_capacity(lines.len() + 2);
    out.extend(lines[..=start].iter().map(|l| Cow::Borrowed(*l)));
    out.extend(section.into_iter().map(Cow::Owned));
    out.extend(lines[end..].iter().map(|l| Cow::Borrowed(*l)));
    let mut result = out.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    Ok(Some(result))
}

/// Tick the day's `使用番茄钟` habit. Returns whether the note changed.
///
/// A missing note, or a habit that is already ticked, is not an error.
pub fn check_pomodoro_habit(vault: &Vault, date: NaiveDate) -> Result<bool, CollaboratorError> {
    let path = daily_note_path(vault.root(), date);
    if !path.is_file() {
        return Ok(false);
    }
    let content =
        std::fs::read_to_string(&path).map_err(|e| CollaboratorError::vault_io(&path, e))?;

    let habit = Regex::new(HABIT_PATTERN)?;
    let stamp = date.format("%Y-%m-%d").to_string();
    let updated = habit.replacen(&content, 1, |caps: &Captures<'_>| {
        format!("{} [x] 使用番茄钟 ✅ {stamp}", &caps[1])
    });
    match updated {
        Cow::Borrowed(_) => Ok(false),
        Cow::Owned(updated) => {
            write_atomic(&path, updated.as_bytes())?;
            Ok(true)
        }
    }
}

fn list_number(line: &str) -> Option<u32> {
    let (num, _) = line.trim().split_once('.')?;
    num.parse().ok()
}

fn is_total_line(line: &str) -> bool {
    parse_minutes(line).is_some()
}

fn last_content_line(section: &[String]) -> Option<usize> {
    section.iter().rposition(|l| !l.trim().is_empty())
}

fn modified(path: &Path) -> Result<SystemTime, CollaboratorError> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| CollaboratorError::vault_io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::fixture;

    const DUAL: &str = "1. 项目/科学研究-DualBasic/DualBasic.README.md";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    #[test]
    fn note_path_layout() {
        let path = daily_note_path(Path::new("/v"), date());
        assert_eq!(
            path,
            Path::new("/v/0. 周期笔记/2026/Daily/03/2026-03-07.md")
        );
    }

    #[test]
    fn bare_link_becomes_timed_entry() {
        let note = "# Day\n## 项目列表\n1. [[DualBasic.README|科学研究-DualBasic]]\n2. [[1. 项目/Alpha/Alpha.README.md|Alpha]] 0hr25\n\n0hr25\n## 习惯\n";
        let out = update_project_section(note, DUAL, "科学研究-DualBasic", 25)
            .unwrap()
            .unwrap();
        assert_eq!(
            out,
            "# Day\n## 项目列表\n1. [[1. 项目/科学研究-DualBasic/DualBasic.README.md|科学研究-DualBasic]] 0hr25\n2. [[1. 项目/Alpha/Alpha.README.md|Alpha]] 0hr25\n\n0hr50\n## 习惯\n"
        );
    }

    #[test]
    fn timed_entry_accumulates() {
        let note = "## 项目列表\n1. [[1. 项目/Alpha/Alpha.README.md|Alpha]] 1hr50\n\n1hr50";
        let out = update_project_section(note, "1. 项目/Alpha/Alpha.README.md", "Alpha", 25)
            .unwrap()
            .unwrap();
        assert_eq!(
            out,
            "## 项目列表\n1. [[1. 项目/Alpha/Alpha.README.md|Alpha]] 2hr15\n\n2hr15"
        );
    }

    #[test]
    fn new_entry_goes_before_total() {
        let note = "## 项目列表\n1. [[1. 项目/Alpha/Alpha.README.md|Alpha]] 0hr25\n\n0hr25\n";
        let out = update_project_section(note, "1. 项目/Beta/Beta.README.md", "Beta", 50)
            .unwrap()
            .unwrap();
        assert_eq!(
            out,
            "## 项目列表\n1. [[1. 项目/Alpha/Alpha.README.md|Alpha]] 0hr25\n2. [[1. 项目/Beta/Beta.README.md|Beta]] 0hr50\n\n1hr15\n"
        );
    }

    #[test]
    fn empty_section_gains_entry_and_total() {
        let note = "## 项目列表\n\n## 其他";
        let out = update_project_section(note, "1. 项目/Beta/Beta.README.md", "Beta", 25)
            .unwrap()
            .unwrap();
        assert_eq!(
            out,
            "## 项目列表\n1. [[1. 项目/Beta/Beta.README.md|Beta]] 0hr25\n\n0hr25\n\n## 其他"
        );
    }

    #[test]
    fn missing_section_is_reported() {
        let out = update_project_section("# nothing here", DUAL, "x", 25).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn updates_note_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let vault = fixture::vault(dir.path());
        assert!(!update_project_time(&vault, date(), DUAL, "科学研究-DualBasic", 25).unwrap());

        fixture::write(
            dir.path(),
            "0. 周期笔记/2026/Daily/03/2026-03-07.md",
            "## 项目列表\n\n## 习惯\n* [ ] 使用番茄钟\n",
        );
        assert!(update_project_time(&vault, date(), DUAL, "科学研究-DualBasic", 25).unwrap());
        let content = std::fs::read_to_string(daily_note_path(dir.path(), date())).unwrap();
        assert!(content.contains("1. [[1. 项目/科学研究-DualBasic/DualBasic.README.md|科学研究-DualBasic]] 0hr25"));
    }

    #[test]
    fn note_without_section_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let vault = fixture::vault(dir.path());
        fixture::write(dir.path(), "0. 周期笔记/2026/Daily/03/2026-03-07.md", "# empty\n");
        assert!(matches!(
            update_project_time(&vault, date(), DUAL, "x", 25),
            Err(CollaboratorError::MissingSection { .. })
        ));
    }

    #[test]
    fn habit_is_ticked_once() {
        let dir = tempfile::tempdir().unwrap();
        let vault = fixture::vault(dir.path());
        assert!(!check_pomodoro_habit(&vault, date()).unwrap());

        fixture::write(
            dir.path(),
            "0. 周期笔记/2026/Daily/03/2026-03-07.md",
            "## 习惯\n* [ ] 使用番茄钟\n- [ ] 喝水\n",
        );
        assert!(check_pomodoro_habit(&vault, date()).unwrap());
        let content = std::fs::read_to_string(daily_note_path(dir.path(), date())).unwrap();
        assert_eq!(content, "## 习惯\n* [x] 使用番茄钟 ✅ 2026-03-07\n- [ ] 喝水\n");

        assert!(!check_pomodoro_habit(&vault, date()).unwrap());
    }
}
