//! Reading and validating lesson TOML files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::core::activity::{ActivityType, Lesson};
use crate::error::{DojoError, Result};

/// A file holding either one lesson or a `[[lessons]]` array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LessonFile {
    Many { lessons: Vec<Lesson> },
    One(Lesson),
}

/// Parse lessons from TOML text.
pub fn parse_lessons(content: &str, origin: &str) -> Result<Vec<Lesson>> {
    let file: LessonFile = toml::from_str(content)
        .map_err(|e| DojoError::catalog(format!("{}: {}", origin, e)))?;

    Ok(match file {
        LessonFile::Many { lessons } => lessons,
        LessonFile::One(lesson) => vec![lesson],
    })
}

/// Load every lesson in one file.
pub fn load_file(path: &Path) -> Result<Vec<Lesson>> {
    let content = fs::read_to_string(path).map_err(|e| DojoError::storage(path, e))?;
    parse_lessons(&content, &path.display().to_string())
}

/// Load `lesson_*.toml` files from a directory in filename order.
pub fn load_dir(dir: &Path) -> Result<Vec<Lesson>> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .map_err(|e| DojoError::storage(dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with("lesson_") && name.ends_with(".toml")
        })
        .collect();

    // lesson_01, lesson_02, ...
    entries.sort_by_key(|e| e.file_name());

    let mut lessons = Vec::new();
    for entry in entries {
        lessons.extend(load_file(&entry.path())?);
    }

    tracing::debug!(dir = %dir.display(), count = lessons.len(), "loaded lessons");
    Ok(lessons)
}

/// Load from a file or a directory.
pub fn load_path(path: &Path) -> Result<Vec<Lesson>> {
    if path.is_dir() {
        load_dir(path)
    } else {
        load_file(path)
    }
}

/// Check the structural rules every lesson must satisfy.
pub fn validate(lessons: &[Lesson]) -> Result<()> {
    let mut lesson_ids = HashSet::new();

    for lesson in lessons {
        if !lesson_ids.insert(lesson.id.as_str()) {
            return Err(DojoError::catalog(format!(
                "duplicate lesson id '{}'",
                lesson.id
            )));
        }
        validate_lesson(lesson)?;
    }

    Ok(())
}

fn validate_lesson(lesson: &Lesson) -> Result<()> {
    let fail = |message: String| DojoError::catalog(format!("lesson '{}': {}", lesson.id, message));

    if lesson.activities.is_empty() {
        return Err(fail("has no activities".to_string()));
    }

    let mut activity_ids = HashSet::new();
    for activity in &lesson.activities {
        if !activity_ids.insert(activity.id.as_str()) {
            return Err(fail(format!("duplicate activity id '{}'", activity.id)));
        }

        if activity.activity_type.edits_code() && activity.target_files.is_empty() {
            return Err(fail(format!("{} needs at least one target file", activity.id)));
        }

        match activity.activity_type {
            ActivityType::DecisionFork if activity.options.is_empty() => {
                return Err(fail(format!("{} has no options", activity.id)));
            }
            ActivityType::TrueFalse if activity.true_false_config.is_none() => {
                return Err(fail(format!("{} has no true_false_config", activity.id)));
            }
            _ => {}
        }

        if let Some(region) = activity
            .editable_regions
            .iter()
            .find(|r| r.start_line == 0 || r.start_line > r.end_line)
        {
            return Err(fail(format!(
                "{} has an invalid editable region {}..{}",
                activity.id, region.start_line, region.end_line
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
id = "quiz"
title = "Quiz"

[[activities]]
id = "tf-1"
type = "true_false"
title = "Keys"

[activities.true_false_config]
correct_answer = false
"#;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn lesson_toml(id: &str) -> String {
        MINIMAL.replacen("id = \"quiz\"", &format!("id = \"{}\"", id), 1)
    }

    #[test]
    fn test_parse_single_lesson() {
        let lessons = parse_lessons(MINIMAL, "inline").unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].id, "quiz");
        assert!(!lessons[0].activities[0]
            .true_false_config
            .as_ref()
            .unwrap()
            .correct_answer);
    }

    #[test]
    fn test_parse_lesson_array() {
        let content = r#"
[[lessons]]
id = "a"
title = "A"

[[lessons]]
id = "b"
title = "B"
"#;
        let lessons = parse_lessons(content, "inline").unwrap();
        let ids: Vec<&str> = lessons.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = parse_lessons("id = ", "broken.toml").unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_load_dir_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lesson_02_b.toml", &lesson_toml("second"));
        write(temp.path(), "lesson_01_a.toml", &lesson_toml("first"));
        write(temp.path(), "notes.toml", &lesson_toml("ignored"));
        write(temp.path(), "lesson_03.txt", &lesson_toml("ignored-too"));

        let lessons = load_dir(temp.path()).unwrap();
        let ids: Vec<&str> = lessons.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_load_path_accepts_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "one.toml", MINIMAL);
        let lessons = load_path(&temp.path().join("one.toml")).unwrap();
        assert_eq!(lessons.len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_storage_error() {
        let temp = TempDir::new().unwrap();
        let err = load_file(&temp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, DojoError::Storage { .. }));
    }

    #[test]
    fn test_validate_accepts_minimal() {
        let lessons = parse_lessons(MINIMAL, "inline").unwrap();
        assert!(validate(&lessons).is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_lessons() {
        let mut lessons = parse_lessons(MINIMAL, "inline").unwrap();
        lessons.push(lessons[0].clone());
        let err = validate(&lessons).unwrap_err();
        assert!(err.to_string().contains("duplicate lesson id"));
    }

    #[test]
    fn test_validate_rejects_structural_problems() {
        let cases = [
            (
                "[[activities]]\nid = \"a\"\ntype = \"decision_fork\"\ntitle = \"A\"\n",
                "no options",
            ),
            (
                "[[activities]]\nid = \"a\"\ntype = \"true_false\"\ntitle = \"A\"\n",
                "no true_false_config",
            ),
            (
                "[[activities]]\nid = \"a\"\ntype = \"break_and_fix\"\ntitle = \"A\"\n",
                "target file",
            ),
            (
                "[[activities]]\nid = \"a\"\ntype = \"constrained_edit\"\ntitle = \"A\"\ntarget_files = [\"x\"]\n\n[[activities.editable_regions]]\nstart_line = 5\nend_line = 2\n",
                "invalid editable region",
            ),
            (
                "[[activities]]\nid = \"a\"\ntype = \"quality_review\"\ntitle = \"A\"\ntarget_files = [\"x\"]\n\n[[activities]]\nid = \"a\"\ntype = \"quality_review\"\ntitle = \"B\"\ntarget_files = [\"x\"]\n",
                "duplicate activity id",
            ),
            ("", "no activities"),
        ];

        for (activities, expected) in cases {
            let content = format!("id = \"l\"\ntitle = \"L\"\n\n{}", activities);
            let lessons = parse_lessons(&content, "inline").unwrap();
            let err = validate(&lessons).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "expected '{}' in '{}'",
                expected,
                err
            );
        }
    }
}
