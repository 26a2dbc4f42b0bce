use super::FileRecord;
use crate::common::*;
use std::path::Component;

pub fn load_classes_file(path: impl AsRef<Path>) -> Result<IndexSet<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read classes file '{}'", path.display()))?;
    let lines: Vec<_> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let classes: IndexSet<_> = lines.iter().cloned().map(ToOwned::to_owned).collect();
    ensure!(
        lines.len() == classes.len(),
        "duplicated class names found in '{}'",
        path.display()
    );
    ensure!(
        !classes.is_empty(),
        "no classes found in '{}'",
        path.display()
    );
    Ok(classes)
}

/// The sample name of an image file, i.e. its path relative to the image
/// directory without extension, joined by `/`.
pub fn sample_name(image_dir: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(image_dir)
        .unwrap_or(path)
        .with_extension("");
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .map(|part| part.to_str())
        .collect::<Option<_>>()
        .ok_or_else(|| format_err!("invalid image file name '{}'", path.display()))?;
    ensure!(!parts.is_empty(), "invalid image file name '{}'", path.display());
    Ok(parts.join("/"))
}

/// Check that no two records share a sample name.
pub fn check_unique_names(records: &[FileRecord]) -> Result<()> {
    let mut names = HashSet::with_capacity(records.len());
    for record in records {
        ensure!(
            names.insert(record.name.as_str()),
            "duplicated sample name '{}' for image '{}'",
            record.name,
            record.path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.txt");

        fs::write(&path, "nucleus\ncell\n\n").unwrap();
        let classes = load_classes_file(&path).unwrap();
        assert_eq!(classes.get_index_of("cell"), Some(1));

        fs::write(&path, "cell\ncell\n").unwrap();
        assert!(load_classes_file(&path).is_err());

        fs::write(&path, "\n").unwrap();
        assert!(load_classes_file(&path).is_err());
    }

    #[test]
    fn name_from_path() {
        let image_dir = Path::new("/data/images");
        assert_eq!(
            sample_name(image_dir, Path::new("/data/images/img_01.png")).unwrap(),
            "img_01"
        );
        assert_eq!(
            sample_name(image_dir, Path::new("/data/images/x/a.png")).unwrap(),
            "x/a"
        );
        assert_ne!(
            sample_name(image_dir, Path::new("/data/images/x/a.png")).unwrap(),
            sample_name(image_dir, Path::new("/data/images/y/a.png")).unwrap()
        );
    }

    #[test]
    fn duplicated_names() {
        let record = |name: &str, path: &str| FileRecord {
            name: name.into(),
            path: path.into(),
            bboxes: vec![],
        };
        assert!(check_unique_names(&[record("a", "a.png"), record("b", "b.png")]).is_ok());
        assert!(check_unique_names(&[record("a", "a.png"), record("a", "a.jpg")]).is_err());
    }
}
