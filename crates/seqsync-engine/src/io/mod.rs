use relative_path::{RelativePath, RelativePathBuf};
use std::fs;
use std::path::{Path, PathBuf};

/// File extensions recognised as diagram sources.
pub const DIAGRAM_EXTENSIONS: &[&str] = &["puml", "plantuml", "pu"];

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid diagram directory: {0}")]
    InvalidDiagramDir(String),
}

/// Read a diagram file relative to `root`.
pub fn read_diagram(relative_path: &RelativePath, root: &Path) -> Result<String, IoError> {
    let absolute_path = relative_path.to_path(root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(IoError::Io)
}

/// Write a diagram file relative to `root`, creating parent directories.
pub fn write_diagram(relative_path: &RelativePath, root: &Path, content: &str) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(root);
    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&absolute_path, content).map_err(IoError::Io)
}

/// Every diagram under `root`, as sorted paths relative to it.
pub fn scan_diagrams(root: &Path) -> Result<Vec<RelativePathBuf>, IoError> {
    if !root.is_dir() {
        return Err(IoError::InvalidDiagramDir(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    scan_directory_recursive(root, &mut files)?;
    let mut relative: Vec<RelativePathBuf> = files
        .iter()
        .filter_map(|path| path.strip_prefix(root).ok())
        .filter_map(|path| RelativePathBuf::from_path(path).ok())
        .collect();
    relative.sort();
    Ok(relative)
}

pub fn is_diagram(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DIAGRAM_EXTENSIONS.contains(&ext))
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if is_diagram(&path) {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_file(dir: &TempDir, name: &str, content: &str) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn scan_finds_nested_diagrams_only() {
        let dir = TempDir::new().unwrap();
        create_file(&dir, "login.puml", "A -> B\n");
        create_file(&dir, "flows/checkout.plantuml", "A -> B\n");
        create_file(&dir, "notes.md", "# not a diagram");

        let files = scan_diagrams(dir.path()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.as_str()).collect();
        assert_eq!(names, vec!["flows/checkout.plantuml", "login.puml"]);
    }

    #[test]
    fn scan_rejects_a_missing_directory() {
        let result = scan_diagrams(Path::new("/this/path/does/not/exist"));
        assert!(matches!(result, Err(IoError::InvalidDiagramDir(_))));
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = read_diagram(RelativePath::new("missing.puml"), dir.path());
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = RelativePath::new("nested/dir/flow.puml");
        write_diagram(path, dir.path(), "A -> B: hi\n").unwrap();
        assert_eq!(read_diagram(path, dir.path()).unwrap(), "A -> B: hi\n");
    }
}
