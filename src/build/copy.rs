//! Asset-copy collaborator: verbatim recursive copy.

use std::fs;
use std::io;
use std::path::Path;

/// Copy the contents of `from` into `to`, keeping relative paths.
///
/// Symlinks are followed. Returns the number of files copied.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<u64> {
    fs::create_dir_all(to)?;
    let mut copied = 0;

    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let source = entry.path();
        let dest = to.join(entry.file_name());

        if fs::metadata(&source)?.is_dir() {
            copied += copy_tree(&source, &dest)?;
        } else {
            fs::copy(&source, &dest)?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_nested_tree_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let from = tmp.path().join("static");
        fs::create_dir_all(from.join("img/icons")).unwrap();
        fs::write(from.join("index.html"), "<html></html>").unwrap();
        fs::write(from.join("img/icons/ship.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let to = tmp.path().join("out");
        assert_eq!(copy_tree(&from, &to).unwrap(), 2);

        assert_eq!(fs::read_to_string(to.join("index.html")).unwrap(), "<html></html>");
        assert_eq!(fs::read(to.join("img/icons/ship.png")).unwrap(), [0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn missing_source_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(copy_tree(&tmp.path().join("nope"), &tmp.path().join("out")).is_err());
    }
}
