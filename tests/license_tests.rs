// SPDX-License-Identifier: GPL-3.0-only

//! Every source file carries the package license

use std::fs;
use std::path::{Path, PathBuf};

fn rust_files(dir: &Path, files: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_files(&path, files);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
}

#[test]
fn test_spdx_headers_match_package_license() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let expected = format!("// SPDX-License-Identifier: {}", env!("CARGO_PKG_LICENSE"));

    let mut files = Vec::new();
    rust_files(&root.join("src"), &mut files);
    rust_files(&root.join("tests"), &mut files);
    assert!(!files.is_empty());

    for file in files {
        let source = fs::read_to_string(&file).unwrap();
        assert_eq!(
            source.lines().next(),
            Some(expected.as_str()),
            "{}",
            file.display()
        );
    }
}
