//! Fixture tree shared by the integration tests.

use filetime::{set_file_mtime, FileTime};
use packfs::{Filesystem, Generator, LoadMode};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const INDEX_HTML: &str = "<!doctype html>\n<title>assets</title>\n<h1>Hello</h1>\n";

/// Base mtime for the fixture; every path gets a sub-second offset on top.
pub const BASE_MTIME: i64 = 1_700_000_000;

/// `assets/` tree with nested directories, an empty directory and files
/// whose mtimes carry sub-second precision.
pub fn assets_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("assets");
    for sub in ["css", "js", "readdir", "empty"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }
    let files: [(&str, &[u8]); 6] = [
        ("index.html", INDEX_HTML.as_bytes()),
        ("css/site.css", b"body { margin: 0 }\n"),
        ("js/app.js", b"console.log('packfs');\n"),
        ("readdir/1.txt", b"one"),
        ("readdir/2.txt", b"two"),
        ("readdir/3.txt", b"three"),
    ];
    for (name, content) in files {
        fs::write(root.join(name), content).unwrap();
    }

    // files first so writing them does not bump directory mtimes afterwards
    let mut paths: Vec<_> = walkdir::WalkDir::new(&root)
        .into_iter()
        .map(|e| e.unwrap().into_path())
        .collect();
    paths.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
    for (i, path) in paths.iter().enumerate() {
        let mtime = FileTime::from_unix_time(BASE_MTIME + i as i64, 750_000_000);
        set_file_mtime(path, mtime).unwrap();
    }
    dir
}

pub fn pack_tree(base: &Path) -> Vec<u8> {
    Generator::new(["assets"])
        .with_base(base)
        .generate()
        .unwrap()
}

pub fn filesystems(base: &Path) -> Vec<Filesystem> {
    let bundle = pack_tree(base);
    vec![
        Filesystem::new(LoadMode::Eager, &bundle),
        Filesystem::new(LoadMode::Lazy, &bundle),
    ]
}
