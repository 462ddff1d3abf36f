use super::support::{assets_tree, filesystems, pack_tree, BASE_MTIME};
use packfs::{unpack, FsError, VirtualFile, Whence};
use std::time::UNIX_EPOCH;

#[test]
fn walk_matches_walkdir() {
    let dir = assets_tree();
    let expected: Vec<String> = walkdir::WalkDir::new(dir.path().join("assets"))
        .sort_by_file_name()
        .into_iter()
        .map(|e| {
            let e = e.unwrap();
            e.path()
                .strip_prefix(dir.path())
                .unwrap()
                .to_str()
                .unwrap()
                .replace('\\', "/")
        })
        .collect();

    for fs in filesystems(dir.path()) {
        let mut seen = Vec::new();
        fs.walk("assets", |path, _| {
            seen.push(path.to_string());
            Ok::<(), FsError>(())
        })
        .unwrap();
        assert_eq!(seen, expected);
        assert_eq!(fs.index().paths(), expected.as_slice());
    }
}

#[test]
fn metadata_matches_disk() {
    let dir = assets_tree();
    for fs in filesystems(dir.path()) {
        fs.walk("assets", |path, meta| {
            let disk = std::fs::metadata(dir.path().join(path)).unwrap();
            let secs = disk
                .modified()
                .unwrap()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs() as i64;
            assert!(secs >= BASE_MTIME, "{path}: fixture mtime not applied");
            assert_eq!(meta.modified().timestamp(), secs, "{path}");
            assert_eq!(meta.is_dir(), disk.is_dir(), "{path}");
            assert_eq!(meta.mode().is_dir(), disk.is_dir(), "{path}");
            assert_eq!(meta.name(), path.rsplit('/').next().unwrap());
            if disk.is_dir() {
                assert_eq!(meta.size(), 0);
            } else {
                assert_eq!(meta.size(), disk.len(), "{path}");
            }
            assert!(meta.sys().is_none());
            Ok::<(), FsError>(())
        })
        .unwrap();
    }
}

#[test]
fn file_content_matches_disk() {
    let dir = assets_tree();
    for fs in filesystems(dir.path()) {
        for path in fs.index().paths() {
            let mut file = fs.open(path).unwrap();
            if file.is_dir() {
                continue;
            }
            let mut content = Vec::new();
            std::io::Read::read_to_end(&mut file, &mut content).unwrap();
            assert_eq!(content, std::fs::read(dir.path().join(path)).unwrap());
        }
    }
}

#[test]
fn seek_boundaries() {
    let dir = assets_tree();
    for fs in filesystems(dir.path()) {
        let mut file = fs.open("assets/readdir/3.txt").unwrap();
        let size = file.stat().size() as i64;
        assert_eq!(size, 5);

        for k in 0..=size {
            assert_eq!(file.seek(k, Whence::Start).unwrap(), k as u64);
            assert_eq!(file.seek(size - k, Whence::End).unwrap(), k as u64);
        }

        file.seek(2, Whence::Start).unwrap();
        assert!(matches!(file.seek(size + 1, Whence::Start), Err(FsError::BadOffset(_))));
        assert!(matches!(file.seek(-1, Whence::Start), Err(FsError::BadOffset(_))));
        assert!(matches!(file.seek(-3, Whence::Current), Err(FsError::BadOffset(_))));
        assert!(matches!(file.seek(size + 1, Whence::End), Err(FsError::BadOffset(_))));
        assert_eq!(file.position(), 2);

        file.seek(0, Whence::Start).unwrap();
        assert!(matches!(file.seek(size + 1, Whence::Current), Err(FsError::BadOffset(_))));
        let chunk = 2;
        file.seek(chunk, Whence::End).unwrap();
        let mut tail = [0u8; 8];
        let n = file.read(&mut tail).unwrap();
        assert_eq!(&tail[..n], b"ee");

        file.seek(2, Whence::Start).unwrap();
        let mut buf = [0u8; 8];
        let n = file.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ree");
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }
}

#[test]
fn closed_handles_reject_everything() {
    let dir = assets_tree();
    for fs in filesystems(dir.path()) {
        let mut file = fs.open("assets/index.html").unwrap();
        let mut dir_handle = fs.open("assets/readdir").unwrap();
        file.close().unwrap();
        dir_handle.close().unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(file.read(&mut buf), Err(FsError::Closed)));
        assert!(matches!(file.seek(0, Whence::Start), Err(FsError::Closed)));
        assert!(matches!(file.close(), Err(FsError::Closed)));
        assert!(matches!(dir_handle.readdir(-1), Err(FsError::Closed)));
        assert!(matches!(dir_handle.close(), Err(FsError::Closed)));

        file.open().unwrap();
        assert_eq!(file.read(&mut buf).unwrap(), 4);
    }
}

#[test]
fn readdir_pagination() {
    let dir = assets_tree();
    for fs in filesystems(dir.path()) {
        let names = |listing: Vec<packfs::Metadata>| {
            listing
                .into_iter()
                .map(|m| m.name().to_string())
                .collect::<Vec<_>>()
        };

        let mut d = fs.open("assets/readdir").unwrap();
        assert_eq!(names(d.readdir(2).unwrap()), vec!["1.txt", "2.txt"]);
        assert_eq!(names(d.readdir(2).unwrap()), vec!["3.txt"]);
        assert!(matches!(d.readdir(2), Err(FsError::EndOfEntries)));
        assert!(d.readdir(-1).unwrap().is_empty());

        let mut d = fs.open("assets/readdir").unwrap();
        for expected in ["1.txt", "2.txt", "3.txt"] {
            assert_eq!(names(d.readdir(1).unwrap()), vec![expected]);
        }
        assert!(matches!(d.readdir(1), Err(FsError::EndOfEntries)));

        let mut d = fs.open("assets/readdir").unwrap();
        assert_eq!(d.readdir(0).unwrap().len(), 3);

        let mut d = fs.open("assets/readdir").unwrap();
        assert_eq!(names(d.readdir(1).unwrap()), vec!["1.txt"]);
        assert_eq!(names(d.readdir(-1).unwrap()), vec!["2.txt", "3.txt"]);

        let mut empty = fs.open("assets/empty").unwrap();
        assert!(empty.readdir(-1).unwrap().is_empty());
        assert!(matches!(empty.readdir(1), Err(FsError::EndOfEntries)));

        let mut root = fs.open("assets").unwrap();
        assert_eq!(
            names(root.readdir(-1).unwrap()),
            vec!["css", "empty", "index.html", "js", "readdir"]
        );
    }
}

#[test]
fn bundles_are_deterministic() {
    let dir = assets_tree();
    let first = pack_tree(dir.path());
    let second = pack_tree(dir.path());
    assert_eq!(first, second);

    let entries = unpack(&first).unwrap();
    for level in 0..=9 {
        let packed = packfs::pack(entries.clone(), level).unwrap();
        assert_eq!(unpack(&packed).unwrap(), entries, "level {level}");
    }
}
