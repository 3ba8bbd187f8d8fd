use super::*;
use tempfile::tempdir;

fn create_test_store() -> (FsBinaryStore, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let store = FsBinaryStore::new(temp_dir.path().join("blobs"));
    (store, temp_dir)
}

fn path(raw: &str) -> StoragePath {
    StoragePath::try_from(raw).unwrap()
}

mod put {
    use super::*;

    #[test]
    fn test_put_writes_bytes_and_returns_path() {
        let (store, _temp) = create_test_store();
        let target = path("posts/a.webp");

        let stored = store.put(b"image bytes", &target).unwrap();

        assert_eq!(stored, target);
        let file = store.file_path(&target);
        assert_eq!(std::fs::read(&file).unwrap(), b"image bytes");
    }

    #[test]
    fn test_put_creates_nested_directories() {
        let (store, _temp) = create_test_store();
        let target = path("posts/2026/10/a.webp");

        store.put(b"x", &target).unwrap();

        assert!(store.root.join("posts").join("2026").join("10").is_dir());
    }

    #[test]
    fn test_put_overwrites_existing_blob() {
        let (store, _temp) = create_test_store();
        let target = path("posts/a.webp");

        store.put(b"first", &target).unwrap();
        store.put(b"second", &target).unwrap();

        assert_eq!(std::fs::read(store.file_path(&target)).unwrap(), b"second");
    }

    #[test]
    fn test_put_leaves_no_staging_file() {
        let (store, _temp) = create_test_store();
        let target = path("posts/a.webp");

        store.put(b"x", &target).unwrap();

        let entries: Vec<_> = std::fs::read_dir(store.root.join("posts"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("a.webp")]);
    }
}

mod delete {
    use super::*;

    #[test]
    fn test_delete_removes_file() {
        let (store, _temp) = create_test_store();
        let target = path("posts/a.webp");
        store.put(b"x", &target).unwrap();
        store.put(b"y", &path("posts/b.webp")).unwrap();

        store.delete(&target).unwrap();

        assert!(!store.file_path(&target).exists());
        assert!(store.root.join("posts").is_dir());
    }

    #[test]
    fn test_delete_missing_blob_succeeds() {
        let (store, _temp) = create_test_store();
        store.delete(&path("posts/missing.webp")).unwrap();
    }

    #[test]
    fn test_delete_last_file_keeps_directory() {
        let (store, _temp) = create_test_store();
        let target = path("posts/a.webp");
        store.put(b"x", &target).unwrap();

        store.delete(&target).unwrap();

        assert!(!store.file_path(&target).exists());
        assert!(store.root.join("posts").is_dir());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (store, _temp) = create_test_store();
        let target = path("posts/a.webp");
        store.put(b"x", &target).unwrap();

        store.delete(&target).unwrap();
        store.delete(&target).unwrap();
    }
}

mod concurrency {
    use super::*;

    #[test]
    fn test_put_and_delete_race_in_shared_directory() {
        let (store, _temp) = create_test_store();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..2_000 {
                    let target = path(&format!("posts/churn-{i}.webp"));
                    store.put(b"x", &target).unwrap();
                    store.delete(&target).unwrap();
                }
            });
            scope.spawn(|| {
                for i in 0..2_000 {
                    let target = path(&format!("posts/kept-{i}.webp"));
                    store.put(b"y", &target).unwrap();
                }
            });
        });

        let listed = store.list("posts").unwrap();
        assert_eq!(listed.len(), 2_000);
        assert!(listed.iter().all(|p| p.file_name().starts_with("kept-")));
    }
}

mod list {
    use super::*;

    #[test]
    fn test_list_returns_logical_paths_sorted() {
        let (store, _temp) = create_test_store();
        store.put(b"x", &path("posts/b.webp")).unwrap();
        store.put(b"x", &path("posts/a.webp")).unwrap();
        store.put(b"x", &path("other/c.webp")).unwrap();

        let listed = store.list("posts").unwrap();

        assert_eq!(listed, vec![path("posts/a.webp"), path("posts/b.webp")]);
    }

    #[test]
    fn test_list_skips_staging_files_and_directories() {
        let (store, _temp) = create_test_store();
        store.put(b"x", &path("posts/a.webp")).unwrap();
        std::fs::write(store.root.join("posts").join(".b.webp.tmp"), b"partial").unwrap();
        std::fs::create_dir_all(store.root.join("posts").join("nested")).unwrap();

        assert_eq!(store.list("posts").unwrap(), vec![path("posts/a.webp")]);
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let (store, _temp) = create_test_store();
        assert!(store.list("posts").unwrap().is_empty());
    }
}
