// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
mod tests {
    use crate::data::NewValue;
    use crate::database::Database;
    use crate::tree::Tree;

    fn snapshot(root: &Tree) -> Vec<(String, Vec<u8>)> {
        root.items(false)
            .unwrap()
            .map(|pair| {
                let (key, value) = pair.unwrap();
                let key = key.get_cached().unwrap().as_str().unwrap().to_string();
                let value = value.get().unwrap().as_bytes().unwrap().to_vec();
                (key, value)
            })
            .collect()
    }

    #[test]
    fn test_vacuum_frees_space_after_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vac.reedtree");
        let mut db = Database::open(&path).unwrap();
        let root = db.connect().unwrap();

        for i in 0..1000 {
            root.insert(format!("key{:04}", i), vec![0xAB; 1024]).unwrap();
        }
        for i in 0..1000 {
            root.update(format!("key{:04}", i), vec![0xCD; 1024]).unwrap();
        }
        root.freeze().unwrap();

        let before = std::fs::metadata(&path).unwrap().len();
        let items_before = snapshot(&root);

        let freed = root.vacuum().unwrap();
        let after = std::fs::metadata(&path).unwrap().len();

        assert!(after < before, "vacuum did not shrink the file");
        assert_eq!(freed, before - after);
        assert_eq!(snapshot(&root), items_before);

        for value in items_before.iter().map(|(_, v)| v) {
            assert_eq!(value, &vec![0xCD; 1024]);
        }
    }

    #[test]
    fn test_vacuum_after_deletions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vac.reedtree");
        let mut db = Database::open(&path).unwrap();
        let root = db.connect().unwrap();

        for i in 0..200 {
            root.insert(format!("key{:03}", i), vec![7u8; 512]).unwrap();
        }
        for i in (0..200).step_by(2) {
            root.delete(format!("key{:03}", i)).unwrap();
        }
        root.freeze().unwrap();

        let before = std::fs::metadata(&path).unwrap().len();
        root.vacuum().unwrap();
        let after = std::fs::metadata(&path).unwrap().len();
        assert!(after < before);

        for i in 0..200 {
            let found = root.contains(format!("key{:03}", i)).unwrap();
            assert_eq!(found, i % 2 == 1);
        }
    }

    #[test]
    fn test_vacuum_copies_shared_values_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(dir.path().join("vac.reedtree")).unwrap();
        let root = db.connect().unwrap();

        root.insert("original", vec![1u8, 2, 3]).unwrap();
        let shared = root.search("original").unwrap();
        root.insert("alias", NewValue::Existing(shared)).unwrap();

        root.vacuum().unwrap();

        let a = root.search("original").unwrap();
        let b = root.search("alias").unwrap();
        assert_eq!(a.offset(), b.offset());
        assert_eq!(a.get().unwrap().as_bytes(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_vacuum_preserves_nested_trees() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(dir.path().join("vac.reedtree")).unwrap();
        let root = db.connect().unwrap();

        root.create("sub").unwrap();
        let sub = root.search("sub").unwrap().get().unwrap();
        sub.as_tree().unwrap().insert("inner", "safe").unwrap();
        root.insert("plain", "also safe").unwrap();

        root.vacuum().unwrap();

        let sub = root.search("sub").unwrap().get().unwrap();
        assert_eq!(
            sub.as_tree()
                .unwrap()
                .search("inner")
                .unwrap()
                .get()
                .unwrap()
                .as_str(),
            Some("safe")
        );
        assert_eq!(
            root.search("plain").unwrap().get().unwrap().as_str(),
            Some("also safe")
        );
    }

    #[test]
    fn test_vacuum_preserves_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(dir.path().join("vac.reedtree")).unwrap();
        let root = db.connect().unwrap();

        let items: Vec<NewValue> = (1..=5).map(NewValue::from).collect();
        root.insert("seq", NewValue::List(items)).unwrap();

        root.vacuum().unwrap();

        let value = root.search("seq").unwrap().get().unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 5);
        for i in 0..5 {
            assert_eq!(
                array.get_value(i).unwrap().as_number(),
                Some((i + 1) as f32)
            );
        }
    }

    #[test]
    fn test_vacuum_on_untouched_database_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vac.reedtree");
        let mut db = Database::open(&path).unwrap();
        let root = db.connect().unwrap();

        for i in 0..20 {
            root.insert(i, format!("v{}", i)).unwrap();
        }
        root.freeze().unwrap();

        root.vacuum().unwrap();
        for i in 0..20 {
            assert_eq!(
                root.search(i).unwrap().get().unwrap().as_str(),
                Some(format!("v{}", i).as_str())
            );
        }

        // A second vacuum over compact data frees nothing further.
        let freed = root.vacuum().unwrap();
        assert_eq!(freed, 0);
    }

    #[test]
    fn test_vacuum_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(dir.path().join("vac.reedtree")).unwrap();
        let root = db.connect().unwrap();

        root.insert("k", "v").unwrap();
        root.vacuum().unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);
    }
}
