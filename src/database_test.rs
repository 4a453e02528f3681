// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
mod tests {
    use crate::data::NewValue;
    use crate::database::Database;
    use crate::error::ReedError;
    use crate::tree::Tree;

    fn all_pairs(root: &Tree) -> Vec<(String, String)> {
        root.items(false)
            .unwrap()
            .map(|pair| {
                let (key, value) = pair.unwrap();
                (
                    key.get_cached().unwrap().as_str().unwrap().to_string(),
                    value.get().unwrap().as_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_basic_crud_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(dir.path().join("db.reedtree")).unwrap();
        let root = db.connect().unwrap();

        for c in 'a'..='n' {
            root.insert(c.to_string(), format!("{}_value", c)).unwrap();
        }
        for c in 'a'..='n' {
            assert_eq!(
                root.search(c.to_string()).unwrap().get().unwrap().as_str(),
                Some(format!("{}_value", c).as_str())
            );
        }

        db.close().unwrap();
    }

    #[test]
    fn test_nested_tree_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.reedtree");

        let mut db = Database::open(&path).unwrap();
        let root = db.connect().unwrap();
        root.create("sub").unwrap();

        let sub = root.search("sub").unwrap().get().unwrap();
        sub.as_tree()
            .unwrap()
            .insert("sub_a", "sub_a_value")
            .unwrap();
        assert_eq!(
            sub.as_tree()
                .unwrap()
                .search("sub_a")
                .unwrap()
                .get()
                .unwrap()
                .as_str(),
            Some("sub_a_value")
        );
        db.close().unwrap();

        let mut db = Database::open(&path).unwrap();
        let root = db.connect().unwrap();
        let sub = root.search("sub").unwrap().get().unwrap();
        assert_eq!(
            sub.as_tree()
                .unwrap()
                .search("sub_a")
                .unwrap()
                .get()
                .unwrap()
                .as_str(),
            Some("sub_a_value")
        );
        db.close().unwrap();
    }

    #[test]
    fn test_close_reopen_preserves_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.reedtree");

        let expected = {
            let mut db = Database::open(&path).unwrap();
            let root = db.connect().unwrap();
            for i in 0..120 {
                root.insert(format!("key{:03}", i), format!("value{}", i))
                    .unwrap();
            }
            for i in (0..120).step_by(3) {
                root.delete(format!("key{:03}", i)).unwrap();
            }
            for i in (1..120).step_by(3) {
                root.update(format!("key{:03}", i), format!("updated{}", i))
                    .unwrap();
            }
            let expected = all_pairs(&root);
            db.close().unwrap();
            expected
        };

        let mut db = Database::open(&path).unwrap();
        let root = db.connect().unwrap();
        assert_eq!(all_pairs(&root), expected);
        db.close().unwrap();
    }

    #[test]
    fn test_mutations_without_close_are_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.reedtree");

        {
            let mut db = Database::open(&path).unwrap();
            let root = db.connect().unwrap();
            root.insert("durable", 1).unwrap();
            db.close().unwrap();
        }
        {
            let mut db = Database::open(&path).unwrap();
            let root = db.connect().unwrap();
            root.insert("volatile", 2).unwrap();
            // Dropped without close: no freeze, no durability.
        }

        let mut db = Database::open(&path).unwrap();
        let root = db.connect().unwrap();
        assert!(root.contains("durable").unwrap());
        assert!(!root.contains("volatile").unwrap());
    }

    #[test]
    fn test_all_value_types_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.reedtree");

        let mut db = Database::open(&path).unwrap();
        let root = db.connect().unwrap();
        root.insert("string", "text").unwrap();
        root.insert("number", 2.5f32).unwrap();
        root.insert("boolean", true).unwrap();
        root.insert("bytes", vec![1u8, 2, 3]).unwrap();
        root.insert("empty", NewValue::Empty).unwrap();
        root.insert("list", NewValue::List(vec![NewValue::from(7)]))
            .unwrap();
        root.insert(
            "map",
            NewValue::Map(vec![(NewValue::from("k"), NewValue::from("v"))]),
        )
        .unwrap();
        db.close().unwrap();

        let mut db = Database::open(&path).unwrap();
        let root = db.connect().unwrap();
        assert_eq!(
            root.search("string").unwrap().get().unwrap().as_str(),
            Some("text")
        );
        assert_eq!(
            root.search("number").unwrap().get().unwrap().as_number(),
            Some(2.5)
        );
        assert_eq!(
            root.search("boolean").unwrap().get().unwrap().as_bool(),
            Some(true)
        );
        assert_eq!(
            root.search("bytes").unwrap().get().unwrap().as_bytes(),
            Some(&[1u8, 2, 3][..])
        );
        assert!(root.search("empty").unwrap().get().unwrap().is_empty_value());

        let list = root.search("list").unwrap().get().unwrap();
        assert_eq!(
            list.as_array().unwrap().get_value(0).unwrap().as_number(),
            Some(7.0)
        );

        let map = root.search("map").unwrap().get().unwrap();
        assert_eq!(
            map.as_tree()
                .unwrap()
                .search("k")
                .unwrap()
                .get()
                .unwrap()
                .as_str(),
            Some("v")
        );
        db.close().unwrap();
    }

    #[test]
    fn test_read_only_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.reedtree");

        {
            let mut db = Database::open(&path).unwrap();
            let root = db.connect().unwrap();
            root.insert("k", "v").unwrap();
            db.close().unwrap();
        }

        let mut db = Database::open_read_only(&path).unwrap();
        assert!(db.is_read_only());
        let root = db.connect().unwrap();
        assert_eq!(
            root.search("k").unwrap().get().unwrap().as_str(),
            Some("v")
        );
        assert!(root.insert("new", 1).is_err());
        db.close().unwrap();
    }

    #[test]
    fn test_read_only_open_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Database::open_read_only(dir.path().join("absent.reedtree")).unwrap_err();
        assert!(matches!(err, ReedError::IoError { .. }));
    }

    #[test]
    fn test_foreign_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-db.reedtree");
        std::fs::write(&path, b"XYZ and then some").unwrap();

        let err = Database::open(&path).unwrap_err();
        assert!(matches!(err, ReedError::Corruption { .. }));
    }

    #[test]
    fn test_fresh_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.reedtree");
        let db = Database::open(&path).unwrap();
        drop(db);

        let bytes = std::fs::read(&path).unwrap();
        // Header plus one empty node record.
        assert_eq!(bytes.len(), 13 + 1520);
        assert_eq!(&bytes[0..3], b"BTR");
        // Root pointer: offset 13, straight after the header.
        assert_eq!(bytes[5..13], [0, 0, 0, 0, 0, 0, 0, 13]);
    }

    #[test]
    fn test_move_value_under_new_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(dir.path().join("db.reedtree")).unwrap();
        let root = db.connect().unwrap();

        root.insert("old_name", "payload").unwrap();
        let value = root.search("old_name").unwrap();
        root.insert("new_name", NewValue::Existing(value)).unwrap();
        root.delete("old_name").unwrap();

        assert!(!root.contains("old_name").unwrap());
        assert_eq!(
            root.search("new_name").unwrap().get().unwrap().as_str(),
            Some("payload")
        );
    }
}
