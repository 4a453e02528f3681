// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::data::value::{NewValue, Value};
    use crate::data::write::{region_power, write_value};
    use crate::pager::{Pager, SharedPager};

    fn scratch_pager(dir: &tempfile::TempDir) -> SharedPager {
        Rc::new(RefCell::new(
            Pager::create(dir.path().join("data.reedtree")).unwrap(),
        ))
    }

    #[test]
    fn test_round_trip_string() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);
        let data = write_value(&pager, &NewValue::from("straße")).unwrap();
        assert_eq!(data.get().unwrap().as_str(), Some("straße"));
    }

    #[test]
    fn test_round_trip_number() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);
        let data = write_value(&pager, &NewValue::from(-12.5f32)).unwrap();
        assert_eq!(data.get().unwrap().as_number(), Some(-12.5));
    }

    #[test]
    fn test_round_trip_boolean() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);
        let data = write_value(&pager, &NewValue::from(true)).unwrap();
        assert_eq!(data.get().unwrap().as_bool(), Some(true));
        let data = write_value(&pager, &NewValue::from(false)).unwrap();
        assert_eq!(data.get().unwrap().as_bool(), Some(false));
    }

    #[test]
    fn test_round_trip_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);
        let payload = vec![0u8, 255, 128, 7];
        let data = write_value(&pager, &NewValue::from(payload.clone())).unwrap();
        assert_eq!(data.get().unwrap().as_bytes(), Some(payload.as_slice()));
    }

    #[test]
    fn test_round_trip_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);
        let data = write_value(&pager, &NewValue::Empty).unwrap();
        assert!(data.get().unwrap().is_empty_value());
    }

    #[test]
    fn test_existing_reference_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);

        let original = write_value(&pager, &NewValue::from("blob")).unwrap();
        let end_before = pager.borrow_mut().seek_end().unwrap();

        let reused = write_value(&pager, &NewValue::Existing(original.clone())).unwrap();
        let end_after = pager.borrow_mut().seek_end().unwrap();

        assert!(reused.same_as(&original));
        assert_eq!(end_before, end_after);
    }

    #[test]
    fn test_list_literal_builds_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);

        let items: Vec<NewValue> = (1..=5).map(NewValue::from).collect();
        let data = write_value(&pager, &NewValue::List(items)).unwrap();

        let Value::Array(array) = data.get().unwrap() else {
            panic!("expected an array value");
        };
        assert_eq!(array.len(), 5);
        assert_eq!(array.power(), 3);
        assert_eq!(array.get_value(0).unwrap().as_number(), Some(1.0));
        assert_eq!(array.get_value(4).unwrap().as_number(), Some(5.0));
    }

    #[test]
    fn test_map_literal_builds_a_searchable_tree() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);

        let entries = vec![
            (NewValue::from("a"), NewValue::from(1)),
            (NewValue::from("b"), NewValue::from(2)),
        ];
        let data = write_value(&pager, &NewValue::Map(entries)).unwrap();

        let Value::Tree(tree) = data.get().unwrap() else {
            panic!("expected a tree value");
        };
        assert_eq!(
            tree.search("a").unwrap().get().unwrap().as_number(),
            Some(1.0)
        );
        assert_eq!(
            tree.search("b").unwrap().get().unwrap().as_number(),
            Some(2.0)
        );
    }

    #[test]
    fn test_region_power_floors_at_three() {
        assert_eq!(region_power(0), 3);
        assert_eq!(region_power(1), 3);
        assert_eq!(region_power(8), 3);
        assert_eq!(region_power(9), 4);
        assert_eq!(region_power(65), 7);
        assert_eq!(region_power(128), 7);
        assert_eq!(region_power(129), 8);
    }
}
