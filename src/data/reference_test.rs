// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::data::value::NewValue;
    use crate::data::write::write_value;
    use crate::data::Data;
    use crate::pager::{Pager, SharedPager};

    fn scratch_pager(dir: &tempfile::TempDir) -> SharedPager {
        Rc::new(RefCell::new(
            Pager::create(dir.path().join("data.reedtree")).unwrap(),
        ))
    }

    #[test]
    fn test_same_offset_interns_to_same_reference() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);

        let written = write_value(&pager, &NewValue::from("shared")).unwrap();
        let offset = written.offset();

        let a = Data::load(&pager, offset);
        let b = Data::load(&pager, offset);
        assert!(a.same_as(&b));
        assert!(a.same_as(&written));
    }

    #[test]
    fn test_different_offsets_are_different_references() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);

        let a = write_value(&pager, &NewValue::from("one")).unwrap();
        let b = write_value(&pager, &NewValue::from("two")).unwrap();
        assert_ne!(a.offset(), b.offset());
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_interning_is_weak() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);

        let offset = {
            let data = write_value(&pager, &NewValue::from("transient")).unwrap();
            data.offset()
        };
        // All strong references are gone; a later load starts fresh
        // instead of resurrecting the dropped entry.
        let revived = Data::load(&pager, offset);
        assert_eq!(revived.get().unwrap().as_str(), Some("transient"));
    }

    #[test]
    fn test_primitive_get_does_not_cache() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);

        let data = write_value(&pager, &NewValue::from("value")).unwrap();
        assert_eq!(data.get().unwrap().as_str(), Some("value"));
        assert!(data.cached_value().is_none());
    }

    #[test]
    fn test_get_cached_populates_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);

        let data = write_value(&pager, &NewValue::from("key")).unwrap();
        assert_eq!(data.get_cached().unwrap().as_str(), Some("key"));
        assert!(data.cached_value().is_some());
    }

    #[test]
    fn test_compare_value_orders_against_keys() {
        let dir = tempfile::tempdir().unwrap();
        let pager = scratch_pager(&dir);

        let data = write_value(&pager, &NewValue::from("m")).unwrap();
        let less = NewValue::from("a").to_value().unwrap();
        let more = NewValue::from("z").to_value().unwrap();
        assert_eq!(
            data.compare_value(&less).unwrap(),
            std::cmp::Ordering::Greater
        );
        assert_eq!(
            data.compare_value(&more).unwrap(),
            std::cmp::Ordering::Less
        );
    }
}
