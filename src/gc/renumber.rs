use lopdf::Object;

use super::{RenumberMap, UsageSet};
use crate::store::{Entry, ObjectStore};

/// New object number for every old one that survives compaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenumberPlan {
    ids: Vec<Option<u32>>,
    new_len: usize,
}

impl RenumberPlan {
    pub fn new_id(&self, num: u32) -> Option<u32> {
        self.ids.get(num as usize).copied().flatten()
    }

    /// Table length after compaction, counting the free-list head
    pub fn new_len(&self) -> usize {
        self.new_len
    }
}

/// Assign dense ids, starting at 1, to every used object in ascending order.
///
/// Objects merged away by [`super::coalesce`] take the id already given to the
/// object they were merged into; ascending order guarantees that object has
/// been numbered first. Unused, unmerged objects get no id.
pub fn plan(usage: &UsageSet, map: &RenumberMap) -> RenumberPlan {
    let len = usage.len();
    let mut ids = vec![None; len];
    let mut next = 1u32;

    for num in 1..len as u32 {
        if !map.is_fixed_point(num) {
            let canonical = ids.get(map.target(num) as usize).copied().flatten();
            ids[num as usize] = canonical;
        } else if usage.is_used(num) {
            ids[num as usize] = Some(next);
            next += 1;
        }
    }

    log::debug!("Renumbering {} objects into {} slots", len, next);
    RenumberPlan {
        ids,
        new_len: next as usize,
    }
}

fn renumber_object(object: &mut Object, plan: &RenumberPlan) {
    match object {
        Object::Reference((num, _)) => {
            let new_id = plan.new_id(*num);
            *object = match new_id {
                Some(id) => Object::Reference((id, 0)),
                None => Object::Null,
            };
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                renumber_object(item, plan);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                renumber_object(value, plan);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                renumber_object(value, plan);
            }
        }
        _ => {}
    }
}

/// Rewrite every reference per `plan`, then repack the table so that each
/// used object sits at its new number with generation 0.
///
/// References to objects that did not survive become `null`. Afterwards the
/// usage set covers the new table with every slot but 0 marked.
pub fn apply(plan: &RenumberPlan, store: &mut ObjectStore, usage: &mut UsageSet) {
    for (_, value) in store.trailer_mut().iter_mut() {
        renumber_object(value, plan);
    }
    for object in store.objects_mut() {
        renumber_object(object, plan);
    }

    let mut old_table = store.take_table();
    let mut table: Vec<Entry> = (0..plan.new_len()).map(|_| Entry::free()).collect();
    if let Some(head) = old_table.first_mut() {
        table[0] = std::mem::replace(head, Entry::free());
    }

    for (num, entry) in old_table.into_iter().enumerate().skip(1) {
        let num = num as u32;
        if !usage.is_used(num) {
            continue;
        }
        if let Some(id) = plan.new_id(num) {
            let mut entry = entry;
            entry.generation = 0;
            table[id as usize] = entry;
        }
    }

    for page in store.pages_mut().iter_mut() {
        if let Some(id) = plan.new_id(page.0) {
            *page = (id, 0);
        }
    }

    log::info!("Compacted object table to {} slots", table.len());
    store.install_table(table);
    *usage = UsageSet::all_used(store.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::{coalesce, sweep};
    use crate::store::tests::sample_document;
    use lopdf::dictionary;

    #[test]
    fn test_plan_is_dense_and_ascending() {
        let mut usage = UsageSet::new(8);
        for num in [2, 3, 5, 7] {
            usage.mark(num);
        }
        let plan = plan(&usage, &RenumberMap::identity(8));

        assert_eq!(plan.new_id(2), Some(1));
        assert_eq!(plan.new_id(3), Some(2));
        assert_eq!(plan.new_id(5), Some(3));
        assert_eq!(plan.new_id(7), Some(4));
        assert_eq!(plan.new_id(1), None);
        assert_eq!(plan.new_id(6), None);
        assert_eq!(plan.new_len(), 5);
    }

    #[test]
    fn test_plan_resolves_merges_to_canonical_id() {
        let mut usage = UsageSet::new(6);
        for num in [1, 3, 4] {
            usage.mark(num);
        }
        let mut map = RenumberMap::identity(6);
        // 5 was merged into 3 and unmarked
        map.merge(5, 3);
        let plan = plan(&usage, &map);

        assert_eq!(plan.new_id(3), Some(2));
        assert_eq!(plan.new_id(5), Some(2));
        assert_eq!(plan.new_id(4), Some(3));
        assert_eq!(plan.new_len(), 4);
    }

    #[test]
    fn test_apply_repacks_and_rewrites_references() {
        let mut doc = sample_document(2);
        let orphan = doc.add_object(dictionary! { "Unused" => true });
        let extra = doc.add_object(dictionary! { "Kept" => true });
        let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        if let Ok(Object::Dictionary(catalog)) = doc.get_object_mut(root) {
            catalog.set("Extra", extra);
        }

        let mut store = ObjectStore::from_document(doc);
        let mut usage = UsageSet::new(store.len());
        sweep(&mut store, &mut usage);
        assert!(!usage.is_used(orphan.0));

        let plan = plan(&usage, &RenumberMap::identity(store.len()));
        assert_eq!(plan.new_id(extra.0), Some(orphan.0));
        apply(&plan, &mut store, &mut usage);

        assert_eq!(store.len(), 8);
        assert_eq!(usage.count(), 7);
        let root = store.trailer().get(b"Root").unwrap().as_reference().unwrap();
        assert_eq!(root.1, 0);
        match store.get(root.0) {
            Some(Object::Dictionary(catalog)) => {
                let moved = catalog.get(b"Extra").unwrap().as_reference().unwrap();
                assert_eq!(moved, (orphan.0, 0));
            }
            other => panic!("expected catalog, got {:?}", other),
        }
        assert!(matches!(
            store.get(orphan.0),
            Some(Object::Dictionary(dict)) if dict.has(b"Kept")
        ));
        for num in 1..store.len() as u32 {
            assert_eq!(store.entry(num).unwrap().generation, 0);
            assert!(store.get(num).is_some());
        }
    }

    #[test]
    fn test_dropped_references_become_null() {
        let mut doc = sample_document(1);
        let target = doc.add_object(dictionary! { "Gone" => true });
        let holder = doc.add_object(dictionary! { "Ref" => target });
        let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        if let Ok(Object::Dictionary(catalog)) = doc.get_object_mut(root) {
            catalog.set("Holder", holder);
        }

        let mut store = ObjectStore::from_document(doc);
        let mut usage = UsageSet::new(store.len());
        sweep(&mut store, &mut usage);
        usage.unmark(target.0);
        let plan = plan(&usage, &RenumberMap::identity(store.len()));
        let new_holder = plan.new_id(holder.0).unwrap();
        apply(&plan, &mut store, &mut usage);

        match store.get(new_holder) {
            Some(Object::Dictionary(dict)) => {
                assert!(matches!(dict.get(b"Ref"), Ok(Object::Null)));
            }
            other => panic!("expected dictionary, got {:?}", other),
        }
    }

    #[test]
    fn test_coalesced_references_point_at_survivor() {
        let mut doc = sample_document(1);
        let a = doc.add_object(dictionary! { "Same" => 1 });
        let b = doc.add_object(dictionary! { "Same" => 1 });
        let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        if let Ok(Object::Dictionary(catalog)) = doc.get_object_mut(root) {
            catalog.set("A", a);
            catalog.set("B", b);
        }

        let mut store = ObjectStore::from_document(doc);
        let mut usage = UsageSet::new(store.len());
        sweep(&mut store, &mut usage);
        let mut map = RenumberMap::identity(store.len());
        coalesce(&store, &mut usage, &mut map);
        let plan = plan(&usage, &map);
        apply(&plan, &mut store, &mut usage);

        let root = store.trailer().get(b"Root").unwrap().as_reference().unwrap();
        let catalog = match store.get(root.0) {
            Some(Object::Dictionary(dict)) => dict.clone(),
            other => panic!("expected catalog, got {:?}", other),
        };
        let a_ref = catalog.get(b"A").unwrap().as_reference().unwrap();
        let b_ref = catalog.get(b"B").unwrap().as_reference().unwrap();
        assert_eq!(a_ref, b_ref);
        assert_eq!(store.len(), 6);
    }
}
