use lopdf::{Dictionary, Object};

use super::{RenumberMap, UsageSet};
use crate::store::ObjectStore;

fn dicts_equal(a: &Dictionary, b: &Dictionary) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_ok_and(|other| objects_equal(value, other)))
}

/// Deep structural equality.
///
/// Types must match exactly (an integer never equals a real), array order
/// matters, dictionary key order does not, and strings compare by bytes
/// regardless of literal or hex notation. References compare by object
/// number and generation; they are not followed. Streams never compare equal.
pub fn objects_equal(a: &Object, b: &Object) -> bool {
    match (a, b) {
        (Object::Null, Object::Null) => true,
        (Object::Boolean(x), Object::Boolean(y)) => x == y,
        (Object::Integer(x), Object::Integer(y)) => x == y,
        (Object::Real(x), Object::Real(y)) => x == y,
        (Object::Name(x), Object::Name(y)) => x == y,
        (Object::String(x, _), Object::String(y, _)) => x == y,
        (Object::Reference(x), Object::Reference(y)) => x == y,
        (Object::Array(x), Object::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| objects_equal(p, q))
        }
        (Object::Dictionary(x), Object::Dictionary(y)) => dicts_equal(x, y),
        _ => false,
    }
}

/// Merge structurally identical non-stream objects into the lowest numbered copy.
///
/// Each used object is compared against every used object below it; on the
/// first match both point at the lower number in `map` and the higher one is
/// unmarked. An object is merged at most once per call. Streams are skipped
/// entirely since comparing payloads is too costly. Returns the number of
/// merges performed.
pub fn coalesce(store: &ObjectStore, usage: &mut UsageSet, map: &mut RenumberMap) -> usize {
    let mut merged = 0;

    for num in 1..store.len() as u32 {
        if !usage.is_used(num) || store.is_stream(num) {
            continue;
        }
        let Some(a) = store.resolve_num(num) else {
            continue;
        };

        for other in 1..num {
            if !usage.is_used(other) || store.is_stream(other) {
                continue;
            }
            let Some(b) = store.resolve_num(other) else {
                continue;
            };
            if !objects_equal(a, b) {
                continue;
            }

            log::debug!("Object {} duplicates object {}", num, other);
            map.merge(num, other);
            map.merge(other, other);
            usage.unmark(num);
            merged += 1;
            break;
        }
    }

    log::info!("Merged {} duplicate objects", merged);
    merged
}
