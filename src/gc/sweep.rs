use lopdf::Object;

use super::UsageSet;
use crate::config::defaults::TRAILER_KEYS;
use crate::store::ObjectStore;

/// Push the object number of every indirect reference inside `object`
fn collect_refs(object: &Object, pending: &mut Vec<u32>) {
    match object {
        Object::Reference((num, _)) => pending.push(*num),
        Object::Array(items) => {
            // Reversed so the stack pops them in document order
            for item in items.iter().rev() {
                collect_refs(item, pending);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_refs(value, pending);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_refs(value, pending);
            }
        }
        _ => {}
    }
}

/// Replace an indirect `/Length` in the stream at `num` by its value.
///
/// The length object is then no longer referenced from here, so it only
/// survives the sweep if something else points at it.
fn bake_length(store: &mut ObjectStore, num: u32) {
    let length_ref = match store.get(num) {
        Some(Object::Stream(stream)) => match stream.dict.get(b"Length") {
            Ok(Object::Reference(id)) => *id,
            _ => return,
        },
        _ => return,
    };

    let Some(length) = store.resolve(&Object::Reference(length_ref)).cloned() else {
        log::debug!(
            "Stream {} has unresolvable Length reference {} {} R",
            num,
            length_ref.0,
            length_ref.1
        );
        return;
    };

    if let Some(Object::Stream(stream)) = store.get_mut(num) {
        stream.dict.set("Length", length);
    }
}

/// Mark every object reachable from the trailer.
///
/// Traversal is depth first over an explicit stack; an object number that is
/// already marked is not visited again, which is what breaks reference cycles.
/// References to free slots or outside the table are ignored. Returns the
/// number of objects newly marked.
pub fn sweep(store: &mut ObjectStore, usage: &mut UsageSet) -> usize {
    let mut pending = Vec::new();
    for key in TRAILER_KEYS {
        if let Ok(value) = store.trailer().get(key) {
            collect_refs(value, &mut pending);
        }
    }

    let mut marked = 0;
    while let Some(num) = pending.pop() {
        if num == 0 || store.get(num).is_none() {
            log::debug!("Ignoring reference to missing object {}", num);
            continue;
        }
        if !usage.mark(num) {
            continue;
        }
        marked += 1;

        bake_length(store, num);

        if let Some(object) = store.get(num) {
            collect_refs(object, &mut pending);
        }
    }

    log::info!("Sweep marked {} of {} objects", usage.count(), store.len());
    marked
}
