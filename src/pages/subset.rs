use lopdf::{Dictionary, Object};

use super::range::parse_page_ranges;
use crate::error::{CleanError, Result};
use crate::store::ObjectStore;

/// Rebuild the page tree so it only holds the pages named in `spec`.
///
/// The catalog is reduced to its `Type` and `Pages` entries, so outlines,
/// named destinations and the like can no longer keep dropped pages alive.
/// The root `Pages` node gets a flat `Kids` array listing the selected pages in
/// the order given (repeats included), and every kept page is re-parented onto
/// it. Must run before the sweep. Returns the number of pages kept.
pub fn retain_pages(store: &mut ObjectStore, spec: &str) -> Result<usize> {
    let ranges = parse_page_ranges(spec)?;
    let page_count = store.page_count();

    let root_ref = match store.trailer().get(b"Root") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(CleanError::MissingRoot),
    };
    let old_root = match store.get(root_ref.0) {
        Some(Object::Dictionary(dict)) => dict,
        _ => return Err(CleanError::malformed(root_ref.0, "catalog is not a dictionary")),
    };
    let pages_ref = match old_root.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(CleanError::malformed(root_ref.0, "catalog has no page tree")),
    };

    let mut root = Dictionary::new();
    if let Ok(kind) = old_root.get(b"Type") {
        root.set("Type", kind.clone());
    }
    root.set("Pages", Object::Reference(pages_ref));
    store.replace(root_ref.0, Object::Dictionary(root))?;

    let mut kids = Vec::new();
    for range in &ranges {
        let Some((first, last)) = range.resolve(page_count) else {
            log::debug!("Page range {:?} selects no pages", range);
            continue;
        };

        for page in first..=last {
            let page_ref = store
                .page_ref(page)
                .ok_or_else(|| CleanError::InvalidPageRange(format!("page {} not found", page)))?;

            match store.get_mut(page_ref.0) {
                Some(Object::Dictionary(page_dict)) => {
                    page_dict.set("Parent", Object::Reference(pages_ref));
                }
                _ => return Err(CleanError::malformed(page_ref.0, "page is not a dictionary")),
            }
            kids.push(Object::Reference(page_ref));
        }
    }

    if kids.is_empty() {
        return Err(CleanError::NoPagesSelected);
    }
    let kept = kids.len();

    match store.get_mut(pages_ref.0) {
        Some(Object::Dictionary(pages)) => {
            pages.set("Count", Object::Integer(kept as i64));
            pages.set("Kids", Object::Array(kids));
        }
        _ => return Err(CleanError::malformed(pages_ref.0, "page tree root is not a dictionary")),
    }

    log::info!("Kept {} of {} pages", kept, page_count);
    Ok(kept)
}
