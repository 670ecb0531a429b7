//! One cleaning run: page subsetting, garbage collection, then serialization.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::CleanOptions;
use crate::error::Result;
use crate::gc::{self, RenumberMap, UsageSet};
use crate::pages::retain_pages;
use crate::store::ObjectStore;
use crate::writer::{PdfWriter, XrefTable};

/// State carried through the stages of a single run.
///
/// The usage set, renumber map and output xref all track the store's table
/// length and are rebuilt whenever compaction changes it.
pub struct Session {
    store: ObjectStore,
    options: CleanOptions,
    usage: UsageSet,
    renumber: RenumberMap,
    xref: XrefTable,
}

impl Session {
    pub fn new(store: ObjectStore, options: CleanOptions) -> Self {
        let len = store.len();
        Self {
            store,
            options,
            usage: UsageSet::new(len),
            renumber: RenumberMap::identity(len),
            xref: XrefTable::new(len),
        }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn usage(&self) -> &UsageSet {
        &self.usage
    }

    pub fn xref(&self) -> &XrefTable {
        &self.xref
    }

    /// Run every stage and write the result to `out`. Returns the bytes written.
    pub fn run<W: Write>(&mut self, out: W) -> Result<u64> {
        if let Some(spec) = self.options.pages.clone() {
            retain_pages(&mut self.store, &spec)?;
        }

        let garbage = self.options.garbage;
        if garbage.sweeps() {
            gc::sweep(&mut self.store, &mut self.usage);
        }

        if garbage.deduplicates() {
            gc::coalesce(&self.store, &mut self.usage, &mut self.renumber);
        }

        if garbage.compacts() {
            let plan = gc::plan(&self.usage, &self.renumber);
            gc::apply(&plan, &mut self.store, &mut self.usage);
            self.renumber = RenumberMap::identity(self.store.len());
        }

        self.xref = XrefTable::new(self.store.len());
        PdfWriter::new(&self.store, &self.options).write(&mut self.usage, &mut self.xref, out)
    }

    pub fn into_store(self) -> ObjectStore {
        self.store
    }
}

/// Clean an already loaded document and return the new file's bytes
pub fn clean(store: ObjectStore, options: &CleanOptions) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    Session::new(store, options.clone()).run(&mut out)?;
    Ok(out)
}

/// Read `input`, clean it and write the result to `output`.
///
/// Nothing is written to `output` unless the whole run succeeds.
pub fn clean_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    password: &str,
    options: &CleanOptions,
) -> Result<()> {
    let store = ObjectStore::open(input, password)?;
    let bytes = clean(store, options)?;
    fs::write(output, bytes)?;
    Ok(())
}
