//! Dense object table built on top of a loaded `lopdf` document.
//!
//! lopdf parses the file, decrypts it and materializes every object (including
//! the ones packed into object streams). This module turns that into a table
//! indexed by object number, which is what the collector and writer work on.

use std::path::Path;

use lopdf::xref::XrefEntry;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::config::defaults::{DEFAULT_PDF_VERSION, FREE_HEAD_GENERATION};
use crate::error::{CleanError, Result};

/// Where an object lived in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Free,
    Direct { offset: u32 },
    Compressed { container: u32 },
}

/// One row of the object table
#[derive(Debug, Clone)]
pub struct Entry {
    pub kind: SlotKind,
    pub generation: u16,
    pub object: Option<Object>,
}

impl Entry {
    pub fn free() -> Self {
        Self {
            kind: SlotKind::Free,
            generation: 0,
            object: None,
        }
    }

    /// Direct and compressed slots hold real objects; free slots do not
    pub fn is_in_use(&self) -> bool {
        !matches!(self.kind, SlotKind::Free)
    }
}

#[derive(Debug)]
pub struct ObjectStore {
    table: Vec<Entry>,
    trailer: Dictionary,
    version: String,
    pages: Vec<ObjectId>,
}

impl ObjectStore {
    /// Open a PDF file, decrypting it with `password` when it is encrypted
    pub fn open<P: AsRef<Path>>(path: P, password: &str) -> Result<Self> {
        let doc = Document::load(path)?;
        Self::unlock(doc, password)
    }

    /// Same as [`ObjectStore::open`] for a document already in memory
    pub fn load_mem(bytes: &[u8], password: &str) -> Result<Self> {
        let doc = Document::load_mem(bytes)?;
        Self::unlock(doc, password)
    }

    /// Encrypted documents are always decrypted, with the empty password when
    /// none was given; a wrong password fails the load
    fn unlock(mut doc: Document, password: &str) -> Result<Self> {
        if doc.is_encrypted() {
            log::debug!("Decrypting document");
            doc.decrypt(password)?;
        }
        Ok(Self::from_document(doc))
    }

    /// Take ownership of every object in `doc` and index it by object number
    pub fn from_document(mut doc: Document) -> Self {
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let objects = std::mem::take(&mut doc.objects);

        let highest = objects.keys().map(|(num, _)| *num).max().unwrap_or(0);
        let len = (doc.reference_table.size as usize)
            .max(highest as usize + 1)
            .max(1);

        let mut table: Vec<Entry> = (0..len).map(|_| Entry::free()).collect();
        table[0].generation = FREE_HEAD_GENERATION;

        for (&num, xref_entry) in doc.reference_table.entries.iter() {
            let Some(entry) = table.get_mut(num as usize).filter(|_| num != 0) else {
                continue;
            };
            match xref_entry {
                XrefEntry::Normal { offset, generation } => {
                    entry.kind = SlotKind::Direct { offset: *offset };
                    entry.generation = *generation;
                }
                XrefEntry::Compressed { container, .. } => {
                    entry.kind = SlotKind::Compressed {
                        container: *container,
                    };
                    entry.generation = 0;
                }
                _ => {}
            }
        }

        for ((num, generation), object) in objects {
            if num == 0 {
                log::debug!("Ignoring object stored at reserved slot 0");
                continue;
            }
            let entry = &mut table[num as usize];
            if entry.kind == SlotKind::Free {
                // Built in memory or recovered without an xref row
                entry.kind = SlotKind::Direct { offset: 0 };
                entry.generation = generation;
            }
            entry.object = Some(object);
        }

        for (num, entry) in table.iter_mut().enumerate() {
            if entry.is_in_use() && entry.object.is_none() {
                log::debug!("Object {} listed in xref but not loaded, treating as free", num);
                entry.kind = SlotKind::Free;
            }
        }

        let version = if doc.version.trim().is_empty() {
            DEFAULT_PDF_VERSION.to_string()
        } else {
            doc.version.trim().to_string()
        };

        log::info!(
            "Loaded object table with {} slots and {} pages",
            table.len(),
            pages.len()
        );

        Self {
            table,
            trailer: doc.trailer,
            version,
            pages,
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when the table holds nothing besides the free-list head at slot 0
    pub fn is_empty(&self) -> bool {
        self.table.len() <= 1
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    pub fn entry(&self, num: u32) -> Option<&Entry> {
        self.table.get(num as usize)
    }

    pub fn entry_mut(&mut self, num: u32) -> Option<&mut Entry> {
        self.table.get_mut(num as usize)
    }

    /// The object stored at `num`, if the slot exists and holds one
    pub fn get(&self, num: u32) -> Option<&Object> {
        self.entry(num).and_then(|e| e.object.as_ref())
    }

    pub fn get_mut(&mut self, num: u32) -> Option<&mut Object> {
        self.entry_mut(num).and_then(|e| e.object.as_mut())
    }

    /// Replace the object stored at `num`, keeping the slot's kind
    pub fn replace(&mut self, num: u32, object: Object) -> Result<()> {
        match self.entry_mut(num) {
            Some(entry) if entry.is_in_use() => {
                entry.object = Some(object);
                Ok(())
            }
            _ => Err(CleanError::malformed(num, "cannot update a free or missing slot")),
        }
    }

    /// Follow indirect references until a direct value is reached.
    ///
    /// Returns `None` for references to free or out-of-range slots and for
    /// reference chains that loop back on themselves.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        let mut current = object;
        let mut hops = 0;
        while let Object::Reference((num, _)) = current {
            hops += 1;
            if hops > self.table.len() {
                return None;
            }
            current = self.get(*num)?;
        }
        Some(current)
    }

    /// Resolve the object stored at `num` to a direct value
    pub fn resolve_num(&self, num: u32) -> Option<&Object> {
        self.get(num).and_then(|obj| self.resolve(obj))
    }

    pub fn is_stream(&self, num: u32) -> bool {
        matches!(self.get(num), Some(Object::Stream(_)))
    }

    /// Encoded payload of the stream at `num`, exactly as it appears in the source
    pub fn raw_stream(&self, num: u32) -> Result<&[u8]> {
        match self.get(num) {
            Some(Object::Stream(stream)) => Ok(&stream.content),
            _ => Err(CleanError::malformed(num, "not a stream")),
        }
    }

    /// Payload of the stream at `num` with its whole filter chain applied
    pub fn decoded_stream(&self, num: u32) -> Result<Vec<u8>> {
        let stream = match self.get(num) {
            Some(Object::Stream(stream)) => stream,
            _ => return Err(CleanError::malformed(num, "not a stream")),
        };
        if !stream.dict.has(b"Filter") {
            return Ok(stream.content.clone());
        }
        stream
            .decompressed_content()
            .map_err(|e| CleanError::StreamDecode {
                num,
                reason: e.to_string(),
            })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Reference to page `page` (1-based) in document order
    pub fn page_ref(&self, page: u32) -> Option<ObjectId> {
        let index = page.checked_sub(1)? as usize;
        self.pages.get(index).copied()
    }

    /// Swap in a repacked table, releasing the old one
    pub(crate) fn install_table(&mut self, table: Vec<Entry>) {
        self.table = table;
    }

    pub(crate) fn take_table(&mut self) -> Vec<Entry> {
        std::mem::take(&mut self.table)
    }

    pub(crate) fn objects_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.table.iter_mut().filter_map(|e| e.object.as_mut())
    }

    pub(crate) fn pages_mut(&mut self) -> &mut Vec<ObjectId> {
        &mut self.pages
    }
}
