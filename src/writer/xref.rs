use std::io::{self, Write};

use lopdf::{Dictionary, Object};

use crate::config::defaults::TRAILER_KEYS;
use crate::gc::UsageSet;

/// One row of the output cross-reference table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XrefRow {
    /// Byte offset for objects in use, next free slot for free rows
    pub offset: u64,
    pub generation: u16,
    pub in_use: bool,
}

/// Output position table: where each object number ended up in the new file
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    rows: Vec<XrefRow>,
}

impl XrefTable {
    pub fn new(len: usize) -> Self {
        Self {
            rows: vec![XrefRow::default(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, num: u32) -> Option<&XrefRow> {
        self.rows.get(num as usize)
    }

    pub fn set_generation(&mut self, num: u32, generation: u16) {
        if let Some(row) = self.rows.get_mut(num as usize) {
            row.generation = generation;
        }
    }

    pub fn record_offset(&mut self, num: u32, offset: u64) {
        if let Some(row) = self.rows.get_mut(num as usize) {
            row.offset = offset;
        }
    }

    /// Thread every slot not in `usage` into the free list rooted at slot 0.
    ///
    /// Free rows get their generation bumped (saturating) and point at the
    /// next free slot; the last one points back at 0.
    pub fn link_free_list(&mut self, usage: &UsageSet) {
        let mut last_free = 0usize;
        for (num, row) in self.rows.iter_mut().enumerate() {
            row.in_use = usage.is_used(num as u32);
        }

        for num in 0..self.rows.len() {
            if self.rows[num].in_use {
                continue;
            }
            self.rows[num].generation = self.rows[num].generation.saturating_add(1);
            if num != 0 {
                self.rows[last_free].offset = num as u64;
                last_free = num;
            }
        }

        if let Some(row) = self.rows.get_mut(last_free) {
            row.offset = 0;
        }
    }

    /// Free slots in list order, starting after the head
    pub fn free_list(&self) -> Vec<u32> {
        let mut slots = Vec::new();
        let Some(head) = self.rows.first() else {
            return slots;
        };
        let mut next = head.offset;
        while next != 0 && slots.len() < self.rows.len() {
            slots.push(next as u32);
            next = self.rows[next as usize].offset;
        }
        slots
    }

    /// Write the `xref` section: one 20 byte row per object number
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "xref\n0 {}", self.rows.len())?;
        for row in &self.rows {
            let kind = if row.in_use { 'n' } else { 'f' };
            writeln!(out, "{:010} {:05} {} ", row.offset, row.generation, kind)?;
        }
        out.write_all(b"\n")
    }
}

/// Trailer for the rewritten file: `Size` plus whichever of `Info`, `Root`
/// and `ID` the source trailer had. Everything else is dropped.
pub fn build_trailer(source: &Dictionary, size: usize) -> Dictionary {
    let mut trailer = Dictionary::new();
    trailer.set("Size", Object::Integer(size as i64));
    for key in TRAILER_KEYS {
        if let Ok(value) = source.get(key) {
            trailer.set(key.to_vec(), value.clone());
        }
    }
    trailer
}
