//! Serialization of the cleaned object table into a classic PDF file.

mod stream;
mod syntax;
mod xref;

pub use stream::{add_hex_filter, hex_encode, is_binary, transcode, EncodedStream, StreamMode};
pub use syntax::{serialize, serialize_dict, PrintStyle};
pub use xref::{build_trailer, XrefRow, XrefTable};

use std::io::{self, Write};

use lopdf::Object;

use crate::config::defaults::BINARY_MARKER;
use crate::config::CleanOptions;
use crate::error::{CleanError, Result};
use crate::gc::UsageSet;
use crate::store::{ObjectStore, SlotKind};

/// Writer that keeps track of how many bytes went through it
pub struct CountingWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.position += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Object streams and cross-reference streams belong to the source file's own
/// layout; the rewritten file gets a fresh classic xref instead
fn is_structural(store: &ObjectStore, object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        _ => return false,
    };
    match dict.get(b"Type").ok().and_then(|t| store.resolve(t)) {
        Some(Object::Name(name)) => name == b"ObjStm" || name == b"XRef",
        _ => false,
    }
}

/// Serializes an [`ObjectStore`] with a freshly built xref table and trailer
pub struct PdfWriter<'a> {
    store: &'a ObjectStore,
    options: &'a CleanOptions,
    style: PrintStyle,
}

impl<'a> PdfWriter<'a> {
    pub fn new(store: &'a ObjectStore, options: &'a CleanOptions) -> Self {
        let style = if options.pretty() {
            PrintStyle::Pretty
        } else {
            PrintStyle::Tight
        };
        Self {
            store,
            options,
            style,
        }
    }

    /// Write the whole document to `out`, filling in `usage` and `xref` with
    /// what was actually written. Returns the number of bytes written.
    ///
    /// Without garbage collection every in-use slot is written; otherwise
    /// only the ones marked in `usage`. Object and xref streams are always
    /// left out.
    pub fn write<W: Write>(
        &self,
        usage: &mut UsageSet,
        xref: &mut XrefTable,
        out: W,
    ) -> Result<u64> {
        let mut out = CountingWriter::new(out);
        let collect = self.options.garbage.sweeps();

        writeln!(out, "%PDF-{}", self.store.version())?;
        out.write_all(BINARY_MARKER)?;
        out.write_all(b"\n")?;

        for num in 0..self.store.len() as u32 {
            let Some(entry) = self.store.entry(num) else {
                continue;
            };
            let generation = match entry.kind {
                SlotKind::Compressed { .. } => 0,
                _ => entry.generation,
            };
            xref.set_generation(num, generation);

            if collect && !usage.is_used(num) {
                continue;
            }
            if !entry.is_in_use() {
                usage.unmark(num);
                continue;
            }

            usage.mark(num);
            xref.record_offset(num, out.position());
            if !self.write_object(&mut out, num, generation)? {
                usage.unmark(num);
            }
        }

        xref.link_free_list(usage);

        let startxref = out.position();
        xref.write_to(&mut out)?;

        let trailer = build_trailer(self.store.trailer(), xref.len());
        out.write_all(b"trailer\n")?;
        out.write_all(&serialize_dict(&trailer, self.style))?;
        writeln!(out, "\nstartxref\n{}\n%%EOF", startxref)?;
        out.flush()?;

        log::info!(
            "Wrote {} objects, {} bytes",
            usage.count(),
            out.position()
        );
        Ok(out.position())
    }

    /// Write one object body; returns false when the object was skipped
    fn write_object<W: Write>(&self, out: &mut W, num: u32, generation: u16) -> Result<bool> {
        let object = self
            .store
            .get(num)
            .ok_or_else(|| CleanError::malformed(num, "object missing from table"))?;

        if is_structural(self.store, object) {
            log::debug!("Skipping structural object {}", num);
            return Ok(false);
        }

        writeln!(out, "{} {} obj", num, generation)?;
        match object {
            Object::Stream(_) => {
                let mode = if self.options.expand {
                    StreamMode::Expand
                } else {
                    StreamMode::Raw
                };
                let encoded = transcode(self.store, num, mode, self.options.ascii)?;
                out.write_all(&serialize_dict(&encoded.dict, self.style))?;
                out.write_all(b"\nstream\n")?;
                out.write_all(&encoded.data)?;
                out.write_all(b"\nendstream\nendobj\n\n")?;
            }
            _ => {
                out.write_all(&serialize(object, self.style))?;
                out.write_all(b"\nendobj\n\n")?;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GarbageLevel;
    use crate::store::tests::sample_document;
    use lopdf::{dictionary, Stream};

    fn write_all(store: &ObjectStore, options: &CleanOptions, usage: &mut UsageSet) -> (Vec<u8>, XrefTable) {
        let mut xref = XrefTable::new(store.len());
        let mut out = Vec::new();
        PdfWriter::new(store, options)
            .write(usage, &mut xref, &mut out)
            .unwrap();
        (out, xref)
    }

    #[test]
    fn test_counting_writer_tracks_position() {
        let mut out = CountingWriter::new(Vec::new());
        out.write_all(b"hello").unwrap();
        write!(out, " {}", 42).unwrap();
        assert_eq!(out.position(), 8);
        assert_eq!(out.into_inner(), b"hello 42".to_vec());
    }

    #[test]
    fn test_header_and_footer() {
        let store = ObjectStore::from_document(sample_document(1));
        let mut usage = UsageSet::new(store.len());
        let (out, _) = write_all(&store, &CleanOptions::default(), &mut usage);

        assert!(out.starts_with(b"%PDF-1.5\n%\xCE\xBC\xE1\xBF\xA6\n\n"));
        assert!(out.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_offsets_point_at_object_headers() {
        let store = ObjectStore::from_document(sample_document(2));
        let mut usage = UsageSet::new(store.len());
        let (out, xref) = write_all(&store, &CleanOptions::default(), &mut usage);

        for num in 1..store.len() as u32 {
            let row = xref.row(num).unwrap();
            assert!(row.in_use);
            let header = format!("{} 0 obj\n", num);
            let at = row.offset as usize;
            assert_eq!(&out[at..at + header.len()], header.as_bytes());
        }
    }

    #[test]
    fn test_startxref_points_at_table() {
        let store = ObjectStore::from_document(sample_document(1));
        let mut usage = UsageSet::new(store.len());
        let (out, _) = write_all(&store, &CleanOptions::default(), &mut usage);

        let text = String::from_utf8_lossy(&out);
        let tail = text.rsplit("startxref\n").next().unwrap();
        let offset: usize = tail.lines().next().unwrap().parse().unwrap();
        assert!(out[offset..].starts_with(b"xref\n0 "));
    }

    #[test]
    fn test_unused_objects_become_free_when_collecting() {
        let store = ObjectStore::from_document(sample_document(1));
        let mut usage = UsageSet::new(store.len());
        usage.mark(1);
        usage.mark(4);
        let options = CleanOptions {
            garbage: GarbageLevel::Mark,
            ..Default::default()
        };
        let (out, xref) = write_all(&store, &options, &mut usage);

        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("1 0 obj"));
        assert!(!text.contains("2 0 obj"));
        assert_eq!(xref.free_list(), vec![2, 3]);
    }

    #[test]
    fn test_object_streams_are_elided() {
        let mut doc = sample_document(1);
        let objstm = doc.add_object(Stream::new(
            dictionary! { "Type" => "ObjStm", "N" => 0, "First" => 0 },
            Vec::new(),
        ));
        let store = ObjectStore::from_document(doc);
        let mut usage = UsageSet::new(store.len());
        let (out, xref) = write_all(&store, &CleanOptions::default(), &mut usage);

        let text = String::from_utf8_lossy(&out);
        assert!(!text.contains(&format!("{} 0 obj", objstm.0)));
        assert!(!usage.is_used(objstm.0));
        assert!(!xref.row(objstm.0).unwrap().in_use);
    }

    #[test]
    fn test_stream_body_matches_length() {
        let mut doc = sample_document(0);
        let id = doc.add_object(Stream::new(dictionary! {}, vec![0u8, 1, 2, 3, 255]));
        let store = ObjectStore::from_document(doc);
        let mut usage = UsageSet::new(store.len());
        let options = CleanOptions {
            ascii: true,
            ..Default::default()
        };
        let (out, xref) = write_all(&store, &options, &mut usage);

        let at = xref.row(id.0).unwrap().offset as usize;
        let body = &out[at..];
        let start = body.windows(7).position(|w| w == b"stream\n").unwrap() + 7;
        let end = body.windows(10).position(|w| w == b"\nendstream").unwrap();
        assert_eq!(&body[start..end], b"0001020304ff>\n".as_slice());
        let dict_text = String::from_utf8_lossy(&body[..start]);
        assert!(dict_text.contains("/Length 14"));
        assert!(dict_text.contains("/Filter/ASCIIHexDecode"));
    }
}
