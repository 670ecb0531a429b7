//! Stream payload transcoding: raw copy, full decode, ASCII hex wrapping.

use std::borrow::Cow;

use lopdf::{Dictionary, Object};

use crate::config::defaults::HEX_BYTES_PER_LINE;
use crate::error::{CleanError, Result};
use crate::store::ObjectStore;

/// How a stream payload is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Copy the encoded bytes untouched
    Raw,
    /// Decode the whole filter chain and drop it from the dictionary
    Expand,
}

/// Image codecs whose encoded form is kept as is, even when expanding.
///
/// JPEG 2000 is opaque by choice; the others are listed too because the
/// decoder behind the store cannot undo them, which would otherwise make
/// expanding any file with such an image fail.
const OPAQUE_FILTERS: [&[u8]; 4] = [b"JPXDecode", b"DCTDecode", b"JBIG2Decode", b"CCITTFaxDecode"];

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// A stream ready to be written: its final dictionary and payload
#[derive(Debug)]
pub struct EncodedStream<'a> {
    pub dict: Dictionary,
    pub data: Cow<'a, [u8]>,
}

/// Bytes other than newline, carriage return and tab below 32, or above 127
fn is_binary_byte(byte: u8) -> bool {
    if matches!(byte, b'\n' | b'\r' | b'\t') {
        return false;
    }
    !(32..=127).contains(&byte)
}

pub fn is_binary(data: &[u8]) -> bool {
    data.iter().any(|b| is_binary_byte(*b))
}

/// Lowercase hex, a line break after every 32 input bytes, closed by `>` and a newline
pub fn hex_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2 + data.len() / HEX_BYTES_PER_LINE + 2);
    for (i, byte) in data.iter().enumerate() {
        out.push(HEX_DIGITS[(byte >> 4) as usize]);
        out.push(HEX_DIGITS[(byte & 15) as usize]);
        if (i + 1) % HEX_BYTES_PER_LINE == 0 {
            out.push(b'\n');
        }
    }
    out.push(b'>');
    out.push(b'\n');
    out
}

/// Filter names of the chain, in application order
fn filter_names(store: &ObjectStore, dict: &Dictionary) -> Vec<Vec<u8>> {
    let Some(filter) = dict.get(b"Filter").ok().and_then(|f| store.resolve(f)) else {
        return Vec::new();
    };
    match filter {
        Object::Name(name) => vec![name.clone()],
        Object::Array(items) => items
            .iter()
            .filter_map(|item| match store.resolve(item) {
                Some(Object::Name(name)) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Whether decoding is skipped for this chain: the last filter is an image codec
fn keeps_encoded_form(store: &ObjectStore, dict: &Dictionary) -> bool {
    filter_names(store, dict)
        .last()
        .is_some_and(|last| OPAQUE_FILTERS.contains(&last.as_slice()))
}

/// Put `ASCIIHexDecode` at the front of the filter chain, padding `DecodeParms` to match
pub fn add_hex_filter(store: &ObjectStore, dict: &mut Dictionary) {
    let hex = Object::Name(b"ASCIIHexDecode".to_vec());
    let filter = dict
        .get(b"Filter")
        .ok()
        .and_then(|f| store.resolve(f))
        .cloned();
    let parms = dict
        .get(b"DecodeParms")
        .ok()
        .and_then(|p| store.resolve(p))
        .cloned()
        .filter(|p| !matches!(p, Object::Null));

    match filter {
        Some(Object::Name(name)) => {
            dict.set("Filter", Object::Array(vec![hex, Object::Name(name)]));
            if let Some(parms) = parms {
                dict.set("DecodeParms", Object::Array(vec![Object::Null, parms]));
            }
        }
        Some(Object::Array(mut chain)) => {
            chain.insert(0, hex);
            dict.set("Filter", Object::Array(chain));
            if let Some(Object::Array(mut parms)) = parms {
                parms.insert(0, Object::Null);
                dict.set("DecodeParms", Object::Array(parms));
            }
        }
        _ => dict.set("Filter", hex),
    }
}

/// Produce the dictionary and payload to write for the stream stored at `num`.
///
/// `Length` is always set to the exact size of the returned payload.
pub fn transcode<'a>(
    store: &'a ObjectStore,
    num: u32,
    mode: StreamMode,
    ascii: bool,
) -> Result<EncodedStream<'a>> {
    let stream = match store.get(num) {
        Some(Object::Stream(stream)) => stream,
        _ => return Err(CleanError::malformed(num, "not a stream")),
    };
    let mut dict = stream.dict.clone();

    let mode = if mode == StreamMode::Expand && keeps_encoded_form(store, &dict) {
        log::debug!("Keeping image stream {} encoded", num);
        StreamMode::Raw
    } else {
        mode
    };

    let mut data: Cow<'a, [u8]> = match mode {
        StreamMode::Raw => Cow::Borrowed(store.raw_stream(num)?),
        StreamMode::Expand => {
            let decoded = store.decoded_stream(num)?;
            dict.remove(b"Filter");
            dict.remove(b"DecodeParms");
            Cow::Owned(decoded)
        }
    };

    if ascii && is_binary(&data) {
        data = Cow::Owned(hex_encode(&data));
        add_hex_filter(store, &mut dict);
    }

    dict.set("Length", Object::Integer(data.len() as i64));
    Ok(EncodedStream { dict, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Stream};

    fn hex_decode(encoded: &[u8]) -> Vec<u8> {
        let digits: Vec<u8> = encoded
            .iter()
            .copied()
            .take_while(|b| *b != b'>')
            .filter(|b| b.is_ascii_hexdigit())
            .collect();
        digits
            .chunks(2)
            .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
            .collect()
    }

    fn store_with(stream: Stream) -> (ObjectStore, u32) {
        let mut doc = Document::with_version("1.4");
        let id = doc.add_object(stream);
        (ObjectStore::from_document(doc), id.0)
    }

    #[test]
    fn test_binary_detection() {
        assert!(!is_binary(b"BT /F1 12 Tf (Hi) Tj ET\r\n\t"));
        assert!(is_binary(&[b'a', 0x00]));
        assert!(is_binary(&[0xff]));
        assert!(!is_binary(&[127]));
    }

    #[test]
    fn test_hex_encode_layout() {
        assert_eq!(hex_encode(&[0x00, 0xab]), b"00ab>\n".to_vec());

        let encoded = hex_encode(&[0x11; 33]);
        let text = String::from_utf8(encoded).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines[0].len(), 64);
        assert_eq!(lines[1], "11>");
    }

    #[test]
    fn test_hex_round_trip() {
        let payload: Vec<u8> = (0..=255u8).collect();
        assert_eq!(hex_decode(&hex_encode(&payload)), payload);
    }

    #[test]
    fn test_raw_copy_recomputes_length() {
        let mut stream = Stream::new(dictionary! { "Filter" => "FlateDecode" }, vec![1, 2, 3]);
        stream.dict.set("Length", 99);
        let (store, num) = store_with(stream);

        let encoded = transcode(&store, num, StreamMode::Raw, false).unwrap();
        assert_eq!(&*encoded.data, &[1, 2, 3]);
        assert!(matches!(encoded.dict.get(b"Length"), Ok(Object::Integer(3))));
        assert!(encoded.dict.has(b"Filter"));
    }

    #[test]
    fn test_expand_drops_filters() {
        let content = b"q 1 0 0 1 0 0 cm Q\n".repeat(50);
        let mut stream = Stream::new(dictionary! {}, content.clone());
        stream.compress().unwrap();
        assert!(stream.dict.has(b"Filter"));
        let (store, num) = store_with(stream);

        let encoded = transcode(&store, num, StreamMode::Expand, false).unwrap();
        assert_eq!(&*encoded.data, content.as_slice());
        assert!(!encoded.dict.has(b"Filter"));
        assert!(!encoded.dict.has(b"DecodeParms"));
        assert_eq!(encoded.dict.get(b"Length").unwrap().as_i64().unwrap(), 950);
    }

    #[test]
    fn test_jpx_is_never_expanded() {
        let stream = Stream::new(dictionary! { "Filter" => "JPXDecode" }, vec![0xff, 0x4f, 0xff, 0x51]);
        let (store, num) = store_with(stream);

        let encoded = transcode(&store, num, StreamMode::Expand, false).unwrap();
        assert_eq!(&*encoded.data, &[0xff, 0x4f, 0xff, 0x51]);
        assert!(encoded.dict.has(b"Filter"));
    }

    #[test]
    fn test_undecodable_image_codecs_stay_encoded() {
        let stream = Stream::new(
            dictionary! { "Filter" => Object::Array(vec!["FlateDecode".into(), "DCTDecode".into()]) },
            vec![0xff, 0xd8, 0xff, 0xe0],
        );
        let (store, num) = store_with(stream);

        let encoded = transcode(&store, num, StreamMode::Expand, false).unwrap();
        assert_eq!(&*encoded.data, &[0xff, 0xd8, 0xff, 0xe0]);
        assert_eq!(encoded.dict.get(b"Filter").unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_ascii_without_filter() {
        let payload = vec![0u8, 1, 2, 200];
        let (store, num) = store_with(Stream::new(dictionary! {}, payload.clone()));

        let encoded = transcode(&store, num, StreamMode::Raw, true).unwrap();
        assert!(matches!(encoded.dict.get(b"Filter"), Ok(Object::Name(n)) if n == b"ASCIIHexDecode"));
        assert_eq!(
            encoded.dict.get(b"Length").unwrap().as_i64().unwrap(),
            encoded.data.len() as i64
        );
        assert_eq!(hex_decode(&encoded.data), payload);
    }

    #[test]
    fn test_ascii_leaves_text_alone() {
        let (store, num) = store_with(Stream::new(dictionary! {}, b"BT ET\n".to_vec()));
        let encoded = transcode(&store, num, StreamMode::Raw, true).unwrap();
        assert_eq!(&*encoded.data, b"BT ET\n");
        assert!(!encoded.dict.has(b"Filter"));
    }

    #[test]
    fn test_hex_filter_prepended_to_single_name() {
        let store = ObjectStore::from_document(Document::with_version("1.4"));
        let mut dict = dictionary! {
            "Filter" => "FlateDecode",
            "DecodeParms" => dictionary! { "Predictor" => 12 },
        };
        add_hex_filter(&store, &mut dict);

        let chain = dict.get(b"Filter").unwrap().as_array().unwrap();
        assert_eq!(chain.len(), 2);
        assert!(matches!(&chain[0], Object::Name(n) if n == b"ASCIIHexDecode"));
        assert!(matches!(&chain[1], Object::Name(n) if n == b"FlateDecode"));
        let parms = dict.get(b"DecodeParms").unwrap().as_array().unwrap();
        assert!(matches!(parms[0], Object::Null));
        assert!(matches!(parms[1], Object::Dictionary(_)));
    }

    #[test]
    fn test_hex_filter_inserted_into_chain() {
        let store = ObjectStore::from_document(Document::with_version("1.4"));
        let mut dict = dictionary! {
            "Filter" => Object::Array(vec!["ASCII85Decode".into(), "FlateDecode".into()]),
            "DecodeParms" => Object::Array(vec![Object::Null, Object::Null]),
        };
        add_hex_filter(&store, &mut dict);

        let chain = dict.get(b"Filter").unwrap().as_array().unwrap();
        assert_eq!(chain.len(), 3);
        assert!(matches!(&chain[0], Object::Name(n) if n == b"ASCIIHexDecode"));
        assert_eq!(dict.get(b"DecodeParms").unwrap().as_array().unwrap().len(), 3);
    }
}
