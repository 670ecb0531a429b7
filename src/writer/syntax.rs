//! PDF object syntax printer.

use lopdf::{Dictionary, Object, StringFormat};

/// Layout used when printing objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintStyle {
    /// No optional whitespace
    #[default]
    Tight,
    /// One dictionary entry per line, indented by nesting depth
    Pretty,
}

fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\0')
}

fn is_regular(byte: u8) -> bool {
    !is_delimiter(byte) && !is_whitespace(byte)
}

struct Printer {
    out: Vec<u8>,
    style: PrintStyle,
    last_regular: bool,
}

impl Printer {
    fn new(style: PrintStyle) -> Self {
        Self {
            out: Vec::new(),
            style,
            last_regular: false,
        }
    }

    /// Append a token, separating it from the previous one only when both
    /// would otherwise run together
    fn push(&mut self, token: &[u8]) {
        let (Some(&first), Some(&last)) = (token.first(), token.last()) else {
            return;
        };
        if self.last_regular && is_regular(first) {
            self.out.push(b' ');
        }
        self.out.extend_from_slice(token);
        self.last_regular = is_regular(last);
    }

    fn space(&mut self) {
        self.out.push(b' ');
        self.last_regular = false;
    }

    fn newline(&mut self, depth: usize) {
        self.out.push(b'\n');
        self.out.extend(std::iter::repeat(b' ').take(depth * 2));
        self.last_regular = false;
    }

    fn name(&mut self, name: &[u8]) {
        let mut token = Vec::with_capacity(name.len() + 1);
        token.push(b'/');
        for &byte in name {
            if byte == b'#' || !(0x21..=0x7e).contains(&byte) || is_delimiter(byte) {
                token.extend_from_slice(format!("#{:02X}", byte).as_bytes());
            } else {
                token.push(byte);
            }
        }
        self.push(&token);
    }

    fn literal_string(&mut self, bytes: &[u8]) {
        let mut token = Vec::with_capacity(bytes.len() + 2);
        token.push(b'(');
        for &byte in bytes {
            match byte {
                b'(' | b')' | b'\\' => {
                    token.push(b'\\');
                    token.push(byte);
                }
                b'\n' => token.extend_from_slice(b"\\n"),
                b'\r' => token.extend_from_slice(b"\\r"),
                b'\t' => token.extend_from_slice(b"\\t"),
                b'\x08' => token.extend_from_slice(b"\\b"),
                b'\x0c' => token.extend_from_slice(b"\\f"),
                0..=31 | 127..=255 => {
                    token.extend_from_slice(format!("\\{:03o}", byte).as_bytes());
                }
                _ => token.push(byte),
            }
        }
        token.push(b')');
        self.push(&token);
    }

    fn hex_string(&mut self, bytes: &[u8]) {
        let mut token = String::with_capacity(bytes.len() * 2 + 2);
        token.push('<');
        for byte in bytes {
            token.push_str(&format!("{:02x}", byte));
        }
        token.push('>');
        self.push(token.as_bytes());
    }

    fn real(&mut self, text: String) {
        // Non-finite values have no PDF representation
        let valid = !text.is_empty()
            && text
                .bytes()
                .all(|b| b.is_ascii_digit() || b == b'-' || b == b'.');
        if valid {
            self.push(text.as_bytes());
        } else {
            self.push(b"0");
        }
    }

    fn array(&mut self, items: &[Object], depth: usize) {
        self.push(b"[");
        for (i, item) in items.iter().enumerate() {
            if i > 0 && self.style == PrintStyle::Pretty {
                self.space();
            }
            self.object(item, depth);
        }
        self.push(b"]");
    }

    fn dictionary(&mut self, dict: &Dictionary, depth: usize) {
        self.push(b"<<");
        if self.style == PrintStyle::Pretty && !dict.is_empty() {
            for (key, value) in dict.iter() {
                self.newline(depth + 1);
                self.name(key);
                self.space();
                self.object(value, depth + 1);
            }
            self.newline(depth);
        } else {
            for (key, value) in dict.iter() {
                self.name(key);
                self.object(value, depth);
            }
        }
        self.push(b">>");
    }

    fn object(&mut self, object: &Object, depth: usize) {
        match object {
            Object::Null => self.push(b"null"),
            Object::Boolean(true) => self.push(b"true"),
            Object::Boolean(false) => self.push(b"false"),
            Object::Integer(value) => self.push(value.to_string().as_bytes()),
            Object::Real(value) => self.real(value.to_string()),
            Object::Name(name) => self.name(name),
            Object::String(bytes, StringFormat::Literal) => self.literal_string(bytes),
            Object::String(bytes, StringFormat::Hexadecimal) => self.hex_string(bytes),
            Object::Array(items) => self.array(items, depth),
            Object::Dictionary(dict) => self.dictionary(dict, depth),
            Object::Stream(stream) => self.dictionary(&stream.dict, depth),
            Object::Reference((num, generation)) => {
                self.push(format!("{} {} R", num, generation).as_bytes())
            }
        }
    }
}

/// Print `object` in PDF syntax. Streams print as their dictionary only.
pub fn serialize(object: &Object, style: PrintStyle) -> Vec<u8> {
    let mut printer = Printer::new(style);
    printer.object(object, 0);
    printer.out
}

pub fn serialize_dict(dict: &Dictionary, style: PrintStyle) -> Vec<u8> {
    let mut printer = Printer::new(style);
    printer.dictionary(dict, 0);
    printer.out
}
