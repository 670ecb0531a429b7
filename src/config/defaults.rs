/// Output file used when no output path is given
pub const DEFAULT_OUTPUT_PATH: &str = "out.pdf";

/// Header version written when the source document does not report one
pub const DEFAULT_PDF_VERSION: &str = "1.7";

/// Comment line following the header, marking the file as binary
pub const BINARY_MARKER: &[u8] = b"%\xCE\xBC\xE1\xBF\xA6\n";

/// Input bytes per line of ASCII hex encoded stream data
pub const HEX_BYTES_PER_LINE: usize = 32;

/// Generation number carried by the head of the free list
pub const FREE_HEAD_GENERATION: u16 = 65535;

/// Trailer keys carried over into the rewritten trailer (besides Size)
pub const TRAILER_KEYS: [&[u8]; 3] = [b"Info", b"Root", b"ID"];
