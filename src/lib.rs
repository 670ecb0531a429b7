pub mod cli;
pub mod config;
pub mod error;
pub mod gc;
pub mod pages;
pub mod session;
pub mod store;
pub mod writer;

pub use config::{CleanOptions, GarbageLevel};
pub use error::{CleanError, Result};
pub use session::{clean, clean_file, Session};
pub use store::ObjectStore;

/// High-level API for cleaning a PDF held in memory.
///
/// This is the recommended entry point for library consumers. It loads the
/// document, optionally decrypts it, runs page subsetting and garbage
/// collection as requested by `options`, and returns the rewritten file.
///
/// # Arguments
///
/// * `bytes` - Contents of the source PDF
/// * `password` - Password for encrypted files; empty when there is none
/// * `options` - Garbage collection level, stream handling and page selection
///
/// # Returns
///
/// The cleaned PDF as bytes, or a CleanError on failure.
///
/// # Example
///
/// ```no_run
/// use pdf_clean::{clean_document, CleanOptions, GarbageLevel};
///
/// let input = std::fs::read("in.pdf").unwrap();
/// let options = CleanOptions {
///     garbage: GarbageLevel::Compact,
///     pages: Some("1-3".to_string()),
///     ..Default::default()
/// };
///
/// let cleaned = clean_document(&input, "", &options).unwrap();
/// std::fs::write("out.pdf", cleaned).unwrap();
/// ```
pub fn clean_document(bytes: &[u8], password: &str, options: &CleanOptions) -> Result<Vec<u8>> {
    let store = ObjectStore::load_mem(bytes, password)?;
    clean(store, options)
}
