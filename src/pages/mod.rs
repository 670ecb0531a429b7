//! Page selection: parsing range lists and cutting the page tree down to them.

mod range;
mod subset;

pub use range::{parse_page_ranges, PageRange};
pub use subset::retain_pages;
