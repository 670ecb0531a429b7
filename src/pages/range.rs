use nom::{
    character::complete::{char, digit1},
    error::{Error, ErrorKind},
    IResult,
};

use crate::error::{CleanError, Result};

/// One comma separated token of a page selection: `a`, `a-b`, `a-` or `-b`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// First page, `None` meaning the first page of the document
    pub start: Option<u32>,
    /// Last page, `None` meaning the last page of the document
    pub end: Option<u32>,
}

impl PageRange {
    pub fn single(page: u32) -> Self {
        Self {
            start: Some(page),
            end: Some(page),
        }
    }

    /// Concrete inclusive bounds for a document with `page_count` pages.
    ///
    /// Reversed bounds are swapped and both ends are clamped into the
    /// document; `None` when no page of the document falls in the range.
    pub fn resolve(&self, page_count: u32) -> Option<(u32, u32)> {
        if page_count == 0 {
            return None;
        }
        let mut first = self.start.unwrap_or(1);
        let mut last = self.end.unwrap_or(page_count);
        if first > last {
            std::mem::swap(&mut first, &mut last);
        }
        let first = first.max(1);
        let last = last.min(page_count);
        (first <= last).then_some((first, last))
    }
}

/// Parse an optional page number
fn page_number(input: &str) -> IResult<&str, Option<u32>> {
    match digit1::<&str, Error<&str>>(input) {
        Ok((rest, digits)) => {
            let page = digits
                .parse()
                .map_err(|_| nom::Err::Failure(Error::new(input, ErrorKind::Digit)))?;
            Ok((rest, Some(page)))
        }
        Err(nom::Err::Error(_)) => Ok((input, None)),
        Err(e) => Err(e),
    }
}

/// Parse a single range token
fn page_range(input: &str) -> IResult<&str, PageRange> {
    let (input, start) = page_number(input)?;

    let input = match char::<&str, Error<&str>>('-')(input) {
        Ok((rest, _)) => rest,
        Err(nom::Err::Error(_)) => {
            return match start {
                Some(page) => Ok((input, PageRange::single(page))),
                None => Err(nom::Err::Error(Error::new(input, ErrorKind::Digit))),
            };
        }
        Err(e) => return Err(e),
    };

    let (input, end) = page_number(input)?;
    if start.is_none() && end.is_none() {
        // A lone dash names no bound at all
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Digit)));
    }
    Ok((input, PageRange { start, end }))
}

/// Parse a comma separated page selection such as `1,3,5-7,9-`
pub fn parse_page_ranges(spec: &str) -> Result<Vec<PageRange>> {
    let mut ranges = Vec::new();

    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match page_range(token) {
            Ok(("", range)) => ranges.push(range),
            _ => return Err(CleanError::InvalidPageRange(token.to_string())),
        }
    }

    Ok(ranges)
}
