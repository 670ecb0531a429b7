use clap::Parser;
use std::path::PathBuf;

use crate::config::defaults::DEFAULT_OUTPUT_PATH;

#[derive(Parser, Debug)]
#[command(name = "pdf-clean")]
#[command(
    author,
    version,
    about = "Rewrite a PDF: garbage collect unused objects, compact the xref, subset pages"
)]
pub struct Args {
    /// Password used to open an encrypted input file
    #[arg(short, long, default_value = "")]
    pub password: String,

    /// Garbage collect unused objects (-gg also compacts the xref, -ggg also merges duplicates)
    #[arg(short = 'g', action = clap::ArgAction::Count)]
    pub garbage: u8,

    /// Decompress all streams
    #[arg(short = 'd', long)]
    pub decompress: bool,

    /// ASCII hex encode binary streams
    #[arg(short = 'a', long)]
    pub ascii: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Input PDF file path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Optional output path (must end in .pdf) followed by comma separated page ranges
    #[arg(allow_hyphen_values = true, trailing_var_arg = true)]
    pub rest: Vec<String>,
}

fn looks_like_pdf_path(arg: &str) -> bool {
    arg.contains(".pdf") || arg.contains(".PDF")
}

impl Args {
    /// Get the output path: the first trailing argument naming a .pdf file, or `out.pdf`
    pub fn output_path(&self) -> PathBuf {
        match self.rest.first() {
            Some(first) if looks_like_pdf_path(first) => PathBuf::from(first),
            _ => PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }

    /// Get the page selection, joining every page argument with commas
    pub fn page_spec(&self) -> Option<String> {
        let skip = match self.rest.first() {
            Some(first) if looks_like_pdf_path(first) => 1,
            _ => 0,
        };

        let specs: Vec<&str> = self.rest[skip..].iter().map(|s| s.as_str()).collect();
        if specs.is_empty() {
            None
        } else {
            Some(specs.join(","))
        }
    }
}
