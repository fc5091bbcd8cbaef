//! I/O utilities for CSV reading, writing, encoding, and delimiter resolution.
//!
//! All file I/O in popdash flows through this module. It provides:
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding candidates**: the ordered list of text encodings the loader
//!   tries, with strict (non-replacing) decoding via `encoding_rs`.
//! - **Reader/writer construction**: `open_csv_reader` over decoded text and
//!   `open_csv_writer` for the UTF-8 (with byte-order mark) download file.

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{EUC_KR, Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One entry of the loader's encoding priority list.
#[derive(Debug, Clone, Copy)]
pub struct EncodingCandidate {
    /// Name reported in logs and load errors.
    pub label: &'static str,
    pub encoding: &'static Encoding,
    /// Strip a leading UTF-8 byte-order mark before decoding.
    pub strip_bom: bool,
}

/// Encodings tried by the loader, highest priority first.
///
/// `encoding_rs` implements cp949 (windows-949) as its EUC-KR decoder, so the
/// two legacy Korean entries share a decoder but stay separate attempts.
pub fn encoding_candidates() -> [EncodingCandidate; 4] {
    [
        EncodingCandidate {
            label: "utf-8-sig",
            encoding: UTF_8,
            strip_bom: true,
        },
        EncodingCandidate {
            label: "cp949",
            encoding: EUC_KR,
            strip_bom: false,
        },
        EncodingCandidate {
            label: "euc-kr",
            encoding: EUC_KR,
            strip_bom: false,
        },
        EncodingCandidate {
            label: "utf-8",
            encoding: UTF_8,
            strip_bom: false,
        },
    ]
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Decodes `bytes` without replacement characters; malformed input is an error.
pub fn decode_strict(bytes: &[u8], candidate: &EncodingCandidate) -> Result<String> {
    let payload = if candidate.strip_bom {
        bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
    } else {
        bytes
    };
    candidate
        .encoding
        .decode_without_bom_handling_and_without_replacement(payload)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            anyhow!(
                "Malformed byte sequence for encoding {}",
                candidate.encoding.name()
            )
        })
}

/// Builds a header-aware reader. Records may vary in length; callers decide
/// how to treat short or long rows.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

/// Opens `path` for CSV output, writing the UTF-8 byte-order mark first when
/// `with_bom` is set.
pub fn open_csv_writer(
    path: &Path,
    delimiter: u8,
    with_bom: bool,
) -> Result<csv::Writer<Box<dyn Write>>> {
    let mut base: Box<dyn Write> = Box::new(BufWriter::new(
        File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
    ));
    if with_bom {
        base.write_all(UTF8_BOM)
            .with_context(|| format!("Writing byte-order mark to {path:?}"))?;
    }

    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(base))
}
