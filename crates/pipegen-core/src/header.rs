//! Split the raw `meta:` header from the templated `data:` body.
//!
//! The header is parsed before any template expansion, so it must be located
//! on the raw file text.

use std::path::Path;

use crate::error::{GenerateError, GenerateResult};

/// Line that separates the header from the body.
pub const DATA_MARKER: &str = "data:";

/// Return the text strictly before the first `data:` line.
///
/// The marker must be a whole line terminated by a line break; the line break
/// that ends the last header line is not part of the result.
pub fn find_header<'a>(source: &'a str, path: &Path) -> GenerateResult<&'a str> {
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        let terminated = line.ends_with('\n');
        let content = line.trim_end_matches('\n').trim_end_matches('\r');
        if terminated && content == DATA_MARKER {
            let header = &source[..offset];
            let header = header.strip_suffix('\n').unwrap_or(header);
            return Ok(header.strip_suffix('\r').unwrap_or(header));
        }
        offset += line.len();
    }

    Err(GenerateError::MissingDataMarker {
        path: path.to_path_buf(),
    })
}
