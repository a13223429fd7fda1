use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::ControlFlow;
use std::path::Path;

use crate::error::{Error, Result};

const READ_BUFFER: usize = 1024 * 1024;

/// Feed every line of `path` to `visit`, decoding invalid UTF-8 lossily.
///
/// Line terminators (`\n` or `\r\n`) are stripped. An error is returned only
/// when the file cannot be opened or a read fails part way; lines delivered
/// before a failure stay delivered.
pub fn for_each_line<F>(path: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(&str),
{
    scan_lines(path, |line| {
        visit(line);
        ControlFlow::Continue(())
    })
}

/// Like [`for_each_line`], but stops reading once `visit` returns `Break`
pub fn scan_lines<F>(path: &Path, visit: F) -> Result<()>
where
    F: FnMut(&str) -> ControlFlow<()>,
{
    let file = File::open(path).map_err(|e| Error::read(path, e))?;
    let reader = BufReader::with_capacity(READ_BUFFER, file);
    scan_lines_in(reader, visit).map_err(|e| Error::read(path, e))
}

/// Same as [`for_each_line`] but over a reader, used for in-memory input
pub fn for_each_line_in<R, F>(reader: R, mut visit: F) -> std::io::Result<()>
where
    R: BufRead,
    F: FnMut(&str),
{
    scan_lines_in(reader, |line| {
        visit(line);
        ControlFlow::Continue(())
    })
}

pub fn scan_lines_in<R, F>(reader: R, mut visit: F) -> std::io::Result<()>
where
    R: BufRead,
    F: FnMut(&str) -> ControlFlow<()>,
{
    for chunk in reader.split(b'\n') {
        let chunk = chunk?;
        let line = chunk.strip_suffix(b"\r").unwrap_or(&chunk[..]);
        if visit(&String::from_utf8_lossy(line)).is_break() {
            break;
        }
    }
    Ok(())
}
