//! Transparent decompression for `.sff.gz`/`.sff.bz2` inputs by piping
//! through the system `gzip`/`bzip2` binaries rather than linking a
//! bundled codec.

use crate::error::{Result, SffError};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

/// Open `path` for reading, transparently decompressing `.gz`/`.bz2` by
/// spawning the matching external tool. Plain `.sff` files are opened
/// directly.
pub fn open_any(path: &Path) -> Result<Box<dyn Read>> {
    let name = path.to_string_lossy();
    let (program, args): (&str, &[&str]) = if name.ends_with(".gz") {
        ("gzip", &["-dc"])
    } else if name.ends_with(".bz2") {
        ("bzip2", &["-dc"])
    } else {
        let file = File::open(path).map_err(|e| SffError::IoUnreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        return Ok(Box::new(file));
    };

    let mut child = Command::new(program)
        .args(args)
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| SffError::IoUnreadable {
            path: path.to_path_buf(),
            source: e,
        })?;

    let stdout = child.stdout.take().ok_or_else(|| SffError::IoUnreadable {
        path: path.to_path_buf(),
        source: std::io::Error::other("decompressor produced no stdout pipe"),
    })?;

    Ok(Box::new(DecompressedStream { child, stdout }))
}

/// Wraps a spawned decompressor's stdout; reaps the child on drop so a
/// caller reading to EOF doesn't leave zombie processes behind.
struct DecompressedStream {
    child: std::process::Child,
    stdout: std::process::ChildStdout,
}

impl Read for DecompressedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stdout.read(buf)
    }
}

impl Drop for DecompressedStream {
    fn drop(&mut self) {
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn plain_sff_opens_directly() {
        let dir = std::env::temp_dir().join("sff2frg_decompress_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path: PathBuf = dir.join("x.sff");
        std::fs::write(&path, b"hello").unwrap();
        let mut r = open_any(&path).unwrap();
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello");
    }
}
