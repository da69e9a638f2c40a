//! Post-fetch decoding of compressed cache files.
//!
//! The decoder inspects the leading bytes of a cache file and, for gzip or
//! zip content, writes the decompressed payload next to it. It never touches
//! the cache file itself, so freshness checks keep working on the raw copy.
//! Output goes through a temporary file, so a corrupt archive leaves no
//! half-written result behind.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::app::{FetchError, Result};
use crate::fetcher::writer::temp_file_beside;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Gzip,
    Zip,
    Plain,
}

/// Classify a file by its signature.
pub fn sniff(path: &Path) -> Result<ContentKind> {
    let mut header = [0u8; 4];
    let mut file = File::open(path)?;
    let mut read = 0;
    while read < header.len() {
        let n = file.read(&mut header[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }

    let header = &header[..read];
    Ok(if header.starts_with(GZIP_MAGIC) {
        ContentKind::Gzip
    } else if header.starts_with(ZIP_MAGIC) {
        ContentKind::Zip
    } else {
        ContentKind::Plain
    })
}

/// Decompress `path` if needed and return the path holding plain content.
pub fn decode(path: &Path) -> Result<PathBuf> {
    match sniff(path)? {
        ContentKind::Gzip => decompress_gzip(path),
        ContentKind::Zip => decompress_zip(path),
        ContentKind::Plain => Ok(path.to_path_buf()),
    }
}

fn decompress_gzip(path: &Path) -> Result<PathBuf> {
    let dest = match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => path.with_extension(""),
        _ => append_suffix(path, "decoded"),
    };

    let mut decoder = GzDecoder::new(File::open(path)?);
    let mut out = temp_file_beside(&dest)?;
    io::copy(&mut decoder, &mut out)
        .map_err(|e| FetchError::Decode(format!("{}: {}", path.display(), e)))?;
    out.persist(&dest).map_err(|e| FetchError::Io(e.error))?;

    tracing::debug!("Decompressed {} to {}", path.display(), dest.display());
    Ok(dest)
}

fn decompress_zip(path: &Path) -> Result<PathBuf> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)
        .map_err(|e| FetchError::Decode(format!("{}: {}", path.display(), e)))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }

        let Some(name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_owned()))
        else {
            continue;
        };

        let dir = path.parent().unwrap_or(Path::new("."));
        let dest = dir.join(name);
        if dest == path {
            return Err(FetchError::Decode(format!(
                "{}: archive entry would overwrite the archive",
                path.display()
            )));
        }

        let mut out = temp_file_beside(&dest)?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| FetchError::Decode(format!("{}: {}", path.display(), e)))?;
        out.persist(&dest).map_err(|e| FetchError::Io(e.error))?;

        tracing::debug!("Extracted {} to {}", path.display(), dest.display());
        return Ok(dest);
    }

    Err(FetchError::Decode(format!(
        "{}: archive holds no files",
        path.display()
    )))
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        writer.add_directory("nested/", options).unwrap();
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_sniff() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        fs::write(&plain, b"1.2.3.4\n").unwrap();
        let short = dir.path().join("short");
        fs::write(&short, b"P").unwrap();
        let gz = dir.path().join("data.gz");
        fs::write(&gz, gzip(b"x")).unwrap();

        assert_eq!(sniff(&plain).unwrap(), ContentKind::Plain);
        assert_eq!(sniff(&short).unwrap(), ContentKind::Plain);
        assert_eq!(sniff(&gz).unwrap(), ContentKind::Gzip);
    }

    #[test]
    fn test_plain_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, b"hello").unwrap();

        assert_eq!(decode(&path).unwrap(), path);
    }

    #[test]
    fn test_gzip_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt.gz");
        fs::write(&path, gzip(b"line one\nline two\n")).unwrap();

        let decoded = decode(&path).unwrap();

        assert_eq!(decoded, dir.path().join("list.txt"));
        assert_eq!(fs::read(&decoded).unwrap(), b"line one\nline two\n");
        assert!(path.exists());
    }

    #[test]
    fn test_gzip_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed");
        fs::write(&path, gzip(b"payload")).unwrap();

        let decoded = decode(&path).unwrap();

        assert_eq!(decoded, dir.path().join("feed.decoded"));
        assert_eq!(fs::read(&decoded).unwrap(), b"payload");
    }

    #[test]
    fn test_corrupt_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gz");
        fs::write(&path, [0x1f, 0x8b, 0x00, 0x01, 0x02]).unwrap();

        assert!(matches!(decode(&path), Err(FetchError::Decode(_))));
        assert!(!dir.path().join("bad").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_truncated_gzip_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt.gz");
        let dest = dir.path().join("list.txt");
        fs::write(&dest, b"previous").unwrap();

        let full = gzip(&vec![b'x'; 64 * 1024]);
        fs::write(&path, &full[..full.len() / 2]).unwrap();

        assert!(decode(&path).is_err());
        assert_eq!(fs::read(&dest).unwrap(), b"previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_zip_first_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.zip");
        fs::write(
            &path,
            zip_with(&[
                ("nested/first.csv", b"a,b\n1,2\n".as_slice()),
                ("second.csv", b"x".as_slice()),
            ]),
        )
        .unwrap();

        let decoded = decode(&path).unwrap();

        assert_eq!(decoded, dir.path().join("first.csv"));
        assert_eq!(fs::read(&decoded).unwrap(), b"a,b\n1,2\n");
    }

    #[test]
    fn test_empty_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.zip");
        fs::write(&path, zip_with(&[])).unwrap();

        assert!(matches!(decode(&path), Err(FetchError::Decode(_))));
    }
}
