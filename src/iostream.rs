//! Dump file I/O: compression detection and byte-counting progress.
//!
//! Restore input and dump output may be plain `.sql` or compressed;
//! compression is picked from the file extension. Progress counts compressed
//! bytes, so bar lengths match on-disk file sizes.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }

    pub fn wrap_writer<'a>(&self, writer: Box<dyn Write + 'a>) -> io::Result<Box<dyn Write + 'a>> {
        Ok(match self {
            Compression::None => writer,
            Compression::Gzip => Box::new(flate2::write::GzEncoder::new(
                writer,
                flate2::Compression::default(),
            )),
            Compression::Bzip2 => Box::new(bzip2::write::BzEncoder::new(
                writer,
                bzip2::Compression::default(),
            )),
            Compression::Xz => Box::new(xz2::write::XzEncoder::new(writer, 6)),
            Compression::Zstd => Box::new(zstd::stream::write::Encoder::new(writer, 0)?.auto_finish()),
        })
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

/// A reader wrapper that reports cumulative bytes read to a callback after
/// each read, for byte-based progress bars.
pub struct ProgressReader<R: Read> {
    reader: R,
    callback: Box<dyn Fn(u64)>,
    bytes_read: u64,
}

impl<R: Read> ProgressReader<R> {
    pub fn new<F>(reader: R, callback: F) -> Self
    where
        F: Fn(u64) + 'static,
    {
        Self {
            reader,
            callback: Box::new(callback),
            bytes_read: 0,
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        self.bytes_read += n as u64;
        (self.callback)(self.bytes_read);
        Ok(n)
    }
}

/// A writer wrapper mirroring [`ProgressReader`] for the dump side.
pub struct ProgressWriter<W: Write> {
    writer: W,
    callback: Box<dyn Fn(u64)>,
    bytes_written: u64,
}

impl<W: Write> ProgressWriter<W> {
    pub fn new<F>(writer: W, callback: F) -> Self
    where
        F: Fn(u64) + 'static,
    {
        Self {
            writer,
            callback: Box::new(callback),
            bytes_written: 0,
        }
    }
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.bytes_written += n as u64;
        (self.callback)(self.bytes_written);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Open a dump file for restore: progress wrapping first, then decompression,
/// so the callback sees on-disk byte positions. Returns the file size for
/// sizing the bar.
pub fn open_dump_input<F>(path: &Path, progress: F) -> io::Result<(Box<dyn Read>, u64)>
where
    F: Fn(u64) + 'static,
{
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let counted = ProgressReader::new(BufReader::new(file), progress);
    let reader = Compression::from_path(path).wrap_reader(Box::new(counted))?;
    Ok((reader, size))
}

/// Create a dump output file, compressing per the extension. Encoders finish
/// on drop; callers drop the writer before treating the file as complete.
pub fn create_dump_output(path: &Path) -> io::Result<Box<dyn Write>> {
    let file = File::create(path)?;
    Compression::from_path(path).wrap_writer(Box::new(BufWriter::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    #[test]
    fn test_compression_from_extension() {
        assert_eq!(
            Compression::from_path(&PathBuf::from("dump.sql")),
            Compression::None
        );
        assert_eq!(
            Compression::from_path(&PathBuf::from("dump.sql.gz")),
            Compression::Gzip
        );
        assert_eq!(
            Compression::from_path(&PathBuf::from("dump.sql.zst")),
            Compression::Zstd
        );
        assert_eq!(
            Compression::from_path(&PathBuf::from("dump.sql.bz2")),
            Compression::Bzip2
        );
        assert_eq!(
            Compression::from_path(&PathBuf::from("dump.sql.xz")),
            Compression::Xz
        );
    }

    #[test]
    fn test_gzip_round_trip() {
        let mut compressed = Vec::new();
        {
            let mut writer = Compression::Gzip
                .wrap_writer(Box::new(&mut compressed))
                .unwrap();
            writer.write_all(b"SELECT 1;").unwrap();
            writer.flush().unwrap();
        }
        let mut reader = Compression::Gzip
            .wrap_reader(Box::new(Cursor::new(compressed)))
            .unwrap();
        let mut restored = String::new();
        reader.read_to_string(&mut restored).unwrap();
        assert_eq!(restored, "SELECT 1;");
    }

    #[test]
    fn test_progress_reader_counts_bytes() {
        use std::cell::Cell;
        use std::rc::Rc;

        let seen = Rc::new(Cell::new(0u64));
        let seen_cb = Rc::clone(&seen);
        let mut reader = ProgressReader::new(Cursor::new(vec![0u8; 1000]), move |n| {
            seen_cb.set(n);
        });

        let mut sink = Vec::new();
        io::copy(&mut reader, &mut sink).unwrap();
        assert_eq!(seen.get(), 1000);
        assert_eq!(sink.len(), 1000);
    }
}
