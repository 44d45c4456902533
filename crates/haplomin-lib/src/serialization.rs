//! Serialization and deserialization support for MinimizerIndex
//!
//! # File Format
//!
//! All integers are little endian.
//!
//! ```text
//! IndexHeader
//!   ├─ magic: "HMIDX001"
//!   ├─ version_major: u32
//!   ├─ version_minor: u32
//!   ├─ k: u64
//!   ├─ w: u64
//!   ├─ seed: u64
//!   ├─ scheme: u8 (0 = direct, 1 = rymer)
//!   ├─ num_keys: u64
//!   └─ num_hits: u64
//! Key records ([num_keys] entries, sorted by key):
//!   ├─ key: u64
//!   ├─ num_hits: u64
//!   └─ hits ([num_hits] entries, sorted by position):
//!      ├─ packed position: u64
//!      └─ payload: [u64; 2]
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::index::MinimizerIndex;
use crate::key::{Key, Scheme};
use crate::position::GraphPosition;

/// Magic bytes for the index format
const MAGIC: &[u8; 8] = b"HMIDX001";

/// File format version: (major, minor)
/// Increment major on breaking changes, minor on compatible changes
const FORMAT_VERSION: (u32, u32) = (1, 0);

/// Default file extension for serialized indexes
pub const INDEX_EXTENSION: &str = "hmi";

/// Header for a serialized MinimizerIndex
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexHeader {
    /// Magic number for format identification ("HMIDX001")
    pub magic: [u8; 8],
    /// Format version major number
    pub version_major: u32,
    /// Format version minor number
    pub version_minor: u32,
    /// K-mer length
    pub k: usize,
    /// Window length in k-mers
    pub w: usize,
    /// Selection seed
    pub seed: u64,
    /// Key encoding scheme
    pub scheme: Scheme,
    /// Number of distinct keys
    pub num_keys: u64,
    /// Number of stored occurrences
    pub num_hits: u64,
}

impl IndexHeader {
    /// Create a header describing an index
    pub fn for_index(index: &MinimizerIndex) -> Self {
        Self {
            magic: *MAGIC,
            version_major: FORMAT_VERSION.0,
            version_minor: FORMAT_VERSION.1,
            k: index.k(),
            w: index.w(),
            seed: index.seed(),
            scheme: index.scheme(),
            num_keys: index.num_keys() as u64,
            num_hits: index.len() as u64,
        }
    }

    /// Write header to a writer
    pub fn write(&self, writer: &mut dyn Write) -> io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version_major.to_le_bytes())?;
        writer.write_all(&self.version_minor.to_le_bytes())?;
        writer.write_all(&(self.k as u64).to_le_bytes())?;
        writer.write_all(&(self.w as u64).to_le_bytes())?;
        writer.write_all(&self.seed.to_le_bytes())?;
        writer.write_all(&[self.scheme.tag()])?;
        writer.write_all(&self.num_keys.to_le_bytes())?;
        writer.write_all(&self.num_hits.to_le_bytes())?;
        Ok(())
    }

    /// Read header from a reader
    pub fn read(reader: &mut dyn Read) -> io::Result<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;

        if &magic != MAGIC {
            return Err(invalid_data("Invalid magic number for haplomin index file".to_string()));
        }

        let version_major = read_u32(reader)?;
        let version_minor = read_u32(reader)?;

        if version_major != FORMAT_VERSION.0 {
            return Err(invalid_data(format!(
                "Incompatible format version: {}.{}, expected {}.{}",
                version_major, version_minor, FORMAT_VERSION.0, FORMAT_VERSION.1
            )));
        }

        let k = read_u64(reader)? as usize;
        let w = read_u64(reader)? as usize;
        let seed = read_u64(reader)?;
        let mut tag = [0u8; 1];
        reader.read_exact(&mut tag)?;
        let scheme = Scheme::from_tag(tag[0])
            .ok_or_else(|| invalid_data(format!("Unknown key scheme tag {}", tag[0])))?;

        if k == 0 || k > scheme.max_k() || w == 0 || k.checked_add(w - 1).is_none() {
            return Err(invalid_data(format!("Invalid parameters k={} w={} for {} keys", k, w, scheme)));
        }

        Ok(Self {
            magic,
            version_major,
            version_minor,
            k,
            w,
            seed,
            scheme,
            num_keys: read_u64(reader)?,
            num_hits: read_u64(reader)?,
        })
    }
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn read_u32(reader: &mut dyn Read) -> io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64(reader: &mut dyn Read) -> io::Result<u64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

/// Path of the index file for a base name, adding the default extension
/// when the name has none
pub fn index_file_path<P: AsRef<Path>>(base: P) -> PathBuf {
    let base = base.as_ref();
    if base.extension().is_some() {
        base.to_path_buf()
    } else {
        base.with_extension(INDEX_EXTENSION)
    }
}

impl MinimizerIndex {
    /// Write the index to a stream
    pub fn serialize(&self, writer: &mut dyn Write) -> io::Result<()> {
        IndexHeader::for_index(self).write(writer)?;

        let mut records: Vec<_> = self.iter().collect();
        records.sort_unstable_by_key(|(key, _)| *key);
        for (key, hits) in records {
            writer.write_all(&key.raw().to_le_bytes())?;
            writer.write_all(&(hits.len() as u64).to_le_bytes())?;
            for hit in hits {
                writer.write_all(&hit.pos.pack().to_le_bytes())?;
                writer.write_all(&hit.payload[0].to_le_bytes())?;
                writer.write_all(&hit.payload[1].to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Read an index from a stream
    pub fn deserialize(reader: &mut dyn Read) -> io::Result<Self> {
        let header = IndexHeader::read(reader)?;
        let mut index = MinimizerIndex::new(header.k, header.w, header.seed, header.scheme);

        for _ in 0..header.num_keys {
            let key = Key::from_raw(read_u64(reader)?);
            if key.is_empty() {
                return Err(invalid_data("Empty key stored in index".to_string()));
            }
            let num_hits = read_u64(reader)?;
            for _ in 0..num_hits {
                let pos = GraphPosition::unpack(read_u64(reader)?);
                let payload = [read_u64(reader)?, read_u64(reader)?];
                if !index.insert_hit(key, pos, payload) {
                    return Err(invalid_data(format!("Duplicate position {} for key {}", pos, key)));
                }
            }
        }

        if index.len() as u64 != header.num_hits {
            return Err(invalid_data(format!(
                "Header announces {} hits, found {}",
                header.num_hits,
                index.len()
            )));
        }
        Ok(index)
    }

    /// Save the index to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.serialize(&mut writer)?;
        writer.flush()?;
        info!("Saved {} keys / {} hits to {}", self.num_keys(), self.len(), path.display());
        Ok(())
    }

    /// Load an index from a file
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let index = Self::deserialize(&mut reader)?;
        info!("Loaded {} keys / {} hits from {}", index.num_keys(), index.len(), path.display());
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexSink;
    use crate::key::{Direct, KeyCodec};

    fn example_index() -> MinimizerIndex {
        let mut index = MinimizerIndex::new(3, 2, 7, Scheme::Direct);
        let gta = Direct::encode(b"GTA").unwrap();
        let cat = Direct::encode(b"CAT").unwrap();
        index.insert(gta, GraphPosition::new(1, false, 3), [5, 6]);
        index.insert(gta, GraphPosition::new(2, true, 0), [0, 0]);
        index.insert(cat, GraphPosition::new(1023, false, 1023), [u64::MAX, 1]);
        index
    }

    #[test]
    fn test_header_roundtrip() {
        let header = IndexHeader::for_index(&example_index());

        let mut buffer = Vec::new();
        header.write(&mut buffer).unwrap();

        let header2 = IndexHeader::read(&mut buffer.as_slice()).unwrap();
        assert_eq!(header, header2);
        assert_eq!(header2.num_keys, 2);
        assert_eq!(header2.num_hits, 3);
    }

    #[test]
    fn test_bad_magic() {
        let mut buffer = Vec::new();
        IndexHeader::for_index(&example_index()).write(&mut buffer).unwrap();
        buffer[0] = b'X';
        let err = IndexHeader::read(&mut buffer.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_index_stream_roundtrip() {
        let index = example_index();
        let mut buffer = Vec::new();
        index.serialize(&mut buffer).unwrap();

        let loaded = MinimizerIndex::deserialize(&mut buffer.as_slice()).unwrap();
        assert_eq!(loaded.k(), 3);
        assert_eq!(loaded.w(), 2);
        assert_eq!(loaded.seed(), 7);
        assert_eq!(loaded.len(), index.len());
        for (key, hits) in index.iter() {
            assert!(loaded.find(key).eq(hits));
        }
    }

    #[test]
    fn test_truncated_stream() {
        let mut buffer = Vec::new();
        example_index().serialize(&mut buffer).unwrap();
        buffer.truncate(buffer.len() - 4);
        assert!(MinimizerIndex::deserialize(&mut buffer.as_slice()).is_err());
    }

    #[test]
    fn test_save_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = index_file_path(dir.path().join("graph"));
        assert!(path.to_string_lossy().ends_with("graph.hmi"));

        let index = example_index();
        index.save(&path).unwrap();
        let loaded = MinimizerIndex::load(&path).unwrap();
        assert_eq!(loaded.num_keys(), index.num_keys());
        assert_eq!(loaded.scheme(), Scheme::Direct);
    }

    #[test]
    fn test_index_file_path_keeps_extension() {
        assert_eq!(index_file_path("out.idx"), PathBuf::from("out.idx"));
    }
}
