//! Binary serialization utilities.
//!
//! All on-disk layouts in this crate are little-endian. Word buffers are
//! written as consecutive `u64` values; on little-endian targets the
//! conversions are plain casts through `bytemuck`, elsewhere they fall
//! back to portable byte shuffling.

#[cfg(not(test))]
use alloc::vec::Vec;

use crate::error::LoadError;

/// Serialize a word buffer to little-endian bytes.
pub fn words_to_bytes(words: &[u64]) -> Vec<u8> {
    #[cfg(target_endian = "little")]
    return bytemuck::cast_slice(words).to_vec();

    #[cfg(not(target_endian = "little"))]
    {
        let mut out = Vec::with_capacity(words.len() * 8);
        for w in words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }
}

/// Deserialize little-endian bytes into a word buffer.
///
/// Panics if the byte length is not a multiple of 8; use
/// [`try_bytes_to_words`] for untrusted input.
pub fn bytes_to_words(bytes: &[u8]) -> Vec<u64> {
    assert!(
        bytes.len() % 8 == 0,
        "byte length must be a multiple of 8, got {}",
        bytes.len()
    );
    convert_words(bytes)
}

/// Deserialize little-endian bytes into a word buffer, or `None` if the
/// byte length is not a multiple of 8.
pub fn try_bytes_to_words(bytes: &[u8]) -> Option<Vec<u64>> {
    if bytes.len() % 8 != 0 {
        return None;
    }
    Some(convert_words(bytes))
}

fn convert_words(bytes: &[u8]) -> Vec<u64> {
    #[cfg(target_endian = "little")]
    if let Ok(words) = bytemuck::try_cast_slice::<u8, u64>(bytes) {
        return words.to_vec();
    }

    bytes.chunks_exact(8).map(word_from_le).collect()
}

#[inline]
fn word_from_le(chunk: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(chunk);
    u64::from_le_bytes(buf)
}

/// Bounds-checked sequential reader over a byte buffer.
///
/// Every deserializer in this crate drains one of these; a read past the
/// end is [`LoadError::UnexpectedEof`] and leftover bytes at the end are
/// [`LoadError::TrailingBytes`]. Counts are validated against the bytes
/// actually present before anything is allocated.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consume the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], LoadError> {
        if n > self.remaining() {
            return Err(LoadError::UnexpectedEof {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, LoadError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, LoadError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, LoadError> {
        Ok(word_from_le(self.take(8)?))
    }

    /// Consume `count` little-endian words.
    pub fn read_words(&mut self, count: usize) -> Result<Vec<u64>, LoadError> {
        let nbytes = count
            .checked_mul(8)
            .ok_or(LoadError::Malformed("word count out of range"))?;
        let slice = self.take(nbytes)?;
        Ok(bytes_to_words(slice))
    }

    /// Assert that the input is fully consumed.
    pub fn finish(self) -> Result<(), LoadError> {
        if self.remaining() > 0 {
            return Err(LoadError::TrailingBytes {
                extra: self.remaining(),
            });
        }
        Ok(())
    }
}

/// Memory-mapped input files.
#[cfg(feature = "mmap")]
pub mod mmap {
    use memmap2::Mmap;
    use std::fs::File;
    use std::io;
    use std::path::Path;

    /// A read-only memory-mapped file.
    ///
    /// Lets multi-gigabyte grammar files be loaded without buffering them
    /// through a `Vec` first; the deserializers only ever read forward.
    pub struct MmapFile {
        map: Mmap,
    }

    impl MmapFile {
        pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
            let file = File::open(path)?;
            // Safety: the map is read-only and private to this process;
            // mutating the file underneath it is undefined behavior, as
            // with any mapped input.
            let map = unsafe { Mmap::map(&file)? };
            Ok(Self { map })
        }

        /// The mapped bytes.
        #[inline]
        pub fn bytes(&self) -> &[u8] {
            &self.map
        }

        /// Size of the mapping in bytes.
        #[inline]
        pub fn len(&self) -> usize {
            self.map.len()
        }

        pub fn is_empty(&self) -> bool {
            self.map.len() == 0
        }
    }
}
