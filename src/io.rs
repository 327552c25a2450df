//! Binary persistence of the distinct-value set.
//!
//! Layout, every field a `u64` in the byte order chosen by the caller:
//!
//! ```text
//! [ count ][ w ][ k ][ value_0 ] ... [ value_{count-1} ]   values ascending
//! ```
//!
//! There is no magic and no version: a stream must be read back with the byte
//! order it was written in. The `(value, seq_id)` table is **not** stored, so an
//! index loaded with [`KmerIndex::read`] cannot attribute repeats to sequences.

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::encode::{BaseLookup, MAX_K};
use crate::index::{IndexError, KmerIndex};

/// Byte order of the persisted integers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the running platform.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    pub fn from_big_endian(big: bool) -> Self {
        if big { Endianness::Big } else { Endianness::Little }
    }
}

impl Default for Endianness {
    fn default() -> Self {
        Self::native()
    }
}

// Upper bound on the reservation taken from a stream's count.
const MAX_PREALLOC: usize = 1 << 20;

struct Header {
    count: u64,
    w: u64,
    k: u64,
}

impl Header {
    fn write_to<B: ByteOrder, W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_u64::<B>(self.count)?;
        w.write_u64::<B>(self.w)?;
        w.write_u64::<B>(self.k)?;
        Ok(())
    }

    fn read_from<B: ByteOrder, R: Read>(r: &mut R) -> std::io::Result<Self> {
        let count = r.read_u64::<B>()?;
        let w = r.read_u64::<B>()?;
        let k = r.read_u64::<B>()?;
        Ok(Header { count, w, k })
    }

    /// `(0, 0, 0)` is an unbuilt index; anything else needs a usable `w` and `k`.
    fn validate(&self) -> Result<(usize, usize), IndexError> {
        if self.count == 0 && self.w == 0 && self.k == 0 {
            return Ok((0, 0));
        }
        if self.k == 0 || self.k > MAX_K as u64 {
            return Err(IndexError::Format(format!(
                "k must be 1..={MAX_K}, found {}",
                self.k
            )));
        }
        if self.w == 0 {
            return Err(IndexError::Format("window size is 0".into()));
        }
        let w = usize::try_from(self.w)
            .map_err(|_| IndexError::Format(format!("window size {} overflows", self.w)))?;
        Ok((w, self.k as usize))
    }
}

impl<L: BaseLookup> KmerIndex<L> {
    /// Write count, `w`, `k` and the ascending distinct values.
    pub fn write<W: Write>(
        &self,
        out: &mut W,
        endianness: Endianness,
    ) -> Result<(), IndexError> {
        match endianness {
            Endianness::Little => self.write_as::<LittleEndian, W>(out),
            Endianness::Big => self.write_as::<BigEndian, W>(out),
        }
    }

    fn write_as<B: ByteOrder, W: Write>(&self, out: &mut W) -> Result<(), IndexError> {
        Header {
            count: self.values().len() as u64,
            w: self.w() as u64,
            k: self.k() as u64,
        }
        .write_to::<B, W>(out)?;
        for &v in self.values() {
            out.write_u64::<B>(v)?;
        }
        Ok(())
    }

    /// Replace the contents with a stream produced by [`write`](Self::write).
    ///
    /// Only the distinct-value set comes back; the entry table stays empty. On
    /// error the index is left unbuilt.
    pub fn read<R: Read>(
        &mut self,
        input: &mut R,
        endianness: Endianness,
    ) -> Result<(), IndexError> {
        self.clear();
        match endianness {
            Endianness::Little => self.read_as::<LittleEndian, R>(input),
            Endianness::Big => self.read_as::<BigEndian, R>(input),
        }
    }

    fn read_as<B: ByteOrder, R: Read>(&mut self, input: &mut R) -> Result<(), IndexError> {
        let header = Header::read_from::<B, R>(input)?;
        let (w, k) = header.validate()?;

        let capacity = usize::try_from(header.count).map_or(MAX_PREALLOC, |n| n.min(MAX_PREALLOC));
        let mut values = Vec::with_capacity(capacity);
        for i in 0..header.count {
            let v = input.read_u64::<B>()?;
            if k < MAX_K && v >> (2 * k) != 0 {
                return Err(IndexError::Format(format!(
                    "value {v:#x} at {i} does not fit k={k}"
                )));
            }
            if values.last().is_some_and(|&prev| prev >= v) {
                return Err(IndexError::Format(format!(
                    "values not strictly ascending at {i}"
                )));
            }
            values.push(v);
        }

        debug!("read index: w={w}, k={k}, {} distinct values", values.len());
        self.restore(w, k, values);
        Ok(())
    }

    /// [`write`](Self::write) to a file at `path`.
    pub fn write_to_path<P: AsRef<Path>>(
        &self,
        path: P,
        endianness: Endianness,
    ) -> Result<(), IndexError> {
        let path = path.as_ref();
        let file_err = |operation, source| IndexError::File {
            path: path.to_path_buf(),
            operation,
            source,
        };
        let file = File::create(path).map_err(|e| file_err("create", e))?;
        let mut out = BufWriter::new(file);
        self.write(&mut out, endianness).map_err(|e| match e {
            IndexError::Io(source) => file_err("write", source),
            other => other,
        })?;
        out.flush().map_err(|e| file_err("flush", e))?;
        Ok(())
    }

    /// [`read`](Self::read) from a file at `path`.
    pub fn read_from_path<P: AsRef<Path>>(
        &mut self,
        path: P,
        endianness: Endianness,
    ) -> Result<(), IndexError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IndexError::File {
            path: path.to_path_buf(),
            operation: "open",
            source,
        })?;
        let mut input = BufReader::new(file);
        self.read(&mut input, endianness).map_err(|e| match e {
            IndexError::Io(source) => IndexError::File {
                path: path.to_path_buf(),
                operation: "read",
                source,
            },
            other => other,
        })
    }
}
