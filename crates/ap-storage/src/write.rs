//! Traits for writing.
use crate::{msg2err, Error, Offset};

/// Write to a file or disk at a certain offset.
pub trait Write {
    /// Write some byte buffer.
    fn write_bytes(&self, offset: Offset, buf: &[u8]) -> Result<usize, Error>;

    /// Make the written data durable. The default does nothing.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Trait extension to simplify writing.
pub trait WriteExt {
    /// Write the whole buffer.
    fn write_exact(&self, offset: Offset, buf: &[u8]) -> Result<(), Error>;
    /// Write a whole sector. The sector size is the length of the buffer.
    fn write_sector(&self, lba: u64, buf: &[u8]) -> Result<(), Error>;
}

impl WriteExt for &dyn Write {
    fn write_exact(&self, offset: Offset, buf: &[u8]) -> Result<(), Error> {
        let mut done = 0;
        while done != buf.len() {
            match self.write_bytes(offset + done as Offset, &buf[done..])? {
                0 => return Err(msg2err!(PartialWriteError { offset, len: buf.len() })),
                n => done += n,
            }
        }
        Ok(())
    }

    fn write_sector(&self, lba: u64, buf: &[u8]) -> Result<(), Error> {
        let offset = lba
            .checked_mul(buf.len() as Offset)
            .ok_or_else(|| msg2err!("sector offset overflow"))?;
        self.write_exact(offset, buf)
    }
}

/// An exact write could only be partially done.
#[derive(thiserror::Error, Debug)]
#[error("partial write of {len} bytes at {offset:#x}")]
pub struct PartialWriteError {
    pub offset: Offset,
    pub len: usize,
}
