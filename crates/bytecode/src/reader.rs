use crate::error::{DecodeError, Result};

/// Big-endian cursor over a class-file buffer. Every read names the structure it
/// belongs to so truncation errors point at the offending part of the file.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn read_bytes(&mut self, len: usize, structure: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated {
                structure,
                offset: self.pos,
                needed: len - self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u1(&mut self, structure: &'static str) -> Result<u8> {
        Ok(self.read_bytes(1, structure)?[0])
    }

    pub fn read_u2(&mut self, structure: &'static str) -> Result<u16> {
        let b = self.read_bytes(2, structure)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u4(&mut self, structure: &'static str) -> Result<u32> {
        let b = self.read_bytes(4, structure)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i1(&mut self, structure: &'static str) -> Result<i8> {
        Ok(self.read_u1(structure)? as i8)
    }

    pub fn read_i2(&mut self, structure: &'static str) -> Result<i16> {
        Ok(self.read_u2(structure)? as i16)
    }

    pub fn read_i4(&mut self, structure: &'static str) -> Result<i32> {
        Ok(self.read_u4(structure)? as i32)
    }

    pub fn skip(&mut self, len: usize, structure: &'static str) -> Result<()> {
        self.read_bytes(len, structure).map(|_| ())
    }

    pub fn ensure_empty(&self, structure: &'static str) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(DecodeError::TrailingBytes { structure, count }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_reports_structure_and_offset() {
        let mut r = Reader::new(&[0xCA, 0xFE, 0xBA]);
        assert_eq!(r.read_u2("magic").unwrap(), 0xCAFE);
        let err = r.read_u2("minor_version").unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                structure: "minor_version",
                offset: 2,
                needed: 1
            }
        );
    }

    #[test]
    fn signed_reads_sign_extend() {
        let mut r = Reader::new(&[0xFF, 0xFF, 0xFE]);
        assert_eq!(r.read_i1("a").unwrap(), -1);
        assert_eq!(r.read_i2("b").unwrap(), -2);
        assert!(r.ensure_empty("c").is_ok());
    }
}
