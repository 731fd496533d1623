//! Minimal dBASE III table reader: header, field descriptors and fixed-width records.

use anyhow::{Context, Result, bail};
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Size of the table prefix and of each field descriptor.
const DESCRIPTOR_LEN: usize = 32;
/// Ends the field descriptor array.
const HEADER_TERMINATOR: u8 = 0x0D;
/// First byte of a record marked deleted.
const DELETED_FLAG: u8 = b'*';

/// One column of the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbfField {
    pub name: String,
    pub kind: char,
    /// Byte offset inside a record (the deletion flag occupies byte 0).
    pub offset: usize,
    pub length: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbfHeader {
    pub record_count: usize,
    pub header_len: usize,
    pub record_len: usize,
    pub fields: Vec<DbfField>,
}

impl DbfHeader {
    /// Parse the header from the start of a table. `bytes` must hold at least `header_len` bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DESCRIPTOR_LEN {
            bail!("file too short for a table header ({} bytes)", bytes.len());
        }
        let record_count = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        let record_len = u16::from_le_bytes([bytes[10], bytes[11]]) as usize;
        if header_len < DESCRIPTOR_LEN + 1 || bytes.len() < header_len {
            bail!("invalid header length {header_len}");
        }

        let mut fields = Vec::new();
        let mut pos = DESCRIPTOR_LEN;
        let mut offset = 1;
        while pos + DESCRIPTOR_LEN <= header_len && bytes[pos] != HEADER_TERMINATOR {
            let desc = &bytes[pos..pos + DESCRIPTOR_LEN];
            let name_end = desc[..11].iter().position(|&b| b == 0).unwrap_or(11);
            let name = String::from_utf8_lossy(&desc[..name_end]).trim().to_string();
            let kind = desc[11] as char;
            let mut length = desc[16] as usize;
            if kind == 'C' {
                // Character fields borrow the decimal-count byte as the high length byte.
                length |= (desc[17] as usize) << 8;
            }
            fields.push(DbfField {
                name,
                kind,
                offset,
                length,
            });
            offset += length;
            pos += DESCRIPTOR_LEN;
        }
        if fields.is_empty() {
            bail!("table has no field descriptors");
        }
        if offset > record_len {
            bail!("fields span {offset} bytes but records are {record_len} bytes");
        }
        Ok(Self {
            record_count,
            header_len,
            record_len,
            fields,
        })
    }

    /// Read only the header of the table at `path`.
    pub fn read(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).with_context(|| format!("open {}", path.display()))?;
        let mut prefix = [0u8; DESCRIPTOR_LEN];
        file.read_exact(&mut prefix)
            .with_context(|| format!("read header of {}", path.display()))?;
        let header_len = u16::from_le_bytes([prefix[8], prefix[9]]) as usize;
        if header_len < DESCRIPTOR_LEN + 1 {
            bail!("invalid header length {header_len} in {}", path.display());
        }
        let mut bytes = prefix.to_vec();
        bytes.resize(header_len, 0);
        file.read_exact(&mut bytes[DESCRIPTOR_LEN..])
            .with_context(|| format!("read field descriptors of {}", path.display()))?;
        Self::parse(&bytes).with_context(|| format!("parse header of {}", path.display()))
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&DbfField> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn require_field(&self, name: &str) -> Result<&DbfField> {
        self.field(name)
            .with_context(|| format!("missing field {name}"))
    }

    /// Iterate the first `count` live (non-deleted) records of `bytes`, the whole table file.
    pub fn records<'a>(
        &self,
        bytes: &'a [u8],
        count: usize,
    ) -> Result<impl Iterator<Item = &'a [u8]> + 'a> {
        let count = count.min(self.record_count);
        let end = self.header_len + count * self.record_len;
        if bytes.len() < end {
            bail!(
                "table truncated: {} records need {} bytes, file has {}",
                count,
                end,
                bytes.len()
            );
        }
        let record_len = self.record_len.max(1);
        Ok(bytes[self.header_len..end]
            .chunks_exact(record_len)
            .filter(|r| r.first() != Some(&DELETED_FLAG)))
    }
}

/// Trimmed text of `field` within `record`.
pub fn field_str<'a>(record: &'a [u8], field: &DbfField) -> Cow<'a, str> {
    let end = (field.offset + field.length).min(record.len());
    let start = field.offset.min(end);
    match String::from_utf8_lossy(&record[start..end]) {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
        Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
    }
}
