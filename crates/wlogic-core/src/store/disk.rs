// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persistent backend: an append-only binary fact log.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! header  := "WLOG" version:u16
//! record  := len:u32 body[len]
//! body    := partition:u16 predicate:u16 arity:u8 flags:u8 arg:u32{arity} [value:f64]
//! ```
//!
//! `flags & 1` marks a record that carries a value.
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};

use super::{FactLog, StoreError, StoredFact};
use crate::ident::{EntityId, Partition, PredicateId, MAX_ARITY};

pub(crate) const LOG_FILE_NAME: &str = "facts.wlog";
const MAGIC: &[u8; 4] = b"WLOG";
const VERSION: u16 = 1;
const HEADER_LEN: usize = 6;
const FIXED_BODY_LEN: usize = 6;
const FLAG_HAS_VALUE: u8 = 1;
const MAX_BODY_LEN: usize = FIXED_BODY_LEN + 4 * MAX_ARITY + 8;

pub(crate) struct DiskLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    scratch: BytesMut,
}

impl DiskLog {
    pub(crate) fn open(dir: &Path, truncate: bool) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE_NAME);
        let file = if truncate {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)?
        } else {
            OpenOptions::new().create(true).append(true).open(&path)?
        };
        let fresh = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if fresh {
            writer.write_all(MAGIC)?;
            writer.write_all(&VERSION.to_le_bytes())?;
        }
        Ok(Self {
            path,
            writer: Some(writer),
            scratch: BytesMut::with_capacity(MAX_BODY_LEN + 4),
        })
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, StoreError> {
        self.writer.as_mut().ok_or(StoreError::Closed)
    }
}

fn encode(fact: &StoredFact, out: &mut BytesMut) {
    let value_len = if fact.value.is_some() { 8 } else { 0 };
    // Arity is validated against MAX_ARITY before a fact reaches the log.
    #[allow(clippy::cast_possible_truncation)]
    let body_len = (FIXED_BODY_LEN + 4 * fact.args.len() + value_len) as u32;
    #[allow(clippy::cast_possible_truncation)]
    let arity = fact.args.len() as u8;
    out.put_u32_le(body_len);
    out.put_u16_le(fact.partition.0);
    out.put_u16_le(fact.predicate.0);
    out.put_u8(arity);
    out.put_u8(if fact.value.is_some() { FLAG_HAS_VALUE } else { 0 });
    for arg in &fact.args {
        out.put_u32_le(arg.0);
    }
    if let Some(value) = fact.value {
        out.put_f64_le(value);
    }
}

fn decode(mut body: &[u8], offset: u64) -> Result<StoredFact, StoreError> {
    let corrupt = |reason| StoreError::Corrupt { offset, reason };
    if body.remaining() < FIXED_BODY_LEN {
        return Err(corrupt("record shorter than fixed header"));
    }
    let partition = Partition(body.get_u16_le());
    let predicate = PredicateId(body.get_u16_le());
    let arity = usize::from(body.get_u8());
    let flags = body.get_u8();
    if arity == 0 || arity > MAX_ARITY {
        return Err(corrupt("arity out of range"));
    }
    let value_len = if flags & FLAG_HAS_VALUE == 0 { 0 } else { 8 };
    if body.remaining() != 4 * arity + value_len {
        return Err(corrupt("record length disagrees with arity"));
    }
    let args = (0..arity).map(|_| EntityId(body.get_u32_le())).collect();
    let value = (value_len != 0).then(|| body.get_f64_le());
    if let Some(v) = value {
        if !(0.0..=1.0).contains(&v) {
            return Err(corrupt("value outside [0, 1]"));
        }
    }
    Ok(StoredFact {
        partition,
        predicate,
        args,
        value,
    })
}

/// `read_exact` where running out of bytes mid-record means a cut-off log.
fn read_record(reader: &mut impl Read, buf: &mut [u8], offset: u64) -> Result<(), StoreError> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == ErrorKind::UnexpectedEof {
            StoreError::Corrupt {
                offset,
                reason: "record truncated",
            }
        } else {
            StoreError::Io(err)
        }
    })
}

impl FactLog for DiskLog {
    fn append(&mut self, fact: &StoredFact) -> Result<(), StoreError> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        encode(fact, &mut scratch);
        let result = self.writer().and_then(|w| Ok(w.write_all(&scratch)?));
        self.scratch = scratch;
        result
    }

    fn scan(
        &mut self,
        partitions: &[Partition],
        visit: &mut dyn FnMut(StoredFact),
    ) -> Result<(), StoreError> {
        self.writer()?.flush()?;
        let mut reader = BufReader::new(File::open(&self.path)?);

        let mut header = [0u8; HEADER_LEN];
        reader.read_exact(&mut header)?;
        if &header[..4] != MAGIC {
            return Err(StoreError::Corrupt {
                offset: 0,
                reason: "bad magic",
            });
        }
        if u16::from_le_bytes([header[4], header[5]]) != VERSION {
            return Err(StoreError::Corrupt {
                offset: 4,
                reason: "unsupported version",
            });
        }

        let mut offset = HEADER_LEN as u64;
        let mut body = [0u8; MAX_BODY_LEN];
        loop {
            if reader.fill_buf()?.is_empty() {
                return Ok(());
            }
            let mut len = [0u8; 4];
            read_record(&mut reader, &mut len, offset)?;
            let len = u32::from_le_bytes(len) as usize;
            if !(FIXED_BODY_LEN..=MAX_BODY_LEN).contains(&len) {
                return Err(StoreError::Corrupt {
                    offset,
                    reason: "record length out of range",
                });
            }
            read_record(&mut reader, &mut body[..len], offset)?;
            let fact = decode(&body[..len], offset)?;
            if partitions.contains(&fact.partition) {
                visit(fact);
            }
            offset += 4 + len as u64;
        }
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_length_mismatch() {
        let fact = StoredFact {
            partition: Partition(0),
            predicate: PredicateId(1),
            args: vec![EntityId(3), EntityId(4)],
            value: Some(0.25),
        };
        let mut buf = BytesMut::new();
        encode(&fact, &mut buf);
        let body = &buf[4..];
        assert_eq!(decode(body, 0).unwrap(), fact);
        let err = decode(&body[..body.len() - 1], 0).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
