//! Decoder for the appliance's binary schema (".dat") files.
//!
//! Every ring buffer database on the appliance is described by a schema file
//! that names the owning device and, per resolution tier, the geometry of one
//! circular sample buffer. The format is a fixed-layout binary container with
//! length-prefixed strings and little-endian scalars.
//!
//! # File Layout
//! ```text
//! [17-byte format tag]            (must equal "hcb_rrd_09082011A")
//! [device id]                     (u32 length + bytes)
//! [device variable]               (u32 length + bytes)
//! [device service]                (u32 length + bytes)
//! [sample-kind label]             (u32 length + bytes; "integer" or other)
//!
//! then, repeated per subset until EOF:
//!   integer kind: 3 x i32         (reserved)
//!   float kind:   2 x f64         (scale value, divider)
//!   t_prev: i32                   (timestamp of the second-newest slot)
//!   t_last: i32                   (timestamp of the newest slot)
//!   min samples per bin: i32
//!   [interval label]              (u32 length + bytes)
//!   offset: i32                   (physical slot of the newest sample)
//!   capacity: i32                 (slot count of the ring)
//!   reserved: i32
//!   [consolidator label]          (u32 length + bytes)
//! ```
//!
//! Two tolerance rules keep a damaged database from aborting a whole
//! migration: a device id equal to the `placeholder` sentinel means the
//! database was never initialized (zero subsets, not an error), and a subset
//! whose declared lengths exceed the remaining bytes is discarded while the
//! fully-decoded subsets before it are kept.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{TransferError, TransferResult};
use crate::sample::SampleKind;

/// Format tag every schema file must start with.
pub const SCHEMA_TAG: &[u8; 17] = b"hcb_rrd_09082011A";

/// Device id assigned before the appliance has ever met its meter adapter.
pub const PLACEHOLDER_DEVICE_ID: &str = "placeholder";

/// Kind-specific leading fields of a subset record.
#[derive(Debug, Clone, PartialEq)]
pub enum SubsetHeader {
    /// Integer subsets carry three reserved words.
    Reserved([i32; 3]),
    /// Float subsets carry a scale pair, unused by the merge.
    Scale {
        /// Scale numerator.
        value: f64,
        /// Scale denominator.
        divider: f64,
    },
}

/// Geometry and labels of one circular sample buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetRecord {
    /// Kind-specific leading fields.
    pub header: SubsetHeader,
    /// Timestamp of the second-newest sample.
    pub t_prev: i64,
    /// Timestamp of the newest sample, held by the slot at `offset`.
    pub t_last: i64,
    /// Minimum samples per consolidation bin.
    pub min_samples_per_bin: i32,
    /// Human-readable interval label, also used in derived filenames.
    pub interval: String,
    /// Physical slot index of the newest sample (the ring's write head).
    pub offset: usize,
    /// Fixed slot count of the ring.
    pub capacity: usize,
    /// Reserved trailing word.
    pub reserved: i32,
    /// Consolidation-function label.
    pub consolidator: String,
}

impl SubsetRecord {
    /// Fixed sampling interval of this subset.
    pub fn sample_interval(&self) -> i64 {
        self.t_last - self.t_prev
    }
}

/// One parsed schema file: the owning device and its ring buffer subsets.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// Device identifier, or the `placeholder` sentinel.
    pub device_id: String,
    /// Device-class variable name.
    pub variable: String,
    /// Device service name.
    pub service: String,
    /// Value kind of every buffer this device owns.
    pub sample_kind: SampleKind,
    /// Display name resolved from the registry; not part of the raw decode.
    pub display_name: Option<String>,
    /// The device's ring buffer subsets, in schema order.
    pub subsets: Vec<SubsetRecord>,
}

impl DeviceRecord {
    /// False when the device still carries the `placeholder` sentinel id.
    pub fn is_provisioned(&self) -> bool {
        self.device_id != PLACEHOLDER_DEVICE_ID
    }

    /// Access a subset by index, guarding the range invariant.
    pub fn subset(&self, index: usize) -> TransferResult<&SubsetRecord> {
        self.subsets
            .get(index)
            .ok_or(TransferError::SubsetOutOfRange {
                index,
                n_sets: self.subsets.len(),
            })
    }
}

/// Why a subset failed to decode; both cases take the discard path.
enum SubsetDecodeError {
    Truncated(&'static str),
    BadGeometry { offset: i32, capacity: i32 },
}

/// Bounds-checked reader over the schema byte stream.
struct SchemaCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SchemaCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], &'static str> {
        if self.buf.len() - self.pos < n {
            return Err(field);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_i32(&mut self, field: &'static str) -> Result<i32, &'static str> {
        let raw = self.take(4, field)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(raw);
        Ok(i32::from_le_bytes(bytes))
    }

    fn read_f64(&mut self, field: &'static str) -> Result<f64, &'static str> {
        let raw = self.take(8, field)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(f64::from_le_bytes(bytes))
    }

    /// Read a length-prefixed string, validating the declared length against
    /// the remaining bytes before touching the payload.
    fn read_string(&mut self, field: &'static str) -> Result<String, &'static str> {
        let len = self.read_i32(field)?;
        let len = usize::try_from(len).map_err(|_| field)?;
        let raw = self.take(len, field)?;
        // The appliance stores strings NUL-terminated inside the length.
        let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}

/// Read and decode one schema file.
pub fn read_schema_file(path: &Path) -> TransferResult<DeviceRecord> {
    let bytes = fs::read(path)?;
    decode_device_record(&bytes)
}

/// Decode a schema byte stream into a [`DeviceRecord`].
///
/// Fails with [`TransferError::FormatMismatch`] on a bad format tag and
/// [`TransferError::Truncated`] when the device header itself is incomplete.
/// Truncation inside a subset is tolerated: the partial subset is discarded
/// and the record keeps every subset fully decoded before it.
pub fn decode_device_record(bytes: &[u8]) -> TransferResult<DeviceRecord> {
    let mut cur = SchemaCursor::new(bytes);

    let tag = cur
        .take(SCHEMA_TAG.len(), "format tag")
        .map_err(TransferError::Truncated)?;
    if tag != SCHEMA_TAG {
        return Err(TransferError::FormatMismatch);
    }

    let device_id = cur
        .read_string("device id")
        .map_err(TransferError::Truncated)?;
    let variable = cur
        .read_string("device variable")
        .map_err(TransferError::Truncated)?;
    let service = cur
        .read_string("device service")
        .map_err(TransferError::Truncated)?;
    let kind_label = cur
        .read_string("sample kind")
        .map_err(TransferError::Truncated)?;

    let mut record = DeviceRecord {
        device_id,
        variable,
        service,
        sample_kind: SampleKind::from_label(&kind_label),
        display_name: None,
        subsets: Vec::new(),
    };

    // Unprovisioned databases carry no usable subsets, whatever trails.
    if !record.is_provisioned() {
        return Ok(record);
    }

    while !cur.is_empty() {
        match decode_subset(&mut cur, record.sample_kind) {
            Ok(subset) => record.subsets.push(subset),
            Err(SubsetDecodeError::Truncated(field)) => {
                warn!(
                    field,
                    kept = record.subsets.len(),
                    "schema file is partly corrupted, continuing"
                );
                break;
            }
            Err(SubsetDecodeError::BadGeometry { offset, capacity }) => {
                warn!(
                    offset,
                    capacity,
                    kept = record.subsets.len(),
                    "subset geometry out of range, continuing"
                );
                break;
            }
        }
    }

    Ok(record)
}

fn decode_subset(
    cur: &mut SchemaCursor<'_>,
    kind: SampleKind,
) -> Result<SubsetRecord, SubsetDecodeError> {
    use SubsetDecodeError::Truncated;

    let header = match kind {
        SampleKind::Integer => SubsetHeader::Reserved([
            cur.read_i32("reserved word 0").map_err(Truncated)?,
            cur.read_i32("reserved word 1").map_err(Truncated)?,
            cur.read_i32("reserved word 2").map_err(Truncated)?,
        ]),
        SampleKind::Float => SubsetHeader::Scale {
            value: cur.read_f64("scale value").map_err(Truncated)?,
            divider: cur.read_f64("scale divider").map_err(Truncated)?,
        },
    };

    let t_prev = cur.read_i32("t_prev").map_err(Truncated)?;
    let t_last = cur.read_i32("t_last").map_err(Truncated)?;
    let min_samples_per_bin = cur.read_i32("min samples per bin").map_err(Truncated)?;
    let interval = cur.read_string("interval label").map_err(Truncated)?;
    let raw_offset = cur.read_i32("offset").map_err(Truncated)?;
    let raw_capacity = cur.read_i32("capacity").map_err(Truncated)?;
    let reserved = cur.read_i32("reserved tail").map_err(Truncated)?;
    let consolidator = cur.read_string("consolidator label").map_err(Truncated)?;

    let bad_geometry = SubsetDecodeError::BadGeometry {
        offset: raw_offset,
        capacity: raw_capacity,
    };
    let (offset, capacity) = match (
        usize::try_from(raw_offset),
        usize::try_from(raw_capacity),
    ) {
        (Ok(o), Ok(c)) if o < c || (c == 0 && o == 0) => (o, c),
        _ => return Err(bad_geometry),
    };

    Ok(SubsetRecord {
        header,
        t_prev: i64::from(t_prev),
        t_last: i64::from(t_last),
        min_samples_per_bin,
        interval,
        offset,
        capacity,
        reserved,
        consolidator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_str(buf: &mut Vec<u8>, s: &str) {
        // Strings in real files include the trailing NUL in their length.
        let len = (s.len() + 1) as i32;
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
        buf.push(0);
    }

    fn device_header(device_id: &str, kind: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(SCHEMA_TAG);
        push_str(&mut buf, device_id);
        push_str(&mut buf, "CurrentElectricityQuantity");
        push_str(&mut buf, "hdrv_zwave");
        push_str(&mut buf, kind);
        buf
    }

    fn push_integer_subset(buf: &mut Vec<u8>, t_prev: i32, t_last: i32, offset: i32, cap: i32) {
        for word in [0i32, 0, 0] {
            buf.extend_from_slice(&word.to_le_bytes());
        }
        buf.extend_from_slice(&t_prev.to_le_bytes());
        buf.extend_from_slice(&t_last.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        push_str(buf, "hour");
        buf.extend_from_slice(&offset.to_le_bytes());
        buf.extend_from_slice(&cap.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        push_str(buf, "last");
    }

    #[test]
    fn decodes_integer_device_with_two_subsets() {
        let mut buf = device_header("dev-1234", "integer");
        push_integer_subset(&mut buf, 100, 110, 2, 5);
        push_integer_subset(&mut buf, 3600, 7200, 0, 24);

        let record = decode_device_record(&buf).unwrap();
        assert_eq!(record.device_id, "dev-1234");
        assert_eq!(record.sample_kind, SampleKind::Integer);
        assert!(record.is_provisioned());
        assert_eq!(record.subsets.len(), 2);

        let first = &record.subsets[0];
        assert_eq!(first.sample_interval(), 10);
        assert_eq!(first.offset, 2);
        assert_eq!(first.capacity, 5);
        assert_eq!(first.interval, "hour");
        assert_eq!(first.consolidator, "last");
        assert_eq!(first.header, SubsetHeader::Reserved([0, 0, 0]));
    }

    #[test]
    fn decodes_float_scale_pair() {
        let mut buf = device_header("dev-5678", "double");
        buf.extend_from_slice(&2.5f64.to_le_bytes());
        buf.extend_from_slice(&10.0f64.to_le_bytes());
        buf.extend_from_slice(&100i32.to_le_bytes());
        buf.extend_from_slice(&110i32.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        push_str(&mut buf, "day");
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&7i32.to_le_bytes());
        buf.extend_from_slice(&0i32.to_le_bytes());
        push_str(&mut buf, "avg");

        let record = decode_device_record(&buf).unwrap();
        assert_eq!(record.sample_kind, SampleKind::Float);
        assert_eq!(record.subsets.len(), 1);
        assert_eq!(
            record.subsets[0].header,
            SubsetHeader::Scale {
                value: 2.5,
                divider: 10.0
            }
        );
    }

    #[test]
    fn rejects_bad_format_tag() {
        let mut buf = device_header("dev-1234", "integer");
        buf[0] ^= 0xff;
        assert!(matches!(
            decode_device_record(&buf),
            Err(TransferError::FormatMismatch)
        ));
    }

    #[test]
    fn truncated_device_header_is_an_error() {
        let buf = device_header("dev-1234", "integer");
        // Chop into the middle of the sample-kind string.
        let cut = &buf[..buf.len() - 3];
        assert!(matches!(
            decode_device_record(cut),
            Err(TransferError::Truncated(_))
        ));
    }

    #[test]
    fn truncated_subset_keeps_fully_decoded_ones() {
        let mut buf = device_header("dev-1234", "integer");
        push_integer_subset(&mut buf, 100, 110, 2, 5);
        push_integer_subset(&mut buf, 3600, 7200, 0, 24);
        // Chop the second subset's consolidator payload short.
        let cut = &buf[..buf.len() - 2];

        let record = decode_device_record(cut).unwrap();
        assert_eq!(record.subsets.len(), 1);
        assert_eq!(record.subsets[0].capacity, 5);
    }

    #[test]
    fn placeholder_device_has_no_subsets() {
        let mut buf = device_header(PLACEHOLDER_DEVICE_ID, "integer");
        // Trailing garbage must be ignored.
        buf.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let record = decode_device_record(&buf).unwrap();
        assert!(!record.is_provisioned());
        assert!(record.subsets.is_empty());
    }

    #[test]
    fn offset_beyond_capacity_takes_discard_path() {
        let mut buf = device_header("dev-1234", "integer");
        push_integer_subset(&mut buf, 100, 110, 2, 5);
        push_integer_subset(&mut buf, 100, 110, 9, 5);

        let record = decode_device_record(&buf).unwrap();
        assert_eq!(record.subsets.len(), 1);
    }

    #[test]
    fn empty_ring_is_legal_geometry() {
        let mut buf = device_header("dev-1234", "integer");
        push_integer_subset(&mut buf, 0, 0, 0, 0);
        let record = decode_device_record(&buf).unwrap();
        assert_eq!(record.subsets.len(), 1);
        assert_eq!(record.subsets[0].capacity, 0);
    }

    #[test]
    fn clean_eof_after_subset_ends_decoding() {
        let mut buf = device_header("dev-1234", "integer");
        push_integer_subset(&mut buf, 100, 110, 2, 5);
        let record = decode_device_record(&buf).unwrap();
        assert_eq!(record.subsets.len(), 1);
    }

    #[test]
    fn subset_accessor_guards_range() {
        let buf = device_header("dev-1234", "integer");
        let record = decode_device_record(&buf).unwrap();
        assert!(matches!(
            record.subset(0),
            Err(TransferError::SubsetOutOfRange { index: 0, n_sets: 0 })
        ));
    }
}
