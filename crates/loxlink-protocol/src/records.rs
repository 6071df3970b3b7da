//! Event-table records.
//!
//! An event-table payload is a run of records of one kind packed back to
//! back. Each record knows how many bytes it consumed, so a single walk
//! ([`decode_table`]) serves all four table kinds.
//!
//! Record layouts (all numeric fields little-endian):
//!
//! | record | layout | length |
//! |---|---|---|
//! | value | uuid, f64 | 24 |
//! | text | uuid, icon uuid, u32 len, text padded to 4 | 36 + pad4(len) |
//! | daytimer | uuid, f64 default, i32 n, n × entry(24) | 28 + 24n |
//! | weather | uuid, u32 last update, i32 n, n × entry(68) | 24 + 68n |

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::UUID_LEN;
use crate::error::{ProtocolError, ProtocolResult};
use crate::uuid::Uuid;
use crate::wire::{read_f64, read_i32, read_u32};

/// Unix timestamp of 2009-01-01T00:00:00Z, the device epoch.
pub const DEVICE_EPOCH: i64 = 1_230_768_000;

/// A record that can be decoded from an offset into a shared buffer.
pub trait Record: Sized {
    /// Decodes exactly one record starting at `offset`.
    fn decode(buf: &[u8], offset: usize) -> ProtocolResult<Self>;

    /// Number of bytes this record occupied on the wire.
    fn data_length(&self) -> usize;
}

/// Decodes a buffer made of back-to-back records of one kind.
///
/// Fails with [`ProtocolError::CorruptedPayload`] if a record would run past
/// the end of the buffer; the partial table is discarded.
pub fn decode_table<R: Record>(buf: &[u8]) -> ProtocolResult<Vec<R>> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let record = R::decode(buf, offset).map_err(|err| match err {
            ProtocolError::TruncatedBuffer {
                offset: field,
                needed,
                ..
            } => ProtocolError::CorruptedPayload {
                offset,
                record_len: field + needed - offset,
                buffer_len: buf.len(),
            },
            other => other,
        })?;

        let len = record.data_length();
        if len == 0 || offset + len > buf.len() {
            return Err(ProtocolError::CorruptedPayload {
                offset,
                record_len: len,
                buffer_len: buf.len(),
            });
        }

        records.push(record);
        offset += len;
    }

    Ok(records)
}

fn device_time(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(DEVICE_EPOCH + seconds, 0).single()
}

/// Reads an entry count and checks that `count` entries of `entry_len`
/// bytes fit in the buffer after the count field.
fn entry_count(buf: &[u8], offset: usize, entry_len: usize) -> ProtocolResult<usize> {
    let count = read_i32(buf, offset)?;
    let count = usize::try_from(count).map_err(|_| ProtocolError::CorruptedPayload {
        offset,
        record_len: 0,
        buffer_len: buf.len(),
    })?;

    let base = offset + 4;
    match count.checked_mul(entry_len) {
        Some(needed) if buf.len().saturating_sub(base) >= needed => Ok(count),
        needed => Err(ProtocolError::truncated(
            buf,
            base,
            needed.unwrap_or(usize::MAX - base),
        )),
    }
}

// ---------------------------------------------------------------------------
// Value events
// ---------------------------------------------------------------------------

/// A numeric state change of one control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueEvent {
    pub uuid: Uuid,
    pub value: f64,
}

impl ValueEvent {
    /// Wire size of a value record.
    pub const LEN: usize = UUID_LEN + 8;
}

impl Record for ValueEvent {
    fn decode(buf: &[u8], offset: usize) -> ProtocolResult<Self> {
        Ok(Self {
            uuid: Uuid::decode(buf, offset)?,
            value: read_f64(buf, offset + UUID_LEN)?,
        })
    }

    fn data_length(&self) -> usize {
        Self::LEN
    }
}

// ---------------------------------------------------------------------------
// Text events
// ---------------------------------------------------------------------------

/// A text state change of one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextEvent {
    pub uuid: Uuid,
    pub icon: Uuid,
    pub text: String,
    #[serde(skip)]
    data_length: usize,
}

impl TextEvent {
    /// Bytes before the text body.
    pub const FIXED_LEN: usize = 2 * UUID_LEN + 4;
}

impl Record for TextEvent {
    fn decode(buf: &[u8], offset: usize) -> ProtocolResult<Self> {
        let uuid = Uuid::decode(buf, offset)?;
        let icon = Uuid::decode(buf, offset + UUID_LEN)?;
        let text_len = read_u32(buf, offset + 2 * UUID_LEN)? as usize;

        let start = offset + Self::FIXED_LEN;
        let body = buf
            .get(start..)
            .and_then(|rest| rest.get(..text_len))
            .ok_or_else(|| ProtocolError::truncated(buf, start, text_len))?;

        Ok(Self {
            uuid,
            icon,
            text: String::from_utf8_lossy(body).into_owned(),
            data_length: Self::FIXED_LEN + text_len.next_multiple_of(4),
        })
    }

    fn data_length(&self) -> usize {
        self.data_length
    }
}

// ---------------------------------------------------------------------------
// Daytimer events
// ---------------------------------------------------------------------------

/// One switching window of a daytimer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaytimerEntry {
    pub mode: i32,
    /// Minutes since midnight.
    pub from: i32,
    /// Minutes since midnight.
    pub to: i32,
    pub need_activate: bool,
    pub value: f64,
}

impl DaytimerEntry {
    pub const LEN: usize = 24;

    fn decode(buf: &[u8], offset: usize) -> ProtocolResult<Self> {
        Ok(Self {
            mode: read_i32(buf, offset)?,
            from: read_i32(buf, offset + 4)?,
            to: read_i32(buf, offset + 8)?,
            need_activate: read_i32(buf, offset + 12)? != 0,
            value: read_f64(buf, offset + 16)?,
        })
    }
}

/// The schedule of one daytimer control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaytimerEvent {
    pub uuid: Uuid,
    pub default_value: f64,
    pub entries: Vec<DaytimerEntry>,
}

impl DaytimerEvent {
    /// Bytes before the first entry.
    pub const FIXED_LEN: usize = UUID_LEN + 8 + 4;
}

impl Record for DaytimerEvent {
    fn decode(buf: &[u8], offset: usize) -> ProtocolResult<Self> {
        let uuid = Uuid::decode(buf, offset)?;
        let default_value = read_f64(buf, offset + UUID_LEN)?;
        let count = entry_count(buf, offset + UUID_LEN + 8, DaytimerEntry::LEN)?;

        let base = offset + Self::FIXED_LEN;
        let entries = (0..count)
            .map(|i| DaytimerEntry::decode(buf, base + i * DaytimerEntry::LEN))
            .collect::<ProtocolResult<Vec<_>>>()?;

        Ok(Self {
            uuid,
            default_value,
            entries,
        })
    }

    fn data_length(&self) -> usize {
        Self::FIXED_LEN + self.entries.len() * DaytimerEntry::LEN
    }
}

// ---------------------------------------------------------------------------
// Weather events
// ---------------------------------------------------------------------------

/// One forecast slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherEntry {
    /// Seconds since the device epoch.
    pub timestamp: i32,
    pub weather_type: i32,
    pub wind_direction: i32,
    pub solar_radiation: i32,
    pub relative_humidity: i32,
    pub temperature: f64,
    pub perceived_temperature: f64,
    pub dew_point: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub barometric_pressure: f64,
}

impl WeatherEntry {
    pub const LEN: usize = 5 * 4 + 6 * 8;

    fn decode(buf: &[u8], offset: usize) -> ProtocolResult<Self> {
        Ok(Self {
            timestamp: read_i32(buf, offset)?,
            weather_type: read_i32(buf, offset + 4)?,
            wind_direction: read_i32(buf, offset + 8)?,
            solar_radiation: read_i32(buf, offset + 12)?,
            relative_humidity: read_i32(buf, offset + 16)?,
            temperature: read_f64(buf, offset + 20)?,
            perceived_temperature: read_f64(buf, offset + 28)?,
            dew_point: read_f64(buf, offset + 36)?,
            precipitation: read_f64(buf, offset + 44)?,
            wind_speed: read_f64(buf, offset + 52)?,
            barometric_pressure: read_f64(buf, offset + 60)?,
        })
    }

    /// Wall-clock time of this slot.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        device_time(i64::from(self.timestamp))
    }
}

/// A weather forecast block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherEvent {
    pub uuid: Uuid,
    /// Seconds since the device epoch.
    pub last_update: u32,
    pub entries: Vec<WeatherEntry>,
}

impl WeatherEvent {
    /// Bytes before the first entry.
    pub const FIXED_LEN: usize = UUID_LEN + 4 + 4;

    /// Wall-clock time of the last forecast update.
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        device_time(i64::from(self.last_update))
    }
}

impl Record for WeatherEvent {
    fn decode(buf: &[u8], offset: usize) -> ProtocolResult<Self> {
        let uuid = Uuid::decode(buf, offset)?;
        let last_update = read_u32(buf, offset + UUID_LEN)?;
        let count = entry_count(buf, offset + UUID_LEN + 4, WeatherEntry::LEN)?;

        let base = offset + Self::FIXED_LEN;
        let entries = (0..count)
            .map(|i| WeatherEntry::decode(buf, base + i * WeatherEntry::LEN))
            .collect::<ProtocolResult<Vec<_>>>()?;

        Ok(Self {
            uuid,
            last_update,
            entries,
        })
    }

    fn data_length(&self) -> usize {
        Self::FIXED_LEN + self.entries.len() * WeatherEntry::LEN
    }
}
