// ---------------------------------------------------------------------------
// codec – Binary replay cache format
// ---------------------------------------------------------------------------
//
// Layout (all fields little-endian, no padding):
//   [0..4]   Magic bytes: "RPLY"
//   [4..8]   Format version (u32)
//   [8..12]  Sample step in seconds (f32)
//   [12..16] Track count (i32)
//   then four length-prefixed arrays, each led by an i32 element count:
//     identifiers: per entry a u32 byte length followed by UTF-8 bytes
//     times:       f32 per frame
//     positions:   f32 x, f32 y, f32 z per (frame, track)
//     rotations:   f32 degrees per (frame, track)
//
// On decode the magic and version are checked before any length field is
// trusted. Every count is bounds-checked against the remaining buffer before
// allocating, and the finished session must pass `ReplayData::validate`.

use bevy::math::Vec3;

use crate::replay_error::ReplayError;
use crate::session::ReplayData;

/// Magic bytes identifying a replay cache file.
pub const MAGIC: [u8; 4] = *b"RPLY";

/// Current format version. Any other value is rejected on load.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the fixed header (magic, version, step, track count).
pub const HEADER_SIZE: usize = 16;

/// Byte offset of the format version field.
pub const VERSION_OFFSET: usize = 4;

/// Serialize a session. Encoding cannot fail; validity is the caller's concern.
pub fn encode(data: &ReplayData) -> Vec<u8> {
    let string_bytes: usize = data.identifiers.iter().map(|s| 4 + s.len()).sum();
    let mut out = Vec::with_capacity(
        HEADER_SIZE
            + 16
            + string_bytes
            + data.times.len() * 4
            + data.positions.len() * 12
            + data.rotations.len() * 4,
    );

    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&data.step.to_le_bytes());
    out.extend_from_slice(&data.track_count.to_le_bytes());

    write_count(&mut out, data.identifiers.len());
    for identifier in &data.identifiers {
        out.extend_from_slice(&(identifier.len() as u32).to_le_bytes());
        out.extend_from_slice(identifier.as_bytes());
    }

    write_count(&mut out, data.times.len());
    for time in &data.times {
        out.extend_from_slice(&time.to_le_bytes());
    }

    write_count(&mut out, data.positions.len());
    for position in &data.positions {
        out.extend_from_slice(&position.x.to_le_bytes());
        out.extend_from_slice(&position.y.to_le_bytes());
        out.extend_from_slice(&position.z.to_le_bytes());
    }

    write_count(&mut out, data.rotations.len());
    for rotation in &data.rotations {
        out.extend_from_slice(&rotation.to_le_bytes());
    }

    out
}

fn write_count(out: &mut Vec<u8>, count: usize) {
    out.extend_from_slice(&(count as i32).to_le_bytes());
}

/// Deserialize and validate a session. On any error no partial session is
/// returned.
pub fn decode(bytes: &[u8]) -> Result<ReplayData, ReplayError> {
    let mut reader = Reader::new(bytes);

    let magic = reader.take_array::<4>("magic")?;
    if magic != MAGIC {
        return Err(ReplayError::BadMagic { found: magic });
    }
    let version = reader.u32("format version")?;
    if version != FORMAT_VERSION {
        return Err(ReplayError::VersionMismatch {
            expected: FORMAT_VERSION,
            found: version,
        });
    }

    let step = reader.f32("step")?;
    if !(step.is_finite() && step > 0.0) {
        return Err(ReplayError::Malformed(format!(
            "step must be positive, found {step}"
        )));
    }
    let track_count = reader.i32("track count")?;
    if track_count < 0 {
        return Err(ReplayError::Malformed(format!(
            "negative track count {track_count}"
        )));
    }

    // Each identifier costs at least its 4-byte length prefix.
    let identifier_count = reader.count("identifier count", 4)?;
    let mut identifiers = Vec::with_capacity(identifier_count);
    for index in 0..identifier_count {
        let len = reader.u32("identifier length")? as usize;
        let raw = reader.take(len, "identifier bytes")?;
        let identifier =
            std::str::from_utf8(raw).map_err(|_| ReplayError::InvalidUtf8 { index })?;
        identifiers.push(identifier.to_string());
    }

    let time_count = reader.count("times count", 4)?;
    let mut times = Vec::with_capacity(time_count);
    for _ in 0..time_count {
        times.push(reader.f32("times")?);
    }

    let position_count = reader.count("positions count", 12)?;
    let mut positions = Vec::with_capacity(position_count);
    for _ in 0..position_count {
        let x = reader.f32("positions")?;
        let y = reader.f32("positions")?;
        let z = reader.f32("positions")?;
        positions.push(Vec3::new(x, y, z));
    }

    let rotation_count = reader.count("rotations count", 4)?;
    let mut rotations = Vec::with_capacity(rotation_count);
    for _ in 0..rotation_count {
        rotations.push(reader.f32("rotations")?);
    }

    if reader.remaining() != 0 {
        return Err(ReplayError::Malformed(format!(
            "{} trailing bytes after rotations",
            reader.remaining()
        )));
    }

    let data = ReplayData {
        step,
        track_count,
        identifiers,
        times,
        positions,
        rotations,
    };
    data.validate().map_err(ReplayError::Malformed)?;
    Ok(data)
}

/// Little-endian cursor over a byte slice.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], ReplayError> {
        if self.remaining() < len {
            return Err(ReplayError::Truncated { context });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], ReplayError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, context)?);
        Ok(out)
    }

    fn u32(&mut self, context: &'static str) -> Result<u32, ReplayError> {
        Ok(u32::from_le_bytes(self.take_array(context)?))
    }

    fn i32(&mut self, context: &'static str) -> Result<i32, ReplayError> {
        Ok(i32::from_le_bytes(self.take_array(context)?))
    }

    fn f32(&mut self, context: &'static str) -> Result<f32, ReplayError> {
        Ok(f32::from_le_bytes(self.take_array(context)?))
    }

    /// Read an element count and check that `count * min_element_size` bytes
    /// remain, so a corrupt count cannot trigger a huge allocation.
    fn count(
        &mut self,
        context: &'static str,
        min_element_size: usize,
    ) -> Result<usize, ReplayError> {
        let count = self.i32(context)?;
        if count < 0 {
            return Err(ReplayError::Malformed(format!("negative {context} {count}")));
        }
        let count = count as usize;
        if count.saturating_mul(min_element_size) > self.remaining() {
            return Err(ReplayError::Truncated { context });
        }
        Ok(count)
    }
}
