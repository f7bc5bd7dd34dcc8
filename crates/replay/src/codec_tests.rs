use bevy::math::Vec3;
use proptest::prelude::*;

use crate::codec::{decode, encode, FORMAT_VERSION, HEADER_SIZE, MAGIC, VERSION_OFFSET};
use crate::replay_error::ReplayError;
use crate::session::{Pose, ReplayData};

/// Three tracks at 60 Hz for two seconds.
fn three_track_session() -> ReplayData {
    let step = 1.0 / 60.0;
    let mut data = ReplayData::new(
        step,
        vec![
            "Level/Player#Pl4yer00".to_string(),
            "Level/Crates/Crate#cRate001".to_string(),
            "Level/Crates/Crate#cRate002".to_string(),
        ],
    );
    for frame in 0..120 {
        let t = frame as f32 * step;
        data.push_frame(
            t,
            &[
                Pose::new(Vec3::new(t * 3.0, 1.0, 0.0), t * 45.0),
                Pose::new(Vec3::new(-2.0, t.sin(), 0.5), 350.0 + t),
                Pose::new(Vec3::new(4.0, -t, -1.0), -t * 90.0),
            ],
        );
    }
    data
}

fn assert_bit_exact(a: &ReplayData, b: &ReplayData) {
    assert_eq!(a.step.to_bits(), b.step.to_bits());
    assert_eq!(a.track_count, b.track_count);
    assert_eq!(a.identifiers, b.identifiers);
    let bits = |v: &[f32]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
    let vec_bits = |v: &[Vec3]| {
        v.iter()
            .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
            .collect::<Vec<_>>()
    };
    assert_eq!(bits(&a.times), bits(&b.times));
    assert_eq!(vec_bits(&a.positions), vec_bits(&b.positions));
    assert_eq!(bits(&a.rotations), bits(&b.rotations));
}

#[test]
fn test_roundtrip_three_tracks() {
    let original = three_track_session();
    let bytes = encode(&original);
    assert_eq!(&bytes[..4], &MAGIC);

    let decoded = decode(&bytes).expect("decode should succeed");
    assert_bit_exact(&original, &decoded);
    assert_eq!(decoded.frame_count(), 120);
}

#[test]
fn test_flipped_version_rejected() {
    let mut bytes = encode(&three_track_session());
    bytes[VERSION_OFFSET] ^= 0xFF;

    let err = decode(&bytes).unwrap_err();
    assert!(
        matches!(err, ReplayError::VersionMismatch { expected, .. } if expected == FORMAT_VERSION),
        "got: {err}"
    );
    assert!(err.is_corrupt());
}

#[test]
fn test_bad_magic_rejected_before_lengths() {
    let mut bytes = encode(&three_track_session());
    bytes[0] = b'X';
    // Garbage lengths after the magic must not matter.
    bytes[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&i32::MAX.to_le_bytes());

    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, ReplayError::BadMagic { .. }), "got: {err}");
}

#[test]
fn test_every_truncation_fails() {
    let bytes = encode(&three_track_session());
    for len in [0, 3, 8, HEADER_SIZE, HEADER_SIZE + 2, bytes.len() / 2, bytes.len() - 1] {
        let result = decode(&bytes[..len]);
        assert!(result.is_err(), "prefix of {len} bytes decoded");
        assert!(result.unwrap_err().is_corrupt());
    }
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut bytes = encode(&three_track_session());
    bytes.push(0);
    let err = decode(&bytes).unwrap_err();
    assert!(format!("{err}").contains("trailing"), "got: {err}");
}

#[test]
fn test_rotation_count_mismatch_rejected() {
    let mut data = three_track_session();
    // Drop one whole frame of rotations: still divisible, unequal quotients.
    data.rotations.truncate(data.rotations.len() - 3);
    let err = decode(&encode(&data)).unwrap_err();
    assert!(format!("{err}").contains("frame count mismatch"), "got: {err}");
}

#[test]
fn test_indivisible_positions_rejected() {
    let mut data = three_track_session();
    data.positions.pop();
    let err = decode(&encode(&data)).unwrap_err();
    assert!(matches!(err, ReplayError::Malformed(_)), "got: {err}");
}

#[test]
fn test_huge_count_is_truncation_not_allocation() {
    let data = ReplayData::new(0.5, Vec::new());
    let mut bytes = encode(&data);
    // Identifier count directly follows the header.
    bytes[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&i32::MAX.to_le_bytes());
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, ReplayError::Truncated { .. }), "got: {err}");
}

#[test]
fn test_negative_track_count_rejected() {
    let mut bytes = encode(&ReplayData::new(0.5, Vec::new()));
    bytes[12..16].copy_from_slice(&(-1i32).to_le_bytes());
    assert!(matches!(decode(&bytes), Err(ReplayError::Malformed(_))));
}

#[test]
fn test_invalid_utf8_identifier() {
    let mut data = ReplayData::new(0.5, vec!["ab".to_string()]);
    data.push_frame(0.0, &[Pose::default()]);
    let mut bytes = encode(&data);
    // header + identifier count + string length, then the two string bytes.
    let string_start = HEADER_SIZE + 4 + 4;
    bytes[string_start] = 0xFF;
    assert!(matches!(
        decode(&bytes),
        Err(ReplayError::InvalidUtf8 { index: 0 })
    ));
}

#[test]
fn test_zero_track_session_roundtrips() {
    let mut data = ReplayData::new(0.25, Vec::new());
    data.push_frame(0.0, &[]);
    data.push_frame(0.25, &[]);
    let decoded = decode(&encode(&data)).expect("degenerate session is still valid");
    assert_eq!(decoded.track_count, 0);
    assert_eq!(decoded.times, vec![0.0, 0.25]);
}

#[test]
fn test_zero_tracks_with_identifiers_rejected() {
    let mut data = ReplayData::new(0.25, Vec::new());
    data.identifiers.push("Level/Stray#strayid1".to_string());
    data.push_frame(0.0, &[]);
    assert!(matches!(decode(&encode(&data)), Err(ReplayError::Malformed(_))));
}

fn arb_session() -> impl Strategy<Value = ReplayData> {
    (1usize..4, 0usize..24, 0.001f32..1.0).prop_flat_map(|(tracks, frames, step)| {
        let samples = tracks * frames;
        (
            Just(step),
            prop::collection::vec("[A-Za-z/]{1,12}#[A-Za-z0-9]{8}", tracks),
            prop::collection::vec(any::<f32>(), frames),
            prop::collection::vec(any::<[f32; 3]>(), samples),
            prop::collection::vec(any::<f32>(), samples),
        )
            .prop_map(|(step, identifiers, times, positions, rotations)| ReplayData {
                step,
                track_count: identifiers.len() as i32,
                identifiers,
                times,
                positions: positions.into_iter().map(Vec3::from_array).collect(),
                rotations,
            })
    })
}

proptest! {
    #[test]
    fn prop_roundtrip_is_bit_exact(data in arb_session()) {
        let decoded = decode(&encode(&data)).expect("valid session decodes");
        assert_bit_exact(&data, &decoded);
        prop_assert_eq!(
            decoded.positions.len() / decoded.track_count as usize,
            decoded.rotations.len() / decoded.track_count as usize
        );
    }

    #[test]
    fn prop_random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode(&bytes);
    }
}
