//! TSR container conformance tests.
//!
//! Checks the on-disk layout byte for byte, lossless round trips and the
//! integrity checks applied to forged or damaged files.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tsrimage::{codec, EncodeOptions, Error, Header, PixelMatrix};

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(6));
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn forge(width: u32, height: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Header { width, height }.to_bytes().to_vec();
    out.extend_from_slice(&zlib(payload));
    out
}

fn random_matrix(rng: &mut StdRng, width: u32, height: u32) -> PixelMatrix {
    let mut data = vec![0u8; (width * height * 3) as usize];
    rng.fill(data.as_mut_slice());
    PixelMatrix::new(width, height, data).unwrap()
}

/// Solid red 2x2 encodes to header 02 00 00 00 02 00 00 00 plus zlib.
#[test]
fn test_header_layout() {
    let m = PixelMatrix::filled(2, 2, [255, 0, 0]).unwrap();
    let bytes = codec::encode(&m).unwrap();
    assert_eq!(&bytes[..8], &[2, 0, 0, 0, 2, 0, 0, 0]);
    // zlib CMF: deflate, 32K window
    assert_eq!(bytes[8], 0x78);
    assert_eq!(((bytes[8] as u16) << 8 | bytes[9] as u16) % 31, 0);
}

#[test]
fn test_wide_header_is_little_endian() {
    let m = PixelMatrix::filled(300, 1, [0, 0, 0]).unwrap();
    let bytes = codec::encode(&m).unwrap();
    assert_eq!(&bytes[..8], &[0x2C, 0x01, 0, 0, 1, 0, 0, 0]);
    assert_eq!(
        codec::read_header(&bytes).unwrap(),
        Header {
            width: 300,
            height: 1
        }
    );
}

#[test]
fn test_empty_matrix_is_header_plus_empty_stream() {
    let bytes = codec::encode(&PixelMatrix::empty()).unwrap();
    assert_eq!(&bytes[..8], &[0u8; 8]);
    assert!(bytes.len() > 8);
    assert_eq!(codec::decode(&bytes).unwrap(), PixelMatrix::empty());
}

#[test]
fn test_zero_width_with_height_roundtrips() {
    let m = PixelMatrix::new(0, 50, Vec::new()).unwrap();
    let decoded = codec::decode(&codec::encode(&m).unwrap()).unwrap();
    assert_eq!(decoded.dimensions(), (0, 50));
    assert_eq!(decoded.rows().count(), 50);
}

#[test]
fn test_random_images_roundtrip_at_every_level() {
    let mut rng = StdRng::seed_from_u64(0x75_72);
    for level in 0..=9u8 {
        let width = rng.gen_range(1..40);
        let height = rng.gen_range(1..40);
        let m = random_matrix(&mut rng, width, height);
        let opts = EncodeOptions {
            compression_level: level,
        };
        let bytes = codec::encode_with_options(&m, &opts).unwrap();
        assert_eq!(codec::decode(&bytes).unwrap(), m, "level {level}");
    }
}

#[test]
fn test_short_inputs_are_truncated_header() {
    for len in 0..8 {
        let data = vec![1u8; len];
        match codec::decode(&data) {
            Err(Error::TruncatedHeader { actual }) => assert_eq!(actual, len),
            other => panic!("len {len}: unexpected {other:?}"),
        }
    }
}

#[test]
fn test_header_only_is_corrupt() {
    let data = Header {
        width: 1,
        height: 1,
    }
    .to_bytes();
    assert!(matches!(codec::decode(&data), Err(Error::CorruptData(_))));
}

#[test]
fn test_payload_one_byte_short_is_malformed() {
    let data = forge(2, 2, &[7u8; 11]);
    match codec::decode(&data) {
        Err(Error::MalformedImage {
            width,
            height,
            expected,
            actual,
        }) => {
            assert_eq!((width, height), (2, 2));
            assert_eq!(expected, 12);
            assert_eq!(actual, 11);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_payload_one_byte_long_is_malformed() {
    let data = forge(2, 2, &[7u8; 13]);
    let err = codec::decode(&data).unwrap_err();
    assert!(err.is_malformed(), "{err}");
}

/// A tiny file claiming a large area must fail without inflating it all.
#[test]
fn test_bomb_payload_is_bounded() {
    let data = forge(1, 1, &vec![0u8; 8 * 1024 * 1024]);
    assert!(data.len() < 64 * 1024);
    match codec::decode(&data) {
        Err(Error::MalformedImage {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 3);
            assert_eq!(actual, 4);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_huge_header_with_small_payload() {
    let data = forge(60_000, 60_000, &[1, 2, 3]);
    let err = codec::decode(&data).unwrap_err();
    assert!(err.is_malformed(), "{err}");
}

#[test]
fn test_truncated_stream_is_corrupt() {
    let m = PixelMatrix::from_fn(16, 16, |x, y| [x as u8 * 9, y as u8 * 7, 3]).unwrap();
    let bytes = codec::encode(&m).unwrap();
    let cut = &bytes[..bytes.len() - 5];
    assert!(matches!(codec::decode(cut), Err(Error::CorruptData(_))));
}

#[test]
fn test_trailing_garbage_is_corrupt() {
    let m = PixelMatrix::filled(3, 3, [1, 2, 3]).unwrap();
    let mut bytes = codec::encode(&m).unwrap();
    bytes.extend_from_slice(b"junk");
    assert!(matches!(codec::decode(&bytes), Err(Error::CorruptData(_))));
}

/// Flipping any single byte must never panic and never decode to a
/// different image.
#[test]
fn test_single_byte_corruption_never_misdecodes() {
    let mut rng = StdRng::seed_from_u64(7);
    let m = random_matrix(&mut rng, 9, 7);
    let bytes = codec::encode(&m).unwrap();

    for i in 0..bytes.len() {
        for flip in [0x01u8, 0x80, 0xFF] {
            let mut damaged = bytes.clone();
            damaged[i] ^= flip;
            if let Ok(decoded) = codec::decode(&damaged) {
                assert_eq!(decoded, m, "byte {i} flip {flip:#04x} decoded differently");
            }
        }
    }
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gradient.tsr");
    let m = PixelMatrix::from_fn(33, 17, |x, y| [x as u8, y as u8, (x ^ y) as u8]).unwrap();

    codec::save(&path, &m, &EncodeOptions::fast()).unwrap();
    assert_eq!(codec::load(&path).unwrap(), m);

    // No temp files left behind.
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_save_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.tsr");
    std::fs::write(&path, b"old contents").unwrap();

    let m = PixelMatrix::filled(4, 4, [9, 9, 9]).unwrap();
    codec::save(&path, &m, &EncodeOptions::default()).unwrap();
    assert_eq!(codec::load(&path).unwrap(), m);
}

#[test]
fn test_load_missing_file_is_io() {
    let dir = tempfile::tempdir().unwrap();
    let result = codec::load(dir.path().join("missing.tsr"));
    assert!(matches!(result, Err(Error::Io(_))));
}

fn matrix_strategy() -> impl Strategy<Value = PixelMatrix> {
    (0u32..24, 0u32..24).prop_flat_map(|(w, h)| {
        proptest::collection::vec(any::<u8>(), (w * h * 3) as usize)
            .prop_map(move |data| PixelMatrix::new(w, h, data).unwrap())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip(m in matrix_strategy(), level in 0u8..=9) {
        let opts = EncodeOptions { compression_level: level };
        let bytes = codec::encode_with_options(&m, &opts).unwrap();
        prop_assert_eq!(&bytes[..4], &m.width().to_le_bytes());
        prop_assert_eq!(&bytes[4..8], &m.height().to_le_bytes());
        prop_assert_eq!(codec::decode(&bytes).unwrap(), m);
    }

    #[test]
    fn prop_wrong_payload_length_is_malformed(
        w in 1u32..16,
        h in 1u32..16,
        delta in prop_oneof![Just(-1i64), Just(1i64), 2i64..40],
    ) {
        let len = (w * h * 3) as i64 + delta;
        let data = forge(w, h, &vec![0x5A; len as usize]);
        let err = codec::decode(&data).unwrap_err();
        prop_assert!(err.is_malformed(), "{}", err);
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = codec::decode(&data);
    }
}
