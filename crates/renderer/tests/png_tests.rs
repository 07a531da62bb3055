//! Tests for the PNG encoder.

use renderer::png::{encode, encode_rgba};
use tiny_skia::Pixmap;

/// Offset of the first chunk with the given type, or None.
fn find_chunk(png: &[u8], chunk_type: &[u8; 4]) -> Option<usize> {
    png.windows(4).position(|w| w == chunk_type)
}

fn chunk_data<'a>(png: &'a [u8], chunk_type: &[u8; 4]) -> Option<&'a [u8]> {
    let type_at = find_chunk(png, chunk_type)?;
    let len_bytes: [u8; 4] = png[type_at - 4..type_at].try_into().ok()?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    Some(&png[type_at + 4..type_at + 4 + len])
}

// ============================================================================
// container structure
// ============================================================================

#[test]
fn test_png_signature_and_trailer() {
    let pixels = vec![255u8; 4 * 4 * 4];
    let png = encode_rgba(&pixels, 4, 4).unwrap();
    assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    assert!(find_chunk(&png, b"IHDR").is_some());
    assert!(find_chunk(&png, b"IDAT").is_some());
    let iend = find_chunk(&png, b"IEND").unwrap();
    // IEND is the final chunk: type + 4 CRC bytes end the file.
    assert_eq!(iend + 8, png.len());
}

#[test]
fn test_ihdr_dimensions() {
    let pixels = vec![0u8; 7 * 3 * 4];
    let png = encode_rgba(&pixels, 7, 3).unwrap();
    let ihdr = chunk_data(&png, b"IHDR").unwrap();
    assert_eq!(u32::from_be_bytes(ihdr[0..4].try_into().unwrap()), 7);
    assert_eq!(u32::from_be_bytes(ihdr[4..8].try_into().unwrap()), 3);
}

#[test]
fn test_chunk_crcs_are_valid() {
    let pixels = vec![128u8; 5 * 5 * 4];
    let png = encode_rgba(&pixels, 5, 5).unwrap();

    // Walk every chunk and recompute its CRC over type + data.
    let mut at = 8;
    while at + 12 <= png.len() {
        let len = u32::from_be_bytes(png[at..at + 4].try_into().unwrap()) as usize;
        let crc_stored = u32::from_be_bytes(png[at + 8 + len..at + 12 + len].try_into().unwrap());
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&png[at + 4..at + 8 + len]);
        assert_eq!(hasher.finalize(), crc_stored);
        at += 12 + len;
    }
    assert_eq!(at, png.len());
}

// ============================================================================
// indexed vs truecolor selection
// ============================================================================

#[test]
fn test_few_colors_encode_indexed() {
    // Two colors: palette path with a PLTE chunk.
    let mut pixels = Vec::new();
    for i in 0..64 {
        if i % 2 == 0 {
            pixels.extend_from_slice(&[255, 0, 0, 255]);
        } else {
            pixels.extend_from_slice(&[0, 0, 255, 255]);
        }
    }
    let png = encode_rgba(&pixels, 8, 8).unwrap();
    let plte = chunk_data(&png, b"PLTE").unwrap();
    assert_eq!(plte.len(), 2 * 3);
    let ihdr = chunk_data(&png, b"IHDR").unwrap();
    assert_eq!(ihdr[9], 3, "color type 3 = indexed");
}

#[test]
fn test_many_colors_fall_back_to_truecolor() {
    // 32x32 gradient with unique colors per pixel exceeds 256 entries.
    let mut pixels = Vec::new();
    for y in 0..32u8 {
        for x in 0..32u8 {
            pixels.extend_from_slice(&[x * 8, y * 8, x.wrapping_mul(y), 255]);
        }
    }
    let png = encode_rgba(&pixels, 32, 32).unwrap();
    assert!(find_chunk(&png, b"PLTE").is_none());
    let ihdr = chunk_data(&png, b"IHDR").unwrap();
    assert_eq!(ihdr[9], 6, "color type 6 = RGBA");
}

#[test]
fn test_trns_only_when_translucent() {
    let opaque = vec![10u8, 20, 30, 255].repeat(16);
    let png = encode_rgba(&opaque, 4, 4).unwrap();
    assert!(find_chunk(&png, b"tRNS").is_none());

    let mut translucent = opaque.clone();
    translucent[3] = 128;
    let png = encode_rgba(&translucent, 4, 4).unwrap();
    assert!(find_chunk(&png, b"tRNS").is_some());
}

// ============================================================================
// input validation
// ============================================================================

#[test]
fn test_rejects_wrong_buffer_length() {
    assert!(encode_rgba(&[0u8; 10], 4, 4).is_err());
    assert!(encode_rgba(&[], 1, 1).is_err());
}

#[test]
fn test_encode_pixmap() {
    let mut pixmap = Pixmap::new(20, 10).unwrap();
    pixmap.fill(tiny_skia::Color::from_rgba8(0, 128, 0, 255));
    let png = encode(&pixmap).unwrap();
    let ihdr = chunk_data(&png, b"IHDR").unwrap();
    assert_eq!(u32::from_be_bytes(ihdr[0..4].try_into().unwrap()), 20);
    assert_eq!(u32::from_be_bytes(ihdr[4..8].try_into().unwrap()), 10);
    // A flat fill dedupes to one palette entry.
    assert_eq!(chunk_data(&png, b"PLTE").unwrap().len(), 3);
}
