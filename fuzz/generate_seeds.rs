#!/usr/bin/env -S cargo +nightly -Zscript
//! Generate seed corpus files for fuzzing.
//! Run: cargo +nightly -Zscript fuzz/generate_seeds.rs

fn bmp(width: u32, height: i32, bpp: u16, compression: u32, extra: &[u8], pixels: &[u8]) -> Vec<u8> {
    let offset = 54 + extra.len() as u32;
    let mut out = Vec::new();
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(offset + pixels.len() as u32).to_le_bytes()); // file size
    out.extend_from_slice(&[0u8; 4]); // reserved
    out.extend_from_slice(&offset.to_le_bytes()); // data offset
    out.extend_from_slice(&40u32.to_le_bytes()); // DIB header size
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // planes
    out.extend_from_slice(&bpp.to_le_bytes());
    out.extend_from_slice(&compression.to_le_bytes());
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(extra);
    out.extend_from_slice(pixels);
    out
}

fn main() {
    use std::fs;
    for target in ["fuzz_decode", "fuzz_roundtrip"] {
        let dir = format!("fuzz/corpus/{target}");
        fs::create_dir_all(&dir).unwrap();

        fs::write(format!("{dir}/bmp_1x1.bmp"), bmp(1, 1, 24, 0, &[], &[0xff, 0, 0, 0])).unwrap();
        fs::write(
            format!("{dir}/bmp_2x2_topdown.bmp"),
            bmp(2, -2, 24, 0, &[], &[0, 0, 255, 255, 255, 255, 0, 0, 1, 2, 3, 4, 5, 6, 0, 0]),
        )
        .unwrap();
        fs::write(format!("{dir}/bmp_gap.bmp"), bmp(1, 1, 24, 0, &[7u8; 68], &[9, 8, 7, 0])).unwrap();
        fs::write(format!("{dir}/bmp_8bit.bmp"), bmp(1, 1, 8, 0, &[0u8; 1024], &[0, 0, 0, 0])).unwrap();
        fs::write(format!("{dir}/bmp_rle.bmp"), bmp(1, 1, 24, 1, &[], &[])).unwrap();

        // Truncated/malformed seeds for edge coverage
        fs::write(format!("{dir}/empty.bin"), b"").unwrap();
        fs::write(format!("{dir}/bm_short.bin"), b"BM\x00\x00").unwrap();
    }

    println!("Generated seed corpus in fuzz/corpus/");
}
