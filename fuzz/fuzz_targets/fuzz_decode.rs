#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic, in either row layout
    let limits = graybmp::Limits::default();
    for layout in [graybmp::RowLayout::Padded, graybmp::RowLayout::Packed] {
        let _ = graybmp::bmp::decode_bytes(data, &limits, layout, &enough::Unstoppable);
    }
});
