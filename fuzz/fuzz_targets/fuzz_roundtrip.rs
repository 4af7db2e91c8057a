#![no_main]
use libfuzzer_sys::fuzz_target;
use graybmp::*;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must convert to an output of the same size whose
    // non-pixel bytes are untouched, and converting again must be a no-op.
    let mut once = Vec::new();
    let Ok(_) = GrayscaleRequest::new().convert(&mut &data[..], &mut once, &Unstoppable) else {
        return;
    };
    assert_eq!(once.len(), data.len(), "size changed");

    let Ok(src) = bmp::decode_bytes(data, &Limits::default(), RowLayout::Padded, &Unstoppable)
    else {
        panic!("converted input failed to decode");
    };
    let offset = src.header().data_offset() as usize;
    assert_eq!(&once[..offset], &data[..offset], "header bytes changed");

    let mut twice = Vec::new();
    GrayscaleRequest::new()
        .convert(&mut &once[..], &mut twice, &Unstoppable)
        .expect("converted output failed to convert again");
    assert_eq!(once, twice, "grayscale is not idempotent");
});
