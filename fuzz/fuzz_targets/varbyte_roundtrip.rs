#![no_main]

use libfuzzer_sys::fuzz_target;
use ngram4::varbyte;

fuzz_target!(|value: u32| {
    let mut buf = Vec::new();
    let written = varbyte::encode(value, &mut buf);
    assert_eq!(buf.len(), written);
    assert!((1..=5).contains(&written));
    let (decoded, consumed) = varbyte::decode(&buf, 0);
    assert_eq!(decoded, value);
    assert_eq!(consumed, written);
});
