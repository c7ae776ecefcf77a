#![no_main]

use command_dispatch::{decode, ValueKind};
use libfuzzer_sys::fuzz_target;

const MAX_TEXT_BYTES: usize = 1024;

fn decode_text(bytes: &[u8]) -> String {
    let capped = &bytes[..bytes.len().min(MAX_TEXT_BYTES)];
    String::from_utf8_lossy(capped).into_owned()
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let kind = ValueKind::ALL[usize::from(selector) % ValueKind::ALL.len()];
    let text = decode_text(rest);

    let Ok(value) = decode("Fuzz", kind, &text) else {
        return;
    };
    assert_eq!(value.kind(), kind);

    // Integer text forms decode back to the same value.
    if kind.is_numeric() && !matches!(kind, ValueKind::Float32 | ValueKind::Float64) {
        let again = decode("Fuzz", kind, &value.value.to_text()).expect("canonical text decodes");
        assert_eq!(again.value, value.value);
    }
});
