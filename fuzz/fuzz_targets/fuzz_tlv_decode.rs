#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Must not panic; errors are fine.
    if let Ok(fields) = fatura::qr::decode_fields(data) {
        let mut again = Vec::new();
        for f in &fields {
            again.extend(fatura::qr::encode_field(f.tag, &f.value).unwrap());
        }
        assert_eq!(again.as_slice(), data);
    }
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = fatura::qr::QrPayload::decode(s);
    }
});
