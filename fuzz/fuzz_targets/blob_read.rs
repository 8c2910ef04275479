#![no_main]

use kpack::BlobView;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(view) = BlobView::parse(data) {
        let _ = view.verify();
        for entry in view.entries() {
            assert!(entry.offset() as usize <= data.len());
            let _ = entry.bytes().len();
        }
        let _ = view.recovered_paddings();
    }
});
