#![no_main]
use std::io::Read;

use libfuzzer_sys::fuzz_target;
use sparsehex::{Advance, Decoder};

/// Drive the decoder over arbitrary text, reading each segment in chunks of
/// `chunk` bytes. Errors are fine; panics and backwards segments are not.
fn decode(data: &[u8]) {
    let Some((&chunk, text)) = data.split_first() else {
        return;
    };
    let mut buf = vec![0u8; usize::from(chunk).max(1)];
    let mut dec = Decoder::new(text);
    let mut end = 0u64;
    loop {
        match dec.advance() {
            Ok(Advance::Gap(gap)) => {
                assert_eq!(dec.offset(), end + gap);
                loop {
                    match dec.read(&mut buf) {
                        Ok(0) => break,
                        Ok(_) => {}
                        Err(_) => return,
                    }
                }
                end = dec.offset();
            }
            Ok(Advance::EndOfInput) => return,
            Err(_) => {
                assert!(dec.advance().is_err(), "decoder recovered after an error");
                return;
            }
        }
    }
}

fuzz_target!(|data: &[u8]| decode(data));
