#![no_main]
use std::io::SeekFrom;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sparsehex::{Encoder, EncoderOptions, LabelTable, decode_all};

#[derive(Debug, Arbitrary)]
struct Run {
    gap: u16,
    data: Vec<u8>,
    labels: Vec<u8>,
}

#[derive(Debug, Arbitrary)]
struct Image {
    start: u32,
    omit_ascii_column: bool,
    runs: Vec<Run>,
}

/// Encode a sparse image, decode the text, and demand the same segments and
/// labels back.
fn roundtrip(image: Image) {
    let mut expected = Vec::new();
    let mut labels = LabelTable::new();
    let mut offset = u64::from(image.start);
    for (i, run) in image.runs.into_iter().enumerate() {
        if run.data.is_empty() {
            continue;
        }
        offset += u64::from(run.gap);
        for (j, spot) in run.labels.iter().enumerate() {
            let rel = u64::from(*spot) % (run.data.len() as u64 + 1);
            labels.set(format!("r{i}_{j}"), offset + rel);
        }
        let end = offset + run.data.len() as u64;
        expected.push((offset, run.data));
        offset = end + 1;
    }

    let options = EncoderOptions {
        omit_ascii_column: image.omit_ascii_column,
    };
    let mut enc = Encoder::with_options(Vec::new(), &labels, options);
    for (offset, data) in &expected {
        enc.seek_to(SeekFrom::Start(*offset)).unwrap();
        enc.write_all_bytes(data).unwrap();
    }
    let text = enc.finish().unwrap();

    let (segments, decoded) = decode_all(&text).unwrap();
    let segments: Vec<_> = segments.into_iter().map(|s| (s.offset, s.data)).collect();
    assert_eq!(segments, expected);
    assert_eq!(decoded, labels);
}

fuzz_target!(|image: Image| roundtrip(image));
