use std::io::{Seek, Write};

use rstest::rstest;

use super::*;

fn lines(rows: &[&str]) -> String {
    let mut text = rows.join("\n");
    if !rows.is_empty() {
        text.push('\n');
    }
    text
}

fn counting(n: u8) -> Vec<u8> {
    (0..n).collect()
}

fn run<'l>(labels: &'l LabelTable, f: impl FnOnce(&mut Encoder<'l, Vec<u8>>)) -> String {
    let mut enc = Encoder::with_labels(Vec::new(), labels);
    f(&mut enc);
    String::from_utf8(enc.finish().unwrap()).unwrap()
}

#[test]
fn close_without_writes_is_empty() {
    assert_eq!(run(&NO_LABELS, |_| {}), "");
}

#[test]
fn seek_without_write_is_empty() {
    let text = run(&NO_LABELS, |enc| {
        enc.seek(SeekFrom::Start(5)).unwrap();
    });
    assert_eq!(text, "");
}

#[test]
fn empty_write_emits_anchor() {
    let text = run(&NO_LABELS, |enc| {
        enc.write_all_bytes(&[]).unwrap();
    });
    assert_eq!(
        text,
        lines(&["00000000                                                    ||"])
    );
}

#[test]
fn single_line() {
    let text = run(&NO_LABELS, |enc| enc.write_all(&counting(0x10)).unwrap());
    assert_eq!(
        text,
        lines(&["00000000  00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F  |................|"])
    );
}

#[test]
fn multiple_lines() {
    let text = run(&NO_LABELS, |enc| enc.write_all(&counting(0x30)).unwrap());
    assert_eq!(
        text,
        lines(&[
            "00000000  00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F  |................|",
            "00000010  10 11 12 13 14 15 16 17  18 19 1A 1B 1C 1D 1E 1F  |................|",
            "00000020  20 21 22 23 24 25 26 27  28 29 2A 2B 2C 2D 2E 2F  | !\"#$%&'()*+,-./|",
        ])
    );
}

#[test]
fn late_start_is_anchored_at_close() {
    let data = counting(0x10);
    let text = run(&NO_LABELS, |enc| {
        enc.seek(SeekFrom::Start(5)).unwrap();
        enc.write_all(&data[5..]).unwrap();
    });
    assert_eq!(
        text,
        lines(&[
            "                         05 06 07  08 09 0A 0B 0C 0D 0E 0F       |...........|",
            "00000010                                                    ||",
        ])
    );
}

#[test]
fn early_end() {
    let text = run(&NO_LABELS, |enc| enc.write_all(&counting(0x0A)).unwrap());
    assert_eq!(
        text,
        lines(&["00000000  00 01 02 03 04 05 06 07  08 09                    |..........|"])
    );
}

#[test]
fn late_start_and_early_end_forces_unaligned_offset() {
    let data = counting(0x0B);
    let text = run(&NO_LABELS, |enc| {
        enc.seek(SeekFrom::Start(5)).unwrap();
        enc.write_all(&data[5..]).unwrap();
    });
    assert_eq!(
        text,
        lines(&["00000005  05 06 07 08 09 0A                                 |......|"])
    );
}

#[test]
fn partial_writes_accumulate() {
    let data = counting(0x0A);
    let text = run(&NO_LABELS, |enc| {
        enc.write_all(&data[..5]).unwrap();
        enc.write_all(&data[5..7]).unwrap();
        enc.write_all(&data[7..]).unwrap();
    });
    assert_eq!(
        text,
        lines(&["00000000  00 01 02 03 04 05 06 07  08 09                    |..........|"])
    );
}

#[test]
fn incomplete_line_between_seeks() {
    let data = counting(0x30);
    let text = run(&NO_LABELS, |enc| {
        enc.write_all(&data[..0x10]).unwrap();
        enc.seek(SeekFrom::Start(0x104)).unwrap();
        enc.write_all(&data[0x10..0x14]).unwrap();
        enc.seek(SeekFrom::Start(0x200)).unwrap();
        enc.write_all(&data[0x20..0x30]).unwrap();
    });
    assert_eq!(
        text,
        lines(&[
            "00000000  00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F  |................|",
            "",
            "00000104  10 11 12 13                                       |....|",
            "",
            "00000200  20 21 22 23 24 25 26 27  28 29 2A 2B 2C 2D 2E 2F  | !\"#$%&'()*+,-./|",
        ])
    );
}

#[test]
fn relative_seeks() {
    let data = b"1BCDEFGHIJKLMNOPABCDEFGHIJKLMNOP";
    let text = run(&NO_LABELS, |enc| {
        enc.write_all(data).unwrap();
        enc.seek(SeekFrom::Start(0x1001)).unwrap();
        enc.write_all(data).unwrap();
        assert_eq!(enc.seek(SeekFrom::Current(-0x0820)).unwrap(), 0x801);
        enc.write_all(data).unwrap();
    });
    assert_eq!(
        text,
        lines(&[
            "00000000  31 42 43 44 45 46 47 48  49 4A 4B 4C 4D 4E 4F 50  |1BCDEFGHIJKLMNOP|",
            "00000010  41 42 43 44 45 46 47 48  49 4A 4B 4C 4D 4E 4F 50  |ABCDEFGHIJKLMNOP|",
            "",
            "             31 42 43 44 45 46 47  48 49 4A 4B 4C 4D 4E 4F   |1BCDEFGHIJKLMNO|",
            "00001010  50 41 42 43 44 45 46 47  48 49 4A 4B 4C 4D 4E 4F  |PABCDEFGHIJKLMNO|",
            "00001020  50                                                |P|",
            "",
            "             31 42 43 44 45 46 47  48 49 4A 4B 4C 4D 4E 4F   |1BCDEFGHIJKLMNO|",
            "00000810  50 41 42 43 44 45 46 47  48 49 4A 4B 4C 4D 4E 4F  |PABCDEFGHIJKLMNO|",
            "00000820  50                                                |P|",
        ])
    );
}

#[test]
fn seek_to_cursor_does_not_break_the_dump() {
    let text = run(&NO_LABELS, |enc| {
        enc.write_all(b"ABCD").unwrap();
        enc.seek(SeekFrom::Current(0)).unwrap();
        enc.write_all(b"EFGH").unwrap();
        enc.seek(SeekFrom::End(0)).unwrap();
        enc.seek(SeekFrom::Start(8)).unwrap();
        enc.write_all(b"IJ").unwrap();
    });
    assert_eq!(
        text,
        lines(&["00000000  41 42 43 44 45 46 47 48  49 4A                    |ABCDEFGHIJ|"])
    );
}

#[test]
fn seek_errors() {
    let mut enc = Encoder::new(Vec::new());
    assert!(matches!(
        enc.seek_to(SeekFrom::Current(-1)),
        Err(EncodeError::NegativeSeek)
    ));
    assert!(matches!(
        enc.seek_to(SeekFrom::Start(MAX_OFFSET + 1)),
        Err(EncodeError::OffsetOutOfRange(_))
    ));
    assert_eq!(enc.seek_to(SeekFrom::Start(MAX_OFFSET)).unwrap(), MAX_OFFSET);
    assert!(matches!(
        enc.write_all_bytes(b"AB"),
        Err(EncodeError::OffsetOutOfRange(_))
    ));

    let err = enc.seek(SeekFrom::End(i64::MIN)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
}

#[test]
fn last_offset_is_reachable_by_an_aligned_row() {
    let start = MAX_OFFSET - 15;
    let text = dump(&[1; 16], start, &NO_LABELS).unwrap();
    assert!(text.starts_with("7FFFFFFFFFFFFFF0  01 01"));
    let (segments, _) = crate::decode_all(text.as_bytes()).unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!((segments[0].offset, segments[0].end()), (start, MAX_OFFSET + 1));

    // Split across writes, with a label on the aligned row start.
    let labels: LabelTable = [("top", start)].into_iter().collect();
    let text = run(&labels, |enc| {
        enc.seek_to(SeekFrom::Start(start - 4)).unwrap();
        enc.write_all_bytes(&[2; 12]).unwrap();
        enc.write_all_bytes(&[3; 8]).unwrap();
        assert_eq!(enc.position(), MAX_OFFSET + 1);
    });
    let (segments, decoded) = crate::decode_all(text.as_bytes()).unwrap();
    assert_eq!((segments[0].offset, segments[0].end()), (start - 4, MAX_OFFSET + 1));
    assert_eq!(decoded, labels);
}

#[test]
fn rows_ending_at_the_top_need_their_own_offset() {
    // The row would start mid-line and owe an offset line at 2^63.
    assert!(matches!(
        dump(b"A", MAX_OFFSET, &NO_LABELS),
        Err(EncodeError::OffsetOutOfRange(ofs)) if ofs == MAX_OFFSET + 1
    ));

    // A label inside the last aligned row splits it the same way.
    let labels: LabelTable = [("late", MAX_OFFSET - 3)].into_iter().collect();
    assert!(matches!(
        dump(&[1; 16], MAX_OFFSET - 15, &labels),
        Err(EncodeError::OffsetOutOfRange(_))
    ));

    // Nothing more fits once the top is reached, not even an empty write.
    let mut enc = Encoder::new(Vec::new());
    enc.seek_to(SeekFrom::Start(MAX_OFFSET - 15)).unwrap();
    enc.write_all_bytes(&[0; 16]).unwrap();
    assert!(matches!(
        enc.write_all_bytes(&[]),
        Err(EncodeError::OffsetOutOfRange(_))
    ));
}

#[test]
fn closed_encoder_rejects_everything() {
    let mut enc = Encoder::new(Vec::new());
    enc.write_all(b"A").unwrap();
    enc.close().unwrap();
    assert!(matches!(enc.close(), Err(EncodeError::Closed)));
    assert!(matches!(enc.write_all_bytes(b"B"), Err(EncodeError::Closed)));
    assert!(matches!(
        enc.seek_to(SeekFrom::Start(0)),
        Err(EncodeError::Closed)
    ));
    let text = String::from_utf8(enc.finish().unwrap()).unwrap();
    assert_eq!(
        text,
        lines(&["00000000  41                                                |A|"])
    );
}

fn split_labels() -> LabelTable {
    [
        ("start", 0),
        ("x100", 0x100),
        ("x100b", 0x100),
        ("x103", 0x103),
        ("x105", 0x105),
    ]
    .into_iter()
    .collect()
}

#[test]
fn labels_close_without_writes_is_empty() {
    assert_eq!(run(&split_labels(), |_| {}), "");
}

#[test]
fn labels_on_empty_write() {
    let labels = split_labels();
    let text = run(&labels, |enc| enc.write_all_bytes(&[]).unwrap());
    assert_eq!(
        text,
        lines(&[
            ":start",
            "00000000                                                    ||",
        ])
    );
}

#[test]
fn labels_split_rows() {
    let labels = split_labels();
    let data = counting(0x30);
    let text = run(&labels, |enc| {
        enc.seek(SeekFrom::Start(0xF0)).unwrap();
        enc.write_all(&data).unwrap();
    });
    assert_eq!(
        text,
        lines(&[
            "000000F0  00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F  |................|",
            ":x100",
            ":x100b",
            "00000100  10 11 12                                          |...|",
            ":x103",
            "                   13 14                                       |..|",
            ":x105",
            "                         15 16 17  18 19 1A 1B 1C 1D 1E 1F       |...........|",
            "00000110  20 21 22 23 24 25 26 27  28 29 2A 2B 2C 2D 2E 2F  | !\"#$%&'()*+,-./|",
        ])
    );
}

#[test]
fn labels_skipped_before_seek_target() {
    let labels = split_labels();
    let data = counting(8);
    let text = run(&labels, |enc| {
        enc.seek(SeekFrom::Start(0x101)).unwrap();
        enc.write_all(&data).unwrap();
    });
    assert_eq!(
        text,
        lines(&[
            "             00 01                                           |..|",
            ":x103",
            "                   02 03                                       |..|",
            ":x105",
            "00000105  04 05 06 07                                       |....|",
        ])
    );
}

#[test]
fn label_at_segment_end_gets_its_own_anchor() {
    let labels: LabelTable = [("tail", 0x20)].into_iter().collect();
    let text = run(&labels, |enc| {
        enc.seek(SeekFrom::Start(0x10)).unwrap();
        enc.write_all(b"0123456789ABCDEF").unwrap();
        enc.seek(SeekFrom::Start(0x100)).unwrap();
        enc.write_all(b"x").unwrap();
    });
    assert_eq!(
        text,
        lines(&[
            "00000010  30 31 32 33 34 35 36 37  38 39 41 42 43 44 45 46  |0123456789ABCDEF|",
            ":tail",
            "00000020                                                    ||",
            "",
            "00000100  78                                                |x|",
        ])
    );
}

#[test]
fn dump_with_offset() {
    let data = b"ABCDEFGHIJKLMNOP".repeat(4);
    assert_eq!(
        dump(&data, 0x18, &LabelTable::new()).unwrap(),
        lines(&[
            "                                   41 42 43 44 45 46 47 48          |ABCDEFGH|",
            "00000020  49 4A 4B 4C 4D 4E 4F 50  41 42 43 44 45 46 47 48  |IJKLMNOPABCDEFGH|",
            "00000030  49 4A 4B 4C 4D 4E 4F 50  41 42 43 44 45 46 47 48  |IJKLMNOPABCDEFGH|",
            "00000040  49 4A 4B 4C 4D 4E 4F 50  41 42 43 44 45 46 47 48  |IJKLMNOPABCDEFGH|",
            "00000050  49 4A 4B 4C 4D 4E 4F 50                           |IJKLMNOP|",
        ])
    );
}

#[test]
fn dump_with_offset_and_labels() {
    let data = b"ABCDEFGHIJKLMNOP".repeat(4);
    let mut labels = LabelTable::new();
    labels.set("ignore", 5);
    labels.set("foo", 0x33);
    labels.set("bar", 0x35);
    labels.set("baz", 0x35);
    assert_eq!(
        dump(&data, 0x18, &labels).unwrap(),
        lines(&[
            "                                   41 42 43 44 45 46 47 48          |ABCDEFGH|",
            "00000020  49 4A 4B 4C 4D 4E 4F 50  41 42 43 44 45 46 47 48  |IJKLMNOPABCDEFGH|",
            "00000030  49 4A 4B                                          |IJK|",
            ":foo",
            "                   4C 4D                                       |LM|",
            ":bar",
            ":baz",
            "                         4E 4F 50  41 42 43 44 45 46 47 48       |NOPABCDEFGH|",
            "00000040  49 4A 4B 4C 4D 4E 4F 50  41 42 43 44 45 46 47 48  |IJKLMNOPABCDEFGH|",
            "00000050  49 4A 4B 4C 4D 4E 4F 50                           |IJKLMNOP|",
        ])
    );
}

#[test]
fn dump_of_nothing_is_empty() {
    let labels: LabelTable = [("here", 0x10)].into_iter().collect();
    assert_eq!(dump(&[], 0x10, &labels).unwrap(), "");
}

#[test]
fn wide_offsets_keep_an_even_digit_count() {
    let text = dump(b"\x01", 0x1_0000_0000, &LabelTable::new()).unwrap();
    assert_eq!(
        text,
        lines(&["0100000000  01                                                |.|"])
    );
    let text = dump(b"\x01", 0x7FFF_FFFF_0000_0000, &LabelTable::new()).unwrap();
    assert!(text.starts_with("7FFFFFFF00000000  01 "));
}

#[test]
fn omit_ascii_column_trims_padding() {
    let options = EncoderOptions {
        omit_ascii_column: true,
    };
    let data = counting(0x14);
    let text = dump_with_options(&data[4..], 4, &LabelTable::new(), options).unwrap();
    assert_eq!(
        text,
        lines(&[
            "                      04 05 06 07  08 09 0A 0B 0C 0D 0E 0F",
            "00000010  10 11 12 13",
        ])
    );
}

#[rstest]
#[case::printable(b'A', b'A')]
#[case::space(b' ', b' ')]
#[case::tilde(b'~', b'~')]
#[case::pipe(b'|', b'.')]
#[case::control(0x1F, b'.')]
#[case::delete(0x7F, b'.')]
#[case::high(0xA9, b'.')]
fn ascii_column(#[case] byte: u8, #[case] shown: u8) {
    assert_eq!(printable(byte), shown);
}

#[rstest]
#[case(0, 8)]
#[case(0xFFFF_FFFF, 8)]
#[case(0x1_0000_0000, 10)]
#[case(0xFF_FFFF_FFFF, 10)]
#[case(0x100_0000_0000, 12)]
#[case(MAX_OFFSET, 16)]
fn offset_field_width(#[case] ofs: u64, #[case] digits: usize) {
    assert_eq!(offset_digits(ofs), digits);
}

#[test]
fn sink_errors_propagate() {
    struct Broken;

    impl io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("broken pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let mut enc = Encoder::new(Broken);
    assert!(matches!(
        enc.write_all_bytes(&[0; 16]),
        Err(EncodeError::Io(_))
    ));
}
