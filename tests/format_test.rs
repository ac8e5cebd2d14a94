//! Wire-format properties: frozen byte positions, codec round-trips.

use folio::codec;
use folio::record::{self, RecordType};
use proptest::prelude::*;

proptest! {
    /// The shared prefix keeps the type digit, ID span, and timestamp
    /// span at their frozen offsets for arbitrary labels and contents,
    /// and full decode returns what was encoded.
    #[test]
    fn data_record_layout_holds(
        label in "[a-zA-Z0-9 _./-]{1,64}",
        content in ".{1,200}",
        id_val in any::<u64>(),
        ts in 1_000_000_000_000u64..=9_999_999_999_999,
    ) {
        let id = format!("{id_val:016x}");
        let snapshot = codec::compress(content.as_bytes()).unwrap();
        let line = record::encode_data(&id, ts, &label, &content, &snapshot);
        let bytes = line.as_bytes();

        prop_assert_eq!(record::line_type(bytes), Some(RecordType::Data));
        prop_assert_eq!(record::line_id(bytes), Some(id.as_str()));
        prop_assert_eq!(record::line_ts(bytes), Some(ts));
        let line_label = record::line_label(bytes);
        prop_assert_eq!(line_label.as_deref(), Some(label.as_str()));

        let rec = record::decode_data(bytes, 0).unwrap();
        prop_assert_eq!(&rec.label, &label);
        prop_assert_eq!(&rec.content, &content);
        prop_assert_eq!(codec::decompress(&rec.snapshot).unwrap(), content.as_bytes());

        let (s, e) = record::content_bounds(bytes).unwrap();
        let unescaped = record::unescape_content(&bytes[s..e]);
        prop_assert_eq!(unescaped.as_deref(), Some(content.as_str()));
    }

    #[test]
    fn index_record_layout_holds(
        label in "[a-zA-Z0-9 _./-]{1,64}",
        id_val in any::<u64>(),
        ts in 1_000_000_000_000u64..=9_999_999_999_999,
        target in 128u64..u32::MAX as u64,
    ) {
        let id = format!("{id_val:016x}");
        let line = record::encode_index(&id, ts, target, &label);
        let bytes = line.as_bytes();

        prop_assert_eq!(record::line_type(bytes), Some(RecordType::Index));
        prop_assert_eq!(record::line_id(bytes), Some(id.as_str()));
        prop_assert_eq!(record::line_ts(bytes), Some(ts));
        prop_assert_eq!(record::line_index_target(bytes), Some(target));

        let rec = record::decode_index(bytes, 0).unwrap();
        prop_assert_eq!(&rec.label, &label);
        prop_assert_eq!(rec.target, target);
    }

    /// compress/decompress round-trips arbitrary bytes and the output
    /// always embeds in a JSON string with no escaping.
    #[test]
    fn codec_round_trips(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let s = codec::compress(&data).unwrap();
        prop_assert_eq!(codec::decompress(&s).unwrap(), data);
        prop_assert!(!s.contains('"'));
        prop_assert!(!s.contains('\\'));
        prop_assert!(s.bytes().all(|b| (0x21..=0x7E).contains(&b)));
    }
}

#[test]
fn blanked_data_span_is_offset_stable() {
    let id = format!("{:016x}", 0xfeedu64);
    let line = record::encode_data(&id, 1_722_470_400_000, "doc", "0123456789", "0abc");
    let mut erased = line.clone().into_bytes();

    let (s, e) = record::content_bounds(&erased).unwrap();
    for b in &mut erased[s..e] {
        *b = b' ';
    }
    erased[record::TYPE_POS] = RecordType::History.digit();

    // Same length, same snapshot position, still one valid JSON line.
    assert_eq!(erased.len(), line.len());
    let rec = record::decode_data(&erased, 0).unwrap();
    assert_eq!(rec.snapshot, "0abc");
    assert_eq!(record::line_type(&erased), Some(RecordType::History));
    assert_eq!(
        record::line_id(&erased).unwrap(),
        record::line_id(line.as_bytes()).unwrap()
    );
}
