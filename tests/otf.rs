use quickcheck_macros::quickcheck;
use sbe_otf::ir::builder::{CompositeType, EncodedType, Field, IrBuilder, Message};
use sbe_otf::ir::navigate;
use sbe_otf::otf::decode_message;
use sbe_otf::{
    Error, ErrorKind, FieldValue, Ir, OtfDecoder, PrimitiveType, PrimitiveValue, Signal, Token,
    TokenListener,
};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    BeginMessage(String),
    EndMessage(String),
    Value(String, Option<u64>, usize),
    GroupHeader(String, u64, u64),
    BeginGroup(String, u64, u64),
    EndGroup(String, u64, u64),
    GroupEnd(String, u64),
    VarData(String, Vec<u8>, usize),
}

#[derive(Debug, Default)]
struct Recorder {
    events: Vec<Event>,
    versions: Vec<u32>,
}

impl<'a> TokenListener<'a> for Recorder {
    fn on_begin_message(&mut self, token: &'a Token) -> Result<(), Error> {
        self.events.push(Event::BeginMessage(token.name().to_owned()));
        Ok(())
    }

    fn on_end_message(&mut self, token: &'a Token) -> Result<(), Error> {
        self.events.push(Event::EndMessage(token.name().to_owned()));
        Ok(())
    }

    fn on_encoding(
        &mut self,
        field: &'a Token,
        _type_token: &'a Token,
        value: FieldValue<'a>,
        offset: usize,
    ) -> Result<(), Error> {
        self.versions.push(field.version());
        let scalar = value.scalar().and_then(|x| x.as_u64());
        self.events
            .push(Event::Value(field.name().to_owned(), scalar, offset));
        Ok(())
    }

    fn on_group_header(&mut self, token: &'a Token, num_in_group: u64, block_length: u64) -> Result<(), Error> {
        self.versions.push(token.version());
        self.events.push(Event::GroupHeader(
            token.name().to_owned(),
            num_in_group,
            block_length,
        ));
        Ok(())
    }

    fn on_group_end(&mut self, token: &'a Token, num_in_group: u64) -> Result<(), Error> {
        self.events
            .push(Event::GroupEnd(token.name().to_owned(), num_in_group));
        Ok(())
    }

    fn on_begin_group(&mut self, token: &'a Token, index: u64, num_in_group: u64) -> Result<(), Error> {
        self.events
            .push(Event::BeginGroup(token.name().to_owned(), index, num_in_group));
        Ok(())
    }

    fn on_end_group(&mut self, token: &'a Token, index: u64, num_in_group: u64) -> Result<(), Error> {
        self.events
            .push(Event::EndGroup(token.name().to_owned(), index, num_in_group));
        Ok(())
    }

    fn on_var_data(
        &mut self,
        field: &'a Token,
        _type_token: &'a Token,
        data: &'a [u8],
        offset: usize,
    ) -> Result<(), Error> {
        self.versions.push(field.version());
        self.events
            .push(Event::VarData(field.name().to_owned(), data.to_vec(), offset));
        Ok(())
    }
}

fn value(name: &str, value: u64, offset: usize) -> Event {
    Event::Value(String::from(name), Some(value), offset)
}

fn order_ir() -> Ir {
    let dimension = CompositeType::new("smallGroupSize")
        .member(EncodedType::new("blockLength", PrimitiveType::UInt16))
        .member(EncodedType::new("numInGroup", PrimitiveType::UInt8));

    IrBuilder::new("trading", 1, 0)
        .message(
            Message::new("Order", 1)
                .with_block_length(8)
                .field(Field::new(
                    "price",
                    1,
                    EncodedType::new("price", PrimitiveType::UInt32),
                ))
                .field(
                    Field::group(
                        "legs",
                        2,
                        vec![Field::new("leg", 3, EncodedType::new("leg", PrimitiveType::UInt32))],
                    )
                    .with_dimension(dimension),
                ),
        )
        .build()
        .unwrap()
}

const ORDER: [u8; 27] = [
    8, 0, 1, 0, 1, 0, 0, 0, // header
    0x39, 0x30, 0, 0, 0, 0, 0, 0, // price
    4, 0, 2, // legs dimension
    7, 0, 0, 0, // leg 0
    9, 0, 0, 0, // leg 1
];

#[test]
fn test_order_events() {
    let ir = order_ir();
    let mut recorder = Recorder::default();
    let read = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&ORDER, 0, &mut recorder)
        .unwrap();

    assert_eq!(read, 27);
    assert_eq!(
        recorder.events,
        vec![
            Event::BeginMessage(String::from("Order")),
            value("price", 12345, 8),
            Event::GroupHeader(String::from("legs"), 2, 4),
            Event::BeginGroup(String::from("legs"), 0, 2),
            value("leg", 7, 19),
            Event::EndGroup(String::from("legs"), 0, 2),
            Event::BeginGroup(String::from("legs"), 1, 2),
            value("leg", 9, 23),
            Event::EndGroup(String::from("legs"), 1, 2),
            Event::GroupEnd(String::from("legs"), 2),
            Event::EndMessage(String::from("Order")),
        ]
    );
}

#[test]
fn test_body_engine_reports_body_length() {
    let ir = order_ir();
    let tokens = ir.message(1).unwrap();
    let read = decode_message(&ORDER, 8, 0, 8, tokens, &mut Recorder::default()).unwrap();
    assert_eq!(read, 19);
}

#[test]
fn test_unbracketed_tokens() {
    let ir = order_ir();
    let body = navigate::message_body(ir.message(1).unwrap());
    let mut recorder = Recorder::default();
    let read = decode_message(&ORDER, 8, 0, 8, body, &mut recorder).unwrap();
    assert_eq!(read, 19);
    assert_eq!(recorder.events.first(), Some(&value("price", 12345, 8)));
    assert_eq!(recorder.events.len(), 9);
}

#[test]
fn test_every_truncation_fails_cleanly() {
    let ir = order_ir();
    let decoder = OtfDecoder::new(&ir).unwrap();
    for len in 0..ORDER.len() {
        let result = decoder.decode(&ORDER[..len], 0, &mut Recorder::default());
        assert!(result.is_err(), "prefix of {} bytes decoded", len);
    }
}

#[test]
fn test_group_overflow_fails_before_group_events() {
    let ir = order_ir();
    let mut data = ORDER;
    data[18] = 200;
    let mut recorder = Recorder::default();
    let err = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&data, 0, &mut recorder)
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        ErrorKind::LengthOverflow {
            declared: 800,
            available: 8,
            ..
        }
    ));
    assert_eq!(err.offset(), Some(19));
    assert_eq!(
        recorder.events,
        vec![
            Event::BeginMessage(String::from("Order")),
            value("price", 12345, 8)
        ]
    );
}

#[test]
fn test_schema_mismatch_emits_nothing() {
    let ir = order_ir();
    let mut data = ORDER;
    data[4] = 2;
    let mut recorder = Recorder::default();
    let err = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&data, 0, &mut recorder)
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::SchemaIdMismatch { expected: 1, actual: 2 }));
    assert!(recorder.events.is_empty());
}

#[test]
fn test_listener_abort_is_propagated() {
    #[derive(Debug)]
    struct Stop(usize);

    impl<'a> TokenListener<'a> for Stop {
        fn on_encoding(
            &mut self,
            field: &'a Token,
            _type_token: &'a Token,
            _value: FieldValue<'a>,
            _offset: usize,
        ) -> Result<(), Error> {
            self.0 += 1;
            if field.name() == "leg" {
                return Err(Error::listener("seen enough"));
            }
            Ok(())
        }
    }

    let ir = order_ir();
    let mut stop = Stop(0);
    let err = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&ORDER, 0, &mut stop)
        .unwrap_err();
    assert_eq!(stop.0, 2);
    match err.into_kind() {
        ErrorKind::Listener(inner) => assert_eq!(inner.to_string(), "seen enough"),
        kind => panic!("unexpected error: {:?}", kind),
    }
}

fn versioned_ir() -> Ir {
    IrBuilder::new("trading", 1, 1)
        .message(
            Message::new("Quote", 2)
                .field(Field::new("bid", 1, EncodedType::new("bid", PrimitiveType::UInt16)))
                .field(
                    Field::new("ask", 2, EncodedType::new("ask", PrimitiveType::UInt16))
                        .with_since_version(1),
                )
                .field(Field::group(
                    "levels",
                    3,
                    vec![
                        Field::new("px", 4, EncodedType::new("px", PrimitiveType::UInt8)),
                        Field::new("qty", 5, EncodedType::new("qty", PrimitiveType::UInt8))
                            .with_since_version(1),
                    ],
                ))
                .field(Field::group("extra", 6, Vec::new()).with_since_version(1))
                .field(Field::data("memo", 7).with_since_version(1)),
        )
        .build()
        .unwrap()
}

#[test]
fn test_old_encoder_skips_newer_elements() {
    let ir = versioned_ir();
    let data = [
        2, 0, 2, 0, 1, 0, 0, 0, // header at version 0
        5, 0, // bid
        1, 0, 2, 0, // levels dimension, one byte elements
        10, 11, // px of each level
    ];

    let mut recorder = Recorder::default();
    let read = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&data, 0, &mut recorder)
        .unwrap();

    assert_eq!(read, data.len());
    assert_eq!(
        recorder.events,
        vec![
            Event::BeginMessage(String::from("Quote")),
            value("bid", 5, 8),
            Event::GroupHeader(String::from("levels"), 2, 1),
            Event::BeginGroup(String::from("levels"), 0, 2),
            value("px", 10, 14),
            Event::EndGroup(String::from("levels"), 0, 2),
            Event::BeginGroup(String::from("levels"), 1, 2),
            value("px", 11, 15),
            Event::EndGroup(String::from("levels"), 1, 2),
            Event::GroupEnd(String::from("levels"), 2),
            Event::EndMessage(String::from("Quote")),
        ]
    );
}

#[test]
fn test_current_encoder_sees_everything() {
    let ir = versioned_ir();
    let data = [
        4, 0, 2, 0, 1, 0, 1, 0, // header at version 1
        5, 0, 6, 0, // bid, ask
        2, 0, 1, 0, 10, 20, // levels
        0, 0, 0, 0, // extra
        3, 0, 0, 0, b'a', b'b', b'c', // memo
    ];

    let mut recorder = Recorder::default();
    let read = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&data, 0, &mut recorder)
        .unwrap();

    assert_eq!(read, data.len());
    assert!(recorder.events.contains(&value("ask", 6, 10)));
    assert!(recorder.events.contains(&value("qty", 20, 17)));
    assert!(recorder
        .events
        .contains(&Event::GroupHeader(String::from("extra"), 0, 0)));
    assert!(recorder
        .events
        .contains(&Event::VarData(String::from("memo"), b"abc".to_vec(), 26)));
}

#[test]
fn test_acting_version_is_monotonic() {
    let ir = versioned_ir();
    let data = [
        4, 0, 2, 0, 1, 0, 1, 0, 5, 0, 6, 0, 2, 0, 1, 0, 10, 20, 0, 0, 0, 0, 3, 0, 0, 0, b'a',
        b'b', b'c',
    ];

    let decode = |version: u32| {
        let decoder = OtfDecoder::builder()
            .acting_version(version)
            .build(&ir)
            .unwrap();
        let mut recorder = Recorder::default();
        let _ = decoder.decode(&data, 0, &mut recorder);
        recorder
            .events
            .into_iter()
            .filter(|x| matches!(x, Event::Value(..)))
            .map(|x| match x {
                Event::Value(name, ..) => name,
                _ => unreachable!(),
            })
            .collect::<Vec<_>>()
    };

    let old = decode(0);
    let new = decode(1);
    for name in &old {
        assert!(new.contains(name), "{} missing at the newer version", name);
    }
    assert!(new.len() > old.len());
}

#[test]
fn test_group_elements_advance_by_declared_block_length() {
    let ir = versioned_ir();

    // a newer encoder appended two unknown bytes to every level
    let data = [
        2, 0, 2, 0, 1, 0, 0, 0, // header at version 0
        5, 0, // bid
        3, 0, 2, 0, // levels dimension, three byte elements
        10, 0xee, 0xee, // level 0
        11, 0xee, 0xee, // level 1
    ];

    let mut recorder = Recorder::default();
    let read = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&data, 0, &mut recorder)
        .unwrap();

    assert_eq!(read, data.len());
    assert!(recorder.events.contains(&value("px", 10, 14)));
    assert!(recorder.events.contains(&value("px", 11, 17)));
}

#[test]
fn test_zero_length_var_data() {
    let ir = IrBuilder::new("trading", 1, 0)
        .message(
            Message::new("Note", 3)
                .field(Field::data("first", 1))
                .field(Field::data("second", 2)),
        )
        .build()
        .unwrap();

    let data = [0, 0, 3, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, b'z'];
    let mut recorder = Recorder::default();
    let read = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&data, 0, &mut recorder)
        .unwrap();

    assert_eq!(read, data.len());
    assert_eq!(
        &recorder.events[1..3],
        &[
            Event::VarData(String::from("first"), Vec::new(), 12),
            Event::VarData(String::from("second"), b"z".to_vec(), 16),
        ]
    );
}

#[test]
fn test_decode_stream() {
    let ir = order_ir();
    let mut data = ORDER.to_vec();
    data.extend_from_slice(&ORDER);
    let mut recorder = Recorder::default();
    let count = OtfDecoder::new(&ir)
        .unwrap()
        .decode_stream(&data, &mut recorder)
        .unwrap();
    assert_eq!(count, 2);
    assert!(recorder.events.contains(&value("leg", 9, 27 + 23)));
}

#[test]
fn test_concurrent_decodes_share_ir() {
    let ir = order_ir();
    let decoder = OtfDecoder::new(&ir).unwrap();
    let buffers: Vec<Vec<u8>> = (0..8u8)
        .map(|i| {
            let mut data = ORDER.to_vec();
            data[23] = i;
            data
        })
        .collect();

    std::thread::scope(|s| {
        let handles: Vec<_> = buffers
            .iter()
            .map(|data| {
                let decoder = &decoder;
                s.spawn(move || {
                    let mut recorder = Recorder::default();
                    decoder.decode(data, 0, &mut recorder).unwrap();
                    recorder.events
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let events = handle.join().unwrap();
            assert!(events.contains(&value("leg", i as u64, 23)));
        }
    });
}

#[test]
fn test_constant_field_consumes_nothing() {
    let ir = IrBuilder::new("trading", 1, 0)
        .message(
            Message::new("Const", 4)
                .field(Field::new(
                    "kind",
                    1,
                    EncodedType::new("kind", PrimitiveType::UInt8).constant(PrimitiveValue::UInt(42)),
                ))
                .field(Field::new("n", 2, EncodedType::new("n", PrimitiveType::UInt8))),
        )
        .build()
        .unwrap();

    let data = [1, 0, 4, 0, 1, 0, 0, 0, 3];
    let mut recorder = Recorder::default();
    let read = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&data, 0, &mut recorder)
        .unwrap();
    assert_eq!(read, 9);
    assert_eq!(&recorder.events[1..3], &[value("kind", 42, 8), value("n", 3, 8)]);
}

/// Build a message from arbitrary (kind, version) pairs. Kinds are sorted so
/// that fields precede groups which precede var data.
fn arbitrary_ir(specs: &[(u8, u8)]) -> Ir {
    let mut specs: Vec<_> = specs.iter().take(12).map(|&(k, v)| (k % 3, u32::from(v % 3))).collect();
    specs.sort_by_key(|x| x.0);

    let mut message = Message::new("Arbitrary", 1);
    for (i, (kind, version)) in specs.into_iter().enumerate() {
        let id = i as u32;
        let name = format!("e{}", i);
        let field = match kind {
            0 => Field::new(name.clone(), id, EncodedType::new(name, PrimitiveType::UInt16)),
            1 => Field::group(
                name.clone(),
                id,
                vec![
                    Field::new("inner", 100, EncodedType::new("inner", PrimitiveType::Int8)),
                    Field::group("nested", 101, Vec::new()).with_since_version(version + 1),
                ],
            ),
            _ => Field::data(name, id),
        };
        message = message.field(field.with_since_version(version));
    }

    IrBuilder::new("arbitrary", 1, 3)
        .message(message)
        .build()
        .unwrap()
}

#[quickcheck]
fn component_counts_close_constructs(specs: Vec<(u8, u8)>) -> bool {
    let ir = arbitrary_ir(&specs);
    let tokens = ir.message(1).unwrap();
    navigate::validate(tokens).is_ok()
        && tokens.iter().enumerate().all(|(i, token)| match token.signal().end() {
            Some(end) => navigate::find_end(tokens, i)
                .map(|x| tokens[x].signal() == end && tokens[x].name() == token.name())
                .unwrap_or(false),
            None => token.component_token_count() == 1,
        })
}

#[quickcheck]
fn body_partitions_into_fields_groups_and_data(specs: Vec<(u8, u8)>) -> bool {
    let ir = arbitrary_ir(&specs);
    let body = navigate::message_body(ir.message(1).unwrap());
    let mut out = Vec::new();
    let i = navigate::collect_fields(body, 0, &mut out);
    let i = navigate::collect_groups(body, i, &mut out);
    let i = navigate::collect_var_data(body, i, &mut out);
    i == body.len() && out.len() == body.len()
}

#[quickcheck]
fn absent_elements_emit_nothing(specs: Vec<(u8, u8)>, acting: u8) -> bool {
    let acting = u32::from(acting % 4);
    let ir = arbitrary_ir(&specs);
    let tokens = ir.message(1).unwrap();
    let block_length = tokens[0].encoded_length();
    let data = vec![0u8; block_length + 1024];

    let mut recorder = Recorder::default();
    let result = decode_message(&data, 0, acting, block_length, tokens, &mut recorder);
    result.is_ok() && recorder.versions.iter().all(|&x| x <= acting)
}

#[test]
fn test_signal_pairs() {
    let tokens = order_ir().message(1).unwrap().to_vec();
    let groups = navigate::find_sub_group_names(&tokens);
    assert_eq!(groups, vec!["legs"]);

    let begin = navigate::find_signal(&tokens, Signal::BeginGroup).unwrap();
    let end = navigate::find_end_signal(&tokens, begin, Signal::EndGroup, "legs").unwrap();
    assert_eq!(end - begin + 1, tokens[begin].component_token_count());
}

#[test]
fn test_group_end_follows_last_element() {
    let ir = IrBuilder::new("trading", 1, 0)
        .message(Message::new("Book", 5).field(Field::group(
            "outer",
            1,
            vec![
                Field::new("a", 2, EncodedType::new("a", PrimitiveType::UInt8)),
                Field::group(
                    "inner",
                    3,
                    vec![Field::new("b", 4, EncodedType::new("b", PrimitiveType::UInt8))],
                ),
            ],
        )))
        .build()
        .unwrap();

    let data = [
        0, 0, 5, 0, 1, 0, 0, 0, // header
        1, 0, 1, 0, // outer dimension
        3, // a
        1, 0, 0, 0, // inner dimension, empty
    ];

    let mut recorder = Recorder::default();
    let read = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&data, 0, &mut recorder)
        .unwrap();

    assert_eq!(read, data.len());
    assert_eq!(
        recorder.events,
        vec![
            Event::BeginMessage(String::from("Book")),
            Event::GroupHeader(String::from("outer"), 1, 1),
            Event::BeginGroup(String::from("outer"), 0, 1),
            value("a", 3, 12),
            Event::GroupHeader(String::from("inner"), 0, 1),
            Event::GroupEnd(String::from("inner"), 0),
            Event::EndGroup(String::from("outer"), 0, 1),
            Event::GroupEnd(String::from("outer"), 1),
            Event::EndMessage(String::from("Book")),
        ]
    );
}

fn empty_group_ir() -> Ir {
    let dimension = CompositeType::new("wideGroupSize")
        .member(EncodedType::new("blockLength", PrimitiveType::UInt16))
        .member(EncodedType::new("numInGroup", PrimitiveType::UInt32));

    IrBuilder::new("trading", 1, 0)
        .message(Message::new("Ping", 6).field(Field::group("empty", 1, Vec::new()).with_dimension(dimension)))
        .build()
        .unwrap()
}

#[test]
fn test_zero_length_elements_are_bounded_by_buffer() {
    let ir = empty_group_ir();
    let decoder = OtfDecoder::new(&ir).unwrap();

    let mut data = vec![0, 0, 6, 0, 1, 0, 0, 0, 0, 0];
    data.extend_from_slice(&200_000_000u32.to_le_bytes());
    let mut recorder = Recorder::default();
    let err = decoder.decode(&data, 0, &mut recorder).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::LengthOverflow {
            declared: 200_000_000,
            available: 0,
            ..
        }
    ));
    assert_eq!(recorder.events, vec![Event::BeginMessage(String::from("Ping"))]);

    data[10..14].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(decoder.decode(&data, 0, &mut Recorder::default()).is_err());
}

#[test]
fn test_zero_length_elements_within_buffer() {
    let ir = empty_group_ir();
    let mut data = vec![0, 0, 6, 0, 1, 0, 0, 0, 0, 0];
    data.extend_from_slice(&3u32.to_le_bytes());
    data.extend_from_slice(&[0xee; 3]);

    let mut recorder = Recorder::default();
    let read = OtfDecoder::new(&ir)
        .unwrap()
        .decode(&data, 0, &mut recorder)
        .unwrap();

    assert_eq!(read, 14);
    let elements = recorder
        .events
        .iter()
        .filter(|x| matches!(x, Event::BeginGroup(..)))
        .count();
    assert_eq!(elements, 3);
    assert!(recorder.events.contains(&Event::GroupEnd(String::from("empty"), 3)));
}

/// Tracks the furthest byte any event refers to
#[derive(Debug, Default)]
struct Extent(usize);

impl<'a> TokenListener<'a> for Extent {
    fn on_encoding(
        &mut self,
        _field: &'a Token,
        type_token: &'a Token,
        value: FieldValue<'a>,
        offset: usize,
    ) -> Result<(), Error> {
        if !type_token.is_constant_encoding() {
            self.0 = self.0.max(offset + value.as_bytes().len());
        }
        Ok(())
    }

    fn on_var_data(
        &mut self,
        _field: &'a Token,
        _type_token: &'a Token,
        data: &'a [u8],
        offset: usize,
    ) -> Result<(), Error> {
        assert!(data.iter().all(|&x| x != 0xaa));
        self.0 = self.0.max(offset + data.len());
        Ok(())
    }
}

#[test]
fn test_events_stay_inside_the_slice() {
    let ir = versioned_ir();
    let message = [
        4, 0, 2, 0, 1, 0, 1, 0, 5, 0, 6, 0, 2, 0, 1, 0, 10, 20, 0, 0, 0, 0, 3, 0, 0, 0, b'a',
        b'b', b'c',
    ];

    let mut buffer = message.to_vec();
    buffer.extend_from_slice(&[0xaa; 32]);
    let decoder = OtfDecoder::new(&ir).unwrap();

    for len in 0..=message.len() {
        let mut extent = Extent::default();
        let result = decoder.decode(&buffer[..len], 0, &mut extent);
        assert!(extent.0 <= len, "event past a {} byte slice", len);
        assert_eq!(result.is_ok(), len == message.len());
    }

    let mut extent = Extent::default();
    let read = decoder.decode(&buffer, 0, &mut extent).unwrap();
    assert_eq!(read, message.len());
    assert_eq!(extent.0, message.len());
}
