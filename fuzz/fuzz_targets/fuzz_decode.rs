#![no_main]
use libfuzzer_sys::fuzz_target;
use sbe_otf::dump::DumpListener;
use sbe_otf::ir::builder::{CompositeType, EncodedType, EnumType, Field, IrBuilder, Message, SetType};
use sbe_otf::{Ir, OtfDecoder, PrimitiveType, PrimitiveValue};
use std::sync::OnceLock;

fn ir() -> &'static Ir {
    static IR: OnceLock<Ir> = OnceLock::new();
    IR.get_or_init(|| {
        IrBuilder::new("fuzz", 1, 2)
            .message(
                Message::new("Everything", 1)
                    .field(Field::new(
                        "side",
                        1,
                        EnumType::new("Side", PrimitiveType::Char)
                            .value("Buy", PrimitiveValue::Char(b'1'))
                            .value("Sell", PrimitiveValue::Char(b'2')),
                    ))
                    .field(Field::new(
                        "flags",
                        2,
                        SetType::new("Flags", PrimitiveType::UInt16).choice("A", 0).choice("B", 9),
                    ))
                    .field(Field::new(
                        "px",
                        3,
                        CompositeType::new("Decimal")
                            .member(EncodedType::new("mantissa", PrimitiveType::Int64))
                            .member(EncodedType::new("exponent", PrimitiveType::Int8)),
                    ))
                    .field(
                        Field::new("qty", 4, EncodedType::new("qty", PrimitiveType::Float).optional())
                            .with_since_version(1),
                    )
                    .field(Field::group(
                        "outer",
                        5,
                        vec![
                            Field::new("a", 6, EncodedType::new("a", PrimitiveType::UInt8)),
                            Field::group(
                                "inner",
                                7,
                                vec![Field::new("b", 8, EncodedType::new("b", PrimitiveType::Double))],
                            ),
                            Field::data("blob", 9),
                        ],
                    ))
                    .field(
                        Field::data("text", 10)
                            .with_var_data_encoding(CompositeType::var_string_encoding())
                            .with_since_version(2),
                    ),
            )
            .build()
            .unwrap()
    })
}

fuzz_target!(|data: &[u8]| {
    let ir = ir();
    let decoder = OtfDecoder::new(ir).unwrap();
    let mut listener = DumpListener::new(Vec::new());
    let _ = decoder.decode_stream(data, &mut listener);

    #[cfg(feature = "json")]
    {
        let _ = sbe_otf::json::JsonPrinter::new(ir).print(data, 0);
    }
});
