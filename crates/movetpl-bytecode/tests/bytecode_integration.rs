//! Integration tests against modules produced by the Move compiler

use movetpl_bytecode::index::IdentifierIndex;
use movetpl_bytecode::{
    deserialize, get_constants, serialize, update_constants, update_identifiers, Constant,
    ConstantType, DecodeError, Module, ModuleError, PatchError, RenameError, TableKind,
    TemplateError, VerifyError,
};

const POKEMON: &str = include_str!("fixtures/pokemon.hex");
const COIN_TEMPLATE: &str = include_str!("fixtures/coin_template.hex");
const U64_MODULE: &str = include_str!("fixtures/u64_module.hex");

fn fixture(hex_text: &str) -> Vec<u8> {
    hex::decode(hex_text.trim()).expect("fixture is valid hex")
}

fn vector_u8() -> ConstantType {
    ConstantType::Vector(Box::new(ConstantType::U8))
}

fn names(module: &Module) -> Vec<&str> {
    module.identifiers.iter().map(|i| i.as_str()).collect()
}

#[test]
fn test_fixtures_roundtrip_exactly() {
    for hex_text in [POKEMON, COIN_TEMPLATE, U64_MODULE] {
        let bytes = fixture(hex_text);
        let module = deserialize(&bytes).unwrap();
        assert_eq!(serialize(&module).unwrap(), bytes);
    }
}

#[test]
fn test_pokemon_structure() {
    let module = deserialize(&fixture(POKEMON)).unwrap();
    assert_eq!(module.version, 6);
    assert_eq!(module.name().map(|n| n.as_str()), Some("pokemon_v1"));
    assert_eq!(
        module.table_order,
        vec![
            TableKind::ModuleHandles,
            TableKind::StructHandles,
            TableKind::FunctionHandles,
            TableKind::Signatures,
            TableKind::Identifiers,
            TableKind::AddressIdentifiers,
            TableKind::ConstantPool,
            TableKind::StructDefinitions,
            TableKind::FunctionDefinitions,
            TableKind::FieldHandles,
        ]
    );
    assert_eq!(module.identifiers.len(), 17);
    assert_eq!(module.function_defs.len(), 15);
    assert_eq!(module.struct_defs[0].fields().len(), 8);
}

#[test]
fn test_pokemon_table_layout_matches_directory() {
    let module = deserialize(&fixture(POKEMON)).unwrap();
    let layout: Vec<(TableKind, u32, u32)> = module
        .table_layout()
        .iter()
        .map(|e| (e.kind, e.offset, e.length))
        .collect();
    assert_eq!(layout[0], (TableKind::ModuleHandles, 0, 2));
    assert_eq!(layout[4], (TableKind::Identifiers, 138, 155));
    assert_eq!(layout[6], (TableKind::ConstantPool, 325, 30));
    assert_eq!(layout[9], (TableKind::FieldHandles, 878, 16));
}

#[test]
fn test_pokemon_constants() {
    let constants = get_constants(&fixture(POKEMON)).unwrap();
    let values: Vec<u64> = constants
        .iter()
        .map(|c| {
            assert_eq!(c.type_tag, ConstantType::U64);
            u64::from_le_bytes(c.value.as_slice().try_into().unwrap())
        })
        .collect();
    assert_eq!(values, [1_000_000_000, 0, 1]);
}

#[test]
fn test_coin_template_constants() {
    let constants = get_constants(&fixture(COIN_TEMPLATE)).unwrap();
    assert_eq!(
        constants,
        vec![
            Constant {
                type_tag: ConstantType::U8,
                value: vec![6],
            },
            Constant {
                type_tag: vector_u8(),
                value: b"\x04TMPL".to_vec(),
            },
            Constant {
                type_tag: vector_u8(),
                value: b"\x0dTemplate Coin".to_vec(),
            },
            Constant {
                type_tag: vector_u8(),
                value: b"\x19Template Coin Description".to_vec(),
            },
        ]
    );
    assert_eq!(constants[1].decode_value().unwrap().to_string(), "b\"TMPL\"");
}

#[test]
fn test_u64_module_constants() {
    let constants = get_constants(&fixture(U64_MODULE)).unwrap();
    assert_eq!(constants.len(), 2);
    assert_eq!(constants[0].value, vec![1, b'0']);
    assert_eq!(constants[1].value, vec![0]);
}

#[test]
fn test_constant_enumeration_survives_roundtrip() {
    for hex_text in [POKEMON, COIN_TEMPLATE, U64_MODULE] {
        let bytes = fixture(hex_text);
        let reencoded = serialize(&deserialize(&bytes).unwrap()).unwrap();
        assert_eq!(get_constants(&reencoded).unwrap(), get_constants(&bytes).unwrap());
    }
}

#[test]
fn test_rename_pokemon() {
    let bytes = fixture(POKEMON);
    let original = deserialize(&bytes).unwrap();

    let renamed_bytes = update_identifiers(
        &bytes,
        [
            ("Stats", "PokeStats"),
            ("pokemon_v1", "capymon"),
            ("new", "capy_new"),
            ("speed", "capy_speed"),
        ],
    )
    .unwrap();
    let renamed = deserialize(&renamed_bytes).unwrap();

    assert_eq!(
        names(&renamed),
        [
            "PokeStats",
            "attack",
            "damage",
            "decrease_hp",
            "defense",
            "hp",
            "level",
            "level_up",
            "capy_new",
            "physical_damage",
            "capymon",
            "scaling",
            "special_attack",
            "special_damage",
            "special_defense",
            "capy_speed",
            "types",
        ]
    );
    assert_eq!(renamed.name().map(|n| n.as_str()), Some("capymon"));

    // Only the identifier pool differs
    let mut expected = original.clone();
    expected.identifiers = renamed.identifiers.clone();
    assert_eq!(renamed, expected);
    assert_eq!(renamed.constant_pool, original.constant_pool);
    assert_eq!(renamed.function_defs, original.function_defs);

    let struct_name = renamed.struct_handles[0].name;
    assert_eq!(
        renamed.identifier_at(struct_name).map(|n| n.as_str()),
        Some("PokeStats")
    );
}

#[test]
fn test_rename_coin_template() {
    let bytes = update_identifiers(
        &fixture(COIN_TEMPLATE),
        [("TEMPLATE", "MCN"), ("template", "mcn")],
    )
    .unwrap();
    let module = deserialize(&bytes).unwrap();
    assert_eq!(module.name().map(|n| n.as_str()), Some("mcn"));
    assert!(names(&module).contains(&"MCN"));
    assert!(!names(&module).contains(&"TEMPLATE"));
}

#[test]
fn test_rename_rejects_invalid_names() {
    let bytes = fixture(POKEMON);
    for bad in ["123123PokeStats", "\\aaa", "+say_hello"] {
        let result = update_identifiers(&bytes, [("pokemon_v1", "capymon"), ("Stats", bad)]);
        assert_eq!(
            result,
            Err(TemplateError::Rename(RenameError::InvalidIdentifier {
                old: "Stats".to_string(),
                new: bad.to_string(),
            }))
        );
    }
}

#[test]
fn test_rename_rejects_collision() {
    let result = update_identifiers(&fixture(POKEMON), [("hp", "level")]);
    assert_eq!(
        result,
        Err(TemplateError::Rename(RenameError::DuplicateIdentifier(
            "level".to_string()
        )))
    );
}

#[test]
fn test_rename_absent_identifier_is_noop() {
    let bytes = fixture(POKEMON);
    let renamed = update_identifiers(&bytes, [("charizard", "pikachu")]).unwrap();
    assert_eq!(renamed, bytes);
}

#[test]
fn test_patch_coin_decimals_and_symbol() {
    let bytes = fixture(COIN_TEMPLATE);

    let patched = update_constants(&bytes, &[3], &[6], "U8").unwrap();
    let constants = get_constants(&patched).unwrap();
    assert_eq!(constants[0].value, vec![3]);
    assert_eq!(constants[1..], get_constants(&bytes).unwrap()[1..]);

    let patched = update_constants(&patched, b"\x03MCN", b"\x04TMPL", "Vector(U8)").unwrap();
    let constants = get_constants(&patched).unwrap();
    assert_eq!(constants[0].value, vec![3]);
    assert_eq!(constants[1].value, b"\x03MCN".to_vec());
    assert_eq!(constants[1].type_tag, vector_u8());
    assert_eq!(patched.len(), bytes.len() - 1);
}

#[test]
fn test_patch_type_guard() {
    let result = update_constants(&fixture(COIN_TEMPLATE), &[8], &[6], "Vector(U8)");
    assert!(matches!(
        result,
        Err(TemplateError::Patch(PatchError::ConstantNotFound { .. }))
    ));
}

#[test]
fn test_patch_value_guard() {
    let result = update_constants(&fixture(COIN_TEMPLATE), &[3], &[0], "U8");
    assert_eq!(
        result,
        Err(TemplateError::Patch(PatchError::ConstantNotFound {
            type_tag: ConstantType::U8,
            expected: "00".to_string(),
        }))
    );
}

#[test]
fn test_patch_replaces_exactly_one() {
    let mut module = deserialize(&fixture(COIN_TEMPLATE)).unwrap();
    module.constant_pool.push(Constant {
        type_tag: ConstantType::U8,
        value: vec![6],
    });
    let bytes = serialize(&module).unwrap();

    let patched = update_constants(&bytes, &[9], &[6], "U8").unwrap();
    let constants = get_constants(&patched).unwrap();
    assert_eq!(constants[0].value, vec![9]);
    assert_eq!(constants[4].value, vec![6]);
}

#[test]
fn test_patch_rejects_malformed_new_value() {
    let result = update_constants(&fixture(COIN_TEMPLATE), b"\x05MCN", b"\x04TMPL", "Vector(U8)");
    assert!(matches!(result, Err(TemplateError::Patch(PatchError::Constant(_)))));
}

#[test]
fn test_bad_magic() {
    let mut bytes = fixture(POKEMON);
    bytes[0] = 0xA2;
    assert!(matches!(
        deserialize(&bytes),
        Err(TemplateError::Format(ModuleError::InvalidMagic(_)))
    ));
}

#[test]
fn test_unsupported_version() {
    let mut bytes = fixture(POKEMON);
    bytes[4] = 7;
    assert_eq!(
        deserialize(&bytes),
        Err(TemplateError::Format(ModuleError::UnsupportedVersion(7)))
    );
}

#[test]
fn test_version_5_gates_new_integer_types() {
    let mut bytes = fixture(POKEMON);
    bytes[4] = 5;
    let module = deserialize(&bytes).unwrap();
    assert_eq!(serialize(&module).unwrap(), bytes);

    let mut bytes = fixture(U64_MODULE);
    bytes[4] = 5;
    assert!(matches!(
        deserialize(&bytes),
        Err(TemplateError::Format(ModuleError::DecodeError(
            DecodeError::UnsupportedInVersion { version: 5, .. }
        )))
    ));
}

#[test]
fn test_truncated_input() {
    let bytes = fixture(COIN_TEMPLATE);
    for cut in [0, 4, 10, bytes.len() / 2, bytes.len() - 1] {
        assert!(
            matches!(deserialize(&bytes[..cut]), Err(TemplateError::Format(_))),
            "cut at {cut}"
        );
    }
}

#[test]
fn test_dangling_self_handle() {
    let mut bytes = fixture(POKEMON);
    let last = bytes.len() - 1;
    assert_eq!(bytes[last], 0x00);
    bytes[last] = 0x05;
    assert!(matches!(
        deserialize(&bytes),
        Err(TemplateError::Verify(VerifyError::IndexOutOfBounds { .. }))
    ));
}

#[test]
fn test_serialize_rejects_dangling_reference() {
    let mut module = deserialize(&fixture(POKEMON)).unwrap();
    module.struct_handles[0].name = IdentifierIndex(17);
    assert!(matches!(
        serialize(&module),
        Err(TemplateError::Verify(VerifyError::IndexOutOfBounds { .. }))
    ));
}

#[test]
fn test_json_dump_rebuilds_identical_bytes() {
    let bytes = fixture(U64_MODULE);
    let json = serde_json::to_string_pretty(&deserialize(&bytes).unwrap()).unwrap();
    let module: Module = serde_json::from_str(&json).unwrap();
    assert_eq!(serialize(&module).unwrap(), bytes);
}
