use formula_xlm::{
    parse_xlm_dump, parse_xlm_dump_bytes, CellAddress, StackItem, XlmParseOptions,
};
use pretty_assertions::assert_eq;

fn parse(dump: &str) -> formula_xlm::FormulaGrid {
    let result = parse_xlm_dump(dump, &XlmParseOptions::default());
    assert!(
        result.is_parsed(),
        "expected dump to parse, got {:?}",
        result.diagnostic().map(ToString::to_string)
    );
    result.into_grid()
}

#[test]
fn single_formula_record_becomes_one_cell() {
    let grid = parse("' 0006 000072 FORMULA : len=2 R1C1 ptgInt 5\n");

    assert_eq!(grid.len(), 1);
    let cell = grid.get(1, 1).expect("R1C1 missing");
    assert_eq!(cell.address(), CellAddress::new(1, 1));
    assert_eq!(cell.items(), &[StackItem::Int(5)]);
}

#[test]
fn non_formula_records_produce_an_empty_grid() {
    let grid = parse(concat!(
        "' 0085     14 BOUNDSHEET : Sheet Information - xlm macro, visible\n",
        "' 0204     20 LABEL : Cell Value, String \"not a formula\"\n",
    ));
    assert!(grid.is_empty());
}

#[test]
fn empty_input_parses_to_an_empty_grid() {
    let result = parse_xlm_dump("", &XlmParseOptions::default());
    assert!(result.is_parsed());
    assert!(result.into_grid().is_empty());
}

#[test]
fn disassembler_style_formula_with_embedded_quotes_parses() {
    let dump = concat!(
        "olevba 0.60 - http://decalage.info/python/oletools\n",
        "' 0085     14 BOUNDSHEET : Sheet Information - xlm macro, visible\n",
        "' 0006     72 FORMULA : Cell Formula - R9C1 len=50 ptgRefV R7C49153 ",
        "ptgStr \"Set wsh = CreateObject(\"WScript.Shell\")\" ptgFuncV FWRITELN (0x0089) \n",
        "' 0006     38 FORMULA : Cell Formula - R10C1 len=16 ptgInt 1 ",
        "ptgFuncVarV args 1 func RUN (0x8011)\n",
    );
    let grid = parse(dump);

    assert_eq!(
        grid.get(9, 1).expect("R9C1 missing").items(),
        &[
            StackItem::CellRef(CellAddress::new(7, 49153)),
            StackItem::Str("Set wsh = CreateObject(\"WScript.Shell\")".to_string()),
            StackItem::Func {
                name: "FWRITELN".to_string(),
                opcode: Some("0x0089".to_string()),
            },
        ]
    );

    let run = &grid.get(10, 1).expect("R10C1 missing").items()[1];
    assert_eq!(
        run,
        &StackItem::FuncVar {
            arg_count: 1,
            name: "RUN".to_string(),
            opcode: "0x8011".to_string(),
        }
    );
    assert!(run.is_macro_command());
    assert_eq!(run.function_id(), Some(0x0011));
}

#[test]
fn string_split_over_lines_is_rejoined() {
    let grid = parse("' 0006 000072 FORMULA : len=12 R2C3 ptgStr \"foo\nbar\" ptgFunc CHAR\n");
    assert_eq!(
        grid.get(2, 3).expect("R2C3 missing").items(),
        &[
            StackItem::Str("foo\\nbar".to_string()),
            StackItem::Func {
                name: "CHAR".to_string(),
                opcode: None,
            },
        ]
    );
}

#[test]
fn grid_iterates_row_major() {
    let grid = parse(concat!(
        "' 0006 000072 FORMULA : len=2 R3C1 ptgInt 3\n",
        "' 0006 000072 FORMULA : len=2 R1C2 ptgInt 2\n",
        "' 0006 000072 FORMULA : len=2 R1C1 ptgInt 1\n",
    ));
    let order: Vec<_> = grid.iter().map(|cell| cell.address()).collect();
    assert_eq!(
        order,
        vec![
            CellAddress::new(1, 1),
            CellAddress::new(1, 2),
            CellAddress::new(3, 1)
        ]
    );
}

#[test]
fn byte_input_with_invalid_utf8_is_decoded_lossily() {
    let mut dump = b"' 0006 000072 FORMULA : len=2 R1C1 ptgStr \"ab".to_vec();
    dump.extend_from_slice(&[0xFF, 0xFE]);
    dump.extend_from_slice(b"cd\"\n");

    let grid = parse_xlm_dump_bytes(&dump, &XlmParseOptions::default()).into_grid();
    assert_eq!(
        grid.get(1, 1).expect("R1C1 missing").items(),
        &[StackItem::Str("abcd".to_string())]
    );
}

#[test]
fn lone_carriage_returns_do_not_break_the_dump() {
    let grid = parse(concat!(
        "' 0204     20 LABEL : Cell Value, String line1\rline2\n",
        "' 0006 000072 FORMULA : len=9 R1C1 ptgStr \"a\rb\" ptgInt 5\n",
    ));
    assert_eq!(grid.len(), 1);
    assert_eq!(
        grid.get(1, 1).expect("R1C1 missing").items(),
        &[StackItem::Str("a\\nb".to_string()), StackItem::Int(5)]
    );
}
