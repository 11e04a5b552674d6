use formula_xlm::{
    parse_xlm_dump, CellAddress, DuplicateCellPolicy, StackItem, XlmDumpParse, XlmParseOptions,
};
use pretty_assertions::assert_eq;

const DUMP: &str = concat!(
    "' 0006 000072 FORMULA : len=2 R4C1 ptgInt 1\n",
    "' 0006 000072 FORMULA : len=2 R5C1 ptgInt 9\n",
    "' 0006 000072 FORMULA : len=2 R4C1 ptgInt 2\n",
);

fn parse_with(policy: DuplicateCellPolicy) -> formula_xlm::ParsedDump {
    let opts = XlmParseOptions {
        duplicate_cells: policy,
        ..XlmParseOptions::default()
    };
    match parse_xlm_dump(DUMP, &opts) {
        XlmDumpParse::Parsed(parsed) => parsed,
        XlmDumpParse::Failed(diag) => panic!("unexpected failure: {diag}"),
    }
}

#[test]
fn later_record_wins_by_default() {
    assert_eq!(XlmParseOptions::default().duplicate_cells, DuplicateCellPolicy::KeepLast);

    let parsed = parse_with(DuplicateCellPolicy::default());
    assert_eq!(parsed.grid.len(), 2);
    assert_eq!(parsed.grid.get(4, 1).unwrap().items(), &[StackItem::Int(2)]);
    assert_eq!(parsed.duplicate_cells, vec![CellAddress::new(4, 1)]);
}

#[test]
fn keep_first_policy_keeps_the_earlier_record() {
    let parsed = parse_with(DuplicateCellPolicy::KeepFirst);
    assert_eq!(parsed.grid.len(), 2);
    assert_eq!(parsed.grid.get(4, 1).unwrap().items(), &[StackItem::Int(1)]);
    assert_eq!(parsed.duplicate_cells, vec![CellAddress::new(4, 1)]);
}
