use formula_xlm::{parse_xlm_dump, parse_xlm_dump_bytes, XlmDumpParse, XlmParseOptions, ERROR_MARKER};
use proptest::prelude::*;

const TOKENS: &[&str] = &[
    "ptgInt 5",
    "ptgInt",
    "ptgNum 1e400",
    "ptgNum",
    "ptgStr \"a\"b\"",
    "ptgStr 'x",
    "ptgRef R~C~",
    "ptgArea R1:C2",
    "ptgFuncVar args 99999999999 func RUN (0x8011)",
    "ptgFuncV FORMULA (0x0006)",
    "ptgNameX 1",
    "ptgAttr",
    "ptgWhatever 1 2",
    "*UNKNOWN TOKEN*",
    "R1C1",
    "len=0",
    ":",
    "\"",
    "'",
    "\n",
    "\r\n",
    "' 0006 000072 FORMULA : ",
];

fn check(result: XlmDumpParse) -> Result<(), TestCaseError> {
    if let XlmDumpParse::Failed(diag) = result {
        prop_assert!(diag.line() >= 1);
        prop_assert!(diag.annotated_line.contains(ERROR_MARKER));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        max_shrink_iters: 0,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..=1024)) {
        let result = std::panic::catch_unwind(|| {
            parse_xlm_dump_bytes(&bytes, &XlmParseOptions::default())
        });
        prop_assert!(result.is_ok(), "parse_xlm_dump_bytes panicked");
        check(result.unwrap())?;
    }

    #[test]
    fn mutated_formula_records_never_panic(
        cell in (0i64..70000, 0i64..300),
        tokens in proptest::collection::vec(proptest::sample::select(TOKENS), 0..12),
        debug in any::<bool>(),
    ) {
        let dump = format!(
            "' 0006 000072 FORMULA : Cell Formula - R{}C{} len=9 {}\n",
            cell.0,
            cell.1,
            tokens.join(" ")
        );
        let opts = XlmParseOptions { debug, ..XlmParseOptions::default() };
        let result = std::panic::catch_unwind(|| parse_xlm_dump(&dump, &opts));
        prop_assert!(result.is_ok(), "parse_xlm_dump panicked on {dump:?}");
        check(result.unwrap())?;
    }
}
