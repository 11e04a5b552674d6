#![no_main]

use libfuzzer_sys::fuzz_target;

use formula_xlm::{DuplicateCellPolicy, XlmDumpParse, XlmParseOptions};

/// Macro sheet dumps are a few hundred records at most; keep inputs in that range.
const MAX_INPUT_BYTES: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let data = if data.len() > MAX_INPUT_BYTES {
        &data[..MAX_INPUT_BYTES]
    } else {
        data
    };

    // First byte selects options; the rest is the dump.
    let selector = data[0];
    let opts = XlmParseOptions {
        debug: selector & 0b1 != 0,
        duplicate_cells: if selector & 0b10 == 0 {
            DuplicateCellPolicy::KeepLast
        } else {
            DuplicateCellPolicy::KeepFirst
        },
    };

    // Accept arbitrary bytes as input; treat invalid UTF-8 lossy.
    let input = String::from_utf8_lossy(&data[1..]);

    match formula_xlm::parse_xlm_dump(&input, &opts) {
        XlmDumpParse::Parsed(parsed) => {
            for formula in parsed.grid.iter() {
                for item in formula.items() {
                    let _ = item.function_id();
                }
            }
        }
        XlmDumpParse::Failed(diag) => {
            let _ = diag.to_string();
        }
    }
});
