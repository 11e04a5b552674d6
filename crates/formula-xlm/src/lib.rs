//! Excel 4.0 macro (XLM) formula dump parsing.
//!
//! Input is the text a BIFF disassembler prints for a macro sheet: one `' MARKER OFFSET TAG :`
//! record per line, with FORMULA records carrying postfix `ptg` token streams. The pipeline is
//!
//! 1. [`repair::repair_dump`] fixes string literals the disassembler printed unescaped,
//! 2. the PEG grammar tokenizes the repaired text (all-or-nothing),
//! 3. [`transform`] turns the parse tree into [`StackItem`] instruction sequences, and
//! 4. the FORMULA records are folded into a sparse [`FormulaGrid`] for an emulator to replay.
//!
//! Failures never escape as panics or partial grids; see [`XlmDumpParse`].

mod grammar;

pub mod diagnostics;
pub mod grid;
pub mod model;
pub mod repair;
pub mod transform;

pub use diagnostics::{annotate_line, XlmDumpDiagnostic, XlmSyntaxError, ERROR_MARKER};
pub use grid::{DuplicateCellPolicy, FormulaGrid};
pub use model::{CellAddress, CellFormula, StackItem, WHOLE_AXIS};
pub use repair::repair_dump;
pub use transform::{parse_records, DumpRecord, FormulaPayload, RecordPayload};

use serde::{Deserialize, Serialize};

/// Options for [`parse_xlm_dump`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XlmParseOptions {
    /// Log the rendered parse tree and the resulting grid at `debug` level.
    pub debug: bool,
    /// Which record wins when two FORMULA records target the same cell.
    pub duplicate_cells: DuplicateCellPolicy,
}

/// A successfully parsed dump.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDump {
    pub grid: FormulaGrid,
    /// Cells targeted by more than one FORMULA record, in record order.
    pub duplicate_cells: Vec<CellAddress>,
}

/// Outcome of [`parse_xlm_dump`].
#[derive(Clone, Debug, PartialEq)]
pub enum XlmDumpParse {
    Parsed(ParsedDump),
    Failed(XlmDumpDiagnostic),
}

impl XlmDumpParse {
    pub fn is_parsed(&self) -> bool {
        matches!(self, XlmDumpParse::Parsed(_))
    }

    pub fn grid(&self) -> Option<&FormulaGrid> {
        match self {
            XlmDumpParse::Parsed(parsed) => Some(&parsed.grid),
            XlmDumpParse::Failed(_) => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&XlmDumpDiagnostic> {
        match self {
            XlmDumpParse::Parsed(_) => None,
            XlmDumpParse::Failed(diag) => Some(diag),
        }
    }

    /// The grid, or an empty grid if the dump failed to parse.
    pub fn into_grid(self) -> FormulaGrid {
        match self {
            XlmDumpParse::Parsed(parsed) => parsed.grid,
            XlmDumpParse::Failed(_) => FormulaGrid::new(),
        }
    }
}

/// Parse a disassembler dump into a formula grid.
///
/// ```
/// use formula_xlm::{parse_xlm_dump, StackItem, XlmParseOptions};
///
/// let dump = "' 0006 000072 FORMULA : len=2 R1C1 ptgInt 5\n";
/// let grid = parse_xlm_dump(dump, &XlmParseOptions::default()).into_grid();
/// assert_eq!(grid.get(1, 1).unwrap().items(), &[StackItem::Int(5)]);
/// ```
pub fn parse_xlm_dump(raw: &str, opts: &XlmParseOptions) -> XlmDumpParse {
    let fixed = repair_dump(raw);

    let records = match parse_records(&fixed, opts) {
        Ok(records) => records,
        Err(err) => {
            let diag = XlmDumpDiagnostic::new(err, &fixed);
            log::error!("{diag}");
            return XlmDumpParse::Failed(diag);
        }
    };

    let (grid, duplicate_cells) = grid::assemble(records, opts.duplicate_cells);
    if opts.debug {
        log::debug!("XLM formula grid ({} cells): {grid:#?}", grid.len());
    }

    XlmDumpParse::Parsed(ParsedDump {
        grid,
        duplicate_cells,
    })
}

/// [`parse_xlm_dump`] over raw bytes; invalid UTF-8 is replaced with U+FFFD.
pub fn parse_xlm_dump_bytes(raw: &[u8], opts: &XlmParseOptions) -> XlmDumpParse {
    parse_xlm_dump(&String::from_utf8_lossy(raw), opts)
}
