//! Instruction-set object model for XLM cell formulas.
//!
//! Each XLM formula is a postfix program: a sequence of [`StackItem`]s that a stack machine
//! replays left to right. The instruction set mirrors the BIFF `ptg` token language closely
//! enough that an emulator can dispatch on it exhaustively.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Axis sentinel meaning "the entire row" (as a column) or "the entire column" (as a row).
pub const WHOLE_AXIS: i64 = -1;

/// Macro-command flag carried in the high bit of a function opcode.
const MACRO_COMMAND_BIT: u16 = 0x8000;

/// A cell coordinate exactly as printed in the dump (`R<row>C<col>`, 1-based).
///
/// Either axis may be [`WHOLE_AXIS`] when the address is the endpoint of a row-only or
/// column-only area.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: i64,
    pub col: i64,
}

impl CellAddress {
    #[inline]
    pub const fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// An endpoint covering the whole of `row`.
    #[inline]
    pub const fn whole_row(row: i64) -> Self {
        Self::new(row, WHOLE_AXIS)
    }

    /// An endpoint covering the whole of `col`.
    #[inline]
    pub const fn whole_col(col: i64) -> Self {
        Self::new(WHOLE_AXIS, col)
    }

    pub const fn is_whole_row(self) -> bool {
        self.col == WHOLE_AXIS && self.row != WHOLE_AXIS
    }

    pub const fn is_whole_col(self) -> bool {
        self.row == WHOLE_AXIS && self.col != WHOLE_AXIS
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.row, self.col) {
            (WHOLE_AXIS, WHOLE_AXIS) => f.write_str("R:C"),
            (row, WHOLE_AXIS) => write!(f, "R{row}"),
            (WHOLE_AXIS, col) => write!(f, "C{col}"),
            (row, col) => write!(f, "R{row}C{col}"),
        }
    }
}

/// One instruction of an XLM formula.
///
/// The enum uses an explicit `{type, value}` tagged layout so the grid can be handed to
/// out-of-process emulators and report writers as JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StackItem {
    // Literals.
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),

    // References.
    CellRef(CellAddress),
    /// Two-corner area. A single-corner area is always a [`StackItem::CellRef`].
    Area {
        first: CellAddress,
        last: CellAddress,
    },
    /// 3-D (cross-sheet) area. Corners are not resolved.
    Area3d,
    /// Shared/array formula pointer (`ptgExp`) to the base cell.
    Exp(CellAddress),
    Name {
        name: String,
    },
    /// External name: sheet/supbook index plus name index.
    NameX {
        sheet: String,
        name: String,
    },
    NameV,

    // Binary operators.
    Add,
    Sub,
    Mul,
    Div,
    Power,
    Concat,
    LessThan,
    LessEqual,
    Equal,
    GreaterEqual,
    GreaterThan,
    NotEqual,
    Range,

    // Unary operators and grouping.
    UnaryPlus,
    UnaryMinus,
    Percent,
    Paren,

    // Function calls.
    /// Fixed-arity call (`ptgFunc`). The opcode is kept when the dump prints it.
    Func {
        name: String,
        opcode: Option<String>,
    },
    /// Variable-arity call (`ptgFuncVar`) with its declared argument count and raw hex opcode.
    FuncVar {
        arg_count: u32,
        name: String,
        opcode: String,
    },

    // Structural markers.
    Array,
    MissingArg,
    Attr,
    MemFunc,
    MemArea,
    MemNoMem,
    MemError,
    EndSheet,
    RefError,
    AreaError,

    /// A syntactically valid token this model has no instruction for.
    Unparsed,
}

impl StackItem {
    /// Numeric literal from a decimal terminal.
    ///
    /// Values with a zero fractional part collapse to [`StackItem::Int`] (`3.0` is `Int(3)`),
    /// provided they are finite and fit in an `i64`.
    pub fn from_decimal(value: f64) -> Self {
        const I64_BOUND: f64 = 9_223_372_036_854_775_808.0; // 2^63
        if value.is_finite() && value.fract() == 0.0 && value >= -I64_BOUND && value < I64_BOUND
        {
            return StackItem::Int(value as i64);
        }
        StackItem::Float(value)
    }

    /// Function name for [`StackItem::Func`] and [`StackItem::FuncVar`].
    pub fn function_name(&self) -> Option<&str> {
        match self {
            StackItem::Func { name, .. } | StackItem::FuncVar { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Raw hex opcode text (e.g. `0x8011`), if the dump printed one.
    pub fn raw_opcode(&self) -> Option<&str> {
        match self {
            StackItem::Func { opcode, .. } => opcode.as_deref(),
            StackItem::FuncVar { opcode, .. } => Some(opcode),
            _ => None,
        }
    }

    /// BIFF function index with the macro-command flag masked off.
    pub fn function_id(&self) -> Option<u16> {
        self.opcode_bits().map(|bits| bits & !MACRO_COMMAND_BIT)
    }

    /// Whether the call's opcode carries the macro-command flag (`0x8000`).
    pub fn is_macro_command(&self) -> bool {
        self.opcode_bits()
            .is_some_and(|bits| bits & MACRO_COMMAND_BIT != 0)
    }

    fn opcode_bits(&self) -> Option<u16> {
        let raw = self.raw_opcode()?;
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        u16::from_str_radix(digits, 16).ok()
    }
}

/// The instruction sequence of one formula cell, in source (postfix) order.
///
/// Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellFormula {
    address: CellAddress,
    items: Vec<StackItem>,
}

impl CellFormula {
    pub fn new(address: CellAddress, items: Vec<StackItem>) -> Self {
        Self { address, items }
    }

    pub fn address(&self) -> CellAddress {
        self.address
    }

    pub fn row(&self) -> i64 {
        self.address.row
    }

    pub fn col(&self) -> i64 {
        self.address.col
    }

    pub fn items(&self) -> &[StackItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<StackItem> {
        self.items
    }
}
