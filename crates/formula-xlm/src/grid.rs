//! Sparse, address-keyed container of cell formulas.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::model::{CellAddress, CellFormula};
use crate::transform::{DumpRecord, RecordPayload};

/// What to do when two FORMULA records target the same cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateCellPolicy {
    /// The later record replaces the earlier one.
    #[default]
    KeepLast,
    /// The earlier record is kept and later ones are ignored.
    KeepFirst,
}

/// `row -> col -> formula`, iterated in row-major order.
///
/// Only cells that carry a formula are present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaGrid {
    rows: BTreeMap<i64, BTreeMap<i64, CellFormula>>,
}

impl FormulaGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: i64, col: i64) -> Option<&CellFormula> {
        self.rows.get(&row)?.get(&col)
    }

    /// All formulas of `row`, keyed by column.
    pub fn row(&self, row: i64) -> Option<&BTreeMap<i64, CellFormula>> {
        self.rows.get(&row)
    }

    pub fn contains(&self, row: i64, col: i64) -> bool {
        self.get(row, col).is_some()
    }

    /// Insert `formula` at its own address, returning the formula it replaced.
    pub fn insert(&mut self, formula: CellFormula) -> Option<CellFormula> {
        self.rows
            .entry(formula.row())
            .or_default()
            .insert(formula.col(), formula)
    }

    /// Number of formula cells.
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row numbers that hold at least one formula, ascending.
    pub fn rows(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.keys().copied()
    }

    /// Every formula, row-major.
    pub fn iter(&self) -> impl Iterator<Item = &CellFormula> + '_ {
        self.rows.values().flat_map(BTreeMap::values)
    }
}

impl IntoIterator for FormulaGrid {
    type Item = CellFormula;
    type IntoIter = std::iter::FlatMap<
        btree_map::IntoValues<i64, BTreeMap<i64, CellFormula>>,
        btree_map::IntoValues<i64, CellFormula>,
        fn(BTreeMap<i64, CellFormula>) -> btree_map::IntoValues<i64, CellFormula>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        let values: fn(BTreeMap<i64, CellFormula>) -> btree_map::IntoValues<i64, CellFormula> =
            BTreeMap::into_values;
        self.rows.into_values().flat_map(values)
    }
}

/// Fold FORMULA records into a grid.
///
/// Returns the grid and the address of every cell that was targeted more than once (one entry
/// per extra record, in record order).
pub(crate) fn assemble(
    records: Vec<DumpRecord>,
    policy: DuplicateCellPolicy,
) -> (FormulaGrid, Vec<CellAddress>) {
    let mut grid = FormulaGrid::new();
    let mut duplicates = Vec::new();

    for record in records {
        let RecordPayload::Formula(payload) = record.payload else {
            continue;
        };
        let address = payload.address;

        if grid.contains(address.row, address.col) {
            log::warn!(
                "duplicate FORMULA record for {address} (record {} at offset {}); keeping the {} one",
                record.marker,
                record.offset,
                match policy {
                    DuplicateCellPolicy::KeepLast => "later",
                    DuplicateCellPolicy::KeepFirst => "earlier",
                }
            );
            duplicates.push(address);
            if policy == DuplicateCellPolicy::KeepFirst {
                continue;
            }
        }

        grid.insert(CellFormula::new(address, payload.items));
    }

    (grid, duplicates)
}
