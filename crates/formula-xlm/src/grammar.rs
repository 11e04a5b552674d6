//! PEG parser for repaired XLM dumps.
//!
//! The grammar itself lives in `grammar/xlm_dump.pest` and is compiled into the crate by
//! `pest_derive`; a missing or malformed grammar is a build error rather than a runtime one.

use std::fmt::Write as _;

use pest::iterators::Pair;
use pest::Parser as _;
use pest_derive::Parser;

use crate::diagnostics::XlmSyntaxError;

#[derive(Parser)]
#[grammar = "grammar/xlm_dump.pest"]
pub(crate) struct XlmDumpParser;

/// Parse repaired dump text into the root `lines` pair.
///
/// Parsing is all-or-nothing: the first rejected token fails the whole document.
pub(crate) fn parse_tree(fixed: &str) -> Result<Pair<'_, Rule>, XlmSyntaxError> {
    let mut pairs = XlmDumpParser::parse(Rule::lines, fixed)?;
    pairs
        .next()
        .ok_or_else(|| XlmSyntaxError::new(1, 1, "empty parse result"))
}

/// Render a parse tree as an indented outline (one production per line).
pub(crate) fn render_tree(root: &Pair<'_, Rule>) -> String {
    let mut out = String::new();
    render_pair(root.clone(), 0, &mut out);
    out
}

fn render_pair(pair: Pair<'_, Rule>, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let rule = pair.as_rule();
    let text = pair.as_str();
    let mut children = pair.into_inner().peekable();
    if children.peek().is_none() {
        let _ = writeln!(out, "{indent}{rule:?} {text:?}");
        return;
    }
    let _ = writeln!(out, "{indent}{rule:?}");
    for child in children {
        render_pair(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_formula_record() {
        let root = parse_tree("' 0006 000072 FORMULA : len=2 R1C1 ptgInt 5\n").expect("parse");
        assert_eq!(root.as_rule(), Rule::lines);

        let tree = render_tree(&root);
        assert!(tree.contains("formula_record"), "{tree}");
        assert!(tree.contains("stack_int"), "{tree}");
        assert!(tree.contains("integer \"5\""), "{tree}");
    }

    #[test]
    fn empty_input_is_an_empty_document() {
        let root = parse_tree("").expect("parse");
        let records = root.into_inner().filter(|p| p.as_rule() == Rule::record).count();
        assert_eq!(records, 0);
    }

    #[test]
    fn known_ptg_with_bad_operand_is_rejected() {
        let err = parse_tree("' 0006 000072 FORMULA : len=2 R1C1 ptgInt abc\n")
            .expect_err("ptgInt requires an integer");
        assert_eq!(err.line, 1);
        // The operand, not the keyword.
        assert_eq!(err.column, 43);
    }
}
