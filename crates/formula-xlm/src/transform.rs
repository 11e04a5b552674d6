//! Parse tree to record/instruction conversion.

use pest::iterators::{Pair, Pairs};
use serde::{Deserialize, Serialize};

use crate::diagnostics::XlmSyntaxError;
use crate::grammar::{parse_tree, render_tree, Rule};
use crate::model::{CellAddress, StackItem, WHOLE_AXIS};
use crate::repair::APOS_ENTITY;
use crate::XlmParseOptions;

/// One record line of the dump.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DumpRecord {
    /// BIFF record id, as 4 hex digits.
    pub marker: String,
    pub offset: u32,
    /// Record type tag (`FORMULA`, `LABEL`, `BOUNDSHEET`, ...).
    pub line_type: String,
    pub payload: RecordPayload,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RecordPayload {
    Formula(FormulaPayload),
    /// Text following `Sheet Information`, without the leading ` - `.
    SheetInfo(String),
    /// Text following `Cell Value`.
    CellValue(String),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormulaPayload {
    pub address: CellAddress,
    pub items: Vec<StackItem>,
}

/// Parse repaired dump text (see [`crate::repair::repair_dump`]) into records.
pub fn parse_records(
    fixed: &str,
    opts: &XlmParseOptions,
) -> Result<Vec<DumpRecord>, XlmSyntaxError> {
    let root = parse_tree(fixed)?;
    if opts.debug {
        log::debug!("XLM parse tree:\n{}", render_tree(&root));
    }
    records_from_tree(root)
}

pub(crate) fn records_from_tree(root: Pair<'_, Rule>) -> Result<Vec<DumpRecord>, XlmSyntaxError> {
    root.into_inner()
        .filter(|pair| pair.as_rule() == Rule::record)
        .map(record)
        .collect()
}

fn record(pair: Pair<'_, Rule>) -> Result<DumpRecord, XlmSyntaxError> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();

    let marker = expect_child(&mut inner, Rule::marker, span)?.as_str().to_string();
    let offset_pair = expect_child(&mut inner, Rule::offset, span)?;
    let offset = offset_pair
        .as_str()
        .parse::<u32>()
        .map_err(|_| XlmSyntaxError::at_span(offset_pair.as_span(), "record offset out of range"))?;

    let body = inner
        .next()
        .ok_or_else(|| XlmSyntaxError::at_span(span, "record has no body"))?;
    let (line_type, payload) = match body.as_rule() {
        Rule::formula_record => ("FORMULA".to_string(), formula_record(body)?),
        Rule::other_record => other_record(body)?,
        rule => return Err(unexpected(&body, rule)),
    };

    Ok(DumpRecord {
        marker,
        offset,
        line_type,
        payload,
    })
}

fn formula_record(pair: Pair<'_, Rule>) -> Result<RecordPayload, XlmSyntaxError> {
    let span = pair.as_span();
    let cell_formula = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::cell_formula)
        .ok_or_else(|| XlmSyntaxError::at_span(span, "FORMULA record without a formula"))?;

    let mut address = None;
    let mut items = Vec::new();
    for child in cell_formula.into_inner() {
        match child.as_rule() {
            Rule::formula_label | Rule::formula_length => {}
            Rule::cell_location => {
                let span = child.as_span();
                let cell = expect_child(&mut child.into_inner(), Rule::cell, span)?;
                let resolved = cell_address(cell)?.ok_or_else(|| {
                    XlmSyntaxError::at_span(span, "FORMULA record with a relative cell address")
                })?;
                address = Some(resolved);
            }
            _ => items.push(stack_item(child)?),
        }
    }

    let address =
        address.ok_or_else(|| XlmSyntaxError::at_span(span, "FORMULA record without a cell"))?;
    Ok(RecordPayload::Formula(FormulaPayload { address, items }))
}

fn other_record(pair: Pair<'_, Rule>) -> Result<(String, RecordPayload), XlmSyntaxError> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let line_type = expect_child(&mut inner, Rule::line_type, span)?
        .as_str()
        .to_string();

    let payload = match inner.next() {
        None => RecordPayload::Text(String::new()),
        Some(body) if body.as_rule() == Rule::other_payload => {
            let body_span = body.as_span();
            let kind = body
                .into_inner()
                .next()
                .ok_or_else(|| XlmSyntaxError::at_span(body_span, "empty record payload"))?;
            match kind.as_rule() {
                Rule::sheet_info => {
                    let rest = rest_of_line(kind);
                    RecordPayload::SheetInfo(
                        rest.trim_start_matches(|c: char| c.is_whitespace() || c == '-')
                            .trim_end()
                            .to_string(),
                    )
                }
                Rule::cell_value => RecordPayload::CellValue(rest_of_line(kind).trim().to_string()),
                _ => RecordPayload::Text(printable(kind.as_str().trim_end())),
            }
        }
        Some(raw) => RecordPayload::Text(printable(raw.as_str().trim_end())),
    };

    Ok((line_type, payload))
}

fn rest_of_line(pair: Pair<'_, Rule>) -> String {
    let text = pair
        .into_inner()
        .next()
        .map(|rest| rest.as_str())
        .unwrap_or_default();
    printable(text)
}

fn stack_item(pair: Pair<'_, Rule>) -> Result<StackItem, XlmSyntaxError> {
    let span = pair.as_span();
    let rule = pair.as_rule();
    let mut inner = pair.into_inner();

    let item = match rule {
        Rule::stack_str => {
            let text = inner
                .next()
                .ok_or_else(|| XlmSyntaxError::at_span(span, "ptgStr without a string"))?;
            StackItem::Str(string_literal(&text))
        }
        Rule::stack_bool => {
            let value = expect_child(&mut inner, Rule::boolean, span)?;
            let text = value.as_str();
            StackItem::Bool(text.eq_ignore_ascii_case("true") || text == "1")
        }
        Rule::stack_int => StackItem::Int(integer(expect_child(&mut inner, Rule::integer, span)?)?),
        Rule::stack_num => match inner.next() {
            Some(value) => StackItem::from_decimal(decimal(value)?),
            None => {
                log::debug!("ptgNum without a value at {:?}", span.start_pos().line_col());
                StackItem::Unparsed
            }
        },

        Rule::stack_func_var => {
            let count = expect_child(&mut inner, Rule::integer, span)?;
            let count_span = count.as_span();
            let arg_count = u32::try_from(integer(count)?).map_err(|_| {
                XlmSyntaxError::at_span(count_span, "argument count out of range")
            })?;
            let name = expect_child(&mut inner, Rule::function_name, span)?;
            let opcode = expect_child(&mut inner, Rule::hex_number, span)?;
            StackItem::FuncVar {
                arg_count,
                name: name.as_str().to_string(),
                opcode: opcode.as_str().to_string(),
            }
        }
        Rule::stack_func => {
            let name = expect_child(&mut inner, Rule::function_name, span)?;
            StackItem::Func {
                name: name.as_str().to_string(),
                opcode: inner.next().map(|op| op.as_str().to_string()),
            }
        }

        Rule::stack_cell_ref => {
            let cell = expect_child(&mut inner, Rule::cell, span)?;
            cell_address(cell)?.map_or_else(|| relative_reference(span), StackItem::CellRef)
        }
        Rule::stack_area => area(expect_child(&mut inner, Rule::cell_area, span)?)?,
        Rule::stack_area_3d => StackItem::Area3d,
        Rule::stack_exp => {
            let cell = expect_child(&mut inner, Rule::cell, span)?;
            cell_address(cell)?.map_or_else(|| relative_reference(span), StackItem::Exp)
        }

        Rule::stack_namex => {
            let sheet = expect_child(&mut inner, Rule::name_operand, span)?;
            let name = expect_child(&mut inner, Rule::name_operand, span)?;
            StackItem::NameX {
                sheet: sheet.as_str().to_string(),
                name: name.as_str().to_string(),
            }
        }
        Rule::stack_namev => StackItem::NameV,
        Rule::stack_name => StackItem::Name {
            name: expect_child(&mut inner, Rule::name_operand, span)?
                .as_str()
                .to_string(),
        },

        Rule::stack_add => StackItem::Add,
        Rule::stack_sub => StackItem::Sub,
        Rule::stack_mul => StackItem::Mul,
        Rule::stack_div => StackItem::Div,
        Rule::stack_power => StackItem::Power,
        Rule::stack_concat => StackItem::Concat,
        Rule::stack_less_than => StackItem::LessThan,
        Rule::stack_less_equal => StackItem::LessEqual,
        Rule::stack_equal => StackItem::Equal,
        Rule::stack_greater_equal => StackItem::GreaterEqual,
        Rule::stack_greater_than => StackItem::GreaterThan,
        Rule::stack_not_equal => StackItem::NotEqual,
        Rule::stack_uplus => StackItem::UnaryPlus,
        Rule::stack_uminus => StackItem::UnaryMinus,
        Rule::stack_percent => StackItem::Percent,
        Rule::stack_paren => StackItem::Paren,
        Rule::stack_range => StackItem::Range,
        Rule::stack_missing_arg => StackItem::MissingArg,

        Rule::stack_array => StackItem::Array,
        Rule::stack_attr => StackItem::Attr,
        Rule::stack_mem_func => StackItem::MemFunc,
        Rule::stack_mem_area => StackItem::MemArea,
        Rule::stack_mem_error => StackItem::MemError,
        Rule::stack_mem_no_mem => StackItem::MemNoMem,
        Rule::stack_ref_error => StackItem::RefError,
        Rule::stack_area_error => StackItem::AreaError,
        Rule::stack_end_sheet => StackItem::EndSheet,

        _ => {
            log::debug!("no instruction for token {:?}", span.as_str());
            StackItem::Unparsed
        }
    };
    Ok(item)
}

fn relative_reference(span: pest::Span<'_>) -> StackItem {
    log::debug!("relative reference {:?} has no anchor cell", span.as_str());
    StackItem::Unparsed
}

fn area(pair: Pair<'_, Rule>) -> Result<StackItem, XlmSyntaxError> {
    let span = pair.as_span();
    let endpoints = pair
        .into_inner()
        .map(area_endpoint)
        .collect::<Result<Vec<_>, _>>()?;
    let item = match endpoints.as_slice() {
        [Some(first)] => StackItem::CellRef(*first),
        [Some(first), Some(last)] => StackItem::Area {
            first: *first,
            last: *last,
        },
        [] => return Err(XlmSyntaxError::at_span(span, "area without endpoints")),
        _ => relative_reference(span),
    };
    Ok(item)
}

/// `None` when an axis is a relative offset.
fn area_endpoint(pair: Pair<'_, Rule>) -> Result<Option<CellAddress>, XlmSyntaxError> {
    let span = pair.as_span();
    match pair.as_rule() {
        Rule::cell => cell_address(pair),
        Rule::cell_area_row => {
            let row = axis(expect_child(&mut pair.into_inner(), Rule::axis, span)?)?;
            Ok(row.map(CellAddress::whole_row))
        }
        Rule::cell_area_col => {
            let col = axis(expect_child(&mut pair.into_inner(), Rule::axis, span)?)?;
            Ok(col.map(CellAddress::whole_col))
        }
        rule => Err(unexpected(&pair, rule)),
    }
}

/// `None` when either axis is a relative offset.
fn cell_address(pair: Pair<'_, Rule>) -> Result<Option<CellAddress>, XlmSyntaxError> {
    let span = pair.as_span();
    let mut inner = pair.into_inner();
    let row = axis(expect_child(&mut inner, Rule::axis, span)?)?;
    let col = axis(expect_child(&mut inner, Rule::axis, span)?)?;
    Ok(row.zip(col).map(|(row, col)| CellAddress::new(row, col)))
}

/// One coordinate, or `None` for a `~N` relative offset.
///
/// Offsets cannot be resolved without the anchor cell, which the dump does not print. A bare
/// `~` means the whole row/column.
fn axis(pair: Pair<'_, Rule>) -> Result<Option<i64>, XlmSyntaxError> {
    let mut relative = false;
    let mut value = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::relative_marker => relative = true,
            Rule::integer => value = Some(integer(part)?),
            _ => {}
        }
    }
    Ok(match (relative, value) {
        (true, Some(_)) => None,
        (_, Some(value)) => Some(value),
        (_, None) => Some(WHOLE_AXIS),
    })
}

fn integer(pair: Pair<'_, Rule>) -> Result<i64, XlmSyntaxError> {
    pair.as_str()
        .parse::<i64>()
        .map_err(|_| XlmSyntaxError::at_span(pair.as_span(), "integer out of range"))
}

fn decimal(pair: Pair<'_, Rule>) -> Result<f64, XlmSyntaxError> {
    pair.as_str()
        .parse::<f64>()
        .map_err(|_| XlmSyntaxError::at_span(pair.as_span(), "invalid number"))
}

fn string_literal(pair: &Pair<'_, Rule>) -> String {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::sq_text => printable(&text.replace(APOS_ENTITY, "'")),
        _ => printable(text),
    }
}

/// Strip undecodable input: once a replacement character is present only printable ASCII
/// survives.
fn printable(text: &str) -> String {
    if !text.contains(char::REPLACEMENT_CHARACTER) {
        return text.to_string();
    }
    text.chars()
        .filter(|c| c.is_ascii_graphic() || matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'))
        .collect()
}

fn expect_child<'i>(
    pairs: &mut Pairs<'i, Rule>,
    rule: Rule,
    parent: pest::Span<'i>,
) -> Result<Pair<'i, Rule>, XlmSyntaxError> {
    match pairs.next() {
        Some(pair) if pair.as_rule() == rule => Ok(pair),
        Some(pair) => Err(unexpected(&pair, pair.as_rule())),
        None => Err(XlmSyntaxError::at_span(parent, format!("missing {rule:?}"))),
    }
}

fn unexpected(pair: &Pair<'_, Rule>, rule: Rule) -> XlmSyntaxError {
    XlmSyntaxError::at_span(pair.as_span(), format!("unexpected {rule:?}"))
}
