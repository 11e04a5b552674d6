use formula_xlm::{parse_xlm_dump, FormulaGrid, XlmParseOptions};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn grid_serializes_as_nested_row_col_map() {
    let dump = concat!(
        "' 0006 000072 FORMULA : len=2 R1C1 ptgInt 5\n",
        "' 0006 000072 FORMULA : len=8 R2C3 ptgArea C1:C2 ptgFuncVar args 1 func SUM (0x0004)\n",
    );
    let grid = parse_xlm_dump(dump, &XlmParseOptions::default()).into_grid();

    let value = serde_json::to_value(&grid).expect("serialize grid");
    assert_eq!(
        value,
        json!({
            "1": {
                "1": {
                    "address": {"row": 1, "col": 1},
                    "items": [{"type": "int", "value": 5}]
                }
            },
            "2": {
                "3": {
                    "address": {"row": 2, "col": 3},
                    "items": [
                        {
                            "type": "area",
                            "value": {
                                "first": {"row": -1, "col": 1},
                                "last": {"row": -1, "col": 2}
                            }
                        },
                        {
                            "type": "func_var",
                            "value": {"arg_count": 1, "name": "SUM", "opcode": "0x0004"}
                        }
                    ]
                }
            }
        })
    );

    let back: FormulaGrid = serde_json::from_value(value).expect("deserialize grid");
    assert_eq!(back, grid);
}
