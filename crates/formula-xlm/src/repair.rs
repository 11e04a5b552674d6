//! Pre-parse repair of disassembler output.
//!
//! The upstream BIFF dumper prints string literals verbatim. Newlines inside a string split one
//! logical record over several physical lines, and embedded double quotes make the literal's
//! end ambiguous. Repair restores the one-record-per-line shape the grammar expects.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Separator written between the pieces of a string literal that was split across lines.
pub const JOIN_MARKER: &str = "\\n";

/// Entity that stands for `'` inside a re-quoted (single-quoted) string literal.
pub const APOS_ENTITY: &str = "&apos;";

fn record_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^' [0-9A-Fa-f]{4} +\d{1,6}(?: |$)").expect("valid regex"))
}

fn complete_record_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^' [0-9A-Fa-f]{4} +\d{1,6} +\S").expect("valid regex"))
}

fn string_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"Str "(.*?)"( ptg|\s*$)"#).expect("valid regex"))
}

/// Repair raw dump text so that every logical record sits on exactly one `\n`-terminated line.
///
/// Never fails; anything repair cannot make sense of is left for the grammar to reject.
pub fn repair_dump(raw: &str) -> String {
    let records = merge_split_records(raw.trim());

    let mut out = String::with_capacity(raw.len() + records.len());
    for record in records {
        if !complete_record_re().is_match(&record) {
            log::debug!("dropping record without a record type: {record:?}");
            continue;
        }
        out.push_str(&requote_strings(&record));
        out.push('\n');
    }
    out
}

/// Glue continuation lines onto the record they belong to.
fn merge_split_records(text: &str) -> Vec<String> {
    let mut records: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    // A lone CR breaks a line just like LF; CRLF is a single break.
    let text = text.replace("\r\n", "\n");
    for line in text.split(['\n', '\r']) {
        if record_start_re().is_match(line) {
            records.extend(current.replace(line.to_string()));
            continue;
        }

        match current.as_mut() {
            Some(record) => {
                record.push_str(JOIN_MARKER);
                record.push_str(line);
            }
            None if line.trim().is_empty() => {}
            None => log::debug!("dropping text before the first record: {line:?}"),
        }
    }

    records.extend(current);
    records
}

/// Rewrite `Str "…"` literals that contain `"` as `Str '…'`, escaping `'` as [`APOS_ENTITY`].
fn requote_strings(record: &str) -> String {
    string_literal_re()
        .replace_all(record, |caps: &Captures<'_>| {
            let text = &caps[1];
            if text.contains('"') {
                format!("Str '{}'{}", text.replace('\'', APOS_ENTITY), &caps[2])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}
