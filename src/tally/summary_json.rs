use log::{info, warn};
use score_ledger::SummaryTable;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::prelude::*;
use text_diff::print_diff;

use std::fs;

use crate::tally::config_reader::read_summary;
use crate::tally::{ParsingJsonSnafu, ReferenceMismatchSnafu, TallyResult, WritingJsonSnafu};

pub fn summary_to_json(table: &SummaryTable) -> JSValue {
    let mut rows: Vec<JSValue> = Vec::new();
    for row in table.rows.iter() {
        let mut scores: JSMap<String, JSValue> = JSMap::new();
        for (period, score) in table.periods.iter().zip(row.scores.iter()) {
            scores.insert(period.to_string(), json!(score));
        }
        rows.push(json!({
            "name": row.participant.display_name_or_unknown(),
            "contact": row.participant.contact,
            "id": row.participant.id,
            "scores": scores,
            "total": row.total,
        }));
    }
    json!({ "columns": table.header(), "rows": rows })
}

/// Writes the JSON export of the summary to a file, or to the standard output for `stdout`.
pub fn write_summary_json(table: &SummaryTable, out: &str) -> TallyResult<()> {
    let pretty_js = serde_json::to_string_pretty(&summary_to_json(table)).context(ParsingJsonSnafu {})?;
    if out == "stdout" {
        println!("{}", pretty_js);
    } else {
        fs::write(out, pretty_js).context(WritingJsonSnafu { path: out })?;
        info!("Summary exported to {}", out);
    }
    Ok(())
}

/// Compares the summary with a reference JSON export, and prints the differences.
pub fn check_reference(table: &SummaryTable, reference_path: &str) -> TallyResult<()> {
    let pretty_js = serde_json::to_string_pretty(&summary_to_json(table)).context(ParsingJsonSnafu {})?;
    let reference = read_summary(reference_path)?;
    let pretty_js_ref = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    if pretty_js_ref != pretty_js {
        warn!("Found differences with the reference summary {}", reference_path);
        print_diff(pretty_js_ref.as_str(), pretty_js.as_str(), "\n");
        return ReferenceMismatchSnafu {
            path: reference_path,
        }
        .fail();
    }
    info!("The summary matches the reference {}", reference_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use score_ledger::builder::Builder;
    use score_ledger::ColumnNames;

    #[test]
    fn exports_rows_in_rank_order() {
        let table = Builder::new()
            .add_score("S1", "100", Some("A"), 50.0)
            .add_score("S2", "101", Some("B"), 70.0)
            .build()
            .build_summary(&ColumnNames::default());
        let js = summary_to_json(&table);
        assert_eq!(
            js["columns"],
            json!(["年级专业班级姓名", "手机号码", "学号", "S1", "S2", "总分"])
        );
        assert_eq!(
            js["rows"][0],
            json!({
                "name": "B",
                "contact": null,
                "id": "101",
                "scores": {"S1": 0.0, "S2": 70.0},
                "total": 70.0
            })
        );
        assert_eq!(js["rows"][1]["id"], "100");
    }
}
