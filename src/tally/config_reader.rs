use log::debug;
use score_ledger::ColumnNames;
use snafu::prelude::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use std::fs;

use crate::tally::{OpeningJsonSnafu, ParsingJsonSnafu, TallyResult};

/// Header overrides. Missing entries keep the default header.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnsConfig {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub identifier: Option<String>,
    pub score: Option<String>,
    pub total: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(rename = "inputDirectory")]
    pub input_directory: Option<String>,
    #[serde(rename = "filePrefix")]
    pub file_prefix: Option<String>,
    #[serde(rename = "fileSuffix")]
    pub file_suffix: Option<String>,
    #[serde(rename = "outputFile")]
    pub output_file: Option<String>,
    #[serde(rename = "worksheetName")]
    pub worksheet_name: Option<String>,
    #[serde(rename = "sheetTitle")]
    pub sheet_title: Option<String>,
    pub columns: Option<ColumnsConfig>,
}

impl TallyConfig {
    pub fn column_names(&self) -> ColumnNames {
        let default = ColumnNames::default();
        let c = self.columns.clone().unwrap_or_default();
        ColumnNames {
            name: c.name.unwrap_or(default.name),
            contact: c.contact.unwrap_or(default.contact),
            identifier: c.identifier.unwrap_or(default.identifier),
            score: c.score.unwrap_or(default.score),
            total: c.total.unwrap_or(default.total),
        }
    }
}

pub fn read_config(path: &str) -> TallyResult<TallyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: TallyConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Reads a summary previously exported in JSON.
pub fn read_summary(path: &str) -> TallyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_keys_are_optional() {
        let config: TallyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TallyConfig::default());
        assert_eq!(config.column_names(), ColumnNames::default());
    }

    #[test]
    fn reads_camel_case_keys() {
        let config: TallyConfig = serde_json::from_str(
            r#"{"filePrefix": "Week", "worksheetName": "Scores", "columns": {"name": "Name"}}"#,
        )
        .unwrap();
        assert_eq!(config.file_prefix.as_deref(), Some("Week"));
        assert_eq!(config.worksheet_name.as_deref(), Some("Scores"));
        let columns = config.column_names();
        assert_eq!(columns.name, "Name");
        assert_eq!(columns.contact, ColumnNames::default().contact);
    }
}
