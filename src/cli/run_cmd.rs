//! `binop run`: invoke every registered plugin

use serde::Serialize;

use super::output::Output;
use crate::plugin::{InvocationRow, PluginHost};

/// One line of `run` output
#[derive(Debug, Serialize)]
struct RunRow<'a> {
    lhs: f64,
    rhs: f64,
    #[serde(flatten)]
    row: InvocationRow<'a>,
}

pub fn run(host: &PluginHost, output: &Output, lhs: f64, rhs: f64) {
    let invocation = host.run_all(lhs, rhs);
    let rows = invocation.rows();

    if output.is_json() {
        let rows: Vec<_> = rows.into_iter().map(|row| RunRow { lhs, rhs, row }).collect();
        output.data(&rows);
        return;
    }

    let (lhs_text, rhs_text) = (lhs.to_string(), rhs.to_string());
    for row in &rows {
        output.row(&[&lhs_text, row.name, &rhs_text, "=", &result_text(row)]);
    }
}

/// Text rendering of one result slot
fn result_text(row: &InvocationRow<'_>) -> String {
    match (row.result, &row.error) {
        (Some(value), _) => value.to_string(),
        (None, Some(error)) => format!("error: {}", error),
        (None, None) => "error: no result".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_text_renders_value_or_error() {
        let ok = InvocationRow {
            name: "Division",
            result: Some(0.2),
            error: None,
        };
        assert_eq!(result_text(&ok), "0.2");

        let failed = InvocationRow {
            name: "Division",
            result: None,
            error: Some("result is not a finite number: inf".to_string()),
        };
        assert_eq!(result_text(&failed), "error: result is not a finite number: inf");
    }

    #[test]
    fn json_row_flattens_invocation_row() {
        let row = RunRow {
            lhs: 10.0,
            rhs: 50.0,
            row: InvocationRow {
                name: "Addition",
                result: Some(60.0),
                error: None,
            },
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["name"], "Addition");
        assert_eq!(json["lhs"], 10.0);
        assert_eq!(json["rhs"], 50.0);
        assert_eq!(json["result"], 60.0);
        assert!(json.get("error").is_none());
    }
}
