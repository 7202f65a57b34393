use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::error::ClientError;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// JSON body for a failed command; client errors also carry their kind and HTTP status
pub fn error_json(err: &anyhow::Error) -> Value {
    match err.downcast_ref::<ClientError>() {
        Some(client) => {
            let mut response = json!({
                "success": false,
                "error": client.user_message(),
                "error_code": client.code(),
            });
            if let Some(status) = client.status() {
                response["status"] = json!(status);
            }
            response
        }
        None => json!({ "success": false, "error": err.to_string() }),
    }
}

/// Reports a failed command: JSON on stdout, text on stderr
pub fn output_error(output_format: &OutputFormat, err: &anyhow::Error, verbose: bool) {
    match output_format {
        OutputFormat::Json => {
            let response = error_json(err);
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_string()));
        }
        OutputFormat::Text if verbose => eprintln!("Error: {err:?}"),
        OutputFormat::Text => eprintln!("Error: {err}"),
    }
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: [] }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Fixed-width text table; cells longer than `max_width` are cut with an ellipsis
pub fn render_table(headers: &[String], rows: &[Vec<String>], max_width: usize) -> String {
    let clip = |s: &str| -> String {
        if s.chars().count() > max_width {
            let cut: String = s.chars().take(max_width.saturating_sub(1)).collect();
            format!("{}…", cut)
        } else {
            s.to_string()
        }
    };
    let headers: Vec<String> = headers.iter().map(|h| clip(h)).collect();
    let rows: Vec<Vec<String>> = rows.iter().map(|r| r.iter().map(|c| clip(c)).collect()).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(&headers)];
    out.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    out.extend(rows.iter().map(|r| line(r)));
    out.join("\n")
}

/// Display form of a field value
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.replace('\n', " "),
        Some(Value::Bool(b)) => (if *b { "yes" } else { "no" }).to_string(),
        Some(other) => other.to_string(),
    }
}
