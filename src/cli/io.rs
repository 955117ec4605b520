//! JSON output for the CLI
//!
//! One JSON object per invocation on stdout, UTF-8.

use std::io::{self, Write};

use serde_json::{json, Value};

use super::errors::CliResult;

fn write_line<W: Write>(writer: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn success(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

pub fn failure(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&mut io::stdout(), &success(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&mut io::stdout(), &failure(code, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes() {
        let ok = success(json!({"nodes": 3}));
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["data"]["nodes"], 3);

        let err = failure("NEST_NOT_FOUND", "node x not found");
        assert_eq!(err["status"], "error");
        assert_eq!(err["code"], "NEST_NOT_FOUND");
    }

    #[test]
    fn test_one_line_per_response() {
        let mut buffer = Vec::new();
        write_line(&mut buffer, &success(json!(null))).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
    }
}
