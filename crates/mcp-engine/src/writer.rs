//! Response writer
//!
//! Sole owner of the output stream. Each response becomes one line that is
//! written in a single call and flushed before `write` returns.

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::protocol::Response;

pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write(&mut self, response: &Response) -> Result<()> {
        let mut line = serde_json::to_string(response).context("Failed to serialize response")?;
        debug!("Sending: {}", line);

        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to write response")?;
        self.writer
            .flush()
            .await
            .context("Failed to flush response")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestId;
    use serde_json::json;

    #[tokio::test]
    async fn test_one_line_per_response_in_order() {
        let mut output = Vec::new();
        let mut writer = ResponseWriter::new(&mut output);
        writer
            .write(&Response::success(RequestId::number(1), json!({"a": "x\ny"})))
            .await
            .unwrap();
        writer
            .write(&Response::success(RequestId::number(2), json!({})))
            .await
            .unwrap();

        drop(writer);
        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert!(output.ends_with('\n'));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"jsonrpc":"2.0","id":1,"result":{"a":"x\ny"}}"#);
        assert_eq!(lines[1], r#"{"jsonrpc":"2.0","id":2,"result":{}}"#);
    }
}
