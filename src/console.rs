//! Console sink writing formatted lines to stdout.

use crate::core::ConsoleSink;
use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;

/// Writes each line to stdout and flushes immediately.
#[derive(Debug, Default, Clone)]
pub struct StdoutConsole;

#[async_trait]
impl ConsoleSink for StdoutConsole {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()?;
        Ok(())
    }
}
