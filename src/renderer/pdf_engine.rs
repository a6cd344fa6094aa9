// src/renderer/pdf_engine.rs
//! HTML to PDF conversion through an external program.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::app_log;
use crate::error::{CvResult, CvToolError};

#[async_trait]
pub trait PdfEngine: Send + Sync {
    async fn html_to_pdf(&self, html: &str) -> CvResult<Vec<u8>>;
}

/// Runs `program args...` with the HTML on stdin and reads the PDF from
/// stdout, e.g. `weasyprint - -`.
pub struct CommandPdfEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPdfEngine {
    pub fn new(command_line: &[String], timeout: Duration) -> anyhow::Result<Self> {
        let (program, args) = command_line
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("PDF renderer command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl PdfEngine for CommandPdfEngine {
    async fn html_to_pdf(&self, html: &str) -> CvResult<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CvToolError::Render(format!(
                    "Failed to start PDF renderer '{}': {}",
                    self.program, e
                ))
            })?;

        // Feed stdin while draining stdout/stderr, or a renderer that streams
        // output before reading all input fills the pipes and never exits.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(html.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let (fed, output) = tokio::time::timeout(self.timeout, async {
            tokio::join!(feed, child.wait_with_output())
        })
        .await
        .map_err(|_| {
            CvToolError::Render(format!(
                "PDF renderer timed out after {}s",
                self.timeout.as_secs()
            ))
        })?;
        let output = output.map_err(|e| CvToolError::Render(format!("PDF renderer failed: {}", e)))?;
        if let Err(e) = fed {
            app_log!(warn, "PDF renderer did not take all of its input: {}", e);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            app_log!(error, "PDF renderer exited with {}: {}", output.status, stderr.trim());
            return Err(CvToolError::Render(format!(
                "PDF renderer exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or("").trim()
            )));
        }

        if !output.stdout.starts_with(b"%PDF") {
            return Err(CvToolError::Render(
                "PDF renderer produced no PDF output".to_string(),
            ));
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Wraps the HTML in a fake PDF header so tests can inspect it.
    #[derive(Default)]
    pub struct EchoPdfEngine {
        pub rendered: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl EchoPdfEngine {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PdfEngine for EchoPdfEngine {
        async fn html_to_pdf(&self, html: &str) -> CvResult<Vec<u8>> {
            if self.fail {
                return Err(CvToolError::Render("cannot load library 'pango-1.0-0'".to_string()));
            }
            self.rendered.lock().unwrap().push(html.to_string());
            Ok(format!("%PDF-1.7\n{}", html).into_bytes())
        }
    }
}
