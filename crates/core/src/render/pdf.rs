//! HTML to PDF conversion through an external `wkhtmltopdf` binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::RenderFailure;

#[derive(Clone, Debug)]
pub struct PdfConverter {
    binary: PathBuf,
}

impl PdfConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    /// Finds `wkhtmltopdf` on `PATH`.
    pub fn locate() -> Option<Self> {
        which::which("wkhtmltopdf").ok().map(Self::new)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub async fn convert(&self, html: &str) -> Result<Vec<u8>, RenderFailure> {
        let temp_dir = std::env::temp_dir();
        let job = Uuid::new_v4();
        let html_path = temp_dir.join(format!("quotation_{job}.html"));
        let pdf_path = temp_dir.join(format!("quotation_{job}.pdf"));

        tokio::fs::write(&html_path, html)
            .await
            .map_err(|error| RenderFailure::Render(format!("could not stage html: {error}")))?;

        let result = self.run(&html_path, &pdf_path).await;

        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;

        if let Ok(bytes) = &result {
            info!(size = bytes.len(), "pdf generated");
        }
        result
    }

    async fn run(&self, html_path: &Path, pdf_path: &Path) -> Result<Vec<u8>, RenderFailure> {
        let output = Command::new(&self.binary)
            .args(["--page-size", "A4"])
            .args(["--margin-top", "10mm", "--margin-bottom", "10mm"])
            .args(["--margin-left", "10mm", "--margin-right", "10mm"])
            .args(["--encoding", "utf-8", "--quiet"])
            .arg(html_path)
            .arg(pdf_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|error| RenderFailure::Render(format!("could not run wkhtmltopdf: {error}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(stderr = %stderr, "wkhtmltopdf failed");
            return Err(RenderFailure::Render(format!("wkhtmltopdf failed: {}", stderr.trim())));
        }

        tokio::fs::read(pdf_path)
            .await
            .map_err(|error| RenderFailure::Render(format!("could not read pdf output: {error}")))
    }
}
