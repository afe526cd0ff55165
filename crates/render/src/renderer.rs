use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use workline_engine::{FormDocument, RenderError, TemplateRenderer};

use crate::form::PdfForm;

/// Loads templates from and stores rendered files in one directory.
#[derive(Debug, Clone)]
pub struct PdfFormRenderer {
    files_dir: PathBuf,
}

impl PdfFormRenderer {
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
        }
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Joins `name` onto the files directory. Absolute names and names that
    /// climb out of the directory are refused.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let stays_inside = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        (stays_inside && !name.trim().is_empty()).then(|| self.files_dir.join(relative))
    }
}

#[async_trait]
impl TemplateRenderer for PdfFormRenderer {
    async fn load(&self, template: &str) -> Result<Box<dyn FormDocument>, RenderError> {
        let path = self
            .resolve(template)
            .ok_or_else(|| RenderError::TemplateNotFound(template.to_string()))?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::TemplateNotFound(path.display().to_string()));
            }
            Err(error) => return Err(RenderError::Io(error)),
        };
        debug!(template = %path.display(), size = bytes.len(), "loaded pdf template");
        Ok(Box::new(PdfForm::from_bytes(&bytes)?))
    }

    async fn store(&self, destination: &str, bytes: Vec<u8>) -> Result<(), RenderError> {
        let path = self
            .resolve(destination)
            .ok_or_else(|| RenderError::Malformed(format!("invalid output file name '{destination}'")))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(file = %path.display(), "stored rendered pdf");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::tests::sample_form_bytes;

    #[test]
    fn names_outside_the_files_directory_are_refused() {
        let renderer = PdfFormRenderer::new("/srv/files");
        assert_eq!(renderer.resolve("forms/a.pdf"), Some(PathBuf::from("/srv/files/forms/a.pdf")));
        assert_eq!(renderer.resolve("../secrets.pdf"), None);
        assert_eq!(renderer.resolve("/etc/passwd"), None);
        assert_eq!(renderer.resolve(""), None);
    }

    #[tokio::test]
    async fn renders_template_into_files_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("welcome.pdf"), sample_form_bytes()).unwrap();
        let renderer = PdfFormRenderer::new(temp_dir.path());

        let mut form = renderer.load("welcome.pdf").await.unwrap();
        form.set_text_field("first_name", "Ada").unwrap();
        form.flatten().unwrap();
        let bytes = form.save().unwrap();
        renderer.store("1700000000000_customer.pdf", bytes).await.unwrap();

        let stored = std::fs::read(temp_dir.path().join("1700000000000_customer.pdf")).unwrap();
        let reloaded = PdfForm::from_bytes(&stored).unwrap();
        assert_eq!(reloaded.text_value("first_name").as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn missing_templates_are_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let renderer = PdfFormRenderer::new(temp_dir.path());
        let error = renderer.load("absent.pdf").await.err().expect("load fails");
        assert!(matches!(error, RenderError::TemplateNotFound(_)));
    }
}
