//! PDF form templates for the `create_pdf` step.
//!
//! [`PdfFormRenderer`] reads AcroForm templates from a files directory and
//! writes rendered documents back to it. [`PdfForm`] fills text fields by
//! their fully qualified name.

mod form;
mod renderer;

pub use form::PdfForm;
pub use renderer::PdfFormRenderer;
