pub mod path_processing;
pub mod settings;
pub mod text_processing;

pub use path_processing::expand_tilde;
pub use settings::{HttpSettings, Settings, SettingsError, SmtpSettings, SmtpTls};
pub use text_processing::{redact_header_value, redact_sensitive};
