//! Network collaborators for the Workline engine.
//!
//! - [`ReqwestHttpClient`] performs the `api_call` step's requests
//! - [`SmtpMailer`] delivers the `send_email` step's messages through an SMTP relay
//!
//! Both are configured from [`workline_util::Settings`] and own their
//! timeouts; the engine awaits them without limits of its own.

mod http;
mod mail;

pub use http::ReqwestHttpClient;
pub use mail::SmtpMailer;
