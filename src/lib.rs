pub mod config;
pub mod documents;
pub mod domain;
pub mod error;
pub mod mail;

pub use config::{Config, Credentials, Endpoint};
pub use domain::email::{EmailDetail, EmailId, EmailSummary};
pub use error::{ErrorKind, MailError, Result};
pub use mail::client::MailboxClient;
pub use mail::sender::Sender;
