pub mod attachments;
pub mod body;
pub mod client;
pub mod decoders;
pub mod mime;
pub mod pop3;
pub mod sender;

#[cfg(test)]
pub(crate) mod testing;
