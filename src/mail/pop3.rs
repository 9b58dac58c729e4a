//! Blocking POP3 session over any `Read + Write` transport (RFC 1939).
//!
//! A session is opened per operation and always closed: [`Pop3Session`] sends
//! `QUIT` when dropped, so early returns and `?` cannot leak a connection.

use log::debug;
use native_tls::TlsConnector;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use crate::config::{Credentials, Endpoint};
use crate::domain::email::EmailId;
use crate::error::{MailError, Result};

/// Opens the byte stream a session runs over.
pub trait MailboxConnector {
    type Stream: Read + Write;

    fn open(&self) -> Result<Self::Stream>;
}

/// Implicit-TLS connector for a fixed mailbox endpoint.
pub struct TlsMailboxConnector {
    endpoint: Endpoint,
}

impl TlsMailboxConnector {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

impl MailboxConnector for TlsMailboxConnector {
    type Stream = native_tls::TlsStream<TcpStream>;

    fn open(&self) -> Result<Self::Stream> {
        debug!("connecting to {}", self.endpoint);
        let tls = TlsConnector::builder().build()?;
        let tcp = TcpStream::connect((self.endpoint.host.as_str(), self.endpoint.port))
            .map_err(|e| MailError::Connection(format!("{}: {e}", self.endpoint)))?;
        tls.connect(self.endpoint.host.as_str(), tcp)
            .map_err(|e| MailError::Connection(format!("TLS handshake with {}: {e}", self.endpoint)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Authenticated,
}

enum Reply {
    Ok(String),
    Err(String),
}

pub struct Pop3Session<S: Read + Write> {
    stream: BufReader<S>,
    state: SessionState,
}

impl<S: Read + Write> Pop3Session<S> {
    /// Reads the server greeting from a freshly opened stream.
    pub fn connect(stream: S) -> Result<Self> {
        let mut session = Self {
            stream: BufReader::new(stream),
            state: SessionState::Connected,
        };
        match session.read_reply()? {
            Reply::Ok(greeting) => {
                debug!("server greeting: {greeting}");
                Ok(session)
            }
            Reply::Err(msg) => {
                session.state = SessionState::Disconnected;
                Err(MailError::Connection(format!("server refused session: {msg}")))
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn authenticate(&mut self, creds: &Credentials) -> Result<()> {
        self.expect_state(SessionState::Connected)?;

        if let Reply::Err(msg) = self.command(&format!("USER {}", creds.user))? {
            return Err(MailError::Auth(format!("USER rejected: {msg}")));
        }
        debug!("C: PASS <redacted>");
        self.send_line(&format!("PASS {}", creds.password))?;
        if let Reply::Err(msg) = self.read_reply()? {
            return Err(MailError::Auth(format!("PASS rejected: {msg}")));
        }

        self.state = SessionState::Authenticated;
        debug!("authenticated as {}", creds.user);
        Ok(())
    }

    /// Ids of every message in the maildrop, in server order.
    pub fn list_ids(&mut self) -> Result<Vec<EmailId>> {
        self.expect_state(SessionState::Authenticated)?;
        if let Reply::Err(msg) = self.command("LIST")? {
            return Err(MailError::Protocol(format!("LIST failed: {msg}")));
        }
        let body = self.read_multiline()?;
        String::from_utf8_lossy(&body)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                l.split_whitespace()
                    .next()
                    .and_then(|n| n.parse::<EmailId>().ok())
                    .ok_or_else(|| MailError::Protocol(format!("bad LIST line: {l}")))
            })
            .collect()
    }

    /// Header block only (`TOP id 0`).
    pub fn fetch_header(&mut self, id: EmailId) -> Result<Vec<u8>> {
        self.fetch(id, &format!("TOP {id} 0"))
    }

    /// Complete message (`RETR id`).
    pub fn fetch_full(&mut self, id: EmailId) -> Result<Vec<u8>> {
        self.fetch(id, &format!("RETR {id}"))
    }

    /// Sends `QUIT` once. Safe to call repeatedly; never fails.
    pub fn disconnect(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }
        self.state = SessionState::Disconnected;
        if let Err(e) = self.send_line("QUIT") {
            debug!("QUIT not delivered: {e}");
            return;
        }
        let mut line = Vec::new();
        if let Err(e) = self.stream.read_until(b'\n', &mut line) {
            debug!("no reply to QUIT: {e}");
        }
    }

    fn fetch(&mut self, id: EmailId, cmd: &str) -> Result<Vec<u8>> {
        self.expect_state(SessionState::Authenticated)?;
        if id == 0 {
            return Err(MailError::MessageNotFound(id));
        }
        match self.command(cmd)? {
            Reply::Ok(_) => self.read_multiline(),
            Reply::Err(msg) => {
                debug!("message {id} rejected: {msg}");
                Err(MailError::MessageNotFound(id))
            }
        }
    }

    fn expect_state(&self, wanted: SessionState) -> Result<()> {
        if self.state == wanted {
            Ok(())
        } else {
            Err(MailError::Protocol(format!(
                "session is {:?}, expected {:?}",
                self.state, wanted
            )))
        }
    }

    fn command(&mut self, cmd: &str) -> Result<Reply> {
        debug!("C: {cmd}");
        self.send_line(cmd)?;
        self.read_reply()
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        let inner = self.stream.get_mut();
        inner.write_all(line.as_bytes())?;
        inner.write_all(b"\r\n")?;
        inner.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let n = self.stream.read_until(b'\n', &mut line)?;
        if n == 0 {
            self.state = SessionState::Disconnected;
            return Err(MailError::Connection("server closed the connection".into()));
        }
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        Ok(line)
    }

    fn read_reply(&mut self) -> Result<Reply> {
        let line = self.read_line()?;
        let line = String::from_utf8_lossy(&line).into_owned();
        if let Some(rest) = line.strip_prefix("+OK") {
            Ok(Reply::Ok(rest.trim().to_string()))
        } else if let Some(rest) = line.strip_prefix("-ERR") {
            Ok(Reply::Err(rest.trim().to_string()))
        } else {
            Err(MailError::Protocol(line))
        }
    }

    /// Reads up to the lone `.` terminator, undoing byte-stuffing. Lines are
    /// re-joined with CRLF.
    fn read_multiline(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let line = self.read_line()?;
            if line == b"." {
                break;
            }
            let content = match line.strip_prefix(b".") {
                Some(rest) => rest,
                None => &line[..],
            };
            out.extend_from_slice(content);
            out.extend_from_slice(b"\r\n");
        }
        Ok(out)
    }
}

impl<S: Read + Write> Drop for Pop3Session<S> {
    fn drop(&mut self) {
        if self.state != SessionState::Disconnected {
            debug!("closing POP3 session");
            self.disconnect();
        }
    }
}
