//! In-memory POP3 server for tests. Each stream speaks the protocol against a
//! shared mailbox and records how many times `QUIT` arrived.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::error::{MailError, Result};
use crate::mail::pop3::MailboxConnector;

#[derive(Default)]
struct State {
    user: String,
    password: String,
    messages: Vec<Vec<u8>>,
    broken_headers: BTreeSet<usize>,
    refuse_greeting: bool,
    unreachable: bool,
    quits: usize,
    sessions: usize,
}

#[derive(Clone, Default)]
pub struct FakeMailbox {
    state: Rc<RefCell<State>>,
}

impl FakeMailbox {
    pub fn new(user: &str, password: &str) -> Self {
        let mailbox = Self::default();
        {
            let mut st = mailbox.state.borrow_mut();
            st.user = user.to_string();
            st.password = password.to_string();
        }
        mailbox
    }

    pub fn with_message(self, raw: impl AsRef<[u8]>) -> Self {
        self.state.borrow_mut().messages.push(raw.as_ref().to_vec());
        self
    }

    /// `TOP` for this 1-based id answers `-ERR`.
    pub fn with_broken_header(self, id: usize) -> Self {
        self.state.borrow_mut().broken_headers.insert(id);
        self
    }

    pub fn refuse_greeting(self) -> Self {
        self.state.borrow_mut().refuse_greeting = true;
        self
    }

    pub fn unreachable(self) -> Self {
        self.state.borrow_mut().unreachable = true;
        self
    }

    pub fn stream(&self) -> ScriptedStream {
        let mut st = self.state.borrow_mut();
        st.sessions += 1;
        let greeting: &[u8] = if st.refuse_greeting {
            b"-ERR server busy\r\n"
        } else {
            b"+OK POP3 ready\r\n"
        };
        ScriptedStream {
            state: Rc::clone(&self.state),
            pending: Vec::new(),
            output: greeting.iter().copied().collect(),
            user_seen: false,
            authed: false,
        }
    }

    pub fn quit_count(&self) -> usize {
        self.state.borrow().quits
    }

    pub fn quit_received(&self) -> bool {
        self.quit_count() > 0
    }

    pub fn session_count(&self) -> usize {
        self.state.borrow().sessions
    }
}

impl MailboxConnector for FakeMailbox {
    type Stream = ScriptedStream;

    fn open(&self) -> Result<ScriptedStream> {
        if self.state.borrow().unreachable {
            return Err(MailError::Connection("connection refused".into()));
        }
        Ok(self.stream())
    }
}

pub struct ScriptedStream {
    state: Rc<RefCell<State>>,
    pending: Vec<u8>,
    output: VecDeque<u8>,
    user_seen: bool,
    authed: bool,
}

impl ScriptedStream {
    fn reply(&mut self, line: &str) {
        self.output.extend(line.as_bytes());
        self.output.extend(b"\r\n");
    }

    fn reply_multiline(&mut self, status: &str, body: &[u8]) {
        self.reply(status);
        let text = String::from_utf8_lossy(body).into_owned();
        for line in text.split("\r\n") {
            if line.starts_with('.') {
                self.output.push_back(b'.');
            }
            self.reply(line);
        }
        self.reply(".");
    }

    fn message(&self, arg: Option<&str>) -> Option<(usize, Vec<u8>)> {
        let id: usize = arg?.parse().ok()?;
        let st = self.state.borrow();
        let raw = st.messages.get(id.checked_sub(1)?)?;
        Some((id, raw.clone()))
    }

    fn handle(&mut self, line: &str) {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or("").to_ascii_uppercase();
        let arg = words.next();

        match verb.as_str() {
            "USER" => {
                self.user_seen = arg == Some(self.state.borrow().user.as_str());
                self.reply("+OK");
            }
            "PASS" => {
                let ok = self.user_seen && arg == Some(self.state.borrow().password.as_str());
                if ok {
                    self.authed = true;
                    self.reply("+OK maildrop locked");
                } else {
                    self.reply("-ERR invalid password");
                }
            }
            "QUIT" => {
                self.state.borrow_mut().quits += 1;
                self.reply("+OK bye");
            }
            _ if !self.authed => self.reply("-ERR not authenticated"),
            "LIST" => {
                let listing: Vec<u8> = {
                    let st = self.state.borrow();
                    st.messages
                        .iter()
                        .enumerate()
                        .map(|(i, m)| format!("{} {}", i + 1, m.len()))
                        .collect::<Vec<_>>()
                        .join("\r\n")
                        .into_bytes()
                };
                if listing.is_empty() {
                    self.reply("+OK 0 messages");
                    self.reply(".");
                } else {
                    self.reply_multiline("+OK scan listing follows", &listing);
                }
            }
            "TOP" => match self.message(arg) {
                Some((id, _)) if self.state.borrow().broken_headers.contains(&id) => {
                    self.reply("-ERR cannot read headers");
                }
                Some((_, raw)) => {
                    let text = String::from_utf8_lossy(&raw).into_owned();
                    let head = text.split("\r\n\r\n").next().unwrap_or("").to_string();
                    self.reply_multiline("+OK top of message follows", format!("{head}\r\n").as_bytes());
                }
                None => self.reply("-ERR no such message"),
            },
            "RETR" => match self.message(arg) {
                Some((_, raw)) => {
                    let body = raw.strip_suffix(b"\r\n").unwrap_or(&raw[..]).to_vec();
                    self.reply_multiline("+OK message follows", &body);
                }
                None => self.reply("-ERR no such message"),
            },
            _ => self.reply("-ERR unknown command"),
        }
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.output.len());
        for (slot, byte) in buf.iter_mut().zip(self.output.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line).trim_end().to_string();
            self.handle(&line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
