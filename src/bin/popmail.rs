use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use popmail::config::{Config, load_config};
use popmail::documents::DocumentTextDispatcher;
use popmail::{MailboxClient, Sender};

#[derive(Parser)]
#[command(name = "popmail")]
#[command(about = "POP3 mailbox reader and SMTP sender", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the most recent messages, newest first
    List {
        #[arg(long, default_value_t = 10)]
        count: usize,
    },

    /// Search subject and sender of the most recent messages
    Search {
        keyword: String,

        /// How many recent messages to scan
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Read one message with its body and attachment names
    Read { id: u32 },

    /// Save an attachment to disk
    Download {
        id: u32,
        filename: String,

        /// Defaults to the configured download directory
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Send a plain-text message
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },

    /// Print the text content of a local document
    ReadDoc { path: PathBuf },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn config() -> Result<Config> {
    load_config().map_err(|e| anyhow!("Configuration error: {e}"))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::List { count } => {
            let client = MailboxClient::from_config(&config()?);
            print_json(&client.list(count)?)
        }

        Command::Search { keyword, limit } => {
            let client = MailboxClient::from_config(&config()?);
            print_json(&client.search(&keyword, limit)?)
        }

        Command::Read { id } => {
            let client = MailboxClient::from_config(&config()?);
            match client.get_detail(id)? {
                Some(detail) => print_json(&detail),
                None => Err(anyhow!("message {id} not found")),
            }
        }

        Command::Download { id, filename, dest } => {
            let cfg = config()?;
            let client = MailboxClient::from_config(&cfg);
            let dest = dest.unwrap_or(cfg.download_dir);
            let path = client.download_attachment(id, &filename, &dest)?;
            println!("Saved {filename} to {}", path.display());
            Ok(())
        }

        Command::Send { to, subject, body } => {
            let sender = Sender::from_config(&config()?);
            println!("{}", sender.send(&to, &subject, &body)?);
            Ok(())
        }

        Command::ReadDoc { path } => {
            // extraction errors are printed inline, not as a failed exit
            let text = DocumentTextDispatcher::with_defaults()
                .extract_text(&path)
                .unwrap_or_else(|e| format!("Error: {e}"));
            println!("{text}");
            Ok(())
        }
    }
}
