//! tlogkv CLI Client
//!
//! Command-line interface for interacting with a tlogkv server, plus an
//! offline checker for transaction log files.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tlogkv::protocol::{read_response, write_command, Command, Response, Status};
use tlogkv::wal::SequenceCheck;
use tlogkv::WalRecovery;

/// tlogkv CLI
#[derive(Parser, Debug)]
#[command(name = "tlogkv-cli")]
#[command(about = "CLI for the tlogkv key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, env = "TLOGKV_SERVER", default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,

    /// Check a transaction log file without a server
    Verify {
        /// Path to the log file
        path: PathBuf,

        /// Require sequences to increase by exactly one
        #[arg(long)]
        contiguous: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let command = match args.command {
        Commands::Get { key } => Command::Get { key },
        Commands::Put { key, value } => Command::Put { key, value },
        Commands::Del { key } => Command::Delete { key },
        Commands::Ping => Command::Ping,
        Commands::Verify { path, contiguous } => return verify(&path, contiguous),
    };

    match send(&args.server, &command) {
        Ok(response) => print_response(&response),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn send(server: &str, command: &Command) -> tlogkv::Result<Response> {
    let stream = TcpStream::connect(server)?;
    let mut writer = BufWriter::new(stream.try_clone()?);
    let mut reader = BufReader::new(stream);

    write_command(&mut writer, command)?;
    read_response(&mut reader)
}

fn print_response(response: &Response) -> ExitCode {
    let text = response.payload_text();
    match response.status {
        Status::Ok => {
            println!("{}", text.unwrap_or_else(|| "OK".to_string()));
            ExitCode::SUCCESS
        }
        Status::NotFound => {
            println!("(not found)");
            ExitCode::FAILURE
        }
        Status::Error | Status::BadRequest => {
            eprintln!("error: {}", text.unwrap_or_default());
            ExitCode::FAILURE
        }
    }
}

fn verify(path: &Path, contiguous: bool) -> ExitCode {
    let check = if contiguous {
        SequenceCheck::Contiguous
    } else {
        SequenceCheck::Monotonic
    };

    match WalRecovery::verify(path, check) {
        Ok(result) => {
            println!("events:        {}", result.events);
            println!("last sequence: {}", result.last_sequence);
            match result.error {
                None => {
                    println!("status:        clean");
                    ExitCode::SUCCESS
                }
                Some(e) => {
                    println!("status:        {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
