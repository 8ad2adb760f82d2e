//! sparseblk CLI Client
//!
//! Command-line interface for interacting with a sparseblk server.

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use sparseblk::network::Client;
use sparseblk::{Result, SEEK_CUR, SEEK_END, SEEK_SET};

/// sparseblk CLI
#[derive(Parser, Debug)]
#[command(name = "sparseblk-cli")]
#[command(about = "CLI for the sparseblk block device server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read bytes at an offset (at most up to the end of that block)
    Read {
        /// Byte offset
        offset: u64,

        /// Number of bytes
        length: u32,

        /// Print as hex instead of lossy UTF-8
        #[arg(long)]
        hex: bool,
    },

    /// Write a string at an offset (truncated at the end of that block)
    Write {
        /// Byte offset
        offset: u64,

        /// Data to write
        data: String,
    },

    /// Move the device cursor
    Seek {
        /// Signed offset
        #[arg(allow_hyphen_values = true)]
        offset: i64,

        /// Seek origin
        #[arg(value_enum, default_value = "set")]
        whence: WhenceArg,
    },

    /// Show capacity, allocated blocks and position
    Stat,

    /// Ping the server
    Ping,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WhenceArg {
    Set,
    Cur,
    End,
}

impl WhenceArg {
    fn raw(self) -> u8 {
        let raw = match self {
            WhenceArg::Set => SEEK_SET,
            WhenceArg::Cur => SEEK_CUR,
            WhenceArg::End => SEEK_END,
        };
        raw as u8
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut client = Client::connect(&args.server)?;

    match args.command {
        Commands::Read { offset, length, hex } => {
            let data = client.read(offset, length)?;
            if hex {
                let rendered: Vec<String> = data.iter().map(|b| format!("{:02x}", b)).collect();
                println!("{}", rendered.join(" "));
            } else {
                println!("{}", String::from_utf8_lossy(&data));
            }
            eprintln!("({} bytes)", data.len());
        }
        Commands::Write { offset, data } => {
            let written = client.write(offset, data.as_bytes())?;
            println!("{}", written);
        }
        Commands::Seek { offset, whence } => {
            let position = client.seek(offset, whence.raw())?;
            println!("{}", position);
        }
        Commands::Stat => {
            let stats = client.stat()?;
            println!("block_size:       {}", stats.block_size);
            println!("capacity:         {} blocks", stats.capacity);
            println!("allocated_blocks: {}", stats.allocated_blocks);
            println!("position:         {}", stats.position);
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    Ok(())
}
