//! pagestore CLI
//!
//! Command-line interface for inspecting and editing storage files.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pagestore::{Config, PageStoreError, Storage};
use tracing_subscriber::{fmt, EnvFilter};

/// pagestore CLI
#[derive(Parser, Debug)]
#[command(name = "pagestore-cli")]
#[command(about = "CLI for pagestore structured storage files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new, empty storage file
    Create {
        /// Storage file path
        file: PathBuf,

        /// Page size in bytes (header included)
        #[arg(short, long, default_value = "1024")]
        page_size: u32,
    },

    /// Show the file header
    Info {
        /// Storage file path
        file: PathBuf,
    },

    /// List streams
    Ls {
        /// Storage file path
        file: PathBuf,
    },

    /// Append data to a stream, creating it if needed
    Put {
        /// Storage file path
        file: PathBuf,

        /// Stream name
        stream: String,

        /// Read data from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print a stream's contents
    Cat {
        /// Storage file path
        file: PathBuf,

        /// Stream name
        stream: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,pagestore=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> pagestore::Result<()> {
    let mut storage = Storage::with_config(Config::default());

    match command {
        Commands::Create { file, page_size } => {
            storage.create_with_page_size(&file, page_size)?;
            tracing::info!("Created {} (page size {})", file.display(), page_size);
        }
        Commands::Info { file } => {
            storage.open(&file)?;
            let header = storage.file_header()?;
            println!("magic:          {:#010x}", header.magic);
            println!("version:        {}", header.version);
            println!("page size:      {}", header.page_size);
            println!("page capacity:  {}", header.page_data_capacity());
            println!("pages:          {}", storage.page_count()?);
            println!("streams:        {}", header.stream_count);
            println!("directory page: {}", header.directory_page);
            println!("free list head: {}", header.first_free_page);
        }
        Commands::Ls { file } => {
            storage.open(&file)?;
            for info in storage.streams()? {
                println!("{:>5}  {:>10}  {}", info.id, info.size, info.name);
            }
        }
        Commands::Put {
            file,
            stream,
            input,
        } => {
            let data = match input {
                Some(path) => fs::read(path)?,
                None => {
                    let mut data = Vec::new();
                    io::stdin().read_to_end(&mut data)?;
                    data
                }
            };

            storage.open(&file)?;
            let id = match storage.open_stream(&stream) {
                Ok(id) => id,
                Err(PageStoreError::NameNotFound(_)) => storage.create_stream(&stream)?,
                Err(e) => return Err(e),
            };
            let end = storage.stream_size(id)?;
            storage.stream_seek(id, end)?;
            storage.write(id, &data)?;
            tracing::info!("Appended {} bytes to {}", data.len(), stream);
        }
        Commands::Cat { file, stream } => {
            storage.open(&file)?;
            let id = storage.open_stream(&stream)?;
            let data = storage.read_to_end(id)?;
            io::stdout().write_all(&data)?;
        }
    }

    if storage.is_open() {
        storage.close()?;
    }
    Ok(())
}
