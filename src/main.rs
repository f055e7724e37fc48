use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use treefs::archive::rle;
use treefs::{commands, Config, FileSystem};

// Allow the tool to return its version with a --version flag
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
struct Opts {
    #[clap(short, long)]
    version: bool,
    #[clap(short, long)]
    debug: bool,
    /// Act as this user instead of the configured one
    #[clap(short, long)]
    user: Option<String>,
    #[clap(subcommand)]
    command: Option<Tool>,
}

#[derive(Subcommand)]
enum Tool {
    /// Run-length encode a real file
    Compress { src: PathBuf, dst: PathBuf },
    /// Expand a run-length encoded file
    Decompress { src: PathBuf, dst: PathBuf },
}

fn main() {
    let opts: Opts = Opts::parse();
    if opts.version {
        println!("{}", VERSION);
        return;
    }
    let config = match Config::load() {
        Ok(config) => config.with_user(opts.user),
        Err(e) => {
            eprintln!("treefs: {}", e);
            std::process::exit(1);
        }
    };
    let _guard = match treefs::log::init_logging(&config, opts.debug) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("treefs: logging disabled: {}", e);
            None
        }
    };

    let result = match opts.command {
        Some(Tool::Compress { src, dst }) => rle::compress_file(&src, &dst).map(|n| {
            println!("{} bytes written to {}", n, dst.display());
        }),
        Some(Tool::Decompress { src, dst }) => rle::decompress_file(&src, &dst).map(|n| {
            println!("{} bytes written to {}", n, dst.display());
        }),
        None => {
            repl(FileSystem::from_config(&config));
            Ok(())
        }
    };
    if let Err(e) = result {
        eprintln!("treefs: {}", e);
        std::process::exit(1);
    }
}

fn repl(mut fs: FileSystem) {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    tracing::info!("Session started as {}", fs.user());
    loop {
        print!("{}@treefs:{}$ ", fs.user(), fs.pwd());
        if let Err(e) = stdout.flush() {
            eprintln!("treefs: {}", e);
            break;
        }
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("treefs: {}", e);
                break;
            }
        }
        let output = commands::run(&mut fs, &line);
        if !output.text.is_empty() {
            println!("{}", output.text);
        }
        if output.exit {
            break;
        }
    }
    tracing::info!("Session ended");
}
