//! Command-line tool for packing and querying grammar-compressed strings.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use slp_access::{
    FlatFixed32Slp, FlatFixedSlp, FlatGammaSlp, MmapFile, PoGammaSlp, PoIncSlp, SelfSdMclSlp,
    SelfSdSdSlp, ShapedSdMclSlp, ShapedSdSdSlp, Slp, SlpRules,
};

#[derive(Debug, Parser)]
#[command(name = "slp-access")]
#[command(about = "Grammar-compressed string storage toolkit", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pack a plain rules file (.slpr) into a queryable store (.slpa)
    Pack(PackArgs),
    /// Expand a store back into the full string
    Decompress(DecompressArgs),
    /// Extract a substring without expanding the rest
    Substring(SubstringArgs),
    /// Print store statistics
    Stat(StatArgs),
}

#[derive(Debug, Parser)]
struct PackArgs {
    /// Input rules file in SLPR interchange form
    #[arg(short, long)]
    input: PathBuf,

    /// Output store file
    #[arg(short, long)]
    output: PathBuf,

    /// Store encoding (run with a bogus name to list the choices)
    #[arg(short, long)]
    encoding: String,
}

#[derive(Debug, Parser)]
struct DecompressArgs {
    /// Input store file
    #[arg(short, long)]
    input: PathBuf,

    /// Output file for the expanded string
    #[arg(short, long)]
    output: PathBuf,

    /// Encoding the store was packed with
    #[arg(short, long)]
    encoding: String,
}

#[derive(Debug, Parser)]
struct SubstringArgs {
    /// Input store file
    #[arg(short, long)]
    input: PathBuf,

    /// Encoding the store was packed with
    #[arg(short, long)]
    encoding: String,

    /// Offset of the first byte to extract
    #[arg(long)]
    from: u64,

    /// Number of bytes to extract
    #[arg(long)]
    len: u64,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct StatArgs {
    /// Input store file
    #[arg(short, long)]
    input: PathBuf,

    /// Encoding the store was packed with
    #[arg(short, long)]
    encoding: String,
}

const ENCODING_NAMES: [&str; 9] = [
    "flat-fixed",
    "flat-fixed32",
    "flat-gamma",
    "po-gamma",
    "po-inc",
    "shaped-sd-mcl",
    "shaped-sd-sd",
    "self-sd-mcl",
    "self-sd-sd",
];

/// Bind an encoding name to its concrete store type and run the body.
/// Unknown names fail here, before any file is touched.
macro_rules! dispatch_encoding {
    ($name:expr, $ty:ident => $body:block) => {{
        match $name {
            "flat-fixed" => {
                type $ty = FlatFixedSlp;
                $body
            }
            "flat-fixed32" => {
                type $ty = FlatFixed32Slp;
                $body
            }
            "flat-gamma" => {
                type $ty = FlatGammaSlp;
                $body
            }
            "po-gamma" => {
                type $ty = PoGammaSlp;
                $body
            }
            "po-inc" => {
                type $ty = PoIncSlp;
                $body
            }
            "shaped-sd-mcl" => {
                type $ty = ShapedSdMclSlp;
                $body
            }
            "shaped-sd-sd" => {
                type $ty = ShapedSdSdSlp;
                $body
            }
            "self-sd-mcl" => {
                type $ty = SelfSdMclSlp;
                $body
            }
            "self-sd-sd" => {
                type $ty = SelfSdSdSlp;
                $body
            }
            other => bail!(
                "unknown encoding '{}' (expected one of: {})",
                other,
                ENCODING_NAMES.join(", ")
            ),
        }
    }};
}

fn load_store<S: Slp>(path: &Path) -> Result<(S, usize)> {
    let file = MmapFile::open(path).with_context(|| format!("opening {}", path.display()))?;
    let slp =
        S::from_bytes(file.bytes()).with_context(|| format!("loading {}", path.display()))?;
    Ok((slp, file.len()))
}

fn run_pack(args: &PackArgs) -> Result<()> {
    dispatch_encoding!(args.encoding.as_str(), S => {
        let started = Instant::now();
        let bytes = fs::read(&args.input)
            .with_context(|| format!("reading {}", args.input.display()))?;
        let rules = SlpRules::from_bytes(&bytes)
            .with_context(|| format!("parsing {}", args.input.display()))?;
        let parsed = Instant::now();
        let slp = S::from_rules(&rules)?;
        let packed = Instant::now();
        let out = slp.to_bytes();
        fs::write(&args.output, &out)
            .with_context(|| format!("writing {}", args.output.display()))?;
        eprintln!(
            "✓ Packed {} rules into {} bytes ({} was {} bytes; parse {:.1?}, pack {:.1?})",
            slp.num_rules(),
            out.len(),
            args.input.display(),
            bytes.len(),
            parsed.duration_since(started),
            packed.duration_since(parsed),
        );
        Ok(())
    })
}

fn run_decompress(args: &DecompressArgs) -> Result<()> {
    dispatch_encoding!(args.encoding.as_str(), S => {
        let started = Instant::now();
        let (slp, file_len) = load_store::<S>(&args.input)?;
        let loaded = Instant::now();
        let text = slp.expand_all();
        let expanded = Instant::now();
        fs::write(&args.output, &text)
            .with_context(|| format!("writing {}", args.output.display()))?;
        eprintln!(
            "✓ Expanded {} bytes from a {} byte store (load {:.1?}, expand {:.1?})",
            text.len(),
            file_len,
            loaded.duration_since(started),
            expanded.duration_since(loaded),
        );
        Ok(())
    })
}

fn run_substring(args: &SubstringArgs) -> Result<()> {
    dispatch_encoding!(args.encoding.as_str(), S => {
        let started = Instant::now();
        let (slp, _) = load_store::<S>(&args.input)?;
        let loaded = Instant::now();
        let text = slp.expand_substring(args.from, args.len)?;
        let extracted = Instant::now();
        match &args.output {
            Some(path) => {
                fs::write(path, &text)
                    .with_context(|| format!("writing {}", path.display()))?;
            }
            None => {
                std::io::stdout().write_all(&text)?;
            }
        }
        eprintln!(
            "✓ Extracted {} bytes at offset {} (load {:.1?}, extract {:.1?})",
            text.len(),
            args.from,
            loaded.duration_since(started),
            extracted.duration_since(loaded),
        );
        Ok(())
    })
}

fn run_stat(args: &StatArgs) -> Result<()> {
    dispatch_encoding!(args.encoding.as_str(), S => {
        let (slp, file_len) = load_store::<S>(&args.input)?;
        let total = slp.total_len();
        println!("encoding:      {}", args.encoding);
        println!("rules:         {}", slp.num_rules());
        println!("alphabet:      {} distinct bytes", slp.alphabet().len());
        println!("total length:  {} bytes", total);
        println!("start symbol:  {}", slp.start_symbol());
        println!("file size:     {} bytes", file_len);
        println!("resident size: {} bytes", slp.size_bytes());
        if total > 0 {
            println!(
                "ratio:         {:.4} file bytes per derived byte",
                file_len as f64 / total as f64
            );
        }
        Ok(())
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Pack(args) => run_pack(&args),
        Command::Decompress(args) => run_decompress(&args),
        Command::Substring(args) => run_substring(&args),
        Command::Stat(args) => run_stat(&args),
    }
}
