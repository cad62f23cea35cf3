use clap::Parser;
use dsm85::annot::AnnotationMap;
use dsm85::config::Config;
use dsm85::dis::disassemble;
use dsm85::error::Error;
use dsm85::literal::parse_int_literal;
use dsm85::parse::parse_bytes;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

//===========================================================================//

#[derive(Parser)]
#[clap(author, about, long_about = None, version)]
struct Cli {
    /// The binary image to disassemble.
    input: PathBuf,

    /// Where to write the listing [default: the input path with a .lst
    /// extension].
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// An annotation file with segments, labels, and comments to apply.
    #[clap(short, long)]
    labels: Option<PathBuf>,

    /// Add an address column to the listing.
    #[clap(short, long)]
    address: bool,

    /// The file offset to start disassembling at.
    #[clap(short, long, default_value = "0", value_parser = parse_address)]
    start: u32,

    /// The number of bytes to read; if --end is also given, --end wins.
    #[clap(short = 'n', long, value_parser = parse_address)]
    length: Option<u32>,

    /// The target address of the start offset [default: --start].
    #[clap(short, long, value_parser = parse_address)]
    base: Option<u32>,

    /// The inclusive file offset to stop at [default: end of file].
    #[clap(short, long, value_parser = parse_address)]
    end: Option<u32>,

    /// Create labels for the 8085 interrupt vectors.  These take
    /// precedence over user-defined labels.
    #[clap(long, alias = "hw")]
    hwlabels: bool,
}

/// Address arguments accept the same literal syntax as annotation files
/// (`$1f00`, `0x1f00`, `1f00h`, `@17`, `%1010`, ...).
fn parse_address(text: &str) -> Result<u32, String> {
    parse_int_literal(text)
        .ok()
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| format!("invalid address: {}", text))
}

//===========================================================================//

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error);
            match error {
                Error::FileNotFound(_) | Error::OutputUnwritable(_) => {
                    ExitCode::from(1)
                }
                Error::BadArgument(_) => ExitCode::from(2),
                Error::Annotation(_) => ExitCode::from(3),
            }
        }
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let image = fs::read(&cli.input)
        .map_err(|_| Error::FileNotFound(cli.input.clone()))?;
    let mut info = AnnotationMap::new();
    if let Some(path) = &cli.labels {
        let text =
            fs::read(path).map_err(|_| Error::FileNotFound(path.clone()))?;
        parse_bytes(&text, &path.display().to_string(), &mut info)?;
    }
    let end_offset = match (cli.end, cli.length) {
        (Some(end), _) => end,
        (None, Some(length)) => {
            cli.start.saturating_add(length).saturating_sub(1)
        }
        (None, None) => (image.len() as u32).saturating_sub(1),
    };
    let config = Config {
        start_offset: cli.start,
        end_offset,
        base_address: cli.base.unwrap_or(cli.start),
        address_column: cli.address,
        hw_labels: cli.hwlabels,
    };
    let listing = disassemble(&config, &image, &mut info);
    let output =
        cli.output.unwrap_or_else(|| cli.input.with_extension("lst"));
    fs::write(&output, listing)
        .map_err(|_| Error::OutputUnwritable(output.clone()))?;
    Ok(())
}

//===========================================================================//
