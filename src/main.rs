use clap::{Parser, Subcommand};
use magick_bind::{Color, CompositeOperator, Geometry, Image, coder_info_list, config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "magick-bind")]
#[command(about = "Inspect and convert images through the magick-bind engine")]
#[command(long_about = "\
Inspect and convert images through the magick-bind engine

Paths may carry a format prefix to force a codec:

  magick-bind convert photo.dat png:out.bin

Output format is chosen from, in order: the prefix, the file extension,
--format, then [output] default_format in magick.toml.

Set RUST_LOG (e.g. RUST_LOG=magick_bind=debug) for engine logs.
Run 'magick-bind gen-config' to generate a documented magick.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./magick.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override [pool] max_workers
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print format and size of an image
    Identify {
        input: PathBuf,
        /// Emit JSON instead of a text line
        #[arg(long)]
        json: bool,
    },
    /// Re-encode an image, optionally in another format
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Target format code (e.g. JPEG)
        #[arg(long)]
        format: Option<String>,
    },
    /// Crop to a geometry such as 10x8+1+8
    Crop {
        input: PathBuf,
        geometry: Geometry,
        output: PathBuf,
    },
    /// Blend one image onto another
    Composite {
        base: PathBuf,
        overlay: PathBuf,
        output: PathBuf,
        /// Offset such as +10+20 written as a geometry (0x0+10+20)
        #[arg(long, default_value = "0x0+0+0")]
        offset: Geometry,
        /// Compositing operator (Over, Multiply, Screen, ...)
        #[arg(long, default_value = "Over")]
        op: CompositeOperator,
    },
    /// Read (or set) one pixel
    Pixel {
        input: PathBuf,
        x: u32,
        y: u32,
        /// Paint this color and write the result to --output
        #[arg(long, requires = "output")]
        set: Option<Color>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List registered formats
    Formats {
        #[arg(long)]
        json: bool,
    },
    /// Print a stock magick.toml with all options documented
    GenConfig,
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "magick_bind=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<config::MagickConfig, config::ConfigError> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(std::path::Path::new("."))?,
    };
    if let Some(workers) = cli.workers {
        cfg.pool.max_workers = Some(workers);
        cfg.validate()?;
    }
    Ok(cfg)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    config::install(load_config(&cli)?);

    match cli.command {
        Command::Identify { input, json } => {
            let im = Image::open(&input)?;
            let size = im.size();
            let format = im.magick().unwrap_or_default();
            if json {
                let value = serde_json::json!({
                    "path": input.display().to_string(),
                    "format": format,
                    "width": size.width(),
                    "height": size.height(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{} {} {}x{}", input.display(), format, size.width(), size.height());
            }
        }
        Command::Convert { input, output, format } => {
            let im = Image::new();
            im.read_async(&input).wait()?;
            if let Some(code) = format {
                im.set_magick_async(&code).wait()?;
            }
            im.write_async(&output).wait()?;
            println!("{} → {}", input.display(), output.display());
        }
        Command::Crop { input, geometry, output } => {
            let mut im = Image::open(&input)?;
            im.crop(geometry)?;
            im.write(&output)?;
            println!("{} {}x{}", output.display(), im.size().width(), im.size().height());
        }
        Command::Composite {
            base,
            overlay,
            output,
            offset,
            op,
        } => {
            let base_im = Image::new();
            let overlay_im = Image::new();
            let (a, b) = (base_im.read_async(&base), overlay_im.read_async(&overlay));
            a.wait()?;
            b.wait()?;
            base_im.composite_async(&overlay_im, offset, op).wait()?;
            base_im.write_async(&output).wait()?;
            println!("{} ({op})", output.display());
        }
        Command::Pixel {
            input,
            x,
            y,
            set,
            output,
        } => {
            let mut im = Image::open(&input)?;
            if let (Some(color), Some(output)) = (set, output) {
                im.set_pixel_color(x, y, &color)?;
                im.write(&output)?;
            }
            let px = im.pixel_color(x, y)?;
            println!("{x},{y}: {px} ({:?})", px.pixel_type());
        }
        Command::Formats { json } => {
            let list = coder_info_list();
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                for info in &list {
                    let mode = format!(
                        "{}{}{}",
                        if info.is_readable() { 'r' } else { '-' },
                        if info.is_writable() { 'w' } else { '-' },
                        if info.is_multi_frame() { '+' } else { '-' },
                    );
                    println!("{:>10}  {mode}  {}", info.name(), info.description());
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
