//! blitbridge - BLIT cartridge inspection tool
//!
//! Main entry point for the command line front end.

use anyhow::{anyhow, Context, Result};
use bb_core::Config;
use bb_integration::GameLoader;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(version, about = "Validate and inspect BLIT game images")]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the image base address, e.g. 0x90000000
    #[arg(long, global = true, value_parser = parse_address)]
    base: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the header descriptor and metadata of an image
    Info { file: PathBuf },
    /// Validate an image; the exit status reflects the result
    Check { file: PathBuf },
    /// List the images in the configured games directory
    List {
        /// Directory to scan instead of `paths.games`
        dir: Option<PathBuf>,
    },
}

fn parse_address(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {:?}: {}", s, e))
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    config.map_err(|e| anyhow!("Failed to load configuration: {}", e))
}

fn info(loader: &GameLoader, file: &Path) -> Result<()> {
    let cart = loader
        .load(file, [])
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let d = cart.descriptor();

    println!("File:    {}", file.display());
    println!("Size:    {} bytes", cart.image.len());
    println!("Base:    0x{:08x}", d.base);
    println!("init:    {}", d.init);
    println!("tick:    {}", d.tick);
    println!("render:  {}", d.render);
    println!(
        "Extent:  [0x{:08x}, 0x{:08x}) ({} bytes)",
        d.start,
        d.end,
        d.extent_len()
    );
    match d.device {
        Some(tag) => {
            match tag.device() {
                Some(device) => println!("Device:  {:?}", device),
                None => println!("Device:  unknown (id {})", tag.device_id),
            }
            if let Some(api) = tag.api_version {
                println!("API:     {}", api);
            }
        }
        None => println!("Device:  untagged"),
    }

    match &cart.metadata {
        Some(meta) => {
            println!("Title:   {}", meta.title);
            println!("Author:  {}", meta.author);
            println!("Version: {}", meta.version);
            println!("Built:   {}", meta.datetime);
            println!("CRC32:   0x{:08x}", meta.crc32);
            if !meta.description.is_empty() {
                println!("About:   {}", meta.description);
            }
            if let Some(type_info) = &meta.type_info {
                println!("Type:    {}", type_info.category);
                if !type_info.url.is_empty() {
                    println!("URL:     {}", type_info.url);
                }
                if !type_info.filetypes.is_empty() {
                    println!("Opens:   {}", type_info.filetypes.join(", "));
                }
            }
        }
        None => println!("No metadata block"),
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_ref())?;
    if let Some(base) = args.base {
        config.general.image_base = base;
    }

    bb_core::logging::init(&config.debug);
    let loader = GameLoader::from_config(&config);
    tracing::debug!(
        "Image base 0x{:08x}, expected device {:?}",
        loader.image_base(),
        config.general.expected_device
    );

    match &args.command {
        Command::Info { file } => info(&loader, file)?,
        Command::Check { file } => {
            let data = std::fs::read(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            match loader.validate(&data) {
                Ok(_) => println!("{}: OK", file.display()),
                Err(e) => return Err(anyhow!("{}: {}", file.display(), e)),
            }
        }
        Command::List { dir } => {
            let dir = dir.as_ref().unwrap_or(&config.paths.games);
            for game in GameLoader::scan(dir)? {
                match loader.load(&game, []) {
                    Ok(cart) => println!(
                        "{}\t{}",
                        game.display(),
                        cart.title().unwrap_or("<untitled>")
                    ),
                    Err(e) => println!("{}\tinvalid: {}", game.display(), e),
                }
            }
        }
    }

    Ok(())
}
