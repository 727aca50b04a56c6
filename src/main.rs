use anyhow::{anyhow, Context, Result};
use clap::{App, Arg};
use log::LevelFilter;
use std::fs::File;
use std::io::BufReader;

use gcode2thumbnail::parser::extract_candidates_from_file;
use gcode2thumbnail::picture::RGBA;
use gcode2thumbnail::provider::ThumbnailProvider;
use gcode2thumbnail::scaler::ScaleOptions;
use gcode2thumbnail::MAX_THUMBNAIL_SIZE;

struct Settings {
    verbose: bool,
    list: bool,
    size: u32,
    background: RGBA,
}

fn main() -> Result<()> {
    let matches = App::new("gcode2thumbnail")
        .version(clap::crate_version!())
        .about("Extracts the thumbnails embedded in G-code files")
        .arg(
            Arg::with_name("INPUT")
                .short("i")
                .index(1)
                .long("input")
                .help("Input filename")
                .required(true),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .short("o")
                .index(2)
                .long("output")
                .help("Output filename (PNG)")
                .required_unless("LIST"),
        )
        .arg(
            Arg::with_name("SIZE")
                .short("s")
                .long("size")
                .takes_value(true)
                .help("Width and height of the box the thumbnail is fit into (defaults to 256)"),
        )
        .arg(
            Arg::with_name("BACKGROUND")
                .short("b")
                .long("background")
                .takes_value(true)
                .help("Background color as RRGGBBAA (defaults to FFFFFFFF)"),
        )
        .arg(
            Arg::with_name("LIST")
                .short("l")
                .long("list")
                .help("Lists the embedded thumbnails instead of writing one"),
        )
        .arg(Arg::with_name("VERBOSE").short("v").long("verbose").help("Be verbose"))
        .get_matches();

    let input = matches
        .value_of("INPUT")
        .ok_or_else(|| anyhow!("no input file given"))?;

    let size = matches
        .value_of("SIZE")
        .unwrap_or("256")
        .parse::<u32>()
        .context("size must be a positive number")?;

    let settings = Settings {
        verbose: matches.is_present("VERBOSE"),
        list: matches.is_present("LIST"),
        size,
        background: matches.value_of("BACKGROUND").unwrap_or("FFFFFFFF").parse()?,
    };

    env_logger::Builder::new()
        .filter_level(if settings.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    if settings.list {
        return list(input);
    }

    let output = matches
        .value_of("OUTPUT")
        .ok_or_else(|| anyhow!("no output file given"))?;

    if settings.size == 0 || settings.size > MAX_THUMBNAIL_SIZE {
        return Err(anyhow!("size must be between 1 and {}", MAX_THUMBNAIL_SIZE));
    }

    if settings.verbose {
        println!("Size                  '{}x{}'", settings.size, settings.size);
        println!("Input                 '{}'", input);
        println!("Output                '{}'", output);
        println!("Background            '{:?}'", settings.background);
    }

    create(input, output, &settings)
}

fn create(input: &str, output: &str, settings: &Settings) -> Result<()> {
    let file = File::open(input).with_context(|| format!("unable to open '{}'", input))?;

    let provider = ThumbnailProvider::with_options(ScaleOptions {
        background: settings.background,
        ..ScaleOptions::default()
    });

    let thumbnail = provider
        .get_thumbnail(BufReader::new(file), settings.size)
        .ok_or_else(|| anyhow!("'{}' contains no usable thumbnail", input))?;

    thumbnail.picture.save(output)?;

    if settings.verbose {
        println!(
            "Wrote                 '{}x{}'",
            thumbnail.picture.width(),
            thumbnail.picture.height()
        );
    }

    Ok(())
}

fn list(input: &str) -> Result<()> {
    let candidates =
        extract_candidates_from_file(input).with_context(|| format!("unable to open '{}'", input))?;

    for (i, candidate) in candidates.enumerate() {
        match candidate.hint {
            Some(hint) => println!(
                "#{:<3} {:>8} chars  announced {}x{} ({} chars)",
                i,
                candidate.len(),
                hint.width,
                hint.height,
                hint.length
            ),
            None => println!("#{:<3} {:>8} chars", i, candidate.len()),
        }
    }

    Ok(())
}
