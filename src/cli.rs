use crate::config::{Config, load_config};
use crate::context::Context;
use crate::geometry::{Point, Size};
use crate::ir::{build_diagram, parse_tree};
use crate::layout_dump::write_layout_dump;
use crate::render::{SvgBackend, write_output_png, write_output_svg};
use crate::text_metrics::{ApproximateMeasurer, FontDbMeasurer, TextMeasure};
use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use log::{LevelFilter, debug, info};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "rowtree", version, about = "Render row-stacked tree diagrams")]
pub struct Args {
    /// Input tree file (.json5/.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Surface width (overrides the config file)
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Surface height (overrides the config file)
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Select the node under a point, given as "x,y"
    #[arg(long = "select-at", value_parser = parse_point)]
    pub select_at: Option<Point>,

    /// Select the node with this id
    #[arg(long = "select-id", conflicts_with = "select_at")]
    pub select_id: Option<String>,

    /// Write the computed geometry as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Measure text with the built-in width table instead of system fonts
    #[arg(long = "fast-metrics")]
    pub fast_metrics: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();
    debug!(args:?; "Parsed arguments");
    execute(&args)
}

pub fn execute(args: &Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())
        .with_context(|| "failed to load configuration")?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if args.fast_metrics {
        config.layout.fast_text_metrics = true;
    }

    let input = read_input(args.input.as_deref())?;
    let doc = parse_tree(&input)?;
    let ctx = Context::from_config(&config, measurer_for(&config));
    let mut built = build_diagram(&doc, ctx)?;
    info!(nodes = doc.nodes.len(); "Tree loaded");

    let bottom = built.diagram.arrange()?;

    if let Some(point) = args.select_at {
        built.diagram.select_node_at(point);
    } else if let Some(id) = &args.select_id {
        let handle = built
            .handles
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("no node with id `{id}`"))?;
        built.diagram.select_node_by_data(handle);
    }
    if args.select_at.is_some() || args.select_id.is_some() {
        report_selection(&built.diagram);
    }

    let surface = output_size(&config, bottom);
    let mut backend = SvgBackend::new(surface);
    built.diagram.draw(&mut backend)?;
    let svg = backend.finish();

    if let Some(path) = &args.dump_layout {
        write_layout_dump(path, &built.diagram, bottom)?;
    }

    match args.output_format {
        OutputFormat::Svg => write_output_svg(&svg, args.output.as_deref())?,
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_output_png(&svg, &output, &config.render)?;
        }
    }
    Ok(())
}

fn measurer_for(config: &Config) -> Box<dyn TextMeasure> {
    if config.layout.fast_text_metrics {
        Box::new(ApproximateMeasurer::default())
    } else {
        Box::new(FontDbMeasurer::new())
    }
}

/// The configured surface, grown to fit everything below the last row.
fn output_size(config: &Config, bottom: f32) -> Size {
    let needed = bottom + config.layout.connector_line_height;
    Size::new(config.render.width, config.render.height.max(needed))
}

fn report_selection(diagram: &crate::tree::Diagram) {
    match (diagram.selected_key(), diagram.selected_node()) {
        (Some(key), Some(node)) => {
            info!(row = key.row, index = key.index; "Node selected");
            let text: Vec<&str> = node
                .lines()
                .iter()
                .map(String::as_str)
                .filter(|line| !line.is_empty())
                .collect();
            eprintln!("selected row {} node {}: {}", key.row, key.index, text.join(" / "));
        }
        _ => eprintln!("no node selected"),
    }
}

fn parse_point(raw: &str) -> Result<Point, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got {raw:?}"))?;
    let x = x.trim().parse::<f32>().map_err(|err| err.to_string())?;
    let y = y.trim().parse::<f32>().map_err(|err| err.to_string())?;
    Ok(Point::new(x, y))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
