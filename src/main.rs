use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use reqwest::Client;
use url::Url;

use ebustl::config::{parse_frame_rate, stl_frame_rate, CumulativeStatusMode, WriterConfig};
use ebustl::models::VideoInfo;
use ebustl::timecode::format_frames;
use ebustl::{extract_teletext, StlReader, StlWriter, Subtitle};

// Cues shown in the extraction summary
const PREVIEW_COUNT: usize = 5;
const PREVIEW_WIDTH: usize = 60;
const PREVIEW_FPS: u32 = 25;

#[derive(Parser)]
#[command(name = "ebustl")]
#[command(about = "Convert teletext/OP-47 subtitles to EBU STL and read STL files")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract teletext subtitles from a raw ancillary dump and write an STL file
    Extract {
        #[arg(help = "Raw OP-47/VANC or teletext dump (path or http(s) URL)")]
        input: String,

        #[arg(short, long, help = "STL file to write")]
        output: PathBuf,

        #[arg(short, long, help = "Programme title (defaults to the input file name)")]
        title: Option<String>,

        #[arg(long, help = "Frame count of the source video, for packet timing")]
        total_frames: Option<u64>,

        #[arg(long, conflicts_with = "total_frames", help = "Duration of the source video in seconds")]
        duration: Option<f64>,

        #[arg(long, default_value = "25", help = "Frame rate, e.g. 25, 25.0 or 25/1")]
        frame_rate: String,

        #[arg(long, help = "Mark multi-block subtitles with cumulative status 1/2/3")]
        conformant: bool,
    },
    /// Decode an STL file and print its captions as JSON
    Read {
        #[arg(help = "STL file (path or http(s) URL)")]
        input: String,

        #[arg(long, help = "Override the frame rate from the Disk Format Code")]
        fps: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let client = Client::new();

    match args.command {
        Command::Extract {
            input,
            output,
            title,
            total_frames,
            duration,
            frame_rate,
            conformant,
        } => {
            let frame_rate = parse_frame_rate(&frame_rate)?;
            let total_frames = total_frames.or_else(|| {
                duration.map(|d| {
                    let video = VideoInfo::new(d, frame_rate);
                    info!("Video: {:.2}s at {} fps, {} frames", d, frame_rate, video.total_frames);
                    video.total_frames
                })
            });
            let title = title.unwrap_or_else(|| default_title(&input));

            let mut config = WriterConfig::new(title, stl_frame_rate(frame_rate));
            if conformant {
                config.cumulative_status = CumulativeStatusMode::Conformant;
            }

            let data = load_input(&client, &input).await?;
            run_extract(&data, &output, config, total_frames, frame_rate).await?;
        }
        Command::Read { input, fps } => {
            let data = load_input(&client, &input).await?;
            let decoded = StlReader::new(fps).read(&data)?;

            let captions: Vec<_> = decoded.captions.iter().map(|c| c.to_json()).collect();
            let warnings: Vec<String> = decoded.warnings.iter().map(|w| w.to_string()).collect();
            let output = serde_json::json!({
                "captions": captions,
                "fps": decoded.fps,
                "gsi": decoded.gsi,
                "warnings": warnings,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

async fn load_input(client: &Client, input: &str) -> Result<Vec<u8>> {
    match Url::parse(input) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            info!("Downloading {}", url);
            let response = client.get(url).send().await?.error_for_status()?;
            Ok(response.bytes().await?.to_vec())
        }
        _ => tokio::fs::read(input)
            .await
            .with_context(|| format!("failed to read {}", input)),
    }
}

fn default_title(input: &str) -> String {
    let name = match Url::parse(input) {
        Ok(url) if url.scheme().starts_with("http") => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        _ => Path::new(input)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned()),
    };
    name.filter(|n| !n.is_empty())
        .unwrap_or_else(|| ebustl::config::DEFAULT_PROGRAM_TITLE.to_string())
}

async fn run_extract(
    data: &[u8],
    output: &Path,
    config: WriterConfig,
    total_frames: Option<u64>,
    frame_rate: f64,
) -> Result<()> {
    let subtitles = extract_teletext(data, total_frames, frame_rate)?;

    println!("Found {} subtitles", subtitles.len());
    print_preview(&subtitles);

    if subtitles.is_empty() {
        println!("No subtitles found, nothing written");
        return Ok(());
    }

    let writer = StlWriter::new(config)?;
    tokio::fs::write(output, writer.to_bytes(&subtitles)?)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Written to {}", output.display());
    Ok(())
}

fn print_preview(subtitles: &[Subtitle]) {
    for (i, subtitle) in subtitles.iter().take(PREVIEW_COUNT).enumerate() {
        let text = subtitle
            .lines
            .iter()
            .filter(|l| l.has_content())
            .map(|l| l.text().trim().to_string())
            .collect::<Vec<_>>()
            .join(" | ");
        let text: String = text.chars().take(PREVIEW_WIDTH).collect();

        println!(
            "  [{}] {} -> {}: {}...",
            i + 1,
            format_frames(subtitle.start_time, PREVIEW_FPS),
            format_frames(subtitle.end_time, PREVIEW_FPS),
            text
        );
    }

    if subtitles.len() > PREVIEW_COUNT {
        println!("  ... and {} more", subtitles.len() - PREVIEW_COUNT);
    }
}
