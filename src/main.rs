mod cli;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use slicer_av::{FfmpegEngine, ToolRegistry, TranscoderSession};
use slicer_core::config::Config;
use slicer_core::{
    extension, format_duration, format_file_size, AudioFormat, InputFile, SegmentMinutes,
};
use slicer_pipeline::{
    build_archive, validate_with_limit, ProgressTracker, SegmentPipeline, SegmentStore,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "audioslicer=debug,slicer_core=debug,slicer_av=debug,slicer_pipeline=debug,slicer_server=debug,tower_http=debug".to_string()
        } else {
            "audioslicer=info,slicer_av=info,slicer_pipeline=info,slicer_server=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = Config::load_or_default(cli.config.as_deref());
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(slicer_server::start(config))?;
            Ok(())
        }
        Commands::Split {
            input,
            minutes,
            output_dir,
            zip,
        } => {
            let config = Config::load_or_default(cli.config.as_deref());
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(split_file(&config, &input, minutes, &output_dir, zip))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("audioslicer {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn split_file(
    config: &Config,
    input: &Path,
    minutes: Option<u32>,
    output_dir: &Path,
    zip: bool,
) -> Result<()> {
    if !input.is_file() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    let minutes = match minutes {
        Some(m) => SegmentMinutes::new(m)?,
        None => config.split.default_segment_minutes(),
    };

    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    let media_type = extension(&name)
        .and_then(|e| AudioFormat::from_extension(&e))
        .map(|f| f.primary_media_type())
        .unwrap_or("application/octet-stream");

    let size = tokio::fs::metadata(input).await?.len();
    validate_with_limit(media_type, &name, size, config.limits.max_upload_bytes)?;

    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let file = InputFile::new(name, media_type, bytes.into());

    let engine = Arc::new(FfmpegEngine::from_config(config));
    let session = Arc::new(TranscoderSession::new(engine, config.split.extension()));
    let pipeline = SegmentPipeline::new(session, Arc::new(SegmentStore::new()));

    let progress = ProgressTracker::new(|p| {
        eprint!("\rSplitting... {p:>3}%");
        let _ = std::io::stderr().flush();
    });

    tracing::info!("Splitting {} into {minutes} segments", input.display());
    let result = pipeline.split(&file, minutes, &progress).await;
    eprintln!();
    let batch = result?;

    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    for segment in &batch.segments {
        let (_, data) = pipeline.segment(segment.id)?;
        let path = output_dir.join(&segment.name);
        tokio::fs::write(&path, &data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "{}  {}  {}",
            segment.name,
            format_file_size(segment.size),
            format_duration(segment.duration_secs)
        );
    }

    if zip {
        let archive = build_archive(&batch, pipeline.store(), config.archive.compression_level)?;
        let path = output_dir.join(&archive.name);
        tokio::fs::write(&path, &archive.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{}  {}", archive.name, format_file_size(archive.bytes.len() as u64));
    }

    println!(
        "\n{} segments, {} total",
        batch.len(),
        format_file_size(batch.total_size())
    );
    pipeline.clear();
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(config_path);
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut ffmpeg_ok = false;

    for tool in &tools {
        let status = if tool.available { "✓" } else { "✗" };
        if tool.name == "ffmpeg" {
            ffmpeg_ok = tool.available;
        }

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if ffmpeg_ok {
        println!("ffmpeg is available; splitting is supported.");
    } else {
        println!("ffmpeg is missing. Install it to enable splitting.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read {}", p.display()))?;
            Config::from_json(&contents)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!(
        "  Max upload: {}",
        format_file_size(config.limits.max_upload_bytes)
    );
    println!(
        "  Default segment length: {}",
        config.split.default_segment_minutes()
    );
    println!("  Segment extension: {}", config.split.extension());
    println!("  Archive compression level: {}", config.archive.compression_level);
    for warning in &warnings {
        println!("  ! {warning}");
    }

    Ok(())
}
