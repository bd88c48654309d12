mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{CliConfig, OutputFormat};
use std::{io::Write, path::PathBuf};
use tracing::{debug, info};
use wtr_watcher::{Event, NativeLibrary, Watch};

#[derive(Parser, Debug)]
#[command(
	name = "wtr-watch",
	version,
	about = "Print filesystem events under a path until interrupted"
)]
struct Cli {
	/// Path to watch
	#[arg(default_value = ".")]
	path: PathBuf,

	/// Output format [default: from the config, else human]
	#[arg(long, value_enum)]
	format: Option<OutputFormat>,

	/// Directory containing libwatcher-c
	#[arg(long)]
	library_dir: Option<PathBuf>,

	/// Directory holding wtr-watch.json, created with defaults if missing
	#[arg(long, default_value = ".")]
	config_dir: PathBuf,
}

fn init_tracing() {
	use tracing_subscriber::{fmt, prelude::*, EnvFilter};

	// stdout carries the events, logs go to stderr
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new("info,wtr_watcher=debug"));

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr).with_target(false))
		.init();
}

fn print_event(out: &mut impl Write, event: &Event, format: OutputFormat) -> Result<()> {
	match format {
		OutputFormat::Human => writeln!(out, "{event}")?,
		OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(event)?)?,
	}

	out.flush()?;
	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	init_tracing();

	let cli = Cli::parse();

	let mut config = CliConfig::load(&cli.config_dir)?;

	if let Some(library_dir) = cli.library_dir {
		config.loader.library_dir = Some(library_dir);
	}

	let format = cli.format.unwrap_or(config.format);

	let library = NativeLibrary::init(&config.loader).context("failed to load libwatcher-c")?;
	debug!(path = %library.path().display(), "Using native library;");

	let (watch, events) = Watch::stream(&cli.path, &config.stream)
		.with_context(|| format!("failed to watch {}", cli.path.display()))?;

	info!(path = %cli.path.display(), "Watching;");

	let mut stdout = std::io::stdout().lock();

	loop {
		tokio::select! {
			event = events.recv() => match event {
				Some(event) => print_event(&mut stdout, &event, format)?,
				None => break,
			},
			_ = tokio::signal::ctrl_c() => {
				info!("Interrupted, closing watcher");
				break;
			}
		}
	}

	// Closing blocks until the native engine is done
	tokio::task::spawn_blocking(move || watch.close())
		.await
		.context("close task failed")?
		.context("failed to close watcher")?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::ffi::CString;

	use wtr_watcher::{
		ffi::{decode, NativeEventRecord},
		EffectType, PathType,
	};

	fn sample_event() -> Event {
		let path = CString::new("/tmp/a").unwrap();
		let record = NativeEventRecord {
			effect_time: 1_700_000_000_000_000_000,
			path_name: path.as_ptr(),
			effect_type: EffectType::Create.into(),
			path_type: PathType::File.into(),
			..Default::default()
		};

		unsafe { decode(&record) }.unwrap()
	}

	#[test]
	fn human_output_is_one_line() {
		let mut out = Vec::new();
		print_event(&mut out, &sample_event(), OutputFormat::Human).unwrap();

		assert_eq!(
			String::from_utf8(out).unwrap(),
			"2023-11-14T22:13:20.000000000Z create file /tmp/a\n"
		);
	}

	#[test]
	fn json_output_is_one_object_per_line() {
		let mut out = Vec::new();
		print_event(&mut out, &sample_event(), OutputFormat::Json).unwrap();

		let line = String::from_utf8(out).unwrap();
		assert!(line.ends_with('\n'));

		let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
		assert_eq!(value["path_name"], "/tmp/a");
		assert_eq!(value["effect_type"], "create");
		assert_eq!(value["path_type"], "file");
		assert_eq!(value["associated_path_name"], "");
	}

	#[test]
	fn cli_defaults() {
		let cli = Cli::parse_from(["wtr-watch"]);

		assert_eq!(cli.path, PathBuf::from("."));
		assert!(cli.format.is_none());
		assert!(cli.library_dir.is_none());
		assert_eq!(cli.config_dir, PathBuf::from("."));
	}

	#[test]
	fn cli_flags() {
		let cli = Cli::parse_from([
			"wtr-watch",
			"/var/log",
			"--format",
			"json",
			"--library-dir",
			"/opt/wtr",
			"--config-dir",
			"/etc/wtr",
		]);

		assert_eq!(cli.path, PathBuf::from("/var/log"));
		assert_eq!(cli.format, Some(OutputFormat::Json));
		assert_eq!(cli.library_dir, Some(PathBuf::from("/opt/wtr")));
		assert_eq!(cli.config_dir, PathBuf::from("/etc/wtr"));
	}
}
