use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};

use ntfs_salvage_core::{
    materialize, parse_mft, read_boot_sector, read_mft, GeometryOverrides, PathResolveError,
    PathResolver,
};

/// Recover files from an NTFS volume by directly decoding its on-disk
/// structures, without mounting the filesystem.
#[derive(Parser)]
#[command(name = "ntfs-salvage")]
#[command(about = "Recover files from an NTFS volume", long_about = None)]
struct Cli {
    /// NTFS partition or disk image (e.g. /dev/sdb1, an image file)
    disk: PathBuf,

    /// Sector size in bytes (default: trust the filesystem)
    #[arg(long = "sector-size")]
    sector_size: Option<u16>,

    /// Cluster size in sectors (default: trust the filesystem)
    #[arg(long = "cluster-size")]
    cluster_size: Option<u8>,

    /// Use the given file as a pre-read MFT image instead of loading it
    /// from the disk
    #[arg(long = "mft")]
    mft: Option<PathBuf>,

    /// Write the loaded MFT byte image to the given file for later reuse
    #[arg(long = "save-mft")]
    save_mft: Option<PathBuf>,

    /// Recover files matching this glob pattern; may be given multiple
    /// times. Matches against both the bare filename and the full
    /// reconstructed path, case-insensitively. With no pattern, paths
    /// are listed but nothing is extracted.
    #[arg(short = 'p', long = "pattern")]
    pattern: Vec<String>,

    /// Output directory (default: current directory)
    #[arg(short = 'o', long = "outdir")]
    outdir: Option<PathBuf>,

    /// Verbose logging (-v, -vv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(outdir) = &cli.outdir {
        std::fs::create_dir_all(outdir)?;
    }
    let outdir = cli.outdir.clone().unwrap_or_else(|| PathBuf::from("."));

    let disk = File::open(&cli.disk)?;
    let mut reader = ntfs_salvage_core::FileBlockReader::new(disk);

    let geometry = read_boot_sector(
        &mut reader,
        GeometryOverrides {
            sector_size: cli.sector_size,
            cluster_size: cli.cluster_size,
        },
    )?;
    let bpc = geometry.bytes_per_cluster();

    eprintln!("Reading MFT");
    let mft_bytes = match &cli.mft {
        Some(path) => std::fs::read(path)?,
        None => read_mft(&mut reader, &geometry, geometry.clusters_per_mft_record_hint)?,
    };

    if let Some(save_path) = &cli.save_mft {
        std::fs::write(save_path, &mft_bytes)?;
    }

    eprintln!("Parsing {} MFT slots", mft_bytes.len() / 1024);
    let mft_index = parse_mft(bpc, &mft_bytes);

    let patterns: Vec<Pattern> = cli
        .pattern
        .iter()
        .filter_map(|p| Pattern::new(&p.to_lowercase()).ok())
        .collect();

    let mut resolver = PathResolver::new();
    let total_records = mft_index.len();

    let progress = ProgressBar::new(total_records as u64);
    progress.set_style(
        ProgressStyle::with_template("Scanning: {pos}/{len} [{bar:40}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for (i, slot) in mft_index.iter().enumerate() {
        progress.inc(1);
        let attrs = match slot {
            Some(attrs) => attrs,
            None => continue,
        };

        let file_name = attrs
            .get(&ntfs_salvage_core::AttrShortName::FileName)
            .and_then(|streams| streams.get(&None));
        let file_name = match file_name {
            Some(v) => v,
            None => continue,
        };
        let bytes = match file_name.materialize(&mut reader) {
            Ok(b) => b,
            Err(_) => continue,
        };
        let (_, fn_) = match ntfs_salvage_core::parse_file_name(&bytes) {
            Ok(v) => v,
            Err(_) => continue,
        };

        let full_path = match resolver.path_of(&mft_index, total_records, i as u64) {
            Ok(components) => components.join("/"),
            Err(PathResolveError::Orphaned(_)) | Err(PathResolveError::CycleDetected(_)) => {
                format!("__ORPHANED__/{}", fn_)
            }
        };

        if patterns.is_empty() {
            println!("{}", full_path);
            continue;
        }

        let fn_lower = fn_.to_lowercase();
        let path_lower = full_path.to_lowercase();
        let matched = patterns
            .iter()
            .any(|pat| pat.matches(&fn_lower) || pat.matches(&path_lower));

        if !matched {
            continue;
        }

        print!("Recovering {} ", full_path);
        match materialize(attrs, &mut reader) {
            Ok(extracted) => {
                match write_extracted(&outdir, &full_path, &extracted) {
                    Ok(()) => println!("Success!"),
                    Err(e) => println!("failed: {}", e),
                }
            }
            Err(e) => println!("failed: {}", e),
        }
    }
    progress.finish_and_clear();

    Ok(())
}

/// Write an extracted file's primary stream and ADS under `outdir`,
/// creating parent directories and suffixing on collision.
fn write_extracted(
    outdir: &Path,
    relative_path: &str,
    extracted: &ntfs_salvage_core::ExtractedFile,
) -> anyhow::Result<()> {
    let dest = outdir.join(relative_path);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    write_with_collision_suffix(&dest, &extracted.primary)?;

    for (stream_name, bytes) in &extracted.alternates {
        let ads_dest = append_suffix(&dest, &format!("~{}", stream_name));
        write_with_collision_suffix(&ads_dest, bytes)?;
    }

    Ok(())
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

/// Open `path` for writing; if it already exists, append `_0000`,
/// `_0001`, … until a free name is found.
fn write_with_collision_suffix(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if !path.exists() {
        let mut f = File::create(path)?;
        f.write_all(bytes)?;
        return Ok(());
    }

    let mut attempt = 0u32;
    loop {
        let candidate = append_suffix(path, &format!("_{:04}", attempt));
        if !candidate.exists() {
            let mut f = File::create(&candidate)?;
            f.write_all(bytes)?;
            return Ok(());
        }
        attempt += 1;
    }
}
