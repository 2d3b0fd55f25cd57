//! backupcrypt 命令行入口
//!
//! 用法：
//!   backupcrypt decrypt <container> --key <key 文件或十六进制> [--output <path>] [--format crypt15]
//!   backupcrypt decrypt-folder <dir> --key <...> --output <dir>
//!   backupcrypt inspect <container> [--format crypt15]
//!
//! 所有实际逻辑都委托给库；这里只负责参数、日志与输出。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use backupcrypt::format::container;
use backupcrypt::fs::atomic::write_atomic;
use backupcrypt::{ContainerFormat, DecodeRequest, spawn_decode};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "backupcrypt", version, about = "Decrypt crypt12 / crypt14 / crypt15 messaging backups")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decrypt a single backup container
    Decrypt {
        /// Encrypted container path
        input: PathBuf,
        /// Key file path, or the key as 64 hex characters
        #[arg(short, long, env = "BACKUPCRYPT_KEY", hide_env_values = true)]
        key: String,
        /// Output path (defaults to the input name without its .cryptNN suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Container format, overrides detection from the file name
        #[arg(long)]
        format: Option<ContainerFormat>,
    },
    /// Decrypt every container found under a directory
    DecryptFolder {
        /// Directory to scan recursively
        input: PathBuf,
        /// Key file path, or the key as 64 hex characters
        #[arg(short, long, env = "BACKUPCRYPT_KEY", hide_env_values = true)]
        key: String,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show container geometry without decrypting
    Inspect {
        /// Encrypted container path
        input: PathBuf,
        /// Container format, overrides detection from the file name
        #[arg(long)]
        format: Option<ContainerFormat>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("backupcrypt=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Decrypt {
            input,
            key,
            output,
            format,
        } => run_decrypt(&input, &key, output, format).await,
        Command::DecryptFolder { input, key, output } => run_decrypt_folder(&input, &key, &output),
        Command::Inspect { input, format } => run_inspect(&input, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_decrypt(
    input: &Path,
    key: &str,
    output: Option<PathBuf>,
    format: Option<ContainerFormat>,
) -> Result<()> {
    let key_material = load_key_material(key)?;
    let container =
        std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let mut request = DecodeRequest::new(container, key_material.to_vec());
    request.filename = file_name(input);
    request.format_override = format;

    if request.resolve_format().is_none() {
        bail!(
            "{} is not a recognized container (expected .crypt12, .crypt14 or .crypt15); use --format to override",
            input.display()
        );
    }

    let output = output.unwrap_or_else(|| default_output_path(input));

    let database = spawn_decode(request)
        .run_with(|step| info!("{step}"))
        .await
        .with_context(|| format!("decrypting {}", input.display()))?;

    write_atomic(&output, &database).with_context(|| format!("writing {}", output.display()))?;

    info!(bytes = database.len(), "wrote {}", output.display());
    Ok(())
}

fn run_decrypt_folder(input: &Path, key: &str, output: &Path) -> Result<()> {
    let key_material = load_key_material(key)?;

    let report = backupcrypt::decrypt_folder(input, output, &key_material)
        .with_context(|| format!("decrypting folder {}", input.display()))?;

    info!(
        decoded = report.decoded.len(),
        skipped = report.skipped.len(),
        "folder done"
    );
    Ok(())
}

fn run_inspect(input: &Path, format: Option<ContainerFormat>) -> Result<()> {
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let format = format
        .or_else(|| backupcrypt::classify(file_name(input).as_deref(), Some(data.as_slice())))
        .with_context(|| format!("{} is not a recognized container", input.display()))?;

    let parsed = container::parse(&data, format)?;

    println!("format:      {format}");
    println!("size:        {}", data.len());
    println!("iv:          {}", hex::encode(parsed.iv));
    println!(
        "ciphertext:  {}..{} ({} bytes)",
        parsed.ciphertext.start,
        parsed.ciphertext.end,
        parsed.ciphertext_len()
    );
    if let Some(tag) = parsed.tag {
        println!("tag:         {}", hex::encode(tag));
    }
    if let Some(header) = &parsed.header {
        println!("header len:  {}", header.header_len);
        println!("flag byte:   {}", header.feature_flag);
        println!("iv source:   {:?}", header.iv_source);
    }

    Ok(())
}

/// `--key` 若指向已存在的文件则读取其内容，否则把参数本身当作密钥材料
fn load_key_material(key: &str) -> Result<Zeroizing<Vec<u8>>> {
    let path = Path::new(key);
    if path.is_file() {
        let bytes = std::fs::read(path).with_context(|| format!("reading key {}", path.display()))?;
        return Ok(Zeroizing::new(bytes));
    }

    Ok(Zeroizing::new(key.trim().as_bytes().to_vec()))
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
}

/// `msgstore.db.crypt15` -> `msgstore.db`；无法识别后缀时追加 `.decrypted`
fn default_output_path(input: &Path) -> PathBuf {
    let recognized = input
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ContainerFormat::from_extension)
        .is_some();

    match (recognized, input.file_stem()) {
        (true, Some(stem)) if !stem.is_empty() => input.with_file_name(stem),
        _ => {
            let mut name = input.as_os_str().to_os_string();
            name.push(".decrypted");
            PathBuf::from(name)
        }
    }
}
