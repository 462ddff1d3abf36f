//! CLI Tooling
//!
//! Command-line interface for packing directory trees into bundles and
//! inspecting or serving existing bundles.

use crate::bundle;
use crate::config::{ConfigLoader, PackfsConfig};
use crate::content::LoadMode;
use crate::entry::Metadata;
use crate::error::ApiError;
use crate::fs::Filesystem;
use crate::generator::{emit_source, Generator};
use crate::handle::VirtualFile;
use crate::logging::LoggingConfig;
use crate::serve::server;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use tracing::info;

/// packfs - pack directory trees into a bundle and serve them read-only
#[derive(Parser)]
#[command(name = "packfs")]
#[command(about = "Pack directory trees into a compressed bundle and serve them as a read-only filesystem")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (default: ./packfs.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,
}

impl Cli {
    /// Fold the logging flags over the configured logging settings.
    pub fn logging_config(&self, mut base: LoggingConfig) -> LoggingConfig {
        if let Some(level) = &self.log_level {
            base.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            base.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            base.output = output.clone();
        }
        base
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Pack files and directories into a bundle
    Pack {
        /// Files or directories to pack, relative to the base directory
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Bundle file to write
        #[arg(short, long)]
        output: PathBuf,
        /// Compression level 0-9 (default from config, else 9)
        #[arg(long)]
        quality: Option<u32>,
        /// Keep only files whose name matches this glob
        #[arg(long)]
        include: Option<String>,
        /// Drop files whose name matches this glob
        #[arg(long)]
        exclude: Option<String>,
        /// Skip files ignored by .gitignore rules
        #[arg(long)]
        gitignore: bool,
        /// Directory entry paths are relative to
        #[arg(long)]
        base: Option<PathBuf>,
        /// Also write a Rust source file embedding the bundle
        #[arg(long)]
        emit_rs: Option<PathBuf>,
        /// Identifier used by the emitted source
        #[arg(long, default_value = "assets", requires = "emit_rs")]
        var: String,
    },
    /// List the entries of a bundle
    Ls {
        /// Bundle file
        bundle: PathBuf,
        /// Only list this path and what is below it
        #[arg(long, default_value = "")]
        root: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print one file from a bundle
    Cat {
        /// Bundle file
        bundle: PathBuf,
        /// Entry path inside the bundle
        path: String,
    },
    /// Serve a bundle over HTTP
    Serve {
        /// Bundle file
        bundle: PathBuf,
        /// Bundle directory served as the document root
        #[arg(long)]
        root: Option<String>,
        /// Listen address (default from config, else 127.0.0.1:8080)
        #[arg(long)]
        addr: Option<String>,
        /// Inflate file content on first open
        #[arg(long)]
        lazy: bool,
    },
}

/// CLI context holding the resolved configuration
pub struct CliContext {
    config: PackfsConfig,
}

impl CliContext {
    /// Create a new CLI context, loading configuration from `config_path` or
    /// the working directory.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(Path::new("."))?,
        };
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: PackfsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PackfsConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Pack {
                inputs,
                output,
                quality,
                include,
                exclude,
                gitignore,
                base,
                emit_rs,
                var,
            } => {
                let mut pack = self.config.pack.clone();
                if let Some(quality) = quality {
                    pack.quality = *quality;
                }
                if include.is_some() {
                    pack.include = include.clone();
                }
                if exclude.is_some() {
                    pack.exclude = exclude.clone();
                }
                if *gitignore {
                    pack.gitignore = true;
                }
                if base.is_some() {
                    pack.base = base.clone();
                }

                let generator = Generator::from_config(inputs.iter(), &pack)?;
                let entries = generator.collect()?;
                let count = entries.len();
                let packed = bundle::pack(entries, generator.quality())?;
                std::fs::write(output, &packed)?;
                info!(output = %output.display(), entries = count, "bundle written");

                let mut message = format!(
                    "Packed {} entries ({} bytes) into {}",
                    count,
                    packed.len(),
                    output.display()
                );
                if let Some(rs) = emit_rs {
                    let source = emit_source(var, &include_path(output, rs)?)?;
                    std::fs::write(rs, source)?;
                    message.push_str(&format!("\nWrote {}", rs.display()));
                }
                Ok(message)
            }
            Commands::Ls {
                bundle,
                root,
                format,
            } => {
                let fs = self.open_bundle(bundle, LoadMode::Lazy)?;
                let mut rows: Vec<(String, Metadata)> = Vec::new();
                fs.walk(root, |path, meta| {
                    rows.push((path.to_string(), meta.clone()));
                    Ok::<(), ApiError>(())
                })?;
                format_listing(&rows, format)
            }
            Commands::Cat { bundle, path } => {
                let bytes = self.read_file(bundle, path)?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Commands::Serve {
                bundle,
                root,
                addr,
                lazy,
            } => {
                let serve = &self.config.serve;
                let mode = LoadMode::from_lazy_flag(*lazy || serve.lazy);
                let root = root.as_deref().unwrap_or(&serve.root);
                let addr = addr.as_deref().unwrap_or(&serve.addr);

                let fs = self.open_bundle(bundle, mode)?;
                let handler = fs.serve(root);
                let listener = TcpListener::bind(addr)?;
                server::serve(listener, &handler)?;
                Ok(String::new())
            }
        }
    }

    /// Raw content of `path` inside `bundle`.
    pub fn read_file(&self, bundle: &Path, path: &str) -> Result<Vec<u8>, ApiError> {
        let fs = self.open_bundle(bundle, LoadMode::Lazy)?;
        let mut file = fs.open(path)?;
        let size = file.stat().size() as usize;
        let mut content = Vec::with_capacity(size);
        std::io::Read::read_to_end(&mut file, &mut content)?;
        file.close()?;
        Ok(content)
    }

    fn open_bundle(&self, bundle: &Path, mode: LoadMode) -> Result<Filesystem, ApiError> {
        let bytes = std::fs::read(bundle)?;
        Ok(Filesystem::load(mode, &bytes)?)
    }
}

/// Path of `bundle` as seen from the directory of `rs_file`, for `include_bytes!`.
fn include_path(bundle: &Path, rs_file: &Path) -> Result<String, ApiError> {
    let bundle_dir = bundle.parent().unwrap_or(Path::new(""));
    let rs_dir = rs_file.parent().unwrap_or(Path::new(""));
    let path = if bundle_dir == rs_dir {
        PathBuf::from(bundle.file_name().unwrap_or(bundle.as_os_str()))
    } else {
        std::fs::canonicalize(bundle)?
    };
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| ApiError::InvalidEntry(format!("{} is not valid UTF-8", path.display())))
}

fn format_listing(rows: &[(String, Metadata)], format: &str) -> Result<String, ApiError> {
    if format == "json" {
        let arr: Vec<serde_json::Value> = rows
            .iter()
            .map(|(path, meta)| {
                json!({
                    "path": path,
                    "dir": meta.is_dir(),
                    "size": meta.size(),
                    "mode": meta.mode().to_string(),
                    "modified": meta.modified().to_rfc3339(),
                })
            })
            .collect();
        return serde_json::to_string_pretty(&arr)
            .map_err(|e| ApiError::ConfigError(e.to_string()));
    }
    if format != "text" {
        return Err(ApiError::ConfigError(format!(
            "Invalid format: {} (must be 'text' or 'json')",
            format
        )));
    }

    use comfy_table::Table;
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Mode", "Size", "Modified", "Path"]);
    for (path, meta) in rows {
        table.add_row(vec![
            meta.mode().to_string(),
            meta.size().to_string(),
            meta.modified().format("%Y-%m-%d %H:%M:%S").to_string(),
            path.clone(),
        ]);
    }
    Ok(table.to_string())
}
