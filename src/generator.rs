//! Bundle generator
//!
//! Walks input files and directories, turns them into entries named relative
//! to a base directory and packs them. Also emits a small Rust source file
//! that embeds a bundle with `include_bytes!`.
//!
//! With gitignore mode on, `.gitignore` files in the base directory and below
//! it are honored. A directory's rules apply to everything under it, and the
//! nearest matching rule wins.

use crate::bundle::{self, MAX_LEVEL};
use crate::config::PackSection;
use crate::entry::{path_order, Entry};
use crate::error::ApiError;
use glob::Pattern;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

/// Collects entries from disk and packs them into a bundle.
#[derive(Debug, Clone)]
pub struct Generator {
    inputs: Vec<PathBuf>,
    base: PathBuf,
    include: Option<Pattern>,
    exclude: Option<Pattern>,
    gitignore: bool,
    quality: u32,
}

impl Generator {
    pub fn new<I, P>(inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            base: PathBuf::from("."),
            include: None,
            exclude: None,
            gitignore: false,
            quality: MAX_LEVEL,
        }
    }

    /// Generator for `inputs` with filters, base and quality taken from config.
    pub fn from_config<I, P>(inputs: I, pack: &PackSection) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut generator = Self::new(inputs)
            .with_quality(pack.quality)
            .with_gitignore(pack.gitignore);
        if let Some(base) = &pack.base {
            generator = generator.with_base(base);
        }
        if let Some(include) = &pack.include {
            generator = generator.with_include(include)?;
        }
        if let Some(exclude) = &pack.exclude {
            generator = generator.with_exclude(exclude)?;
        }
        Ok(generator)
    }

    /// Directory entry paths are made relative to.
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }

    /// Keep only files whose name matches `pattern`.
    pub fn with_include(mut self, pattern: &str) -> Result<Self, ApiError> {
        self.include = Some(Pattern::new(pattern)?);
        Ok(self)
    }

    /// Drop files whose name matches `pattern`.
    pub fn with_exclude(mut self, pattern: &str) -> Result<Self, ApiError> {
        self.exclude = Some(Pattern::new(pattern)?);
        Ok(self)
    }

    /// Skip whatever `.gitignore` files under the base directory ignore.
    pub fn with_gitignore(mut self, enabled: bool) -> Self {
        self.gitignore = enabled;
        self
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    pub fn quality(&self) -> u32 {
        self.quality
    }

    /// Walk every input and return the entries in canonical order.
    ///
    /// Every directory between the base and an input is included, and paths
    /// reached through more than one input appear once.
    pub fn collect(&self) -> Result<Vec<Entry>, ApiError> {
        let base = std::fs::canonicalize(&self.base)?;
        let mut entries: BTreeMap<String, Entry> = BTreeMap::new();
        let mut rules = IgnoreRules::new(base.clone());

        for input in &self.inputs {
            let input = std::fs::canonicalize(self.base.join(input))?;
            let relative = input.strip_prefix(&base).map_err(|_| {
                ApiError::InvalidEntry(format!(
                    "{} is outside of base {}",
                    input.display(),
                    base.display()
                ))
            })?;
            let relative = entry_path(relative)?;
            self.add_ancestors(&base, &relative, &mut entries)?;

            let mut walker = WalkDir::new(&input)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter();
            while let Some(dent) = walker.next() {
                let dent = dent?;
                let file_type = dent.file_type();
                if !file_type.is_dir() && !file_type.is_file() {
                    debug!(path = %dent.path().display(), "skipping non-regular file");
                    continue;
                }
                if self.gitignore
                    && dent.depth() > 0
                    && rules.is_ignored(dent.path(), file_type.is_dir())?
                {
                    debug!(path = %dent.path().display(), "ignored by .gitignore");
                    if file_type.is_dir() {
                        walker.skip_current_dir();
                    }
                    continue;
                }
                if file_type.is_file() && !self.keeps(&dent.file_name().to_string_lossy()) {
                    continue;
                }
                let name = entry_path(dent.path().strip_prefix(&base).unwrap_or(dent.path()))?;
                if name.is_empty() || entries.contains_key(&name) {
                    continue;
                }
                let entry = Entry::from_disk(dent.path(), name.clone())?;
                entries.insert(name, entry);
            }
        }

        let mut entries: Vec<Entry> = entries.into_values().collect();
        entries.sort_by(|a, b| path_order(&a.path, &b.path));
        Ok(entries)
    }

    /// Collect and pack at the configured quality.
    pub fn generate(&self) -> Result<Vec<u8>, ApiError> {
        let entries = self.collect()?;
        let count = entries.len();
        let bundle = bundle::pack(entries, self.quality)?;
        info!(entries = count, bytes = bundle.len(), quality = self.quality, "bundle generated");
        Ok(bundle)
    }

    fn keeps(&self, file_name: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .map(|p| p.matches(file_name))
            .unwrap_or(true);
        let excluded = self
            .exclude
            .as_ref()
            .map(|p| p.matches(file_name))
            .unwrap_or(false);
        included && !excluded
    }

    fn add_ancestors(
        &self,
        base: &Path,
        relative: &str,
        entries: &mut BTreeMap<String, Entry>,
    ) -> Result<(), ApiError> {
        let mut prefix = String::new();
        let mut segments = relative.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                break;
            }
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            if !entries.contains_key(&prefix) {
                let entry = Entry::from_disk(&base.join(&prefix), prefix.clone())?;
                entries.insert(prefix.clone(), entry);
            }
        }
        Ok(())
    }
}

/// `.gitignore` matchers per directory, loaded on first use.
struct IgnoreRules {
    base: PathBuf,
    matchers: HashMap<PathBuf, Option<Gitignore>>,
}

impl IgnoreRules {
    fn new(base: PathBuf) -> Self {
        Self {
            base,
            matchers: HashMap::new(),
        }
    }

    /// Whether `path` is ignored, consulting directories from its parent up to the base.
    fn is_ignored(&mut self, path: &Path, is_dir: bool) -> Result<bool, ApiError> {
        for dir in path.ancestors().skip(1) {
            if !dir.starts_with(&self.base) {
                break;
            }
            if let Some(matcher) = self.matcher(dir)? {
                match matcher.matched(path, is_dir) {
                    Match::Ignore(_) => return Ok(true),
                    Match::Whitelist(_) => return Ok(false),
                    Match::None => {}
                }
            }
        }
        Ok(false)
    }

    fn matcher(&mut self, dir: &Path) -> Result<Option<&Gitignore>, ApiError> {
        if !self.matchers.contains_key(dir) {
            let file = dir.join(".gitignore");
            let matcher = if file.is_file() {
                let mut builder = GitignoreBuilder::new(dir);
                if let Some(err) = builder.add(&file) {
                    return Err(err.into());
                }
                Some(builder.build()?)
            } else {
                None
            };
            self.matchers.insert(dir.to_path_buf(), matcher);
        }
        Ok(self.matchers.get(dir).and_then(Option::as_ref))
    }
}

/// Slash-separated, NFC-normalized entry path for a relative filesystem path.
fn entry_path(relative: &Path) -> Result<String, ApiError> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| {
                    ApiError::InvalidEntry(format!(
                        "{} is not valid UTF-8",
                        relative.display()
                    ))
                })?;
                segments.push(name.nfc().collect::<String>());
            }
            Component::CurDir => {}
            _ => {
                return Err(ApiError::InvalidEntry(format!(
                    "{} is not a relative path",
                    relative.display()
                )))
            }
        }
    }
    Ok(segments.join("/"))
}

/// Rust source embedding `bundle_file` as `VAR` with a `var()` constructor.
pub fn emit_source(var: &str, bundle_file: &str) -> Result<String, ApiError> {
    let valid = var
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && var.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ApiError::ConfigError(format!(
            "{var:?} is not a valid Rust identifier"
        )));
    }

    let upper = var.to_ascii_uppercase();
    let lower = var.to_ascii_lowercase();
    Ok(format!(
        "// Code generated by packfs. DO NOT EDIT.\n\
         \n\
         pub static {upper}: &[u8] = include_bytes!({bundle_file:?});\n\
         \n\
         pub fn {lower}() -> packfs::Filesystem {{\n    \
         packfs::Filesystem::new(packfs::LoadMode::Eager, {upper})\n\
         }}\n"
    ))
}
