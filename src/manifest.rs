//! Merge inputs described as data: a TOML manifest, or a fixed list of entry names.
//!
//! ```toml
//! output = "out/kernels.bin"
//! base_dir = "build/kernels"
//!
//! [[kernel]]
//! name = "copy_nv12"
//! path = "copy_nv12.bin"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::writer::KernelSource;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One `[[kernel]]` table. Without a name, the file stem is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestKernel {
    #[serde(default)]
    pub name: Option<String>,
    pub path: PathBuf,
}

/// Ordered kernel list plus optional output path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeManifest {
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Directory relative kernel paths resolve against. Defaults to the manifest's directory.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default, rename = "kernel")]
    pub kernels: Vec<ManifestKernel>,
    #[serde(skip)]
    origin: Option<PathBuf>,
}

impl MergeManifest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::parse(&text)?;
        manifest.origin = path.parent().map(Path::to_path_buf);
        Ok(manifest)
    }

    /// Parse manifest text. Relative paths resolve against the working directory
    /// unless `base_dir` is set.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(text)?)
    }

    /// Build a manifest from a fixed name list resolved in `dir`.
    #[must_use]
    pub fn from_layout(layout: &FixedLayout<'_>, dir: &Path) -> Self {
        Self {
            output: None,
            base_dir: Some(dir.to_path_buf()),
            kernels: layout
                .file_names()
                .zip(layout.names)
                .map(|(file, name)| ManifestKernel {
                    name: Some((*name).to_string()),
                    path: PathBuf::from(file),
                })
                .collect(),
            origin: None,
        }
    }

    fn root(&self) -> Option<PathBuf> {
        match (&self.base_dir, &self.origin) {
            (Some(base), Some(origin)) if base.is_relative() => Some(origin.join(base)),
            (Some(base), _) => Some(base.clone()),
            (None, origin) => origin.clone(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match self.root() {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Kernel sources in manifest order with paths resolved.
    #[must_use]
    pub fn sources(&self) -> Vec<KernelSource> {
        self.kernels
            .iter()
            .map(|k| {
                let path = self.resolve(&k.path);
                match &k.name {
                    Some(name) => KernelSource::new(name.clone(), path),
                    None => KernelSource::from_path(path),
                }
            })
            .collect()
    }

    /// Output path, resolved like kernel paths.
    #[must_use]
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output.as_deref().map(|p| self.resolve(p))
    }
}

/// A fixed, ordered set of kernel names, each stored as `<name>.<extension>` in one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLayout<'n> {
    pub names: &'n [&'n str],
    pub extension: &'n str,
}

impl<'n> FixedLayout<'n> {
    #[must_use]
    pub const fn new(names: &'n [&'n str], extension: &'n str) -> Self {
        Self { names, extension }
    }

    fn file_names(&self) -> impl Iterator<Item = String> + '_ {
        self.names.iter().map(move |name| {
            if self.extension.is_empty() {
                (*name).to_string()
            } else {
                format!("{name}.{}", self.extension)
            }
        })
    }

    #[must_use]
    pub fn sources(&self, dir: &Path) -> Vec<KernelSource> {
        self.file_names()
            .zip(self.names)
            .map(|(file, name)| KernelSource::new(*name, dir.join(file)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIX: FixedLayout<'static> = FixedLayout::new(
        &["copy_1d_to_2d", "copy_2d_to_1d", "copy_2d_to_2d", "scale", "csc", "blend"],
        "krn",
    );

    #[test]
    fn parse_manifest_keeps_order() {
        let m = MergeManifest::parse(
            r#"
            output = "merged.bin"
            base_dir = "/kernels"

            [[kernel]]
            name = "b"
            path = "b.bin"

            [[kernel]]
            path = "a.bin"
            "#,
        )
        .unwrap();
        let sources = m.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "b");
        assert_eq!(sources[0].path, Path::new("/kernels/b.bin"));
        assert_eq!(sources[1].name, "a");
        assert_eq!(m.output_path().unwrap(), Path::new("/kernels/merged.bin"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = MergeManifest::parse("outptu = \"x\"").unwrap_err();
        assert!(err.to_string().contains("outptu"));
    }

    #[test]
    fn absolute_paths_are_not_rebased() {
        let m = MergeManifest::parse(
            "base_dir = \"/kernels\"\n[[kernel]]\npath = \"/elsewhere/k.bin\"\n",
        )
        .unwrap();
        assert_eq!(m.sources()[0].path, Path::new("/elsewhere/k.bin"));
    }

    #[test]
    fn fixed_layout_resolves_in_dir() {
        let sources = SIX.sources(Path::new("/out"));
        assert_eq!(sources.len(), 6);
        assert_eq!(sources[3].name, "scale");
        assert_eq!(sources[3].path, Path::new("/out/scale.krn"));

        let manifest = MergeManifest::from_layout(&SIX, Path::new("/out"));
        assert_eq!(manifest.sources(), sources);
    }
}
