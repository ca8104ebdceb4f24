use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use thiserror::Error;

/// Strategy for loading voice model files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the model file (fast, zero-copy).
    Mmap,
    /// Read the model into an owned buffer (portable fallback).
    Owned,
}

impl LoadMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "mmap" => Some(LoadMode::Mmap),
            "owned" => Some(LoadMode::Owned),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to open model {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read model {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

/// Voice model bytes handed to the synthesizer.
pub struct ModelData {
    buffer: Buffer,
}

impl ModelData {
    pub fn load(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }
        let mut file = File::open(path).map_err(|source| ModelError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let buffer = match mode {
            LoadMode::Mmap => unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .map_err(|source| ModelError::Read {
                    path: path.to_path_buf(),
                    source,
                })?,
            LoadMode::Owned => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)
                    .map_err(|source| ModelError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Buffer::Owned(buf)
            }
        };
        Ok(Self { buffer })
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.buffer {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}
