//! Loading external resources and turning them into data URLs

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Maps a resolved resource name to a byte stream
pub trait ResourceLoader: Send + Sync {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read>>;
}

impl<F> ResourceLoader for F
where
    F: Fn(&str) -> io::Result<Box<dyn Read>> + Send + Sync,
{
    fn open(&self, name: &str) -> io::Result<Box<dyn Read>> {
        self(name)
    }
}

/// Reads resources from the local file system.
///
/// Relative names are resolved against `base` when one is set, otherwise
/// against the working directory.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    base: Option<PathBuf>,
}

impl FsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ResourceLoader for FsLoader {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(File::open(self.resolve(name))?))
    }
}

/// Read a whole stream into a `data:<media>;base64,...` URL
pub fn to_data_url(mut stream: impl Read, media: &str) -> io::Result<String> {
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    Ok(format!("data:{};base64,{}", media, STANDARD.encode(bytes)))
}
