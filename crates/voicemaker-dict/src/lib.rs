//! Two-tier pronunciation dictionary.
//!
//! A [`Dictionary`] owns two independent stores:
//!
//! - **Preferred**: exact-match word overrides kept in a fixed-size hash table
//!   ([`BUCKETS`] buckets). Each bucket is a list with the newest insert at the
//!   head, so duplicates may coexist and the most recent one wins lookups.
//! - **Filter**: an append-ordered list of substring corrections. Every entry
//!   is applied, in insertion order, by the text filter pass.
//!
//! Each store also tracks an *extension ratio*, the worst-case
//! destination/source length multiplier seen so far, which callers use to
//! pre-size their output buffers.
//!
//! Both stores persist to plain text files with one `"<source> <destination>"`
//! pair per line.
//!
//! # Example
//! ```no_run
//! use voicemaker_dict::Dictionary;
//! use voicemaker_types::DictKind;
//!
//! # fn main() -> Result<(), voicemaker_dict::DictError> {
//! let mut dict = Dictionary::new();
//! dict.set_paths("preferred.dic", "filter.dic")?;
//! dict.load()?;
//! dict.add_word_pair("rust", "ラスト", DictKind::Preferred)?;
//! assert_eq!(dict.get_dst_word("rust"), Some("ラスト"));
//! dict.save()?;
//! # Ok(()) }
//! ```

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use voicemaker_types::{DictKind, WordPair};

/// Number of hash buckets in the Preferred store.
pub const BUCKETS: usize = 5003;

/// Extension ratio of a store that has never seen an insertion.
pub const MIN_EXTENSION_RATIO: usize = 2;

/// Kana and symbol corrections a fresh session starts with.
///
/// Longer sources precede their prefixes so that `ヴェ` becomes `ベ` rather
/// than `ブェ`. Loading a filter file replaces these.
pub const DEFAULT_FILTERS: &[(&str, &str)] = &[
    ("＝", "イコール"),
    ("=", "イコール"),
    ("づ", "ず"),
    ("ヅ", "ズ"),
    ("ゔぁ", "ば"),
    ("ヴァ", "バ"),
    ("ゔぃ", "び"),
    ("ヴィ", "ビ"),
    ("ゔぇ", "べ"),
    ("ヴェ", "ベ"),
    ("ゔぉ", "ぼ"),
    ("ヴォ", "ボ"),
    ("ゔ", "ぶ"),
    ("ヴ", "ブ"),
    ("ぁ", "あ"),
    ("ぃ", "い"),
    ("ぅ", "う"),
    ("ぇ", "え"),
    ("ぉ", "お"),
    ("き", "キ"),
    ("し", "シ"),
    ("ひ", "ヒ"),
    ("に", "ニ"),
    ("み", "ミ"),
    ("り", "リ"),
    ("ぎ", "ギ"),
    ("じ", "ジ"),
    ("び", "ビ"),
    ("ゃ", "ャ"),
    ("ゅ", "ュ"),
    ("ょ", "ョ"),
];

#[derive(Debug, Error)]
pub enum DictError {
    #[error("dictionary path for {0} store is empty")]
    EmptyPath(DictKind),
    #[error("dictionary paths have not been set")]
    PathsNotSet,
    #[error("word pair source is empty")]
    EmptySource,
    #[error("word pair destination is empty")]
    EmptyDestination,
    #[error("word pair for {0:?} cannot be persisted (space in source or line break)")]
    Unpersistable(String),
    #[error("failed to read dictionary {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write dictionary {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to add entry at {}:{line}: {source}", path.display())]
    Entry {
        path: PathBuf,
        line: usize,
        #[source]
        source: Box<DictError>,
    },
}

impl DictError {
    /// True for failures caused by the file system rather than dictionary content.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            DictError::PathsNotSet | DictError::Read { .. } | DictError::Write { .. }
        )
    }
}

#[derive(Clone, Debug)]
struct Paths {
    preferred: PathBuf,
    filter: PathBuf,
}

/// Preferred override table plus ordered Filter list, with persistence.
///
/// Not internally synchronized; callers serialize access.
#[derive(Debug)]
pub struct Dictionary {
    preferred: Vec<VecDeque<WordPair>>,
    preferred_len: usize,
    filter: Vec<WordPair>,
    preferred_ratio: usize,
    filter_ratio: usize,
    paths: Option<Paths>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    /// Empty dictionary with both ratios at [`MIN_EXTENSION_RATIO`].
    pub fn new() -> Self {
        Self {
            preferred: vec![VecDeque::new(); BUCKETS],
            preferred_len: 0,
            filter: Vec::new(),
            preferred_ratio: MIN_EXTENSION_RATIO,
            filter_ratio: MIN_EXTENSION_RATIO,
            paths: None,
        }
    }

    /// Empty Preferred store and a Filter store seeded with [`DEFAULT_FILTERS`].
    pub fn with_default_filters() -> Self {
        let mut dict = Self::new();
        for &(source, destination) in DEFAULT_FILTERS {
            if let Err(err) = dict.add_word_pair(source, destination, DictKind::Filter) {
                warn!("skipping default filter {source:?}: {err}");
            }
        }
        dict
    }

    /// Record where [`load`](Self::load) and [`save`](Self::save) read and write.
    pub fn set_paths(
        &mut self,
        preferred: impl AsRef<Path>,
        filter: impl AsRef<Path>,
    ) -> Result<(), DictError> {
        let preferred = preferred.as_ref();
        let filter = filter.as_ref();
        if preferred.as_os_str().is_empty() {
            return Err(DictError::EmptyPath(DictKind::Preferred));
        }
        if filter.as_os_str().is_empty() {
            return Err(DictError::EmptyPath(DictKind::Filter));
        }
        self.paths = Some(Paths {
            preferred: preferred.to_path_buf(),
            filter: filter.to_path_buf(),
        });
        Ok(())
    }

    pub fn paths(&self) -> Option<(&Path, &Path)> {
        self.paths
            .as_ref()
            .map(|p| (p.preferred.as_path(), p.filter.as_path()))
    }

    /// Replace both stores with the contents of the persisted files.
    ///
    /// Both files are opened before anything is cleared, so a missing file
    /// leaves the current entries untouched. Blank and malformed lines are
    /// skipped. A failing insert aborts the load and keeps whatever was
    /// already loaded.
    pub fn load(&mut self) -> Result<(), DictError> {
        let paths = self.paths.clone().ok_or(DictError::PathsNotSet)?;
        let preferred = open_reader(&paths.preferred)?;
        let filter = open_reader(&paths.filter)?;

        self.clear();
        let preferred_count = self.load_store(preferred, &paths.preferred, DictKind::Preferred)?;
        let filter_count = self.load_store(filter, &paths.filter, DictKind::Filter)?;
        info!(
            "loaded {preferred_count} preferred and {filter_count} filter pairs (ratios {}/{})",
            self.preferred_ratio, self.filter_ratio
        );
        Ok(())
    }

    fn load_store(
        &mut self,
        reader: BufReader<File>,
        path: &Path,
        kind: DictKind,
    ) -> Result<usize, DictError> {
        let mut count = 0usize;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| DictError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if line.is_empty() {
                continue;
            }
            let Some((source, destination)) = parse_line(line) else {
                warn!("skipping malformed line {} in {}", lineno + 1, path.display());
                continue;
            };
            self.add_word_pair(source, destination, kind)
                .map_err(|err| DictError::Entry {
                    path: path.to_path_buf(),
                    line: lineno + 1,
                    source: Box::new(err),
                })?;
            count += 1;
        }
        Ok(count)
    }

    /// Write Preferred then Filter to their files, one pair per line.
    ///
    /// Preferred buckets are written oldest entry first so that a reload
    /// restores the same lookup precedence among duplicates.
    pub fn save(&self) -> Result<(), DictError> {
        let paths = self.paths.as_ref().ok_or(DictError::PathsNotSet)?;
        write_pairs(
            &paths.preferred,
            self.preferred.iter().flat_map(|bucket| bucket.iter().rev()),
        )?;
        write_pairs(&paths.filter, self.filter.iter())?;
        debug!(
            "saved {} preferred and {} filter pairs",
            self.preferred_len,
            self.filter.len()
        );
        Ok(())
    }

    /// Insert a pair into the selected store and update its extension ratio.
    pub fn add_word_pair(
        &mut self,
        source: &str,
        destination: &str,
        kind: DictKind,
    ) -> Result<(), DictError> {
        if source.is_empty() {
            return Err(DictError::EmptySource);
        }
        if source.contains([' ', '\n', '\r']) || destination.contains(['\n', '\r']) {
            return Err(DictError::Unpersistable(source.to_string()));
        }
        let pair = WordPair::new(source, destination).ok_or(DictError::EmptyDestination)?;
        let ratio = destination.len() / source.len() + 1;
        match kind {
            DictKind::Preferred => {
                self.preferred[bucket_of(source)].push_front(pair);
                self.preferred_len += 1;
                self.preferred_ratio = self.preferred_ratio.max(ratio);
            }
            DictKind::Filter => {
                self.filter.push(pair);
                self.filter_ratio = self.filter_ratio.max(ratio);
            }
        }
        Ok(())
    }

    /// Remove every entry of `kind` whose source equals `source`.
    ///
    /// Returns the number of removed entries. Extension ratios are unchanged.
    pub fn del_word_pair(&mut self, source: &str, kind: DictKind) -> usize {
        match kind {
            DictKind::Preferred => {
                let bucket = &mut self.preferred[bucket_of(source)];
                let before = bucket.len();
                bucket.retain(|pair| pair.source() != source);
                let removed = before - bucket.len();
                self.preferred_len -= removed;
                removed
            }
            DictKind::Filter => {
                let before = self.filter.len();
                self.filter.retain(|pair| pair.source() != source);
                before - self.filter.len()
            }
        }
    }

    /// Preferred-store lookup; the most recent insert for `source` wins.
    pub fn get_dst_word(&self, source: &str) -> Option<&str> {
        self.preferred[bucket_of(source)]
            .iter()
            .find(|pair| pair.source() == source)
            .map(WordPair::destination)
    }

    pub fn extension_ratio(&self, kind: DictKind) -> usize {
        match kind {
            DictKind::Preferred => self.preferred_ratio,
            DictKind::Filter => self.filter_ratio,
        }
    }

    /// Filter pairs in insertion order.
    pub fn filter_pairs(&self) -> std::slice::Iter<'_, WordPair> {
        self.filter.iter()
    }

    pub fn len(&self, kind: DictKind) -> usize {
        match kind {
            DictKind::Preferred => self.preferred_len,
            DictKind::Filter => self.filter.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.preferred_len == 0 && self.filter.is_empty()
    }

    fn clear(&mut self) {
        for bucket in &mut self.preferred {
            bucket.clear();
        }
        self.preferred_len = 0;
        self.filter.clear();
    }
}

/// Polynomial rolling hash of the source bytes, seeded with their length.
fn hash_source(source: &str) -> u32 {
    source
        .bytes()
        .fold(source.len() as u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
}

fn bucket_of(source: &str) -> usize {
    hash_source(source) as usize % BUCKETS
}

/// Split a persisted line at its first space.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let (source, destination) = line.split_once(' ')?;
    if source.is_empty() || destination.is_empty() {
        return None;
    }
    Some((source, destination))
}

fn open_reader(path: &Path) -> Result<BufReader<File>, DictError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| DictError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn write_pairs<'a>(
    path: &Path,
    pairs: impl Iterator<Item = &'a WordPair>,
) -> Result<(), DictError> {
    let to_err = |source| DictError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_err)?;
    let mut writer = BufWriter::new(file);
    for pair in pairs {
        writeln!(writer, "{} {}", pair.source(), pair.destination()).map_err(to_err)?;
    }
    writer.flush().map_err(to_err)
}
