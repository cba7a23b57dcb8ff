//! Server-side attachment tags
//!
//! Tag files are registered per map. Each file contributes a contiguous run
//! of named orientations to one shared table.
//!
//! File format (little-endian):
//!
//! ```text
//! "TAGS"  ident
//! i32     version (1)
//! i32     count
//! count x { name[64], origin[3], axis[3][3] }
//! ```

use svgame_abi::layout::{get_i32, get_vec3, Orientation};
use svgame_abi::{MAX_QPATH, MAX_SERVER_TAGS, MAX_TAG_FILES, TAG_IDENT, TAG_VERSION};

use crate::error::TrapError;

const HEADER_SIZE: usize = 12;
const ENTRY_SIZE: usize = MAX_QPATH + Orientation::SIZE;

#[derive(Clone, Debug, PartialEq)]
struct Tag {
    name: String,
    orientation: Orientation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct TagFile {
    filename: String,
    start: usize,
    count: usize,
}

/// Registered tag files and their tags.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TagRegistry {
    files: Vec<TagFile>,
    tags: Vec<Tag>,
}

impl TagRegistry {
    /// Forget everything; done on every map change.
    pub fn clear(&mut self) {
        self.files.clear();
        self.tags.clear();
    }

    pub fn num_files(&self) -> usize {
        self.files.len()
    }

    pub fn num_tags(&self) -> usize {
        self.tags.len()
    }

    /// Number of an already registered file, 1-based.
    pub fn file_number(&self, filename: &str) -> Option<i32> {
        self.files
            .iter()
            .position(|f| f.filename.eq_ignore_ascii_case(filename))
            .map(|i| i as i32 + 1)
    }

    /// Register `filename` whose contents are `data`.
    ///
    /// Returns the 1-based file number, or 0 when the data is not a tag
    /// file of the supported version.
    pub fn register(&mut self, filename: &str, data: &[u8]) -> Result<i32, TrapError> {
        if let Some(number) = self.file_number(filename) {
            return Ok(number);
        }
        if self.files.len() >= MAX_TAG_FILES {
            return Err(TrapError::TagFileLimit);
        }

        let Some(entries) = parse(data) else {
            log::warn!("[game] {filename} is not a version {TAG_VERSION} tag file");
            return Ok(0);
        };
        if self.tags.len() + entries.len() > MAX_SERVER_TAGS {
            return Err(TrapError::ServerTagLimit);
        }

        let start = self.tags.len();
        let count = entries.len();
        self.tags.extend(entries);
        self.files.push(TagFile {
            filename: String::from(filename),
            start,
            count,
        });
        Ok(self.files.len() as i32)
    }

    /// Look up `name` in file `file_number` (1-based), ignoring case.
    pub fn lookup(&self, file_number: i32, name: &str) -> Option<&Orientation> {
        if file_number < 1 {
            return None;
        }
        let file = self.files.get(file_number as usize - 1)?;
        self.tags[file.start..file.start + file.count]
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .map(|t| &t.orientation)
    }
}

fn parse(data: &[u8]) -> Option<Vec<Tag>> {
    let header = data.get(..HEADER_SIZE)?;
    if header[..4] != TAG_IDENT || get_i32(header, 4) != TAG_VERSION {
        return None;
    }
    let count = usize::try_from(get_i32(header, 8)).ok()?;
    let body = data.get(HEADER_SIZE..HEADER_SIZE + count.checked_mul(ENTRY_SIZE)?)?;

    let tags = body
        .chunks_exact(ENTRY_SIZE)
        .map(|entry| {
            let raw_name = &entry[..MAX_QPATH];
            let end = raw_name.iter().position(|b| *b == 0).unwrap_or(MAX_QPATH);
            Tag {
                name: String::from_utf8_lossy(&raw_name[..end]).into_owned(),
                orientation: Orientation {
                    origin: get_vec3(entry, MAX_QPATH),
                    axis: [
                        get_vec3(entry, MAX_QPATH + 12),
                        get_vec3(entry, MAX_QPATH + 24),
                        get_vec3(entry, MAX_QPATH + 36),
                    ],
                },
            }
        })
        .collect();
    Some(tags)
}

/// Serialize tags into the file format. Used to build fixtures.
pub fn encode_tag_file(tags: &[(&str, Orientation)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + tags.len() * ENTRY_SIZE);
    out.extend_from_slice(&TAG_IDENT);
    out.extend_from_slice(&TAG_VERSION.to_le_bytes());
    out.extend_from_slice(&(tags.len() as i32).to_le_bytes());
    for (name, orientation) in tags {
        let mut entry = [0u8; ENTRY_SIZE];
        let copy = name.len().min(MAX_QPATH - 1);
        entry[..copy].copy_from_slice(&name.as_bytes()[..copy]);
        orientation.encode(&mut entry[MAX_QPATH..]);
        out.extend_from_slice(&entry);
    }
    out
}
