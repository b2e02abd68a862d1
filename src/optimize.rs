//! Save-time cleanup of the document: the equivalent of a "garbage" level
//! plus stream deflation, and the atomic write of the result.

use crate::error::{CompressionError, Result};
use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// How aggressively unused and duplicate objects are removed before saving.
/// Every level includes the work of the levels below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum GarbageLevel {
    /// Keep every object
    None = 0,
    /// Drop objects nothing refers to
    Unreferenced = 1,
    /// Also drop streams with no content
    EmptyStreams = 2,
    /// Also renumber objects so the cross-reference table is dense
    Compact = 3,
    /// Also merge byte-identical streams
    #[default]
    Deduplicate = 4,
}

impl TryFrom<u8> for GarbageLevel {
    type Error = CompressionError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(GarbageLevel::None),
            1 => Ok(GarbageLevel::Unreferenced),
            2 => Ok(GarbageLevel::EmptyStreams),
            3 => Ok(GarbageLevel::Compact),
            4 => Ok(GarbageLevel::Deduplicate),
            other => Err(CompressionError::InvalidGarbageLevel(other)),
        }
    }
}

impl fmt::Display for GarbageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub merged: usize,
    pub pruned: usize,
    pub empty_streams: usize,
}

impl OptimizeStats {
    pub fn objects_removed(&self) -> usize {
        self.merged + self.pruned + self.empty_streams
    }
}

pub fn optimize_document(doc: &mut Document, level: GarbageLevel, deflate: bool) -> OptimizeStats {
    let mut stats = OptimizeStats::default();

    if level >= GarbageLevel::Deduplicate {
        stats.merged = deduplicate_streams(doc);
    }
    if level >= GarbageLevel::Unreferenced {
        stats.pruned = doc.prune_objects().len();
    }
    if level >= GarbageLevel::EmptyStreams {
        stats.empty_streams = doc.delete_zero_length_streams().len();
    }
    if level >= GarbageLevel::Compact {
        doc.renumber_objects();
    }
    if deflate {
        // Streams that already carry a filter, JPEG images included, are left alone.
        doc.compress();
    }

    debug!(
        "Garbage level {}: merged {}, pruned {}, empty streams {}",
        level, stats.merged, stats.pruned, stats.empty_streams
    );
    stats
}

fn fingerprint(stream: &Stream) -> (u64, String) {
    let dict = format!("{:?}", stream.dict);
    let mut hasher = DefaultHasher::new();
    dict.hash(&mut hasher);
    stream.content.hash(&mut hasher);
    (hasher.finish(), dict)
}

/// Points every reference to a duplicated stream at its first copy and
/// removes the other copies. Returns how many objects were removed.
pub fn deduplicate_streams(doc: &mut Document) -> usize {
    let mut buckets: HashMap<u64, Vec<(ObjectId, String)>> = HashMap::new();
    let mut replacements: HashMap<ObjectId, ObjectId> = HashMap::new();

    for (&id, object) in &doc.objects {
        let Object::Stream(stream) = object else {
            continue;
        };
        let (hash, dict) = fingerprint(stream);
        let bucket = buckets.entry(hash).or_default();

        let original = bucket
            .iter()
            .find(|(candidate, candidate_dict)| {
                *candidate_dict == dict
                    && matches!(
                        doc.objects.get(candidate),
                        Some(Object::Stream(other)) if other.content == stream.content
                    )
            })
            .map(|(candidate, _)| *candidate);

        match original {
            Some(original) => {
                replacements.insert(id, original);
            }
            None => bucket.push((id, dict)),
        }
    }

    if replacements.is_empty() {
        return 0;
    }

    for duplicate in replacements.keys() {
        doc.objects.remove(duplicate);
    }
    for object in doc.objects.values_mut() {
        remap_references(object, &replacements);
    }
    remap_dictionary(&mut doc.trailer, &replacements);

    replacements.len()
}

fn remap_references(object: &mut Object, replacements: &HashMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(target) = replacements.get(id) {
                *id = *target;
            }
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                remap_references(item, replacements);
            }
        }
        Object::Dictionary(dict) => remap_dictionary(dict, replacements),
        Object::Stream(stream) => remap_dictionary(&mut stream.dict, replacements),
        _ => {}
    }
}

fn remap_dictionary(dict: &mut Dictionary, replacements: &HashMap<ObjectId, ObjectId>) {
    for (_, value) in dict.iter_mut() {
        remap_references(value, replacements);
    }
}

/// Writes the document next to `output` and moves it into place, so a failed
/// save never leaves a partial file behind.
pub fn save_document(doc: &mut Document, output: &Path) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        doc.save_to(&mut writer)?;
        writer.flush()?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }

    temp.persist(output)?;
    debug!("Wrote {:?}", output);
    Ok(())
}
