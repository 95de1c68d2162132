//! Deterministic masking dictionary.
//!
//! Maps each original value to the first masked value assigned to it, keyed
//! by value kind + canonical text so `42` (int) and `"42"` (text) stay
//! distinct. Entries are written once and never overwritten, which is what
//! keeps equal originals mapping to equal masked values for the whole run.
//! The dictionary can be pre-seeded from a CSV and exported (sorted by key)
//! at the end of a run.

use std::path::Path;

use ahash::AHashMap;

use crate::sql::SqlValue;

/// Dictionary key: value kind + canonical text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DictKey {
    tag: &'static str,
    text: String,
}

impl DictKey {
    fn of(value: &SqlValue) -> Self {
        Self {
            tag: value.type_tag(),
            text: value.canonical_text(),
        }
    }
}

/// Process-lifetime mapping from original to masked value.
#[derive(Debug, Default)]
pub struct Dictionary {
    entries: AHashMap<DictKey, SqlValue>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the masked value previously assigned to this original.
    pub fn get(&self, original: &SqlValue) -> Option<&SqlValue> {
        if original.is_null() {
            return None;
        }
        self.entries.get(&DictKey::of(original))
    }

    /// Record a mapping; the first write for a key wins. Returns whether the
    /// entry was inserted. NULL originals are never recorded.
    pub fn record(&mut self, original: &SqlValue, masked: SqlValue) -> bool {
        if original.is_null() {
            return false;
        }
        match self.entries.entry(DictKey::of(original)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(masked);
                true
            }
        }
    }

    /// Pre-seed from a CSV written by a previous run.
    pub fn load_csv(&mut self, path: &Path) -> anyhow::Result<usize> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| anyhow::anyhow!("Cannot read dictionary {:?}: {}", path, e))?;
        let mut loaded = 0;
        for record in reader.records() {
            let record = record?;
            let (tag, original, masked) = match (record.get(0), record.get(1), record.get(2)) {
                (Some(t), Some(o), Some(m)) => (t, o, m),
                _ => anyhow::bail!("Dictionary row needs 3 fields: type,original,masked"),
            };
            let original = SqlValue::parse_tagged(tag, original)
                .ok_or_else(|| anyhow::anyhow!("Unknown dictionary value type '{}'", tag))?;
            let masked = SqlValue::parse_tagged(tag, masked)
                .unwrap_or_else(|| SqlValue::Str(masked.to_string()));
            if self.record(&original, masked) {
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Export all entries sorted by key.
    pub fn save_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| anyhow::anyhow!("Cannot write dictionary {:?}: {}", path, e))?;
        writer.write_record(["type", "original", "masked"])?;

        let mut keys: Vec<&DictKey> = self.entries.keys().collect();
        keys.sort();
        for key in keys {
            let masked = &self.entries[key];
            writer.write_record([key.tag, key.text.as_str(), masked.canonical_text().as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }
}
