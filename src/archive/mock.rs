use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

use super::{ArchiveRegistry, Deposition, DepositionFile, DepositionMetadata};
use crate::error::{ReleaseNotesError, Result};

/// In-memory archive registry for tests
#[derive(Debug, Default)]
pub struct MockRegistry {
    depositions: BTreeMap<u64, Deposition>,
    /// File link to (deposition id, file name)
    files: BTreeMap<String, (u64, String)>,
    next_id: u64,
    failures: HashMap<&'static str, u16>,
    calls: HashMap<&'static str, usize>,
}

impl MockRegistry {
    pub fn new() -> Self {
        MockRegistry {
            next_id: 100,
            ..Self::default()
        }
    }

    fn record(&mut self, method: &'static str) -> Result<()> {
        *self.calls.entry(method).or_default() += 1;
        match self.failures.remove(method) {
            Some(status) => Err(ReleaseNotesError::remote("mock", status, method)),
            None => Ok(()),
        }
    }

    fn new_deposition(&mut self, metadata: Value, state: &str) -> Deposition {
        let id = self.next_id;
        self.next_id += 1;
        let deposition = Deposition {
            id,
            state: state.to_string(),
            metadata,
            links: BTreeMap::from([
                ("self".to_string(), json!(format!("mock://depositions/{}", id))),
                ("html".to_string(), json!(format!("mock://records/{}", id))),
                ("bucket".to_string(), json!(format!("mock://buckets/{}", id))),
                (
                    "newversion".to_string(),
                    json!(format!("mock://depositions/{}/newversion", id)),
                ),
            ]),
            files: Vec::new(),
        };
        self.depositions.insert(id, deposition.clone());
        deposition
    }

    /// Add an already-published deposition; returns its id
    pub fn insert_published(&mut self, metadata: &DepositionMetadata) -> u64 {
        let value = serde_json::to_value(metadata).unwrap_or(Value::Null);
        self.new_deposition(value, "done").id
    }

    /// Make the next call to `method` fail with `status`
    pub fn fail_next(&mut self, method: &'static str, status: u16) {
        self.failures.insert(method, status);
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.get(method).copied().unwrap_or(0)
    }

    pub fn deposition_count(&self) -> usize {
        self.depositions.len()
    }

    /// File names attached to a deposition
    pub fn files(&self, id: u64) -> Vec<String> {
        self.files
            .values()
            .filter(|(dep, _)| *dep == id)
            .map(|(_, name)| name.clone())
            .collect()
    }

    fn stored(&self, id: u64) -> Result<Deposition> {
        self.depositions
            .get(&id)
            .cloned()
            .ok_or_else(|| ReleaseNotesError::remote("mock", 404, format!("deposition {}", id)))
    }
}

impl ArchiveRegistry for MockRegistry {
    fn find_deposition(&mut self, title: &str) -> Result<Option<Deposition>> {
        self.record("find_deposition")?;
        Ok(self
            .depositions
            .values()
            .find(|d| d.title() == Some(title))
            .cloned())
    }

    fn create_deposition(&mut self, metadata: &DepositionMetadata) -> Result<Deposition> {
        self.record("create_deposition")?;
        Ok(self.new_deposition(serde_json::to_value(metadata)?, "unsubmitted"))
    }

    fn get_deposition(&mut self, id: u64) -> Result<Deposition> {
        self.record("get_deposition")?;
        self.stored(id)
    }

    fn create_new_version(&mut self, deposition: &Deposition) -> Result<Option<Deposition>> {
        self.record("create_new_version")?;
        if deposition.is_draft() {
            return Ok(None);
        }
        let metadata = self.stored(deposition.id)?.metadata;
        Ok(Some(self.new_deposition(metadata, "unsubmitted")))
    }

    fn update(
        &mut self,
        deposition: &Deposition,
        metadata: &DepositionMetadata,
    ) -> Result<Deposition> {
        self.record("update")?;
        let value = serde_json::to_value(metadata)?;
        let stored = self.depositions.get_mut(&deposition.id).ok_or_else(|| {
            ReleaseNotesError::remote("mock", 404, format!("deposition {}", deposition.id))
        })?;
        stored.metadata = value;
        Ok(stored.clone())
    }

    fn upload(&mut self, deposition: &Deposition, _content: &[u8], name: &str) -> Result<Value> {
        self.record("upload")?;
        let link = format!("mock://buckets/{}/{}", deposition.id, name);
        self.files
            .insert(link.clone(), (deposition.id, name.to_string()));
        Ok(json!({"key": name, "links": {"self": link}}))
    }

    fn get_files(&mut self, deposition: &Deposition) -> Result<Vec<DepositionFile>> {
        self.record("get_files")?;
        Ok(self
            .files
            .iter()
            .filter(|(_, (dep, _))| *dep == deposition.id)
            .map(|(link, (_, name))| DepositionFile {
                filename: name.clone(),
                links: BTreeMap::from([("self".to_string(), json!(link))]),
            })
            .collect())
    }

    fn delete_file(&mut self, file: &DepositionFile) -> Result<()> {
        self.record("delete_file")?;
        let link = file.link("self").unwrap_or_default().to_string();
        match self.files.remove(&link) {
            Some(_) => Ok(()),
            None => Err(ReleaseNotesError::remote("mock", 404, link)),
        }
    }
}
