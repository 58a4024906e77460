use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::Utc;
use serde_json::Value;
use traceos_types::{Contract, ContractStats, ContractStatus, ContractType};
use ulid::Ulid;

/// Optional filters for `ContractStore::list`. `None` fields are unfiltered.
#[derive(Debug, Default, Clone)]
pub struct ContractFilter {
    pub session_id: Option<String>,
    pub from_agent: Option<String>,
    pub to_agent: Option<String>,
    pub contract_type: Option<ContractType>,
    pub status: Option<ContractStatus>,
}

/// Session-keyed, ordered sequence of contracts. In-memory with one JSON
/// file per session on disk for durability; contract ids are ULIDs, so
/// sorting by id already matches creation order even under concurrent
/// inserts.
pub struct ContractStore {
    storage_path: PathBuf,
    contracts: RwLock<HashMap<String, Vec<Contract>>>,
}

impl ContractStore {
    pub fn new(storage_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let storage_path = storage_path.into();
        fs::create_dir_all(&storage_path)?;
        let store = Self {
            storage_path,
            contracts: RwLock::new(HashMap::new()),
        };
        store.load_from_disk()?;
        Ok(store)
    }

    fn session_file(&self, session_id: &str) -> PathBuf {
        self.storage_path.join(format!("{session_id}.json"))
    }

    fn load_from_disk(&self) -> std::io::Result<()> {
        let mut contracts = self.contracts.write().expect("ContractStore lock poisoned");
        for entry in fs::read_dir(&self.storage_path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let session_id = match path.file_stem().and_then(|s| s.to_str()) {
                Some(s) => s.to_string(),
                None => continue,
            };
            let raw = fs::read_to_string(&path)?;
            if let Ok(parsed) = serde_json::from_str::<Vec<Contract>>(&raw) {
                contracts.insert(session_id, parsed);
            } else {
                tracing::warn!(path = %path.display(), "skipping unreadable contract file");
            }
        }
        Ok(())
    }

    fn save_to_disk(&self, session_id: &str) -> std::io::Result<()> {
        let contracts = self.contracts.read().expect("ContractStore lock poisoned");
        let list = contracts.get(session_id).cloned().unwrap_or_default();
        let json = serde_json::to_string_pretty(&list).expect("Contract serializes");
        fs::write(self.session_file(session_id), json)
    }

    pub fn create_contract(
        &self,
        session_id: &str,
        contract_type: ContractType,
        from_agent: &str,
        to_agent: &str,
        capability: Option<String>,
        payload: Value,
    ) -> Contract {
        let contract = Contract {
            contract_id: Ulid::new().to_string(),
            session_id: session_id.to_string(),
            contract_type,
            from_agent: from_agent.to_string(),
            to_agent: to_agent.to_string(),
            capability,
            payload,
            status: ContractStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
            metadata: HashMap::new(),
        };

        self.contracts
            .write()
            .expect("ContractStore lock poisoned")
            .entry(session_id.to_string())
            .or_default()
            .push(contract.clone());

        if let Err(e) = self.save_to_disk(session_id) {
            tracing::warn!(session_id, error = %e, "failed to persist contract to disk");
        }

        contract
    }

    pub fn update_contract(
        &self,
        contract_id: &str,
        status: Option<ContractStatus>,
        result: Option<Value>,
        error: Option<String>,
    ) -> Option<Contract> {
        let mut touched_session = None;
        let updated = {
            let mut contracts = self.contracts.write().expect("ContractStore lock poisoned");
            let mut found = None;
            for (session_id, list) in contracts.iter_mut() {
                if let Some(contract) = list.iter_mut().find(|c| c.contract_id == contract_id) {
                    if let Some(status) = status {
                        contract.status = status;
                        if matches!(status, ContractStatus::Completed | ContractStatus::Failed) {
                            contract.completed_at = Some(Utc::now());
                        }
                    }
                    if result.is_some() {
                        contract.result = result;
                    }
                    if error.is_some() {
                        contract.error = error;
                    }
                    found = Some(contract.clone());
                    touched_session = Some(session_id.clone());
                    break;
                }
            }
            found
        };

        if let Some(session_id) = touched_session {
            if let Err(e) = self.save_to_disk(&session_id) {
                tracing::warn!(session_id, error = %e, "failed to persist contract update");
            }
        }

        updated
    }

    pub fn list(&self, filter: &ContractFilter) -> Vec<Contract> {
        let contracts = self.contracts.read().expect("ContractStore lock poisoned");
        let mut result: Vec<Contract> = match &filter.session_id {
            Some(id) => contracts.get(id).cloned().unwrap_or_default(),
            None => contracts.values().flatten().cloned().collect(),
        };

        if let Some(from) = &filter.from_agent {
            result.retain(|c| &c.from_agent == from);
        }
        if let Some(to) = &filter.to_agent {
            result.retain(|c| &c.to_agent == to);
        }
        if let Some(t) = filter.contract_type {
            result.retain(|c| c.contract_type == t);
        }
        if let Some(s) = filter.status {
            result.retain(|c| c.status == s);
        }

        result
    }

    pub fn get(&self, contract_id: &str) -> Option<Contract> {
        let contracts = self.contracts.read().expect("ContractStore lock poisoned");
        contracts
            .values()
            .flatten()
            .find(|c| c.contract_id == contract_id)
            .cloned()
    }

    /// All contracts for a session, in creation order. The ULID primary key
    /// already sorts this way, but sort defensively in case of manual edits.
    pub fn get_conversation(&self, session_id: &str) -> Vec<Contract> {
        let mut list = self.list(&ContractFilter {
            session_id: Some(session_id.to_string()),
            ..Default::default()
        });
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        list
    }

    pub fn clear_session(&self, session_id: &str) {
        self.contracts
            .write()
            .expect("ContractStore lock poisoned")
            .remove(session_id);
        let _ = fs::remove_file(self.session_file(session_id));
    }

    pub fn stats(&self) -> ContractStats {
        let contracts = self.contracts.read().expect("ContractStore lock poisoned");
        let mut by_status: HashMap<ContractStatus, usize> = HashMap::new();
        let mut total_contracts = 0usize;
        for list in contracts.values() {
            total_contracts += list.len();
            for c in list {
                *by_status.entry(c.status).or_insert(0) += 1;
            }
        }
        ContractStats {
            total_sessions: contracts.len(),
            total_contracts,
            by_status,
        }
    }
}
