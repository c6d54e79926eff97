//! Machine registry - the closed set of monitored machines.
//!
//! Registration order is tick order and summary order.

use std::collections::HashSet;

use crate::types::MachineId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no machines registered")]
    Empty,
    #[error("machine id at position {0} is blank")]
    Blank(usize),
    #[error("machine '{0}' registered twice")]
    Duplicate(String),
    #[error("unknown machine '{0}'")]
    UnknownMachine(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineRegistry {
    machines: Vec<MachineId>,
}

impl MachineRegistry {
    /// Register `ids` in order. Ids are trimmed; blanks and duplicates are rejected.
    pub fn new<I, S>(ids: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut machines = Vec::new();

        for (pos, raw) in ids.into_iter().enumerate() {
            let id = raw.as_ref().trim();
            if id.is_empty() {
                return Err(RegistryError::Blank(pos));
            }
            if !seen.insert(id.to_string()) {
                return Err(RegistryError::Duplicate(id.to_string()));
            }
            machines.push(MachineId::new(id));
        }

        if machines.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(Self { machines })
    }

    pub fn machines(&self) -> &[MachineId] {
        &self.machines
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.machines.iter().any(|m| m.as_str() == id)
    }

    /// Look up a registered id by name.
    pub fn resolve(&self, id: &str) -> Result<&MachineId, RegistryError> {
        let id = id.trim();
        self.machines
            .iter()
            .find(|m| m.as_str() == id)
            .ok_or_else(|| RegistryError::UnknownMachine(id.to_string()))
    }
}
