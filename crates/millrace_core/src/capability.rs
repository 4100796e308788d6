//! Static element capability sets.
//!
//! Each element variant declares, at build time, which of a small fixed set
//! of capabilities it implements. The graph layer resolves these once when
//! the graph is built; there are no per-call "does this element support X"
//! lookups at runtime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A capability names one way an element participates in the dataflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Receives packets pushed into its input ports
    Push,

    /// Hands out packets when its output ports are pulled
    Pull,

    /// Registers a task with the scheduler and originates work
    Scheduled,

    /// Registers timers and reacts to deadlines
    Timed,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "Push"),
            Self::Pull => write!(f, "Pull"),
            Self::Scheduled => write!(f, "Scheduled"),
            Self::Timed => write!(f, "Timed"),
        }
    }
}

/// The set of capabilities an element declares
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    capabilities: BTreeSet<Capability>,
}

impl CapabilitySet {
    /// Create a new empty capability set
    #[must_use]
    pub fn new() -> Self {
        Self {
            capabilities: BTreeSet::new(),
        }
    }

    /// Declare a capability
    pub fn declare(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
    }

    /// Builder-style declaration
    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Check whether a capability is declared
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Number of declared capabilities
    #[must_use]
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Whether no capability is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Iterate over declared capabilities in stable order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.capabilities.iter().map(|c| c.to_string()).collect();
        write!(f, "{{{}}}", names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_set_declare() {
        let mut set = CapabilitySet::new();
        assert!(set.is_empty());

        set.declare(Capability::Push);
        set.declare(Capability::Scheduled);
        assert!(set.has(Capability::Push));
        assert!(set.has(Capability::Scheduled));
        assert!(!set.has(Capability::Pull));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_capability_set_builder() {
        let set = CapabilitySet::new()
            .with(Capability::Pull)
            .with(Capability::Timed);
        assert!(set.has(Capability::Pull));
        assert!(set.has(Capability::Timed));
        assert!(!set.has(Capability::Push));
    }

    #[test]
    fn test_capability_set_display() {
        let set = CapabilitySet::new()
            .with(Capability::Scheduled)
            .with(Capability::Push);
        assert_eq!(format!("{}", set), "{Push,Scheduled}");
    }

    #[test]
    fn test_capability_set_from_iter() {
        let set: CapabilitySet = [Capability::Push, Capability::Push, Capability::Pull]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }
}
