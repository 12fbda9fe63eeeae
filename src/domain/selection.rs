// Selection domain model - what a surface is observing
use super::electric::{Phase, Quantity};
use std::collections::BTreeSet;

/// A tree-widget node identifier, parsed once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionToken {
    /// `None` is the bare parent node: every phase.
    Current(Option<Phase>),
    Voltage(Option<Phase>),
    GridFrequency,
}

impl SelectionToken {
    /// Returns `None` for identifiers outside the known vocabulary so newer
    /// widget nodes pass through harmlessly.
    pub fn parse(node_id: &str) -> Option<SelectionToken> {
        match node_id {
            "Current" => Some(SelectionToken::Current(None)),
            "Voltage" => Some(SelectionToken::Voltage(None)),
            "Grid frequency" => Some(SelectionToken::GridFrequency),
            other => {
                if let Some(phase) = other.strip_prefix("Current") {
                    Phase::parse(phase).map(|p| SelectionToken::Current(Some(p)))
                } else if let Some(phase) = other.strip_prefix("Voltage") {
                    Phase::parse(phase).map(|p| SelectionToken::Voltage(Some(p)))
                } else {
                    None
                }
            }
        }
    }
}

/// Canonical query descriptor.
///
/// `quantities` keeps insertion order, which is also display order. A phase set
/// is only ever populated together with its quantity; an empty phase set for a
/// selected quantity means "all phases".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionDescriptor {
    pub quantities: Vec<Quantity>,
    pub current_phases: BTreeSet<Phase>,
    pub voltage_phases: BTreeSet<Phase>,
}

impl Default for SelectionDescriptor {
    /// Current on L1, so an emptied tree never leaves a surface blank.
    fn default() -> Self {
        Self {
            quantities: vec![Quantity::Current],
            current_phases: BTreeSet::from([Phase::L1]),
            voltage_phases: BTreeSet::new(),
        }
    }
}

impl SelectionDescriptor {
    /// Fold a selection event's node identifiers into a descriptor.
    pub fn from_nodes<I, S>(node_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut descriptor = SelectionDescriptor {
            quantities: Vec::new(),
            current_phases: BTreeSet::new(),
            voltage_phases: BTreeSet::new(),
        };

        for token in node_ids
            .into_iter()
            .filter_map(|id| SelectionToken::parse(id.as_ref()))
        {
            descriptor.apply(token);
        }

        if descriptor.quantities.is_empty() {
            return SelectionDescriptor::default();
        }

        descriptor
    }

    fn apply(&mut self, token: SelectionToken) {
        match token {
            SelectionToken::Current(phase) => {
                self.push_quantity(Quantity::Current);
                if let Some(phase) = phase {
                    self.current_phases.insert(phase);
                }
            }
            SelectionToken::Voltage(phase) => {
                self.push_quantity(Quantity::Voltage);
                if let Some(phase) = phase {
                    self.voltage_phases.insert(phase);
                }
            }
            SelectionToken::GridFrequency => self.push_quantity(Quantity::GridFrequency),
        }
    }

    fn push_quantity(&mut self, quantity: Quantity) {
        if !self.quantities.contains(&quantity) {
            self.quantities.push(quantity);
        }
    }

    /// The quantity the render projection is built from.
    pub fn primary_quantity(&self) -> Option<Quantity> {
        self.quantities.first().copied()
    }

    pub fn phases_for(&self, quantity: Quantity) -> &BTreeSet<Phase> {
        match quantity {
            Quantity::Voltage => &self.voltage_phases,
            _ => &self.current_phases,
        }
    }

    /// Phases to render for `quantity`, in L1, L2, L3 order. Empty for grid
    /// frequency.
    pub fn effective_phases(&self, quantity: Quantity) -> Vec<Phase> {
        if !quantity.has_phases() {
            return Vec::new();
        }
        let phases = self.phases_for(quantity);
        if phases.is_empty() {
            Phase::ALL.to_vec()
        } else {
            phases.iter().copied().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_current_phases() {
        let descriptor = SelectionDescriptor::from_nodes(["CurrentL1", "CurrentL2"]);

        assert_eq!(descriptor.quantities, vec![Quantity::Current]);
        assert_eq!(
            descriptor.current_phases,
            BTreeSet::from([Phase::L1, Phase::L2])
        );
        assert!(descriptor.voltage_phases.is_empty());
    }

    #[test]
    fn test_empty_selection_falls_back_to_default() {
        let descriptor = SelectionDescriptor::from_nodes(Vec::<String>::new());

        assert_eq!(descriptor.quantities, vec![Quantity::Current]);
        assert_eq!(descriptor.current_phases, BTreeSet::from([Phase::L1]));
        assert_eq!(descriptor, SelectionDescriptor::default());
    }

    #[test]
    fn test_unknown_nodes_are_ignored() {
        let descriptor = SelectionDescriptor::from_nodes(["Power factor", "VoltageL3", "CurrentL9"]);

        assert_eq!(descriptor.quantities, vec![Quantity::Voltage]);
        assert_eq!(descriptor.voltage_phases, BTreeSet::from([Phase::L3]));
        assert!(descriptor.current_phases.is_empty());
    }

    #[test]
    fn test_duplicates_are_idempotent_and_order_is_kept() {
        let descriptor = SelectionDescriptor::from_nodes([
            "Grid frequency",
            "VoltageL2",
            "VoltageL2",
            "Grid frequency",
            "VoltageL1",
        ]);

        assert_eq!(
            descriptor.quantities,
            vec![Quantity::GridFrequency, Quantity::Voltage]
        );
        assert_eq!(
            descriptor.voltage_phases,
            BTreeSet::from([Phase::L1, Phase::L2])
        );
        assert_eq!(descriptor.primary_quantity(), Some(Quantity::GridFrequency));
    }

    #[test]
    fn test_phase_sets_only_follow_their_quantity() {
        let inputs: Vec<Vec<&str>> = vec![
            vec!["Grid frequency"],
            vec!["Voltage"],
            vec!["VoltageL1", "Grid frequency"],
            vec!["CurrentL3", "Voltage"],
            vec!["bogus"],
        ];

        for nodes in inputs {
            let d = SelectionDescriptor::from_nodes(&nodes);
            if !d.current_phases.is_empty() {
                assert!(d.quantities.contains(&Quantity::Current), "{:?}", nodes);
            }
            if !d.voltage_phases.is_empty() {
                assert!(d.quantities.contains(&Quantity::Voltage), "{:?}", nodes);
            }
        }
    }

    #[test]
    fn test_bare_parent_means_all_phases() {
        let descriptor = SelectionDescriptor::from_nodes(["Current"]);

        assert!(descriptor.current_phases.is_empty());
        assert_eq!(
            descriptor.effective_phases(Quantity::Current),
            vec![Phase::L1, Phase::L2, Phase::L3]
        );
        assert!(descriptor.effective_phases(Quantity::GridFrequency).is_empty());
    }
}
