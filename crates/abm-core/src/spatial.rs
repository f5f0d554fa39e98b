use crate::agent::{distance, Agent};
use rstar::{RTree, RTreeObject, AABB};

/// An agent's slot in the population together with its position, as stored
/// in the R*-tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentLocation {
    pub index: usize,
    pub position: [usize; 2],
}

impl AgentLocation {
    fn point(&self) -> [f64; 2] {
        [self.position[0] as f64, self.position[1] as f64]
    }
}

impl RTreeObject for AgentLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point())
    }
}

/// Position index over the agent population, kept in step with moves so
/// neighbour queries see current positions.
pub struct SpatialIndex {
    tree: RTree<AgentLocation>,
}

impl SpatialIndex {
    /// Build via bulk_load (O(n log n)). Slot `i` refers to `agents[i]`.
    pub fn build(agents: &[Agent]) -> Self {
        let locations = agents
            .iter()
            .enumerate()
            .map(|(index, agent)| AgentLocation {
                index,
                position: agent.position(),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(locations),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Record that the agent in slot `index` moved from `from` to `to`.
    pub fn relocate(&mut self, index: usize, from: [usize; 2], to: [usize; 2]) {
        if from == to {
            return;
        }
        let old = AgentLocation {
            index,
            position: from,
        };
        self.tree.remove(&old);
        self.tree.insert(AgentLocation {
            index,
            position: to,
        });
    }

    /// Slots within `radius` of `center`, excluding `exclude`, sorted in
    /// population order. Uses an AABB envelope query then filters by
    /// Euclidean distance.
    pub fn query_neighbors(&self, center: [usize; 2], radius: f64, exclude: usize) -> Vec<usize> {
        let c = [center[0] as f64, center[1] as f64];
        let envelope = AABB::from_corners(
            [c[0] - radius, c[1] - radius],
            [c[0] + radius, c[1] + radius],
        );
        let mut found: Vec<usize> = self
            .tree
            .locate_in_envelope(&envelope)
            .filter(|loc| loc.index != exclude && distance(center, loc.position) <= radius)
            .map(|loc| loc.index)
            .collect();
        found.sort_unstable();
        found
    }
}
