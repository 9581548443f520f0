//! Internal-resource coupling between instances.

use dcplan_core::resource::INTERNAL_RESOURCES;
use dcplan_core::{ModuleCatalog, ModuleDefinition, ModuleId};
use serde::Serialize;

use crate::convert::PlacedModuleInstance;

/// Symmetric `n × n` coupling weights; `get(i, j)` is the summed flow that
/// could pass between instance `i` and instance `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityMatrix {
    size: usize,
    weights: Vec<f64>,
}

impl ConnectivityMatrix {
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.weights[i * self.size + j]
    }

    /// Sum of the weights from `i` to every index in `others`.
    pub fn total_to(&self, i: usize, others: impl IntoIterator<Item = usize>) -> f64 {
        others.into_iter().map(|j| self.get(i, j)).sum()
    }

    fn add(&mut self, i: usize, j: usize, flow: f64) {
        self.weights[i * self.size + j] += flow;
        self.weights[j * self.size + i] += flow;
    }
}

/// Pair every producer of each internal resource with every other consumer
/// of it, adding `min(produced, consumed)` both ways.
///
/// This is a proximity hint, not a flow assignment.
pub fn connectivity_matrix(modules: &[&ModuleDefinition]) -> ConnectivityMatrix {
    let size = modules.len();
    let mut matrix = ConnectivityMatrix {
        size,
        weights: vec![0.0; size * size],
    };

    for resource in INTERNAL_RESOURCES {
        for (p, producer) in modules.iter().enumerate() {
            let produced = producer.output(resource);
            if produced <= 0.0 {
                continue;
            }
            for (c, consumer) in modules.iter().enumerate() {
                let consumed = consumer.input(resource);
                if p != c && consumed > 0.0 {
                    matrix.add(p, c, produced.min(consumed));
                }
            }
        }
    }
    matrix
}

/// A single allocated internal-resource flow between two placed instances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceConnection {
    pub resource: String,
    pub producer_id: ModuleId,
    pub producer_instance: u32,
    pub consumer_id: ModuleId,
    pub consumer_instance: u32,
    pub flow: f64,
}

/// Greedy producer → consumer allocation per internal resource.
///
/// Producers are visited in placement order and serve consumers in placement
/// order until either side runs dry.
pub fn resource_connections(
    catalog: &ModuleCatalog,
    placed: &[PlacedModuleInstance],
) -> Vec<ResourceConnection> {
    let modules: Vec<Option<&ModuleDefinition>> =
        placed.iter().map(|p| catalog.get(p.module_id)).collect();
    let mut connections = Vec::new();

    for resource in INTERNAL_RESOURCES {
        let mut production: Vec<f64> = modules
            .iter()
            .map(|m| m.map(|m| m.output(resource)).unwrap_or(0.0))
            .collect();
        let mut consumption: Vec<f64> = modules
            .iter()
            .map(|m| m.map(|m| m.input(resource)).unwrap_or(0.0))
            .collect();

        for p in 0..placed.len() {
            for c in 0..placed.len() {
                if p == c || production[p] <= 0.0 || consumption[c] <= 0.0 {
                    continue;
                }
                let flow = production[p].min(consumption[c]);
                production[p] -= flow;
                consumption[c] -= flow;
                connections.push(ResourceConnection {
                    resource: resource.to_string(),
                    producer_id: placed[p].module_id,
                    producer_instance: placed[p].instance_index,
                    consumer_id: placed[c].module_id,
                    consumer_instance: placed[c].instance_index,
                    flow,
                });
            }
        }
    }
    connections
}
