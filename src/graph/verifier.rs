use std::collections::HashMap;

use crate::errors::{SGError, SGResult};
use crate::graph::Graph;
use crate::types::Shape;

/// Static re-validation of a built graph: connectivity (every consumed
/// symbol is produced earlier) and shape consistency (every recorded
/// output shape equals what the operator derives from its input shapes).
/// Model construction runs this before allocating anything.
pub struct Verifier;

impl Verifier {
    pub fn verify(graph: &Graph) -> SGResult<HashMap<usize, Shape>> {
        let mut predicted: HashMap<usize, Shape> = HashMap::new();
        for s in graph.inputs() {
            predicted.insert(s.id(), s.shape().clone());
        }
        for p in graph.params() {
            predicted.insert(p.symbol.id(), p.symbol.shape().clone());
        }

        for node in graph.nodes() {
            let mut input_shapes = Vec::with_capacity(node.inputs.len());
            for s in &node.inputs {
                let shape = predicted.get(&s.id()).ok_or(SGError::UnknownSymbol(s.id()))?;
                if shape != s.shape() {
                    return Err(SGError::IncompatibleShapes {
                        expected: s.shape().dims().to_vec(),
                        found: shape.dims().to_vec(),
                    });
                }
                input_shapes.push(shape.clone());
            }

            let derived = node.op.result_shape(&input_shapes, &node.attrs)?;
            let recorded = node.outputs[0].shape();
            if recorded != &derived {
                return Err(SGError::IncompatibleShapes {
                    expected: derived.dims().to_vec(),
                    found: recorded.dims().to_vec(),
                });
            }
            for o in &node.outputs {
                predicted.insert(o.id(), o.shape().clone());
            }
        }

        tracing::debug!(nodes = graph.nodes().len(), "graph verified");
        Ok(predicted)
    }
}
