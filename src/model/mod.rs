use tracing::warn;

use crate::arena::Arena;
use crate::errors::{SGError, SGResult};
use crate::graph::verifier::Verifier;
use crate::graph::Graph;
use crate::tensor::Tensor;
use crate::types::Symbol;

#[cfg(feature = "metrics")]
use crate::metrics::PerfCounters;

/// Executor for a built graph. Construction allocates every forward
/// activation and every gradient buffer once; `forward`, `inference` and
/// `backward` then run as plain indexed sweeps over the node list, each
/// node dispatching through its boxed operator — the per-graph dispatch
/// table in trait-object form.
///
/// The model owns its TENSORS and GRADS arenas and both start empty at
/// construction, so symbols minted by a different graph are meaningless
/// here: their ids would alias this graph's slots. Build one model per
/// graph and read gradients through it.
pub struct Model {
    graph: Graph,
    tensors: Arena,
    grads: Arena,
    n_inference_nodes: Option<usize>,
    inference_only: bool,
    ran_forward: bool,
    #[cfg(feature = "metrics")]
    perf: PerfCounters,
}

impl Model {
    pub fn new(graph: Graph) -> SGResult<Self> {
        Self::with_mode(graph, false)
    }

    /// A model that skips gradient allocation entirely; `backward` errors.
    pub fn inference_only(graph: Graph) -> SGResult<Self> {
        Self::with_mode(graph, true)
    }

    pub fn with_mode(graph: Graph, inference_only: bool) -> SGResult<Self> {
        Verifier::verify(&graph)?;

        let mut tensors = Arena::new();
        for s in graph.inputs() {
            tensors.append(s, Tensor::zeros(s.shape()))?;
        }
        for p in graph.params() {
            tensors.append(&p.symbol, p.init.materialize(p.symbol.shape())?)?;
        }
        for node in graph.nodes() {
            for o in &node.outputs {
                tensors.append(o, Tensor::zeros(o.shape()))?;
            }
        }

        let mut grads = Arena::new();
        if !inference_only {
            for s in graph.inputs() {
                if s.trainable() {
                    grads.append(s, Tensor::zeros(s.shape()))?;
                }
            }
            for p in graph.params() {
                if p.symbol.trainable() {
                    grads.append(&p.symbol, Tensor::zeros(p.symbol.shape()))?;
                }
            }
            for node in graph.nodes() {
                for o in &node.outputs {
                    if o.trainable() {
                        grads.append(o, Tensor::zeros(o.shape()))?;
                    }
                }
            }
        }

        let n_inference_nodes = graph.n_inference_nodes();
        if graph.loss_out().is_none() {
            warn!("graph has no loss output; forward and backward are unavailable");
        }
        if n_inference_nodes.is_none() {
            warn!("no graph output is produced by any node; inference is unavailable");
        }

        #[cfg(feature = "metrics")]
        let perf = PerfCounters::new(graph.nodes().len());

        Ok(Self {
            graph,
            tensors,
            grads,
            n_inference_nodes,
            inference_only,
            ran_forward: false,
            #[cfg(feature = "metrics")]
            perf,
        })
    }

    /// Copies the positional inputs into the arena and runs every node,
    /// returning the loss tensor.
    pub fn forward(&mut self, inputs: &[Tensor]) -> SGResult<Tensor> {
        let loss = self.graph.loss_out().cloned().ok_or(SGError::LossMissing)?;
        self.load_inputs(inputs)?;
        self.run_nodes(self.graph.nodes().len())?;
        self.ran_forward = true;
        Ok(self.tensors.get(&loss)?.clone())
    }

    /// Runs the shortest node prefix that produces every declared output
    /// and returns those tensors in declaration order.
    pub fn inference(&mut self, inputs: &[Tensor]) -> SGResult<Vec<Tensor>> {
        let k = self.n_inference_nodes.ok_or(SGError::InferenceDisabled)?;
        self.load_inputs(inputs)?;
        self.run_nodes(k)?;
        self.graph
            .outputs()
            .iter()
            .map(|s| self.tensors.get(s).map(|t| t.clone()))
            .collect()
    }

    /// Seeds the loss gradient (with `upper_grad`, or ones) and sweeps the
    /// nodes in reverse, accumulating into the gradient arena. Gradients
    /// from overlapping paths sum; repeated backward calls keep
    /// accumulating until `zero_grads`.
    pub fn backward(&mut self, upper_grad: Option<&Tensor>) -> SGResult<()> {
        if self.inference_only {
            return Err(SGError::InferenceOnly);
        }
        if !self.ran_forward {
            return Err(SGError::BackwardBeforeForward);
        }
        let loss = self.graph.loss_out().cloned().ok_or(SGError::LossMissing)?;

        let seed = self.grads.get_mut(&loss)?;
        match upper_grad {
            Some(ug) => {
                if ug.dims() != seed.dims() {
                    return Err(SGError::IncompatibleShapes {
                        expected: seed.dims().to_vec(),
                        found: ug.dims().to_vec(),
                    });
                }
                seed.copy_from(ug)?;
            }
            None => seed.fill(1.0),
        }

        for i in (0..self.graph.nodes().len()).rev() {
            let node = &self.graph.nodes()[i];
            let out_sym = &node.outputs[0];
            if !out_sym.trainable() {
                continue;
            }

            #[cfg(feature = "metrics")]
            let started = std::time::Instant::now();

            if node.op.is_dynamic() {
                for slot in 0..node.inputs.len() {
                    if !node.inputs[slot].trainable() {
                        continue;
                    }
                    node.op.backward_dynamic(
                        slot,
                        &self.tensors,
                        &mut self.grads,
                        &node.inputs,
                        &node.outputs,
                        &node.attrs,
                    )?;
                }
            } else {
                for slot in 0..node.inputs.len() {
                    let input = &node.inputs[slot];
                    if !input.trainable() {
                        continue;
                    }
                    let grad = {
                        let upstream = self.grads.get(out_sym)?;
                        let input_tensors: Vec<&Tensor> = node
                            .inputs
                            .iter()
                            .map(|s| self.tensors.get(s))
                            .collect::<SGResult<_>>()?;
                        node.op.backward(slot, upstream, &input_tensors, &node.attrs)?
                    };
                    self.grads.accumulate(input, &grad)?;
                }
            }

            #[cfg(feature = "metrics")]
            self.perf.record_backward(i, node.op.name(), started.elapsed());
        }
        Ok(())
    }

    /// Gradient of the loss w.r.t. a trainable symbol; `None` for
    /// non-trainable symbols, which never get an arena entry.
    pub fn gradient(&self, symbol: &Symbol) -> Option<&Tensor> {
        self.grads.try_get(symbol)
    }

    /// Current arena tensor for a symbol.
    pub fn tensor(&self, symbol: &Symbol) -> Option<&Tensor> {
        self.tensors.try_get(symbol)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn n_inference_nodes(&self) -> Option<usize> {
        self.n_inference_nodes
    }

    pub fn zero_grads(&mut self) {
        self.grads.fill_all(0.0);
    }

    #[cfg(feature = "metrics")]
    pub fn perf_report(&self) -> String {
        self.perf.report()
    }

    fn load_inputs(&mut self, inputs: &[Tensor]) -> SGResult<()> {
        let expected = self.graph.inputs().len();
        if inputs.len() != expected {
            return Err(SGError::ArityMismatch {
                op: "model inputs".to_string(),
                expected,
                found: inputs.len(),
            });
        }
        for (symbol, tensor) in self.graph.inputs().iter().zip(inputs) {
            if symbol.shape().dims() != tensor.dims() {
                return Err(SGError::IncompatibleShapes {
                    expected: symbol.shape().dims().to_vec(),
                    found: tensor.dims().to_vec(),
                });
            }
            self.tensors.get_mut(symbol)?.copy_from(tensor)?;
        }
        Ok(())
    }

    fn run_nodes(&mut self, count: usize) -> SGResult<()> {
        for i in 0..count {
            let node = &self.graph.nodes()[i];

            #[cfg(feature = "metrics")]
            let started = std::time::Instant::now();

            if node.op.is_dynamic() {
                node.op.forward_dynamic(&mut self.tensors, &node.inputs, &node.outputs, &node.attrs)?;
            } else {
                if node.inputs.is_empty() || node.inputs.len() > 3 {
                    return Err(SGError::ArityMismatch {
                        op: node.op.name().to_string(),
                        expected: 3,
                        found: node.inputs.len(),
                    });
                }
                let (out, input_tensors) =
                    self.tensors.output_with_inputs(&node.outputs[0], &node.inputs)?;
                node.op.forward(out, &input_tensors, &node.attrs)?;
            }

            #[cfg(feature = "metrics")]
            self.perf.record_forward(i, node.op.name(), started.elapsed());
        }
        Ok(())
    }
}
