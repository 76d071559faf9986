use std::fmt::Write as _;
use std::time::Duration;

/// Per-node wall-clock counters, compiled in only under the `metrics`
/// feature so disabled builds pay nothing.
#[derive(Debug, Default, Clone)]
pub struct NodeStats {
    pub name: String,
    pub forward_calls: u64,
    pub forward_time: Duration,
    pub backward_calls: u64,
    pub backward_time: Duration,
}

#[derive(Debug)]
pub struct PerfCounters {
    nodes: Vec<NodeStats>,
}

impl PerfCounters {
    pub fn new(node_count: usize) -> Self {
        Self { nodes: vec![NodeStats::default(); node_count] }
    }

    pub fn record_forward(&mut self, node: usize, name: &str, elapsed: Duration) {
        let stats = &mut self.nodes[node];
        if stats.name.is_empty() {
            stats.name = name.to_string();
        }
        stats.forward_calls += 1;
        stats.forward_time += elapsed;
    }

    pub fn record_backward(&mut self, node: usize, name: &str, elapsed: Duration) {
        let stats = &mut self.nodes[node];
        if stats.name.is_empty() {
            stats.name = name.to_string();
        }
        stats.backward_calls += 1;
        stats.backward_time += elapsed;
    }

    pub fn stats(&self) -> &[NodeStats] {
        &self.nodes
    }

    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<4} {:<12} {:>8} {:>12} {:>8} {:>12}",
            "node", "op", "fwd", "fwd total", "bwd", "bwd total"
        );
        for (i, s) in self.nodes.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:<4} {:<12} {:>8} {:>10}us {:>8} {:>10}us",
                i,
                s.name,
                s.forward_calls,
                s.forward_time.as_micros(),
                s.backward_calls,
                s.backward_time.as_micros()
            );
        }
        out
    }
}
