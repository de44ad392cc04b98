use std::fmt;
use std::time::Duration;

// Per-node performance metrics — compiled in only under the `profile`
// feature. Each node accumulates wall-clock totals for its forward and
// backward kernels; the report aggregates them into a table.

/// Accumulated timing for one node in one direction.
#[derive(Debug, Clone, Copy, Default)]
struct NodeTimer {
    calls: usize,
    total: Duration,
}

impl NodeTimer {
    fn record(&mut self, d: Duration) {
        self.calls += 1;
        self.total += d;
    }

    fn avg(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

/// Timing counters for every node of a compiled model.
#[derive(Debug)]
pub struct Metrics {
    ops: Vec<&'static str>,
    forward: Vec<NodeTimer>,
    backward: Vec<NodeTimer>,
}

impl Metrics {
    pub(crate) fn new(ops: &[&'static str]) -> Self {
        Metrics {
            ops: ops.to_vec(),
            forward: vec![NodeTimer::default(); ops.len()],
            backward: vec![NodeTimer::default(); ops.len()],
        }
    }

    pub(crate) fn record_forward(&mut self, node: usize, d: Duration) {
        self.forward[node].record(d);
    }

    pub(crate) fn record_backward(&mut self, node: usize, d: Duration) {
        self.backward[node].record(d);
    }

    /// Aggregate the counters into a printable report.
    pub fn report(&self) -> Report {
        let rows = self
            .ops
            .iter()
            .enumerate()
            .map(|(i, op)| Row {
                node: i,
                op,
                fwd_calls: self.forward[i].calls,
                fwd_total: self.forward[i].total,
                fwd_avg: self.forward[i].avg(),
                bwd_calls: self.backward[i].calls,
                bwd_total: self.backward[i].total,
            })
            .collect();
        Report { rows }
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    pub node: usize,
    pub op: &'static str,
    pub fwd_calls: usize,
    pub fwd_total: Duration,
    pub fwd_avg: Duration,
    pub bwd_calls: usize,
    pub bwd_total: Duration,
}

/// Per-node timing table, printed with `Display`.
#[derive(Debug, Clone)]
pub struct Report {
    pub rows: Vec<Row>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<5} {:<12} {:>9} {:>12} {:>12} {:>9} {:>12}",
            "node", "op", "fwd-calls", "fwd-total", "fwd-avg", "bwd-calls", "bwd-total"
        )?;
        for r in &self.rows {
            writeln!(
                f,
                "{:<5} {:<12} {:>9} {:>12.2?} {:>12.2?} {:>9} {:>12.2?}",
                r.node, r.op, r.fwd_calls, r.fwd_total, r.fwd_avg, r.bwd_calls, r.bwd_total
            )?;
        }
        let fwd: Duration = self.rows.iter().map(|r| r.fwd_total).sum();
        let bwd: Duration = self.rows.iter().map(|r| r.bwd_total).sum();
        writeln!(f, "total forward {:.2?}, backward {:.2?}", fwd, bwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_report() {
        let mut m = Metrics::new(&["relu", "mean"]);
        m.record_forward(0, Duration::from_micros(10));
        m.record_forward(0, Duration::from_micros(30));
        m.record_backward(1, Duration::from_micros(5));

        let report = m.report();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].fwd_calls, 2);
        assert_eq!(report.rows[0].fwd_total, Duration::from_micros(40));
        assert_eq!(report.rows[0].fwd_avg, Duration::from_micros(20));
        assert_eq!(report.rows[1].bwd_calls, 1);

        let s = format!("{}", report);
        assert!(s.contains("relu"));
        assert!(s.contains("mean"));
    }
}
