use daggy::{
    petgraph::visit::{DfsPostOrder, Reversed},
    Dag, NodeIndex, Walker,
};
use num_traits::Float;
use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};
use tracing::debug;

/// A scalar in the computation graph: forward value, accumulated gradient and
/// the operator that produced it (`None` for leaves).
#[derive(Clone, Debug)]
pub struct Value<T>
where
    T: Float + fmt::Display,
{
    data: T,
    grad: T,
    op: Option<Op>,
}

impl<T> Value<T>
where
    T: Float + fmt::Display,
{
    fn new(data: T) -> Self {
        Value::with_op(data, None)
    }

    fn with_op(data: T, op: Option<Op>) -> Self {
        Self {
            data,
            grad: T::zero(),
            op,
        }
    }

    pub fn data(&self) -> T {
        self.data
    }

    pub fn grad(&self) -> T {
        self.grad
    }

    pub fn op(&self) -> Option<Op> {
        self.op
    }

    pub fn is_leaf(&self) -> bool {
        self.op.is_none()
    }
}

impl<T> fmt::Display for Value<T>
where
    T: Float + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.op {
            Some(op) => write!(
                f,
                "Value {} {{ data: {:.4}, grad: {:.4} }}",
                op.as_str(),
                self.data,
                self.grad
            ),
            None => write!(f, "Value {{ data: {:.4}, grad: {:.4} }}", self.data, self.grad),
        }
    }
}

/// Operators with their own local derivative rule. Negation, subtraction and
/// division are built out of these.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    ADD,
    MUL,
    POW,
    RELU,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::ADD => "+",
            Op::MUL => "*",
            Op::POW => "^",
            Op::RELU => "relu",
        }
    }
}

/// Which argument slot an edge feeds. `x * x` produces two edges from the
/// same node, one per slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Lhs,
    Rhs,
}

/// Casts an `f64` constant into `T`; unrepresentable values become NaN.
pub(crate) fn from_f64<T: Float>(v: f64) -> T {
    T::from(v).unwrap_or_else(T::nan)
}

/// Arena holding every scalar of a forward pass. Edges point from operand to
/// result, so a node's daggy parents are its operands.
pub struct ComputationGraph<T>
where
    T: Float + fmt::Display,
{
    graph: Dag<Value<T>, Operand>,
}

impl<T> ComputationGraph<T>
where
    T: Float + fmt::Display,
{
    pub fn new() -> Self {
        Self { graph: Dag::new() }
    }

    /// Adds a leaf and returns its index.
    pub fn new_value(&mut self, data: T) -> NodeIndex {
        self.graph.add_node(Value::new(data))
    }

    pub fn new_values(&mut self, data: &[T]) -> Vec<NodeIndex> {
        data.iter().map(|&d| self.new_value(d)).collect()
    }

    pub fn add(&mut self, lhs: NodeIndex, rhs: NodeIndex) -> NodeIndex {
        let data = self.graph[lhs].data + self.graph[rhs].data;
        self.new_binary(lhs, rhs, data, Op::ADD)
    }

    pub fn mul(&mut self, lhs: NodeIndex, rhs: NodeIndex) -> NodeIndex {
        let data = self.graph[lhs].data * self.graph[rhs].data;
        self.new_binary(lhs, rhs, data, Op::MUL)
    }

    /// `-x`, as `x * -1`.
    pub fn neg(&mut self, x: NodeIndex) -> NodeIndex {
        let minus_one = self.new_value(-T::one());
        self.mul(x, minus_one)
    }

    /// `lhs - rhs`, as `lhs + (-rhs)`.
    pub fn sub(&mut self, lhs: NodeIndex, rhs: NodeIndex) -> NodeIndex {
        let neg = self.neg(rhs);
        self.add(lhs, neg)
    }

    /// `base ^ exp`. A negative base with a non-integer exponent yields NaN,
    /// which then flows through the graph like any other value.
    pub fn pow(&mut self, base: NodeIndex, exp: NodeIndex) -> NodeIndex {
        let data = self.graph[base].data.powf(self.graph[exp].data);
        self.new_binary(base, exp, data, Op::POW)
    }

    /// `lhs / rhs`, as `lhs * rhs^-1`.
    pub fn div(&mut self, lhs: NodeIndex, rhs: NodeIndex) -> NodeIndex {
        let minus_one = self.new_value(-T::one());
        let recip = self.pow(rhs, minus_one);
        self.mul(lhs, recip)
    }

    pub fn relu(&mut self, x: NodeIndex) -> NodeIndex {
        let data = self.graph[x].data.max(T::zero());
        let (_, out) = self
            .graph
            .add_child(x, Operand::Lhs, Value::with_op(data, Some(Op::RELU)));
        out
    }

    fn new_binary(&mut self, lhs: NodeIndex, rhs: NodeIndex, data: T, op: Op) -> NodeIndex {
        let (_, out) = self
            .graph
            .add_child(lhs, Operand::Lhs, Value::with_op(data, Some(op)));
        // `out` has no children yet, so this edge cannot close a cycle.
        self.graph
            .add_edge(rhs, out, Operand::Rhs)
            .expect("fresh result node cannot be part of a cycle");
        out
    }

    pub fn value(&self, idx: NodeIndex) -> &Value<T> {
        &self.graph[idx]
    }

    pub fn data(&self, idx: NodeIndex) -> T {
        self.graph[idx].data
    }

    pub fn grad(&self, idx: NodeIndex) -> T {
        self.graph[idx].grad
    }

    pub fn op(&self, idx: NodeIndex) -> Option<Op> {
        self.graph[idx].op
    }

    pub fn set_data(&mut self, idx: NodeIndex, data: T) {
        self.graph[idx].data = data;
    }

    pub fn zero_grad(&mut self, idx: NodeIndex) {
        self.graph[idx].grad = T::zero();
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Drops every node created after the first `len`. Indices below `len`
    /// stay valid, which lets long-lived leaves survive while the
    /// intermediates of a forward pass are thrown away.
    pub fn truncate(&mut self, len: usize) {
        let before = self.graph.node_count();
        while self.graph.node_count() > len {
            let last = NodeIndex::new(self.graph.node_count() - 1);
            self.graph.remove_node(last);
        }
        debug!(before, after = self.graph.node_count(), "truncated graph");
    }

    /// Returns `(lhs, rhs)` operands of `idx`.
    fn operands(&self, idx: NodeIndex) -> (Option<NodeIndex>, Option<NodeIndex>) {
        let mut lhs = None;
        let mut rhs = None;
        for (edge, parent) in self.graph.parents(idx).iter(&self.graph) {
            match self.graph.edge_weight(edge) {
                Some(Operand::Lhs) => lhs = Some(parent),
                Some(Operand::Rhs) => rhs = Some(parent),
                None => {}
            }
        }
        (lhs, rhs)
    }

    /// Every node reachable from `root` through operand edges, each exactly
    /// once, with operands ahead of the nodes computed from them.
    pub fn topological_order(&self, root: NodeIndex) -> Vec<NodeIndex> {
        let operands_first = Reversed(self.graph.graph());
        let mut dfs = DfsPostOrder::new(operands_first, root);
        let mut order = Vec::new();
        while let Some(idx) = dfs.next(operands_first) {
            order.push(idx);
        }
        order
    }

    /// Seeds `root` with gradient 1 and pushes gradients back to every node
    /// it depends on. Gradients accumulate: leaves that outlive this pass
    /// (parameters) must be zeroed before the next call.
    pub fn backward(&mut self, root: NodeIndex) {
        let order = self.topological_order(root);
        debug!(nodes = order.len(), "backward pass");

        self.graph[root].grad = T::one();
        for &idx in order.iter().rev() {
            self.backward_one_level(idx);
        }
    }

    fn accumulate(&mut self, idx: NodeIndex, delta: T) {
        let node = &mut self.graph[idx];
        node.grad = node.grad + delta;
    }

    /// Applies the local derivative rule of `idx` to its operands.
    fn backward_one_level(&mut self, idx: NodeIndex) {
        let Some(op) = self.graph[idx].op else {
            return;
        };
        let out = self.graph[idx].grad;

        match (op, self.operands(idx)) {
            (Op::ADD, (Some(a), Some(b))) => {
                self.accumulate(a, out);
                self.accumulate(b, out);
            }
            (Op::MUL, (Some(a), Some(b))) => {
                let (a_data, b_data) = (self.data(a), self.data(b));
                self.accumulate(a, b_data * out);
                self.accumulate(b, a_data * out);
            }
            (Op::POW, (Some(base), Some(exp))) => {
                let (x, y) = (self.data(base), self.data(exp));
                self.accumulate(base, y * x.powf(y - T::one()) * out);
                // d/dy x^y = x^y ln x; NaN for a negative base.
                self.accumulate(exp, x.powf(y) * x.ln() * out);
            }
            (Op::RELU, (Some(a), None)) => {
                if self.data(a) > T::zero() {
                    self.accumulate(a, out);
                }
            }
            (op, operands) => unreachable!("{op:?} built with operands {operands:?}"),
        }
    }

    /// Renders the graph in Graphviz DOT: one record per value and one
    /// circle per operator.
    pub fn write_dot<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "digraph {{")?;
        writeln!(out, r#"    rankdir="LR""#)?;
        writeln!(out, "    node [shape=record]")?;

        for (index, node) in self.graph.raw_nodes().iter().enumerate() {
            writeln!(
                out,
                r#"    {} [label="{{ {} | data: {:.4} | grad: {:.4} }}"]"#,
                index, index, node.weight.data, node.weight.grad
            )?;
            if let Some(op) = node.weight.op {
                writeln!(out, r#"    op{} [label="{}" shape=circle]"#, index, op.as_str())?;
                writeln!(out, "    op{} -> {}", index, index)?;
            }
        }

        for edge in self.graph.raw_edges() {
            writeln!(
                out,
                "    {} -> op{}",
                edge.source().index(),
                edge.target().index()
            )?;
        }
        writeln!(out, "}}")
    }

    pub fn save_dot<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = BufWriter::new(File::create(path.as_ref())?);
        self.write_dot(&mut file)?;
        file.flush()?;
        debug!(path = ?path.as_ref(), "wrote graph");
        Ok(())
    }
}

impl<T> Default for ComputationGraph<T>
where
    T: Float + fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}
