use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod hierarchy;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum ReconcileError {
    #[error("invalid ranking format: {0}")]
    InvalidFormat(String),
    #[error("duplicate object label in ranking: {0}")]
    DuplicateLabel(Label),
    #[error(
        "rankings MUST cover the same object set; symmetric difference: [{}]",
        join_labels(.0)
    )]
    MismatchedObjectSet(Vec<Label>),
    #[error("unknown reconciliation variant: {0}")]
    InvalidVariant(String),
}

fn join_labels(labels: &[Label]) -> String {
    labels.iter().map(Label::as_str).collect::<Vec<_>>().join(", ")
}

/// Opaque object identifier.
///
/// Equality is by string value. The ordering is the Label Universe comparison
/// rule: labels that parse as integers sort numerically and before all
/// non-numeric labels; non-numeric labels sort lexicographically. The ordering
/// only drives deterministic output, never ranking semantics.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<i128> {
        self.0.parse().ok()
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(lhs), Some(rhs)) => lhs.cmp(&rhs).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Ordered sequence of tie-clusters, index 0 = most preferred.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Ranking {
    pub clusters: Vec<Vec<Label>>,
}

impl Ranking {
    /// Normalize a loosely-shaped ranking description into canonical clusters.
    ///
    /// Accepted shapes: a flat array of scalars (each its own singleton
    /// cluster), an array mixing scalars and arrays of scalars, or an object
    /// exposing one of those under a `ranking` or `clusters` key (checked in
    /// that order). Scalars are stringified; empty inner arrays are skipped.
    ///
    /// # Errors
    /// Returns [`ReconcileError::InvalidFormat`] when the wrapper lacks both
    /// recognized keys, the unwrapped value is not a sequence, a cluster
    /// member is not a scalar, or the result has zero clusters.
    pub fn from_value(value: &Value) -> Result<Self, ReconcileError> {
        let sequence = match value {
            Value::Object(object) => object
                .get("ranking")
                .or_else(|| object.get("clusters"))
                .ok_or_else(|| {
                    ReconcileError::InvalidFormat(
                        "wrapper object MUST expose a `ranking` or `clusters` key".to_string(),
                    )
                })?,
            other => other,
        };

        let Value::Array(items) = sequence else {
            return Err(ReconcileError::InvalidFormat(
                "ranking MUST be a sequence of clusters".to_string(),
            ));
        };

        let mut clusters: Vec<Vec<Label>> = Vec::new();
        for item in items {
            match item {
                Value::Array(members) => {
                    if members.is_empty() {
                        continue;
                    }
                    let cluster =
                        members.iter().map(scalar_label).collect::<Result<Vec<_>, _>>()?;
                    clusters.push(cluster);
                }
                scalar => clusters.push(vec![scalar_label(scalar)?]),
            }
        }

        if clusters.is_empty() {
            return Err(ReconcileError::InvalidFormat(
                "ranking MUST contain at least one cluster".to_string(),
            ));
        }

        Ok(Self { clusters })
    }

    #[must_use]
    pub fn label_set(&self) -> BTreeSet<Label> {
        self.clusters.iter().flatten().cloned().collect()
    }

    /// Map each label to its cluster index.
    ///
    /// # Errors
    /// Returns [`ReconcileError::DuplicateLabel`] when a label appears in two
    /// clusters of this ranking.
    pub fn positions(&self) -> Result<BTreeMap<Label, usize>, ReconcileError> {
        let mut positions = BTreeMap::new();
        for (index, cluster) in self.clusters.iter().enumerate() {
            for label in cluster {
                if positions.insert(label.clone(), index).is_some() {
                    return Err(ReconcileError::DuplicateLabel(label.clone()));
                }
            }
        }
        Ok(positions)
    }
}

fn scalar_label(value: &Value) -> Result<Label, ReconcileError> {
    match value {
        Value::String(text) => Ok(Label::new(text.as_str())),
        Value::Number(number) => Ok(Label::new(number.to_string())),
        Value::Bool(flag) => Ok(Label::new(flag.to_string())),
        other => Err(ReconcileError::InvalidFormat(format!(
            "cluster members MUST be scalar labels, got: {other}"
        ))),
    }
}

/// Establish the shared Label Universe of two rankings.
///
/// # Errors
/// Returns [`ReconcileError::MismatchedObjectSet`] carrying the sorted
/// symmetric difference when the two label sets are not equal.
pub fn label_universe(a: &Ranking, b: &Ranking) -> Result<Vec<Label>, ReconcileError> {
    let labels_a = a.label_set();
    let labels_b = b.label_set();
    if labels_a != labels_b {
        let difference = labels_a.symmetric_difference(&labels_b).cloned().collect();
        return Err(ReconcileError::MismatchedObjectSet(difference));
    }
    Ok(labels_a.into_iter().collect())
}

/// Fixed-size n×n boolean relation over the Label Universe index range.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RelationMatrix {
    order: usize,
    cells: Vec<bool>,
}

impl RelationMatrix {
    #[must_use]
    pub fn new(order: usize) -> Self {
        Self { order, cells: vec![false; order * order] }
    }

    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> bool {
        self.cells[row * self.order + column]
    }

    pub fn set(&mut self, row: usize, column: usize, value: bool) {
        self.cells[row * self.order + column] = value;
    }

    /// Elementwise conjunction.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        debug_assert_eq!(self.order, other.order);
        let cells = self.cells.iter().zip(&other.cells).map(|(lhs, rhs)| *lhs && *rhs).collect();
        Self { order: self.order, cells }
    }

    /// Elementwise disjunction.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        debug_assert_eq!(self.order, other.order);
        let cells = self.cells.iter().zip(&other.cells).map(|(lhs, rhs)| *lhs || *rhs).collect();
        Self { order: self.order, cells }
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut transposed = Self::new(self.order);
        for row in 0..self.order {
            for column in 0..self.order {
                transposed.set(column, row, self.get(row, column));
            }
        }
        transposed
    }

    /// Warshall transitive closure: one full pivot/row/column pass.
    #[must_use]
    pub fn transitive_closure(&self) -> Self {
        let mut closure = self.clone();
        for pivot in 0..self.order {
            for row in 0..self.order {
                if !closure.get(row, pivot) {
                    continue;
                }
                for column in 0..self.order {
                    if closure.get(pivot, column) {
                        closure.set(row, column, true);
                    }
                }
            }
        }
        closure
    }

    #[must_use]
    pub fn rows(&self) -> Vec<Vec<bool>> {
        (0..self.order)
            .map(|row| (0..self.order).map(|column| self.get(row, column)).collect())
            .collect()
    }
}

/// Build the "at least as good as" total-preorder matrix of one ranking.
///
/// `Y[i][j]` is true iff label i's cluster index is less than or equal to
/// label j's cluster index, with rows/columns indexed by universe order. The
/// result is reflexive, transitive, and total.
///
/// # Errors
/// Returns [`ReconcileError::MismatchedObjectSet`] when the ranking's label
/// set differs from the universe, or [`ReconcileError::DuplicateLabel`] when
/// a label appears in two clusters.
pub fn relation_matrix(
    ranking: &Ranking,
    universe: &[Label],
) -> Result<RelationMatrix, ReconcileError> {
    let expected: BTreeSet<&Label> = universe.iter().collect();
    let actual: BTreeSet<&Label> = ranking.clusters.iter().flatten().collect();
    if expected != actual {
        let difference =
            expected.symmetric_difference(&actual).map(|label| (*label).clone()).collect();
        return Err(ReconcileError::MismatchedObjectSet(difference));
    }

    let positions = ranking.positions()?;
    let mut universe_positions = Vec::with_capacity(universe.len());
    for label in universe {
        let Some(position) = positions.get(label) else {
            // Unreachable after the set-equality check above.
            return Err(ReconcileError::MismatchedObjectSet(vec![label.clone()]));
        };
        universe_positions.push(*position);
    }

    let mut matrix = RelationMatrix::new(universe.len());
    for (row, &left) in universe_positions.iter().enumerate() {
        for (column, &right) in universe_positions.iter().enumerate() {
            if left <= right {
                matrix.set(row, column, true);
            }
        }
    }
    Ok(matrix)
}

/// Extract the contradiction kernel of two relation matrices.
///
/// A pair {i,j} is contradictory when the consensus relation `YA ∧ YB`
/// supports neither direction, which happens exactly when the two rankings
/// impose strictly opposite preference and no tie mitigates the conflict.
/// Pairs carry the lower-universe-indexed label first and follow the (i,j),
/// i<j enumeration order.
#[must_use]
pub fn contradiction_kernel(
    ya: &RelationMatrix,
    yb: &RelationMatrix,
    universe: &[Label],
) -> Vec<(Label, Label)> {
    let consensus = ya.and(yb);
    let mut kernel = Vec::new();
    for row in 0..universe.len() {
        for column in row + 1..universe.len() {
            if !consensus.get(row, column) && !consensus.get(column, row) {
                kernel.push((universe[row].clone(), universe[column].clone()));
            }
        }
    }
    kernel
}

/// Synthesize the consistent clustered ranking from two relation matrices and
/// the contradiction kernel.
///
/// Consensus `C = YA ∧ YB` is forced symmetric on contradictory pairs, the
/// indifference relation `E = C ∧ Cᵗ` is transitively closed, and labels are
/// partitioned into equivalence classes. Classes are appended in
/// first-occurrence order of their lowest-universe-index member; this cluster
/// order is NOT derived from the consensus preference between classes (only
/// membership is), which is preserved from the source design on purpose.
#[must_use]
pub fn consistent_ranking(
    ya: &RelationMatrix,
    yb: &RelationMatrix,
    kernel: &[(Label, Label)],
    universe: &[Label],
) -> Vec<Vec<Label>> {
    let mut consensus = ya.and(yb);
    for (left, right) in kernel {
        let row = universe.iter().position(|label| label == left);
        let column = universe.iter().position(|label| label == right);
        if let (Some(row), Some(column)) = (row, column) {
            consensus.set(row, column, true);
            consensus.set(column, row, true);
        }
    }

    let tied = consensus.and(&consensus.transpose());
    let closure = tied.transitive_closure();

    let mut assigned = vec![false; universe.len()];
    let mut classes = Vec::new();
    for row in 0..universe.len() {
        if assigned[row] {
            continue;
        }
        let mut class = Vec::new();
        for column in 0..universe.len() {
            if closure.get(row, column) && closure.get(column, row) {
                assigned[column] = true;
                class.push(universe[column].clone());
            }
        }
        classes.push(class);
    }
    classes
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    ContradictionKernel,
    ConsistentRanking,
}

impl Variant {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContradictionKernel => "contradiction_kernel",
            Self::ConsistentRanking => "consistent_ranking",
        }
    }

    /// Parse a variant selector.
    ///
    /// # Errors
    /// Returns [`ReconcileError::InvalidVariant`] for any value outside the
    /// two recognized selectors (short aliases included).
    pub fn parse(value: &str) -> Result<Self, ReconcileError> {
        match value {
            "contradiction_kernel" | "kernel" => Ok(Self::ContradictionKernel),
            "consistent_ranking" | "consistent" => Ok(Self::ConsistentRanking),
            other => Err(ReconcileError::InvalidVariant(other.to_string())),
        }
    }
}

/// Result of one reconciliation, serialized as the bare payload array.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum ReconcileOutput {
    Kernel(Vec<(Label, Label)>),
    Ranking(Vec<Vec<Label>>),
}

impl ReconcileOutput {
    #[must_use]
    pub fn variant(&self) -> Variant {
        match self {
            Self::Kernel(_) => Variant::ContradictionKernel,
            Self::Ranking(_) => Variant::ConsistentRanking,
        }
    }
}

/// Reconcile two loosely-shaped ranking descriptions.
///
/// Runs the full pipeline: normalization, Label Universe validation, relation
/// matrix construction, contradiction detection, and (for
/// [`Variant::ConsistentRanking`]) consistent-ranking synthesis. All
/// validation happens before any relation algebra; partial results are never
/// produced.
///
/// # Errors
/// Returns the typed failure of the first stage that rejects its input; see
/// [`ReconcileError`].
pub fn reconcile(
    a: &Value,
    b: &Value,
    variant: Variant,
) -> Result<ReconcileOutput, ReconcileError> {
    let ranking_a = Ranking::from_value(a)?;
    let ranking_b = Ranking::from_value(b)?;
    let universe = label_universe(&ranking_a, &ranking_b)?;
    let ya = relation_matrix(&ranking_a, &universe)?;
    let yb = relation_matrix(&ranking_b, &universe)?;
    let kernel = contradiction_kernel(&ya, &yb, &universe);

    match variant {
        Variant::ContradictionKernel => Ok(ReconcileOutput::Kernel(kernel)),
        Variant::ConsistentRanking => {
            Ok(ReconcileOutput::Ranking(consistent_ranking(&ya, &yb, &kernel, &universe)))
        }
    }
}
