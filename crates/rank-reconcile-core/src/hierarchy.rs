//! Single-hierarchy relation matrices and the entropy-based structural
//! complexity metric. Independent of the two-ranking reconciliation pipeline;
//! only the relation-matrix algebra is shared.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Label, RelationMatrix};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum HierarchyError {
    #[error("invalid edge line `{0}`: expected `parent,child`")]
    InvalidEdge(String),
    #[error("edge list MUST contain at least one edge")]
    Empty,
    #[error("adjacency vertices MUST be positive integers, got: {0}")]
    NonNumericVertex(Label),
}

/// Parse a `parent,child` edge list, one edge per line.
///
/// Blank lines are skipped; surrounding whitespace around labels is trimmed.
///
/// # Errors
/// Returns [`HierarchyError::InvalidEdge`] for a line without exactly one
/// comma-separated non-empty pair, or [`HierarchyError::Empty`] when no edges
/// remain.
pub fn parse_edge_list(input: &str) -> Result<Vec<(Label, Label)>, HierarchyError> {
    let mut edges = Vec::new();
    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((parent, child)) = trimmed.split_once(',') else {
            return Err(HierarchyError::InvalidEdge(trimmed.to_string()));
        };
        let parent = parent.trim();
        let child = child.trim();
        if parent.is_empty() || child.is_empty() {
            return Err(HierarchyError::InvalidEdge(trimmed.to_string()));
        }
        edges.push((Label::new(parent), Label::new(child)));
    }
    if edges.is_empty() {
        return Err(HierarchyError::Empty);
    }
    Ok(edges)
}

/// Build the adjacency matrix of an edge list over positive-integer vertices.
///
/// The matrix is sized by the maximum vertex id; vertex `v` maps to index
/// `v - 1`.
///
/// # Errors
/// Returns [`HierarchyError::NonNumericVertex`] when an endpoint is not a
/// positive integer.
pub fn adjacency_matrix(edges: &[(Label, Label)]) -> Result<RelationMatrix, HierarchyError> {
    let mut order = 0_usize;
    let mut numbered = Vec::with_capacity(edges.len());
    for (parent, child) in edges {
        let from = vertex_number(parent)?;
        let to = vertex_number(child)?;
        order = order.max(from).max(to);
        numbered.push((from, to));
    }

    let mut matrix = RelationMatrix::new(order);
    for (from, to) in numbered {
        matrix.set(from - 1, to - 1, true);
    }
    Ok(matrix)
}

fn vertex_number(label: &Label) -> Result<usize, HierarchyError> {
    match label.as_str().parse::<usize>() {
        Ok(number) if number >= 1 => Ok(number),
        _ => Err(HierarchyError::NonNumericVertex(label.clone())),
    }
}

/// The five organizational relations of one hierarchy, indexed by the sorted
/// node universe.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HierarchyRelations {
    pub nodes: Vec<Label>,
    pub direct_control: RelationMatrix,
    pub direct_subordination: RelationMatrix,
    pub indirect_control: RelationMatrix,
    pub indirect_subordination: RelationMatrix,
    pub collaboration: RelationMatrix,
}

impl HierarchyRelations {
    #[must_use]
    pub fn matrices(&self) -> [&RelationMatrix; 5] {
        [
            &self.direct_control,
            &self.direct_subordination,
            &self.indirect_control,
            &self.indirect_subordination,
            &self.collaboration,
        ]
    }
}

/// Derive the five hierarchy relation matrices from an edge list.
///
/// Direct control holds the edges as given; direct subordination is its
/// transpose. Indirect control is the transitive closure minus the direct
/// edges and the diagonal; indirect subordination is its transpose.
/// Collaboration joins distinct nodes sharing a parent, symmetrically.
#[must_use]
pub fn hierarchy_relations(edges: &[(Label, Label)]) -> HierarchyRelations {
    let node_set: BTreeSet<Label> =
        edges.iter().flat_map(|(parent, child)| [parent.clone(), child.clone()]).collect();
    let nodes: Vec<Label> = node_set.into_iter().collect();
    let index: BTreeMap<&Label, usize> =
        nodes.iter().enumerate().map(|(position, label)| (label, position)).collect();
    let order = nodes.len();

    let mut direct_control = RelationMatrix::new(order);
    let mut parent_of: BTreeMap<&Label, &Label> = BTreeMap::new();
    for (parent, child) in edges {
        if let (Some(&row), Some(&column)) = (index.get(parent), index.get(child)) {
            direct_control.set(row, column, true);
        }
        parent_of.insert(child, parent);
    }
    let direct_subordination = direct_control.transpose();

    let closure = direct_control.transitive_closure();
    let mut indirect_control = RelationMatrix::new(order);
    for row in 0..order {
        for column in 0..order {
            if row != column && closure.get(row, column) && !direct_control.get(row, column) {
                indirect_control.set(row, column, true);
            }
        }
    }
    let indirect_subordination = indirect_control.transpose();

    let mut collaboration = RelationMatrix::new(order);
    for row in 0..order {
        for column in 0..order {
            if row == column {
                continue;
            }
            let left_parent = parent_of.get(&nodes[row]);
            let right_parent = parent_of.get(&nodes[column]);
            if let (Some(left), Some(right)) = (left_parent, right_parent) {
                if left == right {
                    collaboration.set(row, column, true);
                }
            }
        }
    }

    HierarchyRelations {
        nodes,
        direct_control,
        direct_subordination,
        indirect_control,
        indirect_subordination,
        collaboration,
    }
}

/// Shannon-entropy structural complexity of one hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ComplexityReport {
    pub entropy: f64,
    pub normalized: f64,
}

/// Compute total structural entropy and its normalized form.
///
/// For each node and relation, the out-degree ratio `P = l / (n - 1)`
/// contributes `-P * log2(P)` when positive. The reference entropy is
/// `n * R / (e * ln 2)` for `R` relations; the normalized complexity divides
/// by it (0 when the reference is 0).
#[must_use]
pub fn structural_complexity(relations: &HierarchyRelations) -> ComplexityReport {
    let order = relations.nodes.len();
    let matrices = relations.matrices();

    let mut entropy = 0.0_f64;
    if order > 1 {
        for matrix in matrices {
            for row in 0..order {
                let out_degree = (0..order).filter(|&column| matrix.get(row, column)).count();
                if out_degree > 0 {
                    let probability = ratio(out_degree, order - 1);
                    entropy -= probability * probability.log2();
                }
            }
        }
    }

    let reference =
        ratio_f64(order * matrices.len()) / (std::f64::consts::E * std::f64::consts::LN_2);
    let normalized = if reference > 0.0 { entropy / reference } else { 0.0 };
    ComplexityReport { entropy, normalized }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    ratio_f64(numerator) / ratio_f64(denominator)
}

fn ratio_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}
