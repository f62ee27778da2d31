// ============================================================
// Layer 4 — Interaction Matrix Builder
// ============================================================
// Builds the sparse item × user rating matrix consumed by the
// factorization model, plus the id maps that translate its
// row / column numbers back to raw ids and titles.
//
//   rows    = items  (m_index)
//   columns = users  (u_index)
//   values  = rating as f32
//
// Construction: coordinate list (TriMat) → compressed sparse
// rows (CSR), so one row is one item's ratings across users.
// When the same (item, user) pair appears more than once the
// coordinate entries are SUMMED by the conversion.
//
// Only the train partition contributes values, but the shape
// comes from the full merged table. A user or item that only
// appears in test still owns an all-zero column / row, so the
// train matrix and anything built from test line up.

use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::domain::error::PipelineError;
use crate::domain::id_index::IdIndex;
use crate::domain::rating::{ItemMapRow, MergedRecord, UserMapRow};
use crate::domain::traits::SparseRow;

/// (n_items, n_users) of the interaction matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixShape {
    pub n_items: usize,
    pub n_users: usize,
}

impl MatrixShape {
    /// Global shape: `max(m_index) + 1` by `max(u_index) + 1` over
    /// the full merged table, not just the train rows.
    pub fn from_records(records: &[MergedRecord]) -> Self {
        let n_items = records.iter().map(|r| r.m_index + 1).max().unwrap_or(0);
        let n_users = records.iter().map(|r| r.u_index + 1).max().unwrap_or(0);
        Self { n_items, n_users }
    }

    pub fn as_tuple(&self) -> (usize, usize) {
        (self.n_items, self.n_users)
    }
}

/// Sparse item × user matrix in CSR form, with its user × item
/// transpose kept alongside for by-user lookups.
#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    item_user: CsMat<f32>,
    user_item: CsMat<f32>,
}

impl InteractionMatrix {
    /// Assemble the matrix from `train` with the given global shape.
    pub fn build(train: &[MergedRecord], shape: MatrixShape) -> Result<Self, PipelineError> {
        let mut triplets = TriMat::with_capacity(shape.as_tuple(), train.len());

        for rec in train {
            if rec.m_index >= shape.n_items || rec.u_index >= shape.n_users {
                return Err(PipelineError::shape_mismatch(
                    "interaction matrix",
                    format!("indices below {:?}", shape.as_tuple()),
                    format!("({}, {})", rec.m_index, rec.u_index),
                ));
            }
            triplets.add_triplet(rec.m_index, rec.u_index, rec.rating as f32);
        }

        let item_user: CsMat<f32> = triplets.to_csr();

        tracing::info!(
            "Built item x user matrix: {} x {}, {} stored ratings from {} train rows",
            item_user.rows(),
            item_user.cols(),
            item_user.nnz(),
            train.len(),
        );
        Ok(Self::from_matrix(item_user))
    }

    /// Wrap an existing matrix (e.g. one read back from disk),
    /// converting it to CSR if needed.
    pub fn from_matrix(matrix: CsMat<f32>) -> Self {
        let item_user = if matrix.is_csr() { matrix } else { matrix.to_csr() };
        let user_item = item_user.transpose_view().to_csr();
        Self { item_user, user_item }
    }

    pub fn item_user(&self) -> &CsMat<f32> {
        &self.item_user
    }

    pub fn shape(&self) -> MatrixShape {
        MatrixShape {
            n_items: self.item_user.rows(),
            n_users: self.item_user.cols(),
        }
    }

    pub fn nnz(&self) -> usize {
        self.item_user.nnz()
    }

    /// One item's ratings across users.
    pub fn item_row(&self, m_index: usize) -> Option<SparseRow> {
        sparse_row(&self.item_user, m_index)
    }

    /// One user's ratings across items.
    pub fn user_row(&self, u_index: usize) -> Option<SparseRow> {
        sparse_row(&self.user_item, u_index)
    }

    /// The exact transpose as a CSR user × item matrix, so that a row
    /// is one user's ratings across items.
    pub fn user_item(&self) -> &CsMat<f32> {
        &self.user_item
    }
}

/// Copy row `row` of a CSR matrix into a `SparseRow`.
fn sparse_row(matrix: &CsMat<f32>, row: usize) -> Option<SparseRow> {
    let view = matrix.outer_view(row)?;
    let (indices, values) = view.iter().map(|(i, &v)| (i, v)).unzip();
    Some(SparseRow { indices, values })
}

/// One (user_id, u_index) row per entry of the user index, in
/// u_index order.
pub fn build_user_map(users: &IdIndex) -> Vec<UserMapRow> {
    users
        .iter()
        .map(|(u_index, user_id)| UserMapRow { user_id, u_index })
        .collect()
}

/// One (movie_id, m_index, title, genres) row per entry of the item
/// index, in m_index order. Title and genres come from the item's
/// first merged row.
pub fn build_item_map(items: &IdIndex, records: &[MergedRecord]) -> Vec<ItemMapRow> {
    let mut catalog: Vec<Option<&MergedRecord>> = vec![None; items.len()];
    for rec in records {
        if let Some(slot) = catalog.get_mut(rec.m_index) {
            if slot.is_none() {
                *slot = Some(rec);
            }
        }
    }

    items
        .iter()
        .map(|(m_index, movie_id)| {
            let (title, genres) = catalog[m_index]
                .map(|r| (r.title.clone(), r.genres.clone()))
                .unwrap_or_default();
            ItemMapRow { movie_id, m_index, title, genres }
        })
        .collect()
}
