use anyhow::Result;

use crate::data::matrix::InteractionMatrix;
use crate::domain::traits::{Recommender, ScoredItem, SparseRow};

/// Ranks items by their number of stored train ratings.
pub struct PopularityRecommender {
    item_counts: Vec<f32>,
    num_users:   usize,
}

impl PopularityRecommender {
    /// Count stored entries per item row of the item × user matrix.
    pub fn fit(matrix: &InteractionMatrix) -> Self {
        let shape = matrix.shape();
        let item_counts = (0..shape.n_items)
            .map(|m| matrix.item_row(m).map_or(0, |row| row.nnz()) as f32)
            .collect();

        Self { item_counts, num_users: shape.n_users }
    }
}

impl Recommender for PopularityRecommender {
    fn num_users(&self) -> usize {
        self.num_users
    }

    fn recommend(
        &self,
        _u_index: usize,
        user_row: &SparseRow,
        top_n:    usize,
    ) -> Result<Vec<ScoredItem>> {
        let mut candidates: Vec<ScoredItem> = self
            .item_counts
            .iter()
            .enumerate()
            .filter(|(m, _)| !user_row.contains(*m))
            .map(|(m_index, &score)| ScoredItem { m_index, score })
            .collect();

        // Highest count first, lower index breaks ties
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.m_index.cmp(&b.m_index)));
        candidates.truncate(top_n);
        Ok(candidates)
    }
}
