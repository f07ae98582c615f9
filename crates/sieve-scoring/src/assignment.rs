//! Rectangular minimum-cost bipartite assignment (Kuhn-Munkres), used to
//! match base invoice lines against candidate invoice lines.

/// Solve the rectangular minimum-cost assignment problem for a `rows x
/// cols` cost matrix. Returns, for each row, the column it was matched to
/// (or `None` if `cols < rows` left it unmatched). Every column is used at
/// most once; `min(rows, cols)` rows end up matched.
///
/// `cost` must be rectangular (every row the same length) and free of
/// NaN. An empty matrix (zero rows or zero columns) returns all-`None`.
pub fn min_cost_assignment(cost: &[Vec<f64>]) -> Vec<Option<usize>> {
    let rows = cost.len();
    let cols = if rows == 0 { 0 } else { cost[0].len() };
    if rows == 0 || cols == 0 {
        return vec![None; rows];
    }

    // The classic O(n^3) primal-dual algorithm is stated for n <= m
    // (rows <= cols); transpose when there are more rows than columns
    // and swap the result back at the end.
    if rows <= cols {
        solve(cost, rows, cols)
    } else {
        let transposed: Vec<Vec<f64>> = (0..cols)
            .map(|j| (0..rows).map(|i| cost[i][j]).collect())
            .collect();
        let col_to_row = solve(&transposed, cols, rows);
        let mut row_to_col = vec![None; rows];
        for (j, assigned_row) in col_to_row.into_iter().enumerate() {
            if let Some(i) = assigned_row {
                row_to_col[i] = Some(j);
            }
        }
        row_to_col
    }
}

/// `cost` is `n x m` with `n <= m`. 1-indexed internally, as in the
/// textbook presentation of the algorithm.
fn solve(cost: &[Vec<f64>], n: usize, m: usize) -> Vec<Option<usize>> {
    const INF: f64 = f64::INFINITY;
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut p = vec![0usize; m + 1]; // p[j] = row matched to column j, 1-indexed, 0 = unmatched
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![INF; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = INF;
            let mut j1 = 0usize;
            for j in 1..=m {
                if !used[j] {
                    let cur = cost[i0 - 1][j - 1] - u[i0] - v[j];
                    if cur < minv[j] {
                        minv[j] = cur;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![None; n];
    for (j, &row) in p.iter().enumerate().skip(1) {
        if row != 0 {
            row_to_col[row - 1] = Some(j - 1);
        }
    }
    row_to_col
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_matrix_picks_min_cost_permutation() {
        let cost = vec![
            vec![4.0, 1.0, 3.0],
            vec![2.0, 0.0, 5.0],
            vec![3.0, 2.0, 2.0],
        ];
        let result = min_cost_assignment(&cost);
        assert_eq!(result, vec![Some(1), Some(0), Some(2)]);
    }

    #[test]
    fn test_more_columns_than_rows_leaves_no_row_unmatched() {
        let cost = vec![vec![1.0, 9.0, 9.0], vec![9.0, 1.0, 9.0]];
        let result = min_cost_assignment(&cost);
        assert_eq!(result, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_more_rows_than_columns_leaves_some_rows_unmatched() {
        let cost = vec![vec![1.0], vec![5.0], vec![2.0]];
        let result = min_cost_assignment(&cost);
        let matched: Vec<_> = result.iter().filter(|r| r.is_some()).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(result[0], Some(0));
    }

    #[test]
    fn test_empty_matrix() {
        let cost: Vec<Vec<f64>> = vec![];
        assert_eq!(min_cost_assignment(&cost), Vec::<Option<usize>>::new());
    }
}
