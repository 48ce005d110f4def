//! Exact minimum-cost bipartite assignment (Hungarian algorithm in its
//! potentials form, O(n²·m)). CEAFe needs the optimal total similarity of
//! an alignment between gold and predicted clusters; a greedy matching is
//! not optimal in general, so the exact solver is used.

/// Solve the rectangular assignment problem, minimizing total cost.
///
/// `cost` is a row-major matrix; every row must have the same width and
/// all entries must be finite. Returns, per row, the assigned column (the
/// shorter side is matched completely, the rest stay `None`).
pub fn min_cost_assignment(cost: &[Vec<f64>]) -> Vec<Option<usize>> {
    let n = cost.len();
    if n == 0 {
        return Vec::new();
    }
    let m = cost[0].len();
    debug_assert!(cost.iter().all(|row| row.len() == m));

    // The potentials form below needs rows <= cols; transpose otherwise.
    if m < n {
        let transposed: Vec<Vec<f64>> = (0..m)
            .map(|j| (0..n).map(|i| cost[i][j]).collect())
            .collect();
        let by_col = min_cost_assignment(&transposed);
        let mut by_row = vec![None; n];
        for (col, row) in by_col.iter().enumerate() {
            if let Some(row) = row {
                by_row[*row] = Some(col);
            }
        }
        return by_row;
    }

    // 1-based potentials over rows (u) and columns (v); matched[j] holds
    // the row assigned to column j, 0 meaning unmatched.
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    let mut matched = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for row in 1..=n {
        matched[0] = row;
        let mut j0 = 0usize;
        let mut min_slack = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        // Grow an alternating tree until a free column is reached.
        loop {
            used[j0] = true;
            let i0 = matched[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let slack = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if slack < min_slack[j] {
                    min_slack[j] = slack;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[matched[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }
            j0 = j1;
            if matched[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path back to the root.
        loop {
            let j1 = way[j0];
            matched[j0] = matched[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut by_row = vec![None; n];
    for j in 1..=m {
        if matched[j] != 0 {
            by_row[matched[j] - 1] = Some(j - 1);
        }
    }
    by_row
}
