//! Dense Euclidean distance matrix over node ids.

/// Symmetric distances between every pair of nodes, stored row-major.
///
/// # Examples
///
/// ```
/// use trsp_alns::distance::DistanceMatrix;
///
/// let dm = DistanceMatrix::euclidean(&[(0.0, 0.0), (3.0, 4.0), (6.0, 8.0)]);
/// assert!((dm.get(0, 1) - 5.0).abs() < 1e-10);
/// assert!((dm.max() - 10.0).abs() < 1e-10);
/// assert_eq!(dm.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
    max: f64,
}

impl DistanceMatrix {
    /// Distances between the given positions; node `i` is `points[i]`.
    pub fn euclidean(points: &[(f64, f64)]) -> Self {
        let n = points.len();
        let mut data = vec![0.0; n * n];
        let mut max = 0.0_f64;
        for (i, &(xi, yi)) in points.iter().enumerate() {
            for (j, &(xj, yj)) in points.iter().enumerate().skip(i + 1) {
                let d = (xi - xj).hypot(yi - yj);
                data[i * n + j] = d;
                data[j * n + i] = d;
                max = max.max(d);
            }
        }
        Self { n, data, max }
    }

    /// Distance from `from` to `to`.
    ///
    /// # Panics
    ///
    /// Panics if either id is out of range.
    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.n + to]
    }

    /// Distances from `from` to every node.
    pub fn row(&self, from: usize) -> &[f64] {
        &self.data[from * self.n..(from + 1) * self.n]
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Largest distance, zero without nodes.
    pub fn max(&self) -> f64 {
        self.max
    }
}
