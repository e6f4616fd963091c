//! Square matrix storage, text-file I/O, and the add/multiply kernels
//!
//! Matrix files are whitespace-separated floating-point values, row-major,
//! exactly N x N entries, no header. Row-range kernels operate on flat
//! buffers so the worker can run them directly on wire payloads.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Dense N x N matrix, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub size: usize,
    pub data: Vec<f32>,
}

impl Matrix {
    /// Zero-filled matrix
    pub fn new(size: usize) -> Self {
        Matrix {
            size,
            data: vec![0.0; size * size],
        }
    }

    /// Build from a flat buffer; the length must be exactly size * size
    pub fn from_vec(data: Vec<f32>, size: usize) -> Result<Self> {
        if data.len() != size * size {
            anyhow::bail!(
                "Data length {} does not match dimensions {}x{}",
                data.len(),
                size,
                size
            );
        }
        Ok(Matrix { size, data })
    }

    /// Load an N x N matrix from a text file
    ///
    /// The expected dimension comes from the command argument, not the file;
    /// too few or too many values is an error.
    pub fn load<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut data = Vec::with_capacity(size * size);
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;
            for token in line.split_whitespace() {
                if data.len() == size * size {
                    anyhow::bail!(
                        "{}: more than {} values for a {}x{} matrix",
                        path.display(),
                        size * size,
                        size,
                        size
                    );
                }
                let value: f32 = token.parse().with_context(|| {
                    format!("{}: bad value {:?} on line {}", path.display(), token, line_num + 1)
                })?;
                data.push(value);
            }
        }

        if data.len() != size * size {
            anyhow::bail!(
                "{}: expected {} values for a {}x{} matrix, found {}",
                path.display(),
                size * size,
                size,
                size,
                data.len()
            );
        }

        Ok(Matrix { size, data })
    }

    /// Save to a text file, one row per line
    pub fn store<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        for row in self.data.chunks(self.size) {
            let line = row
                .iter()
                .map(|v| format!("{:.6}", v))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Borrow rows `[start_row, end_row)` as a flat slice
    pub fn row_slice(&self, start_row: usize, end_row: usize) -> &[f32] {
        &self.data[start_row * self.size..end_row * self.size]
    }
}

/// Element-wise add over a row range
///
/// Both inputs are `rows * n` slices covering the same row range.
pub fn add_rows(a: &[f32], b: &[f32], _n: usize) -> Vec<f32> {
    a.iter().zip(b.iter()).map(|(x, y)| x + y).collect()
}

/// Row-range multiply: `(rows x n) . (n x n)`
///
/// `a` holds the assigned row slice of the left operand; `b` must be the
/// full right operand because every output row reads all of its columns.
pub fn mult_rows(a: &[f32], b: &[f32], n: usize) -> Vec<f32> {
    let rows = a.len() / n;
    let mut out = vec![0.0f32; rows * n];
    for i in 0..rows {
        for j in 0..n {
            let mut sum = 0.0f32;
            for k in 0..n {
                sum += a[i * n + k] * b[k * n + j];
            }
            out[i * n + j] = sum;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m.txt");

        let m = Matrix::from_vec(vec![1.0, 2.0, 3.0, 4.0], 2).unwrap();
        m.store(&path).unwrap();

        let loaded = Matrix::load(&path, 2).unwrap();
        assert_eq!(loaded.size, 2);
        assert_eq!(loaded.data, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_load_rejects_wrong_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.txt");
        std::fs::write(&path, "1.0 2.0 3.0").unwrap();

        assert!(Matrix::load(&path, 2).is_err()); // 3 values for a 2x2
        assert!(Matrix::load(&path, 1).is_err()); // 3 values for a 1x1
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Matrix::load("/nonexistent/matrix.txt", 4).is_err());
    }

    #[test]
    fn test_from_vec_validates_length() {
        assert!(Matrix::from_vec(vec![0.0; 3], 2).is_err());
        assert!(Matrix::from_vec(vec![0.0; 4], 2).is_ok());
    }

    #[test]
    fn test_add_rows() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(add_rows(&a, &b, 2), vec![11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn test_mult_rows_single_row() {
        // Row [1, 2] times [[1, 2], [3, 4]] = [7, 10]
        let a = [1.0, 2.0];
        let b = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mult_rows(&a, &b, 2), vec![7.0, 10.0]);
    }

    #[test]
    fn test_mult_rows_matches_full_multiply() {
        // 3x3 identity on the left leaves B unchanged
        let mut identity = vec![0.0f32; 9];
        for i in 0..3 {
            identity[i * 3 + i] = 1.0;
        }
        let b: Vec<f32> = (0..9).map(|v| v as f32).collect();

        let full = mult_rows(&identity, &b, 3);
        assert_eq!(full, b);

        // Row-range [1, 3) of the same product
        let chunk = mult_rows(&identity[3..9], &b, 3);
        assert_eq!(chunk, b[3..9].to_vec());
    }

    #[test]
    fn test_row_slice() {
        let m = Matrix::from_vec((0..9).map(|v| v as f32).collect(), 3).unwrap();
        assert_eq!(m.row_slice(1, 2), &[3.0, 4.0, 5.0]);
        assert_eq!(m.row_slice(0, 3).len(), 9);
    }
}
