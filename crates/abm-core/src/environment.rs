use std::path::{Path, PathBuf};
use std::{error::Error, fmt, fs, io};

/// Rectangular resource grid, stored row-major and indexed `[y][x]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

#[derive(Debug)]
pub enum GridError {
    Io { path: PathBuf, source: io::Error },
    Parse { row: usize, col: usize, value: String },
    Negative { row: usize, col: usize, value: f64 },
    Ragged { row: usize, expected: usize, actual: usize },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Io { path, .. } => {
                write!(f, "unable to read environment from file: {}", path.display())
            }
            GridError::Parse { row, col, value } => {
                write!(f, "cell ({row}, {col}) is not numeric: {value:?}")
            }
            GridError::Negative { row, col, value } => {
                write!(f, "cell ({row}, {col}) must be finite and non-negative, got {value}")
            }
            GridError::Ragged {
                row,
                expected,
                actual,
            } => write!(f, "row {row} has {actual} columns, expected {expected}"),
        }
    }
}

impl Error for GridError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GridError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, GridError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(GridError::Ragged {
                    row: r,
                    expected: cols,
                    actual: row.len(),
                });
            }
            for (c, &value) in row.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(GridError::Negative {
                        row: r,
                        col: c,
                        value,
                    });
                }
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Parse comma-separated numeric rows. Fields may be wrapped in double
    /// quotes; blank lines are skipped.
    pub fn parse_csv(text: &str) -> Result<Self, GridError> {
        let mut rows = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row_idx = rows.len();
            let row = line
                .split(',')
                .enumerate()
                .map(|(col, field)| {
                    let field = field.trim();
                    let unquoted = field
                        .strip_prefix('"')
                        .and_then(|f| f.strip_suffix('"'))
                        .unwrap_or(field)
                        .trim();
                    unquoted.parse::<f64>().map_err(|_| GridError::Parse {
                        row: row_idx,
                        col,
                        value: field.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    pub fn load_csv(path: &Path) -> Result<Self, GridError> {
        let text = fs::read_to_string(path).map_err(|source| GridError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_csv(&text)
    }
}

/// The shared 2-D resource plane agents move through and deplete.
///
/// Axis lengths are clipped by optional limits; cells outside the clipped
/// window are kept but never visited.
#[derive(Clone, Debug)]
pub struct Environment {
    plane: Grid,
    x_length: usize,
    y_length: usize,
}

impl Environment {
    pub fn new(plane: Grid, x_limit: Option<usize>, y_limit: Option<usize>) -> Self {
        let x_length = x_limit.map_or(plane.cols, |lim| lim.min(plane.cols));
        let y_length = y_limit.map_or(plane.rows, |lim| lim.min(plane.rows));
        Self {
            plane,
            x_length,
            y_length,
        }
    }

    pub fn x_length(&self) -> usize {
        self.x_length
    }

    pub fn y_length(&self) -> usize {
        self.y_length
    }

    pub fn is_empty(&self) -> bool {
        self.x_length == 0 || self.y_length == 0
    }

    pub fn plane(&self) -> &Grid {
        &self.plane
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.plane.data[y * self.plane.cols + x]
    }

    /// Remove up to `amount` from a cell and return how much was taken.
    pub fn take(&mut self, x: usize, y: usize, amount: f64) -> f64 {
        let idx = y * self.plane.cols + x;
        let taken = self.plane.data[idx].min(amount).max(0.0);
        self.plane.data[idx] -= taken;
        taken
    }

    /// Sum of resources inside the clipped window.
    pub fn total(&self) -> f64 {
        (0..self.y_length)
            .map(|y| {
                let start = y * self.plane.cols;
                self.plane.data[start..start + self.x_length]
                    .iter()
                    .sum::<f64>()
            })
            .sum()
    }

    /// Row-major copy of the clipped window.
    pub fn window(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.x_length * self.y_length);
        for y in 0..self.y_length {
            let start = y * self.plane.cols;
            out.extend_from_slice(&self.plane.data[start..start + self.x_length]);
        }
        out
    }
}
