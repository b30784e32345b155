use serde::{Deserialize, Serialize};

/// Largest grid a run may ask for.
pub const MAX_GRID_CELLS: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid must have at least one row and one column, got {rows}x{cols}")]
    EmptyGrid { rows: usize, cols: usize },
    #[error("A {rows}x{cols} grid exceeds the limit of {MAX_GRID_CELLS} cells")]
    GridTooLarge { rows: usize, cols: usize },
    #[error("{robots} robots and {boxes} boxes do not fit on a {rows}x{cols} grid")]
    Overcrowded {
        robots: usize,
        boxes: usize,
        rows: usize,
        cols: usize,
    },
}

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid height (M).
    pub rows: usize,
    /// Grid width (N).
    pub cols: usize,
    pub robots: usize,
    pub boxes: usize,
    /// Seed for every random choice in the run. Drawn at startup when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            rows: 10,
            cols: 10,
            robots: 5,
            boxes: 15,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::EmptyGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let cells = self
            .rows
            .checked_mul(self.cols)
            .filter(|cells| *cells <= MAX_GRID_CELLS)
            .ok_or(ConfigError::GridTooLarge {
                rows: self.rows,
                cols: self.cols,
            })?;
        if self.robots.saturating_add(self.boxes) > cells {
            return Err(ConfigError::Overcrowded {
                robots: self.robots,
                boxes: self.boxes,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_population_larger_than_grid() {
        let config = SimulationConfig {
            rows: 2,
            cols: 2,
            robots: 3,
            boxes: 2,
            seed: None,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Overcrowded { .. })
        ));
    }

    #[test]
    fn rejects_empty_grid() {
        let config = SimulationConfig {
            rows: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyGrid { .. })));
    }

    #[test]
    fn rejects_huge_or_overflowing_grids() {
        for (rows, cols) in [(usize::MAX, 2), (1 << 11, 1 << 10)] {
            let config = SimulationConfig {
                rows,
                cols,
                ..SimulationConfig::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::GridTooLarge { rows, cols }));
        }

        let at_limit = SimulationConfig {
            rows: 1 << 10,
            cols: 1 << 10,
            ..SimulationConfig::default()
        };
        assert_eq!(at_limit.validate(), Ok(()));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimulationConfig = serde_json::from_str(r#"{"robots": 2}"#).unwrap();
        assert_eq!(config.robots, 2);
        assert_eq!(config.rows, 10);
        assert_eq!(config.seed, None);
    }
}
