//! Lighting mode selection.

use serde::{Deserialize, Serialize};

/// Which light assignment strategy drives the frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightingMode {
    /// Flat per-cell light index lists over the full tile/slice grid
    Clustered,
    /// Per-cell light trees where a heuristic predicts they pay off,
    /// flat lists elsewhere
    #[default]
    Hybrid,
    /// A single depth slice holding one light tree per tile
    Tree,
}

impl LightingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LightingMode::Clustered => "Clustered",
            LightingMode::Hybrid => "Hybrid",
            LightingMode::Tree => "Tree",
        }
    }

    /// Cycle to the next mode, wrapping around.
    pub fn next(self) -> Self {
        match self {
            LightingMode::Clustered => LightingMode::Hybrid,
            LightingMode::Hybrid => LightingMode::Tree,
            LightingMode::Tree => LightingMode::Clustered,
        }
    }
}

impl std::fmt::Display for LightingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_cycle_wraps() {
        let mut mode = LightingMode::Clustered;
        mode = mode.next();
        assert_eq!(mode, LightingMode::Hybrid);
        mode = mode.next();
        assert_eq!(mode, LightingMode::Tree);
        mode = mode.next();
        assert_eq!(mode, LightingMode::Clustered);
    }

    #[test]
    fn test_mode_strings() {
        assert_eq!(LightingMode::Hybrid.to_string(), "Hybrid");
        assert_eq!(LightingMode::Clustered.as_str(), "Clustered");
    }
}
