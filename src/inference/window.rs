use std::ops::Range;

use crate::constants::{MIN_Y, MODEL_HEIGHT, WORLD_HEIGHT};

/// The vertical slice of the world the model sees.
///
/// The model works on `model_height` rows centred in the world's
/// `world_height` rows. Every conversion between model rows, grid rows
/// (`0..world_height`) and absolute world heights goes through here, so
/// sampling and scattering always agree on the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelWindow {
    pub model_height: i32,
    pub world_height: i32,
    pub min_y: i32,
}

impl ModelWindow {
    pub const fn new(model_height: i32, world_height: i32, min_y: i32) -> Self {
        Self {
            model_height,
            world_height,
            min_y,
        }
    }

    /// `(model_height - world_height) / 2`, truncated toward zero. Negative
    /// whenever the model is shorter than the world.
    pub const fn offset(&self) -> i32 {
        (self.model_height - self.world_height) / 2
    }

    /// Grid row (world height relative to `min_y`) a model row lands on.
    pub const fn grid_row(&self, model_y: i32) -> i32 {
        model_y - self.offset()
    }

    /// Absolute world height sampled for a model row.
    pub const fn world_y(&self, model_y: i32) -> i32 {
        self.grid_row(model_y) + self.min_y
    }

    pub const fn row_to_world_y(&self, row: i32) -> i32 {
        row + self.min_y
    }

    pub const fn contains_row(&self, row: i32) -> bool {
        row >= 0 && row < self.world_height
    }

    /// Grid rows that receive real predictions.
    pub fn predicted_rows(&self) -> Range<i32> {
        let start = self.grid_row(0).clamp(0, self.world_height);
        let end = self.grid_row(self.model_height).clamp(0, self.world_height);
        start..end
    }
}

impl Default for ModelWindow {
    fn default() -> Self {
        Self::new(MODEL_HEIGHT, WORLD_HEIGHT, MIN_Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_is_centred() {
        let window = ModelWindow::default();
        assert_eq!(window.offset(), -176);
        assert_eq!(window.world_y(0), 112);
        assert_eq!(window.world_y(MODEL_HEIGHT - 1), 143);
        assert_eq!(window.predicted_rows(), 176..208);
    }

    #[test]
    fn test_sampling_and_scatter_agree() {
        let window = ModelWindow::new(31, 384, -64);
        for model_y in 0..31 {
            let row = window.grid_row(model_y);
            assert_eq!(window.row_to_world_y(row), window.world_y(model_y));
        }
    }

    #[test]
    fn test_model_taller_than_world_clips() {
        let window = ModelWindow::new(40, 20, 0);
        assert_eq!(window.offset(), 10);
        assert_eq!(window.world_y(0), -10);
        assert!(!window.contains_row(window.grid_row(0)));
        assert_eq!(window.predicted_rows(), 0..20);
    }
}
