//! Routing matrix
//!
//! A fixed-size boolean grid `route[input][output]`. Out-of-range addressing
//! is never an error: queries answer false and mutations do nothing.

use tracing::debug;

/// Inputs of the standard router: three DIN ports, wireless, USB
pub const DEFAULT_INPUTS: usize = 5;

/// Outputs of the standard router: three DIN ports
pub const DEFAULT_OUTPUTS: usize = 3;

/// Result of validating an (input, output) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteIndex {
    /// Flat cell index
    Valid(usize),
    OutOfRange,
}

/// Live input → output routing table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingMatrix {
    inputs: usize,
    outputs: usize,
    cells: Vec<bool>,
}

impl RoutingMatrix {
    /// Create a matrix in its default mapping
    pub fn new(inputs: usize, outputs: usize) -> Self {
        let mut matrix = Self {
            inputs,
            outputs,
            cells: vec![false; inputs * outputs],
        };
        matrix.set_default_diagonal();
        matrix
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Reset to the default mapping.
    ///
    /// Input `i` goes to output `i` while there is one; every remaining input
    /// goes to output 0 only.
    pub fn set_default_diagonal(&mut self) {
        for input in 0..self.inputs {
            for output in 0..self.outputs {
                let on = if input < self.outputs {
                    input == output
                } else {
                    output == 0
                };
                self.cells[input * self.outputs + output] = on;
            }
        }
    }

    /// Validate a cell address
    pub fn index(&self, input: usize, output: usize) -> RouteIndex {
        if input < self.inputs && output < self.outputs {
            RouteIndex::Valid(input * self.outputs + output)
        } else {
            RouteIndex::OutOfRange
        }
    }

    /// Whether `input` is currently routed to `output`
    pub fn get(&self, input: usize, output: usize) -> bool {
        match self.index(input, output) {
            RouteIndex::Valid(idx) => self.cells[idx],
            RouteIndex::OutOfRange => false,
        }
    }

    /// Flip a cell. Returns false (and does nothing) when out of range.
    pub fn toggle(&mut self, input: usize, output: usize) -> bool {
        match self.index(input, output) {
            RouteIndex::Valid(idx) => {
                self.cells[idx] = !self.cells[idx];
                debug!(input, output, enabled = self.cells[idx], "Route toggled");
                true
            }
            RouteIndex::OutOfRange => {
                debug!(input, output, "Ignoring toggle outside the matrix");
                false
            }
        }
    }

    /// Outputs currently enabled for `input`, in ascending order
    pub fn enabled_outputs(&self, input: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.outputs).filter(move |&output| self.get(input, output))
    }
}

impl Default for RoutingMatrix {
    fn default() -> Self {
        Self::new(DEFAULT_INPUTS, DEFAULT_OUTPUTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_mapping() {
        let matrix = RoutingMatrix::default();

        for input in 0..3 {
            for output in 0..3 {
                assert_eq!(matrix.get(input, output), input == output);
            }
        }
        // Wireless and USB land on the first DIN output
        for input in 3..5 {
            assert!(matrix.get(input, 0));
            assert!(!matrix.get(input, 1));
            assert!(!matrix.get(input, 2));
        }
    }

    #[test]
    fn test_default_mapping_more_outputs_than_inputs() {
        let matrix = RoutingMatrix::new(2, 4);
        assert_eq!(matrix.enabled_outputs(0).collect::<Vec<_>>(), vec![0]);
        assert_eq!(matrix.enabled_outputs(1).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_out_of_range_get_is_false() {
        let matrix = RoutingMatrix::default();
        assert!(!matrix.get(5, 0));
        assert!(!matrix.get(0, 3));
        assert!(!matrix.get(usize::MAX, usize::MAX));
        assert_eq!(matrix.index(5, 0), RouteIndex::OutOfRange);
        assert_eq!(matrix.index(1, 2), RouteIndex::Valid(5));
    }

    #[test]
    fn test_out_of_range_toggle_is_noop() {
        let mut matrix = RoutingMatrix::default();
        let before = matrix.clone();
        assert!(!matrix.toggle(7, 1));
        assert!(!matrix.toggle(1, 3));
        assert_eq!(matrix, before);
    }

    #[test]
    fn test_reset_restores_default() {
        let mut matrix = RoutingMatrix::default();
        matrix.toggle(0, 2);
        matrix.toggle(4, 0);
        matrix.set_default_diagonal();
        assert_eq!(matrix, RoutingMatrix::default());
    }

    proptest! {
        #[test]
        fn test_toggle_is_involution(input in 0usize..8, output in 0usize..6) {
            let mut matrix = RoutingMatrix::default();
            let before = matrix.clone();
            let was = matrix.get(input, output);

            let applied = matrix.toggle(input, output);
            if applied {
                prop_assert_eq!(matrix.get(input, output), !was);
            } else {
                prop_assert_eq!(&matrix, &before);
            }

            matrix.toggle(input, output);
            prop_assert_eq!(matrix, before);
        }
    }
}
