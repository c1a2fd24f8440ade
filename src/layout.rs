//! Memory layout of a compiled straight-line program.
//!
//! The memory bank is one flat, 0-indexed array of scalars per scalar type.
//! Variables sit at the front, the optional path variable directly after
//! them, constants and temporaries are scattered through the middle, and the
//! output ranges (functions, Jacobian, time derivative) are reserved as
//! contiguous blocks at the end. This module records where each region
//! starts and how large it is.

/// Starting locations of the input regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputLocations {
    /// First slot of the variable inputs.
    pub variables: usize,
    /// Slot of the path-variable input. Meaningful only when the program
    /// has a path variable.
    pub time: usize,
}

/// Starting locations of the output regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputLocations {
    /// First slot of the function values.
    pub functions: usize,
    /// First slot of the Jacobian block. Entry `(i, j)` lives at
    /// `jacobian + i + j * F`, so each column of the matrix is
    /// function-index contiguous.
    pub jacobian: usize,
    /// First slot of the time derivatives. Meaningful only when the program
    /// has a path variable.
    pub time_deriv: usize,
}

/// Quantities of things appearing in the program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumberOf {
    pub variables: usize,
    pub functions: usize,
    /// Total Jacobian entries, `functions * variables`.
    pub jacobian: usize,
    /// Time-derivative entries; equal to `functions` when a path variable
    /// is present, zero otherwise.
    pub time_deriv: usize,
}

/// The complete memory layout of a compiled program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Layout {
    pub input: InputLocations,
    pub output: OutputLocations,
    pub counts: NumberOf,
    /// Length of the memory bank: highest slot used plus one.
    pub memory_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_empty() {
        let layout = Layout::default();
        assert_eq!(layout.memory_len, 0);
        assert_eq!(layout.counts.variables, 0);
        assert_eq!(layout.input.variables, 0);
    }
}
