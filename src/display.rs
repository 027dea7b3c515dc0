//! Matrix display
//!
//! The router only asks for a render; how the grid is drawn belongs to the
//! display implementation.

use colored::*;

use crate::matrix::RoutingMatrix;
use crate::selection::SelectionCursor;

/// Render target for the routing matrix and cursor
pub trait MatrixDisplay {
    fn render_matrix(&mut self, matrix: &RoutingMatrix, cursor: &SelectionCursor);
}

/// Renders the grid to stdout
pub struct ConsoleDisplay {
    input_labels: Vec<String>,
    output_labels: Vec<String>,
}

impl ConsoleDisplay {
    pub fn new(input_labels: Vec<String>, output_labels: Vec<String>) -> Self {
        Self {
            input_labels,
            output_labels,
        }
    }

    fn input_label(&self, index: usize) -> String {
        self.input_labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("In{}", index + 1))
    }

    fn output_label(&self, index: usize) -> String {
        self.output_labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Out{}", index + 1))
    }

    /// Build the text of one frame
    pub fn render_to_string(&self, matrix: &RoutingMatrix, cursor: &SelectionCursor) -> String {
        let row_width = (0..matrix.inputs())
            .map(|i| self.input_label(i).chars().count())
            .max()
            .unwrap_or(0);
        let col_width = (0..matrix.outputs())
            .map(|j| self.output_label(j).chars().count())
            .max()
            .unwrap_or(0)
            .max(3);

        let mut out = String::new();

        out.push_str(&" ".repeat(row_width));
        for output in 0..matrix.outputs() {
            let label = format!(" {:^width$}", self.output_label(output), width = col_width);
            let label = if !cursor.is_input_select() && output == cursor.selected_output {
                label.bold().to_string()
            } else {
                label
            };
            out.push_str(&label);
        }
        out.push('\n');

        for input in 0..matrix.inputs() {
            let label = format!("{:<width$}", self.input_label(input), width = row_width);
            if cursor.is_input_select() && input == cursor.selected_input {
                out.push_str(&label.bold().to_string());
            } else {
                out.push_str(&label);
            }

            for output in 0..matrix.outputs() {
                let on = matrix.get(input, output);
                let selected = input == cursor.selected_input && output == cursor.selected_output;
                let glyph = match (selected, on) {
                    (true, true) => "[#]",
                    (true, false) => "[ ]",
                    (false, true) => " # ",
                    (false, false) => " . ",
                };
                // Pad before colouring so escape codes don't skew the width
                let cell = format!(" {:^width$}", glyph, width = col_width);
                let cell = match (selected, on) {
                    (true, _) => cell.yellow().bold(),
                    (false, true) => cell.green(),
                    (false, false) => cell.dimmed(),
                };
                out.push_str(&cell.to_string());
            }
            out.push('\n');
        }

        let axis = if cursor.is_input_select() { "input" } else { "output" };
        out.push_str(&format!("selecting {}", axis));
        out
    }
}

impl MatrixDisplay for ConsoleDisplay {
    fn render_matrix(&mut self, matrix: &RoutingMatrix, cursor: &SelectionCursor) {
        println!("\n{}", self.render_to_string(matrix, cursor));
    }
}
