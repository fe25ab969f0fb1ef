//! Output formatting utilities for CLI commands

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use discpack::builder::{Hue, MissingNumbers};

/// Print a table with headers
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{}", table);
}

pub fn format_hue(hue: Hue) -> String {
    match hue {
        Hue::Template(true) => "random".to_string(),
        Hue::Template(false) => "black".to_string(),
        Hue::Shift(degrees) => format!("{:+.0}°", degrees),
    }
}

/// `(5, 6)`, or `none` when empty
pub fn format_number_list(missing: &MissingNumbers) -> String {
    if missing.is_empty() {
        "none".to_string()
    } else {
        missing.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discpack::builder::missing_numbers;

    #[test]
    fn test_format_hue() {
        assert_eq!(format_hue(Hue::Template(true)), "random");
        assert_eq!(format_hue(Hue::Template(false)), "black");
        assert_eq!(format_hue(Hue::Shift(87.0)), "+87°");
    }

    #[test]
    fn test_format_number_list() {
        assert_eq!(format_number_list(&MissingNumbers::default()), "none");
        let consumed = [4, 7, 20].into_iter().collect();
        assert_eq!(format_number_list(&missing_numbers(4, &consumed)), "(5, 6, 8-19)");
    }
}
