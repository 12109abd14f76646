use pagelabel_core::Label;

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Output as JSON (class names in class-id order)
    #[arg(long)]
    pub json: bool,
}

pub fn run(options: Options, _global: crate::Global) -> Result<()> {
    if options.json {
        let names: Vec<&str> = Label::ALL.iter().map(Label::as_str).collect();
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    let mut table = crate::prelude::new_table();
    table.add_row(prettytable::row!["ID", "Label"]);
    for (id, name) in class_rows() {
        table.add_row(prettytable::row![id, name]);
    }
    table.printstd();

    Ok(())
}

/// `(class_id, label name)` for every label.
pub fn class_rows() -> Vec<(usize, &'static str)> {
    Label::ALL
        .iter()
        .map(|label| (label.class_id(), label.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_rows() {
        let rows = class_rows();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0], (0, "title"));
        assert_eq!(rows[3], (3, "picture"));
        assert_eq!(rows[11], (11, "formula"));
    }
}
