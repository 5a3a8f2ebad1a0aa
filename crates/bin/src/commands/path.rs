//! Path command - parses a field path and prints its keys.

use formtree::Path;

use crate::{
    cli::{Format, PathArgs},
    output::{print_json, print_table},
};

/// Run the path command
pub fn run(args: &PathArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path: Path = args.path.parse()?;

    match args.format {
        Format::Json => print_json(&serde_json::json!({
            "path": path,
            "keys": path.keys(),
        }))?,
        Format::Human => {
            let rows: Vec<Vec<String>> = path
                .keys()
                .iter()
                .enumerate()
                .map(|(depth, key)| {
                    let (kind, text) = match key.as_index() {
                        Some(index) => ("index", index.to_string()),
                        None => ("name", key.to_string()),
                    };
                    vec![depth.to_string(), kind.to_string(), text]
                })
                .collect();
            print_table(&["DEPTH", "KIND", "KEY"], &rows);
            println!("normalized: {path}");
        }
    }
    Ok(())
}
