//! `quranlens tools`: print the tool catalog.

use quranlens_tools::catalog;

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let definitions = catalog::definitions();

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    println!("🧰 {} tools", definitions.len());
    for def in &definitions {
        let required = def.parameters["required"]
            .as_array()
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        println!("   {:<24} ({required})", def.name);
    }

    Ok(())
}
