//! Discovery and inspection commands.

use anyhow::Result;
use owo_colors::OwoColorize;
use monoship_core::OrderReport;

use crate::formatting::{print_package_table, print_section_header, print_warning, SectionStyle};

use super::{load_config, load_graph, GlobalArgs};

pub fn cmd_scan(global: &GlobalArgs, json: bool) -> Result<()> {
    let config = load_config(global)?;
    let graph = load_graph(global, &config)?;
    let packages: Vec<_> = graph.packages().collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
        return Ok(());
    }

    print_section_header("Scanning packages", SectionStyle::Primary);
    if packages.is_empty() {
        print_warning("No packages found");
    } else {
        println!(
            "  {} Found {} {}",
            "OK".green(),
            packages.len().to_string().bold().cyan(),
            "packages".bold()
        );
        println!();
        print_package_table(&packages);
    }
    println!();
    Ok(())
}

pub fn cmd_order(global: &GlobalArgs, json: bool) -> Result<()> {
    let config = load_config(global)?;
    let graph = load_graph(global, &config)?;
    let order = graph.topological_order()?;
    let report = OrderReport::new(&graph, &order)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_section_header("Build order", SectionStyle::Primary);
    if report.packages.is_empty() {
        print_warning("No packages found");
    } else {
        print!("{}", report.render());
    }
    println!();
    Ok(())
}

pub fn cmd_levels(global: &GlobalArgs, json: bool) -> Result<()> {
    let config = load_config(global)?;
    let graph = load_graph(global, &config)?;
    let order = graph.topological_order()?;
    let levels = graph.dependency_levels(&order)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&levels)?);
        return Ok(());
    }

    print_section_header("Dependency levels", SectionStyle::Primary);
    if levels.is_empty() {
        print_warning("No packages found");
    }
    for (idx, level) in levels.iter().enumerate() {
        println!(
            "  {} {}",
            format!("{:2}", idx).bright_black(),
            level.join(", ").bold().white()
        );
    }
    println!();
    Ok(())
}
