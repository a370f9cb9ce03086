//! Table formatting utilities using comfy-table.

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use monoship_core::{PackageNode, PackageResult};

use super::status::Status;

fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(*h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        )
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Prints discovered packages with version, directory and workspace deps.
pub fn print_package_table(packages: &[&PackageNode]) {
    let mut table = styled_table(&["Package", "Version", "Directory", "Depends on"]);

    for pkg in packages {
        let deps = if pkg.in_workspace_dependencies.is_empty() {
            "-".to_string()
        } else {
            pkg.in_workspace_dependencies.join(", ")
        };
        table.add_row(vec![
            Cell::new(&pkg.name).fg(Color::White),
            Cell::new(&pkg.version).fg(Color::DarkGrey),
            Cell::new(pkg.dir_name()).fg(Color::DarkGrey),
            Cell::new(deps),
        ]);
    }

    println!("{}", table);
}

/// Prints one row per settled package, in build order.
pub fn print_results_table(results: &[PackageResult], dry_run: bool) {
    let mut table = styled_table(&["Status", "#", "Package", "Details"]);

    let mut sorted: Vec<&PackageResult> = results.iter().collect();
    sorted.sort_by_key(|r| r.index);

    for result in sorted {
        let position = (result.index + 1).to_string();
        if result.success {
            let details = if dry_run {
                result.output.as_deref().unwrap_or_default().trim().to_string()
            } else {
                String::new()
            };
            table.add_row(vec![
                Cell::new(Status::Success.symbol()).fg(Color::Green),
                Cell::new(position).fg(Color::DarkGrey),
                Cell::new(&result.name).fg(Color::White),
                Cell::new(details).fg(Color::DarkGrey),
            ]);
        } else {
            let mut details = result
                .error
                .clone()
                .unwrap_or_else(|| "operation failed".to_string());
            if let Some(output) = result.output.as_deref().map(str::trim) {
                details.push('\n');
                details.push_str(output);
            }
            table.add_row(vec![
                Cell::new(Status::Error.symbol()).fg(Color::Red),
                Cell::new(position).fg(Color::DarkGrey),
                Cell::new(&result.name).fg(Color::Red),
                Cell::new(details).fg(Color::Red),
            ]);
        }
    }

    println!("{}", table);
}
