mod cli;
mod prompts;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Parser;
use colored::{ColoredString, Colorize};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

use alm_core::config::DB_PATH_ENV;
use alm_core::{
    export_matrix_to_json, export_snapshot_to_json, open_controllers, resolve_database_path,
    AlmConfig, AlmError, Design, DesignController, DesignCriteria, DesignId, DesignStatus,
    DesignType, NewDesign, NewRequirement, Outcome, Priority, Requirement, RequirementController,
    RequirementCriteria, RequirementId, RequirementPatch, RequirementStatus, Snapshot,
    TraceabilityMatrix,
};

use crate::cli::{Cli, Command, DesignCommand, ExportFormat, ReqCommand};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AlmConfig::load_default()?;
    init_logging(config.log_level.as_deref());

    // Determine which database file to use
    let env_db = std::env::var(DB_PATH_ENV).ok();
    let db_path = resolve_database_path(cli.db.as_deref(), env_db.as_deref(), &config);
    log::debug!("Using database {:?}", db_path);

    let (mut requirements, mut designs) = open_controllers(config.database_config(db_path.clone()))
        .with_context(|| format!("Failed to open database {:?}", db_path))?;
    requirements.subscribe(|event| log::info!("Change: {}", event));
    designs.subscribe(|event| log::info!("Change: {}", event));

    match cli.command {
        Command::Req(cmd) => handle_req_command(cmd, &requirements, &designs),
        Command::Design(cmd) => handle_design_command(cmd, &designs, &requirements),
        Command::Trace => print_trace(&requirements, &designs),
        Command::Export { format, output } => {
            handle_export_command(&requirements, &designs, format, &output)
        }
    }
}

/// `RUST_LOG` wins over the config file's `log_level`; default is `warn`
fn init_logging(configured: Option<&str>) {
    let env = env_logger::Env::default().default_filter_or(configured.unwrap_or("warn"));
    env_logger::Builder::from_env(env).init();
}

/// Prints a successful outcome, or turns a failed one into an error
fn finish<T>(outcome: Outcome<T>) -> Result<Option<T>> {
    if outcome.succeeded {
        println!("{}", outcome.message.green());
        Ok(outcome.entity)
    } else {
        bail!("{}", outcome.message)
    }
}

fn parse_opt<T>(value: Option<&str>) -> Result<Option<T>>
where
    T: FromStr<Err = AlmError>,
{
    Ok(value.map(|v| v.parse::<T>()).transpose()?)
}

fn parse_design_ids(list: &str) -> Result<BTreeSet<DesignId>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<DesignId>()
                .with_context(|| format!("Invalid design ID: '{}'", s))
        })
        .collect()
}

fn parse_requirement_ids(list: &str) -> BTreeSet<RequirementId> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn handle_req_command(
    cmd: ReqCommand,
    controller: &RequirementController,
    designs: &DesignController,
) -> Result<()> {
    match cmd {
        ReqCommand::Add {
            id,
            title,
            description,
            status,
            priority,
            category,
            parent,
            verification,
            designs: design_list,
            interactive,
        } => {
            // Default to interactive mode if no title is given
            let mut data = if interactive || title.is_none() {
                prompts::prompt_new_requirement()?
            } else {
                NewRequirement {
                    title: title.unwrap_or_default(),
                    description: description.unwrap_or_default(),
                    status: parse_opt(status.as_deref())?,
                    priority: parse_opt(priority.as_deref())?,
                    category,
                    parent_id: parent,
                    verification_criteria: verification.unwrap_or_default(),
                    ..NewRequirement::default()
                }
            };
            data.id = id;
            if let Some(list) = design_list {
                data.design_ids = parse_design_ids(&list)?;
            }

            finish(controller.create_requirement(data))?;
        }
        ReqCommand::List {
            status,
            priority,
            category,
        } => {
            let criteria = RequirementCriteria {
                status: parse_opt(status.as_deref())?,
                priority: parse_opt(priority.as_deref())?,
                category,
                parent_id: None,
            };
            let found = if criteria.is_empty() {
                controller.list_requirements()?
            } else {
                controller.find_requirements(&criteria)?
            };
            print_requirement_table(&found);
        }
        ReqCommand::Show { id } => {
            show_requirement(controller, designs, &id)?;
        }
        ReqCommand::Update {
            id,
            title,
            description,
            status,
            priority,
            category,
            clear_category,
            parent,
            clear_parent,
            verification,
            designs: design_list,
        } => {
            let patch = RequirementPatch {
                title,
                description,
                status: parse_opt(status.as_deref())?,
                priority: parse_opt(priority.as_deref())?,
                category: if clear_category {
                    Some(None)
                } else {
                    category.map(Some)
                },
                parent_id: if clear_parent {
                    Some(None)
                } else {
                    parent.map(Some)
                },
                verification_criteria: verification,
                design_ids: design_list.as_deref().map(parse_design_ids).transpose()?,
            };

            if patch.is_empty() {
                bail!("Nothing to update; pass at least one field flag");
            }

            finish(controller.update_requirement(&id, &patch))?;
        }
        ReqCommand::Delete { id, yes } => {
            let req = controller
                .get_requirement(&id)?
                .with_context(|| format!("Requirement {} not found", id))?;

            println!("{}", req);

            // Confirm deletion unless --yes flag is used
            if !yes && !prompts::confirm("Are you sure you want to delete this requirement?")? {
                println!("{}", "Deletion cancelled.".yellow());
                return Ok(());
            }

            finish(controller.delete_requirement(&id))?;
        }
        ReqCommand::Search { query } => {
            print_requirement_table(&controller.search_requirements(&query)?);
        }
        ReqCommand::Children { id } => {
            print_requirement_table(&controller.children(&id)?);
        }
    }

    Ok(())
}

fn handle_design_command(
    cmd: DesignCommand,
    controller: &DesignController,
    requirements: &RequirementController,
) -> Result<()> {
    match cmd {
        DesignCommand::Add {
            name,
            description,
            r#type,
            status,
            requirements: requirement_list,
            interactive,
        } => {
            let mut data = if interactive || name.is_none() {
                prompts::prompt_new_design()?
            } else {
                let design_type = r#type
                    .as_deref()
                    .context("--type is required (see `alm design types`)")?
                    .parse::<DesignType>()?;
                NewDesign::new(
                    name.unwrap_or_default(),
                    description.unwrap_or_default(),
                    design_type,
                )
            };
            data.status = parse_opt(status.as_deref())?;
            if let Some(list) = requirement_list {
                data.requirement_ids = parse_requirement_ids(&list);
            }

            finish(controller.create_design(data))?;
        }
        DesignCommand::List { r#type, status } => {
            let criteria = DesignCriteria {
                design_type: parse_opt(r#type.as_deref())?,
                status: parse_opt(status.as_deref())?,
            };
            print_design_table(&controller.find_designs(&criteria)?);
        }
        DesignCommand::Show { id } => {
            show_design(controller, requirements, id)?;
        }
        DesignCommand::Update {
            id,
            name,
            description,
            r#type,
            status,
            requirements: requirement_list,
        } => {
            let mut design = controller
                .get_design(id)?
                .with_context(|| format!("Design {} not found", id))?;

            if let Some(name) = name {
                design.name = name;
            }
            if let Some(description) = description {
                design.description = description;
            }
            if let Some(design_type) = parse_opt(r#type.as_deref())? {
                design.design_type = design_type;
            }
            if let Some(status) = parse_opt(status.as_deref())? {
                design.status = status;
            }
            if let Some(list) = requirement_list {
                design.requirement_ids = parse_requirement_ids(&list);
            }

            finish(controller.update_design(design))?;
        }
        DesignCommand::Delete { id, yes } => {
            let design = controller
                .get_design(id)?
                .with_context(|| format!("Design {} not found", id))?;

            println!("{}", design);

            if !yes && !prompts::confirm("Are you sure you want to delete this design?")? {
                println!("{}", "Deletion cancelled.".yellow());
                return Ok(());
            }

            finish(controller.delete_design(id))?;
        }
        DesignCommand::Types => {
            for design_type in controller.list_design_types() {
                println!("{}", design_type);
            }
        }
    }

    Ok(())
}

fn status_colored(status: RequirementStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        RequirementStatus::Draft => label.yellow(),
        RequirementStatus::UnderReview => label.cyan(),
        RequirementStatus::Approved => label.blue(),
        RequirementStatus::Implemented => label.green(),
        RequirementStatus::Obsolete => label.dimmed(),
    }
}

fn priority_colored(priority: Priority) -> ColoredString {
    let label = priority.as_str();
    match priority {
        Priority::Critical => label.red().bold(),
        Priority::High => label.red(),
        Priority::Medium => label.yellow(),
        Priority::Low => label.green(),
    }
}

fn design_status_colored(status: DesignStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        DesignStatus::Draft => label.yellow(),
        DesignStatus::InReview => label.cyan(),
        DesignStatus::Approved => label.blue(),
        DesignStatus::Implemented => label.green(),
    }
}

fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn print_requirement_table(requirements: &[Requirement]) {
    if requirements.is_empty() {
        println!("{}", "No requirements found.".yellow());
        return;
    }

    println!(
        "{:<10} | {:<40} | {:<12} | {:<8} | {:<15}",
        "ID", "Title", "Status", "Priority", "Category"
    );
    println!("{}", "-".repeat(97));

    for req in requirements {
        println!(
            "{:<10} | {:<40} | {:<12} | {:<8} | {:<15}",
            req.id,
            truncate(&req.title, 40),
            status_colored(req.status),
            priority_colored(req.priority),
            req.category.as_deref().unwrap_or("-")
        );
    }
}

fn print_design_table(designs: &[Design]) {
    if designs.is_empty() {
        println!("{}", "No designs found.".yellow());
        return;
    }

    println!(
        "{:<6} | {:<40} | {:<12} | {:<12} | {}",
        "ID", "Name", "Type", "Status", "Requirements"
    );
    println!("{}", "-".repeat(97));

    for design in designs {
        let linked = design
            .requirement_ids
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "{:<6} | {:<40} | {:<12} | {:<12} | {}",
            design.id.map(|id| id.to_string()).unwrap_or_default(),
            truncate(&design.name, 40),
            design.design_type,
            design_status_colored(design.status),
            if linked.is_empty() { "-".to_string() } else { linked }
        );
    }
}

fn show_requirement(
    controller: &RequirementController,
    designs: &DesignController,
    id: &str,
) -> Result<()> {
    let req = controller
        .get_requirement(id)?
        .with_context(|| format!("Requirement {} not found", id))?;

    println!("{}: {}", "ID".blue(), req.id);
    println!("{}: {}", "Title".blue(), req.title);
    println!("{}: {}", "Description".blue(), req.description);
    println!("{}: {}", "Status".blue(), status_colored(req.status));
    println!("{}: {}", "Priority".blue(), priority_colored(req.priority));
    if let Some(category) = &req.category {
        println!("{}: {}", "Category".blue(), category);
    }
    if let Some(parent) = &req.parent_id {
        println!("{}: {}", "Parent".blue(), parent);
    }
    if !req.verification_criteria.is_empty() {
        println!("{}: {}", "Verification".blue(), req.verification_criteria);
    }
    println!("{}: {}", "Created".blue(), local_time(&req.created_at));
    println!("{}: {}", "Modified".blue(), local_time(&req.updated_at));

    if !req.design_ids.is_empty() {
        println!("\n{}:", "Designs".green());
        for design_id in &req.design_ids {
            match designs.get_design(*design_id)? {
                Some(design) => println!(
                    "  {} {} ({})",
                    design_id.to_string().yellow(),
                    design.name,
                    design.design_type
                ),
                None => println!("  {} {}", design_id.to_string().yellow(), "(missing)".red()),
            }
        }
    }

    let children = controller.children(&req.id)?;
    if !children.is_empty() {
        println!("\n{}:", "Children".green());
        for child in children {
            println!("  {} - {}", child.id.yellow(), child.title);
        }
    }

    Ok(())
}

fn show_design(
    controller: &DesignController,
    requirements: &RequirementController,
    id: DesignId,
) -> Result<()> {
    let design = controller
        .get_design(id)?
        .with_context(|| format!("Design {} not found", id))?;

    println!("{}: {}", "ID".blue(), id);
    println!("{}: {}", "Name".blue(), design.name);
    println!("{}: {}", "Type".blue(), design.design_type);
    println!("{}: {}", "Status".blue(), design_status_colored(design.status));
    println!("{}: {}", "Created".blue(), local_time(&design.created_at));
    println!("{}: {}", "Modified".blue(), local_time(&design.updated_at));
    println!("\n{}:\n{}", "Description".blue(), design.description);

    if !design.requirement_ids.is_empty() {
        println!("\n{}:", "Requirements".green());
        for req_id in &design.requirement_ids {
            match requirements.get_requirement(req_id)? {
                Some(req) => println!("  {} - {}", req_id.yellow(), req.title),
                None => println!("  {} {}", req_id.yellow(), "(missing)".red()),
            }
        }
    }

    Ok(())
}

fn print_trace(requirements: &RequirementController, designs: &DesignController) -> Result<()> {
    let matrix = TraceabilityMatrix::build(
        &requirements.list_requirements()?,
        &designs.list_designs()?,
    );

    if matrix.rows.is_empty() {
        println!("{}", "No requirements found.".yellow());
        return Ok(());
    }

    println!("{:<10} | {:<40} | {}", "ID", "Title", "Designs");
    println!("{}", "-".repeat(97));

    for row in &matrix.rows {
        let linked = if row.designs.is_empty() {
            "-".red().to_string()
        } else {
            row.designs
                .iter()
                .map(|d| format!("{} {}", d.id, d.name))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "{:<10} | {:<40} | {}",
            row.requirement_id,
            truncate(&row.title, 40),
            linked
        );
    }

    let coverage = &matrix.coverage;
    println!(
        "\n{}: {}/{} ({:.0}%)",
        "Coverage".blue(),
        coverage.covered,
        coverage.total,
        coverage.percent()
    );
    if !coverage.uncovered.is_empty() {
        println!("{}: {}", "Uncovered".yellow(), coverage.uncovered.join(", "));
    }
    if !matrix.orphan_designs.is_empty() {
        let orphans = matrix
            .orphan_designs
            .iter()
            .map(|d| format!("{} {}", d.id, d.name))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{}: {}", "Unlinked designs".yellow(), orphans);
    }

    Ok(())
}

fn handle_export_command(
    requirements: &RequirementController,
    designs: &DesignController,
    format: ExportFormat,
    output: &Path,
) -> Result<()> {
    let all_requirements = requirements.list_requirements()?;
    let all_designs = designs.list_designs()?;

    match format {
        ExportFormat::Snapshot => {
            export_snapshot_to_json(&Snapshot::new(all_requirements, all_designs), output)?
        }
        ExportFormat::Matrix => export_matrix_to_json(
            &TraceabilityMatrix::build(&all_requirements, &all_designs),
            output,
        )?,
    }

    println!("{} {}", "Exported to".green(), output.display());
    Ok(())
}
