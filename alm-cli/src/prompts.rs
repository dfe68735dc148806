use anyhow::Result;
use inquire::{Confirm, Select, Text};

use alm_core::{DesignType, NewDesign, NewRequirement, Priority, RequirementStatus};

fn optional(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Prompts the user for a new requirement
pub fn prompt_new_requirement() -> Result<NewRequirement> {
    let title = Text::new("Title:").prompt()?;

    // Use the Editor type for multiline input
    let description = inquire::Editor::new("Description:").prompt()?;

    let status = Select::new("Status:", RequirementStatus::ALL.to_vec()).prompt()?;

    // Medium first so Enter keeps the usual default
    let priority = Select::new("Priority:", Priority::ALL.to_vec())
        .with_starting_cursor(1)
        .prompt()?;

    let category = Text::new("Category (optional):").prompt()?;
    let parent_id = Text::new("Parent requirement ID (optional):").prompt()?;
    let verification_criteria = Text::new("Verification criteria:").prompt()?;

    Ok(NewRequirement {
        title,
        description,
        status: Some(status),
        priority: Some(priority),
        category: optional(category),
        parent_id: optional(parent_id),
        verification_criteria,
        ..NewRequirement::default()
    })
}

/// Prompts the user for a new design
pub fn prompt_new_design() -> Result<NewDesign> {
    let name = Text::new("Name:").prompt()?;
    let description = inquire::Editor::new("Description:").prompt()?;
    let design_type = Select::new("Type:", DesignType::ALL.to_vec()).prompt()?;

    Ok(NewDesign::new(name, description, design_type))
}

/// Asks for a yes/no answer, defaulting to no
pub fn confirm(message: &str) -> Result<bool> {
    Ok(Confirm::new(message).with_default(false).prompt()?)
}
