use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Requirement and design traceability")]
pub struct Cli {
    /// Path to the SQLite database (overrides $ALM_DB_PATH and the config file)
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage requirements
    #[clap(subcommand)]
    Req(ReqCommand),

    /// Manage designs
    #[clap(subcommand)]
    Design(DesignCommand),

    /// Print the requirement to design traceability matrix
    Trace,

    /// Export data as JSON
    Export {
        /// What to export
        #[clap(long, value_enum, default_value = "snapshot")]
        format: ExportFormat,

        /// Output file path
        #[clap(long, short = 'o')]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReqCommand {
    /// Add a new requirement
    Add {
        /// Explicit ID (REQ-###); allocated automatically when omitted
        #[clap(long)]
        id: Option<String>,

        /// Title of the requirement
        #[clap(long)]
        title: Option<String>,

        /// Description of the requirement
        #[clap(long)]
        description: Option<String>,

        /// Status (Draft, Under Review, Approved, Implemented, Obsolete)
        #[clap(long)]
        status: Option<String>,

        /// Priority (Low, Medium, High, Critical)
        #[clap(long)]
        priority: Option<String>,

        /// Category label
        #[clap(long)]
        category: Option<String>,

        /// Parent requirement ID
        #[clap(long)]
        parent: Option<String>,

        /// How the requirement will be verified
        #[clap(long)]
        verification: Option<String>,

        /// Comma-separated design IDs to link
        #[clap(long)]
        designs: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List requirements
    List {
        /// Filter by status
        #[clap(long)]
        status: Option<String>,

        /// Filter by priority
        #[clap(long)]
        priority: Option<String>,

        /// Filter by category
        #[clap(long)]
        category: Option<String>,
    },

    /// Show details for a requirement
    Show {
        /// Requirement ID
        id: String,
    },

    /// Update fields of a requirement; omitted flags are left unchanged
    Update {
        /// Requirement ID
        id: String,

        #[clap(long)]
        title: Option<String>,

        #[clap(long)]
        description: Option<String>,

        #[clap(long)]
        status: Option<String>,

        #[clap(long)]
        priority: Option<String>,

        #[clap(long, conflicts_with = "clear_category")]
        category: Option<String>,

        /// Remove the category
        #[clap(long)]
        clear_category: bool,

        #[clap(long, conflicts_with = "clear_parent")]
        parent: Option<String>,

        /// Detach from the parent requirement
        #[clap(long)]
        clear_parent: bool,

        #[clap(long)]
        verification: Option<String>,

        /// Comma-separated design IDs replacing the current links ("" unlinks all)
        #[clap(long)]
        designs: Option<String>,
    },

    /// Delete a requirement
    Delete {
        /// Requirement ID
        id: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Search ID, title and description (case-insensitive)
    Search {
        query: String,
    },

    /// List direct children of a requirement
    Children {
        /// Parent requirement ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DesignCommand {
    /// Add a new design
    Add {
        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// Design type (see `alm design types`)
        #[clap(long)]
        r#type: Option<String>,

        /// Status (Draft, In Review, Approved, Implemented)
        #[clap(long)]
        status: Option<String>,

        /// Comma-separated requirement IDs to link
        #[clap(long)]
        requirements: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List designs
    List {
        /// Filter by design type
        #[clap(long)]
        r#type: Option<String>,

        /// Filter by status
        #[clap(long)]
        status: Option<String>,
    },

    /// Show details for a design
    Show {
        id: i64,
    },

    /// Update a design; omitted flags keep their stored value
    Update {
        id: i64,

        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        description: Option<String>,

        #[clap(long)]
        r#type: Option<String>,

        #[clap(long)]
        status: Option<String>,

        /// Comma-separated requirement IDs replacing the current links ("" unlinks all)
        #[clap(long)]
        requirements: Option<String>,
    },

    /// Delete a design
    Delete {
        id: i64,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// List the available design types
    Types,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// All requirements and designs
    Snapshot,
    /// Traceability matrix with coverage summary
    Matrix,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_db_flag_after_subcommand() {
        let cli = Cli::parse_from(["alm", "req", "list", "--db", "/tmp/x.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(cli.command, Command::Req(ReqCommand::List { .. })));
    }

    #[test]
    fn test_clear_and_set_category_conflict() {
        let result = Cli::try_parse_from([
            "alm",
            "req",
            "update",
            "REQ-001",
            "--category",
            "Auth",
            "--clear-category",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_export_format() {
        let cli = Cli::parse_from(["alm", "export", "--format", "matrix", "-o", "m.json"]);
        match cli.command {
            Command::Export { format, output } => {
                assert_eq!(format, ExportFormat::Matrix);
                assert_eq!(output, PathBuf::from("m.json"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
