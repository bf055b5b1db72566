use clap::Subcommand;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user account
    Add {
        /// Username for the new user
        #[arg(long, short)]
        username: Option<String>,

        /// Password; prompted for when omitted
        #[arg(long)]
        password: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

#[derive(Subcommand)]
pub enum AnnotationCommands {
    /// Print annotations as JSON lines, one annotation per line
    Dump {
        /// Annotation ids to dump; pick interactively when none are given
        ids: Vec<i64>,

        /// Dump every annotation
        #[arg(long, conflicts_with = "ids")]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum StudyCommands {
    /// Print a study's logged events as JSON lines, one event per line
    Dump {
        /// Study to dump; pick interactively when omitted
        study_id: Option<i64>,
    },
}
