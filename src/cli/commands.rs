use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "pd", about = concat!("plandoc v", env!("CARGO_PKG_VERSION"), " - a project plan in plain markdown"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different plandoc directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create plandoc.toml and an empty project file in the current directory
    Init(InitArgs),
    /// List tasks with their line numbers
    List(ListArgs),
    /// List level 1-3 headings with their line numbers
    Headings,
    /// Show per-assignee totals across all projects
    Summary,
    /// Mark tasks completed (stamps today's completion date)
    Done(LinesArg),
    /// Mark tasks open again (clears the completion date)
    Undone(LinesArg),
    /// Set or clear a task's assignee
    Assign(AssignArgs),
    /// Set or clear one of a task's dates
    Date(DateArgs),
    /// Set or clear a task's cost
    Cost(CostArgs),
    /// Add a dated update under one or more tasks
    Update(UpdateArgs),
    /// Rewrite or delete an update line
    EditUpdate(EditUpdateArgs),
    /// Replace a block of lines with new content
    Edit(EditArgs),
    /// Move a task within its list
    Mv(MvArgs),
    /// Move a section to another line
    MoveSection(SectionMoveArgs),
    /// Copy a section to another line
    DupSection(SectionMoveArgs),
    /// Add a task to a section, or above the first heading
    Add(AddArgs),
    /// Delete a task and its updates
    Rm(LineArg),
    /// Move a section or task to the archive
    Archive(LineArg),
    /// Move a section or task from the archive back into the plan
    Restore(LineArg),
    /// Move every completed task to the archive
    ArchiveDone,
    /// Manage users
    User(UserCmd),
    /// Replace the project with a validated project file
    Import(ImportArgs),
    /// Write the project file or its markdown to stdout or a file
    Export(ExportArgs),
}

// ---------------------------------------------------------------------------
// Init / read args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Project file name, relative to the directory
    #[arg(long, default_value = "project.json")]
    pub file: String,
    /// Title of a first project heading
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only tasks assigned to this alias ("none" for unassigned)
    #[arg(long)]
    pub assignee: Option<String>,
    /// Only open tasks
    #[arg(long, conflicts_with = "done")]
    pub open: bool,
    /// Only completed tasks
    #[arg(long)]
    pub done: bool,
    /// List the archive instead of the plan
    #[arg(long)]
    pub archive: bool,
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct LineArg {
    /// Line number as shown by `pd list`
    pub line: usize,
}

#[derive(Args)]
pub struct LinesArg {
    /// Line numbers as shown by `pd list`
    #[arg(required = true)]
    pub lines: Vec<usize>,
}

#[derive(Args)]
pub struct AssignArgs {
    pub line: usize,
    /// User alias; omit to clear
    pub alias: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DateArg {
    Creation,
    Due,
    Completion,
}

#[derive(Args)]
pub struct DateArgs {
    pub line: usize,
    pub kind: DateArg,
    /// YYYY-MM-DD; omit to clear
    pub date: Option<String>,
}

#[derive(Args)]
pub struct CostArgs {
    pub line: usize,
    /// Amount such as 2000 or 12.50; omit to clear
    pub amount: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Update text
    pub text: String,
    /// Task line numbers
    #[arg(required = true)]
    pub lines: Vec<usize>,
    /// Who the update is from
    #[arg(long)]
    pub by: Option<String>,
}

#[derive(Args)]
pub struct EditUpdateArgs {
    /// Line of the update
    pub line: usize,
    /// New text (required unless --delete)
    #[arg(required_unless_present = "delete")]
    pub text: Option<String>,
    /// New date; keeps the old one when omitted
    #[arg(long)]
    pub date: Option<String>,
    /// Who the update is from
    #[arg(long)]
    pub by: Option<String>,
    /// Delete the update instead
    #[arg(long, conflicts_with_all = ["text", "date", "by"])]
    pub delete: bool,
}

#[derive(Args)]
pub struct EditArgs {
    /// First line to replace
    pub start: usize,
    /// How many lines to replace (0 inserts)
    pub count: usize,
    /// Replacement content; "-" reads stdin
    #[arg(allow_hyphen_values = true)]
    pub content: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Direction {
    Up,
    Down,
    Top,
    Bottom,
}

#[derive(Args)]
pub struct MvArgs {
    pub line: usize,
    pub direction: Direction,
}

#[derive(Args)]
pub struct SectionMoveArgs {
    /// Line of the section heading
    pub heading: usize,
    /// Line the section should land on
    pub dest: usize,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// Line of the section heading to add under
    #[arg(long)]
    pub under: Option<usize>,
    /// Assign to this alias
    #[arg(long)]
    pub by: Option<String>,
}

// ---------------------------------------------------------------------------
// User args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct UserCmd {
    #[command(subcommand)]
    pub action: UserAction,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Add a user
    Add(UserAddArgs),
    /// Rename a user's alias everywhere it appears
    Rename(UserRenameArgs),
    /// Remove a user and their mentions
    Rm(UserRmArgs),
    /// List users
    List,
}

#[derive(Args)]
pub struct UserAddArgs {
    pub alias: String,
    /// Display name
    #[arg(long)]
    pub name: Option<String>,
    /// Email address (repeatable)
    #[arg(long = "email")]
    pub emails: Vec<String>,
}

#[derive(Args)]
pub struct UserRenameArgs {
    pub old: String,
    pub new: String,
}

#[derive(Args)]
pub struct UserRmArgs {
    pub alias: String,
}

// ---------------------------------------------------------------------------
// Import / export args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ImportArgs {
    /// Project file (JSON) to import
    pub file: String,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
    /// Export only the plan markdown
    #[arg(long)]
    pub markdown: bool,
}
