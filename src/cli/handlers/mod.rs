mod init;
pub use init::cmd_init;

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::project_io::{self, ProjectFile};
use crate::io::recovery::atomic_write;
use crate::model::config::Config;
use crate::model::task::{Cost, DateKind};
use crate::model::user::{User, find_user, sanitize_alias};
use crate::ops::reducer::{Op, OpContext};
use crate::ops::session::Session;
use crate::ops::task_ops::UpdateEdit;
use crate::ops::tree_ops::MoveDirection;
use crate::parse::line::{LineKind, classify, parse_iso_date};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let start = start_dir(cli.project_dir.as_deref())?;

    match cli.command {
        Commands::Init(args) => cmd_init(args, &start),

        // Read commands
        Commands::List(args) => cmd_list(&start, args, json),
        Commands::Headings => cmd_headings(&start, json),
        Commands::Summary => cmd_summary(&start, json),

        // Task edits
        Commands::Done(args) => cmd_toggle(&start, args, true, json),
        Commands::Undone(args) => cmd_toggle(&start, args, false, json),
        Commands::Assign(args) => cmd_assign(&start, args, json),
        Commands::Date(args) => cmd_date(&start, args, json),
        Commands::Cost(args) => cmd_cost(&start, args, json),
        Commands::Update(args) => cmd_update(&start, args, json),
        Commands::EditUpdate(args) => cmd_edit_update(&start, args, json),
        Commands::Edit(args) => cmd_edit(&start, args, json),

        // Structure
        Commands::Mv(args) => cmd_mv(&start, args, json),
        Commands::MoveSection(args) => run_op(
            &start,
            Op::MoveSection {
                heading_line: args.heading,
                dest_line: args.dest,
            },
            json,
        ),
        Commands::DupSection(args) => run_op(
            &start,
            Op::DuplicateSection {
                heading_line: args.heading,
                dest_line: args.dest,
            },
            json,
        ),
        Commands::Add(args) => cmd_add(&start, args, json),
        Commands::Rm(args) => run_op(&start, Op::DeleteTask { line: args.line }, json),

        // Archive
        Commands::Archive(args) => cmd_archive(&start, args, json),
        Commands::Restore(args) => cmd_restore(&start, args, json),
        Commands::ArchiveDone => run_op(&start, Op::ArchiveCompleted, json),

        // Users
        Commands::User(args) => cmd_user(&start, args, json),

        // Import / export
        Commands::Import(args) => cmd_import(&start, args, json),
        Commands::Export(args) => cmd_export(&start, args),
    }
}

/// `plandoc.toml`'s `[log] filter`, if a plandoc directory can be found
/// from `project_dir` (or the working directory).
pub fn configured_log_filter(project_dir: Option<&str>) -> Option<String> {
    let start = start_dir(project_dir).ok()?;
    let root = config_io::discover_root(&start).ok()?;
    config_io::read_config(&root).ok().map(|c| c.log.filter)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn start_dir(project_dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match project_dir {
        Some(dir) => Ok(std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

/// A discovered plandoc directory with its session open
struct Workspace {
    config: Config,
    path: PathBuf,
    session: Session,
}

impl Workspace {
    fn open(start: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let root = config_io::discover_root(start)?;
        let config = config_io::read_config(&root)?;
        let path = config_io::project_file_path(&root, &config);
        let session = project_io::load_project_file(&path)?.into_session();
        Ok(Workspace {
            config,
            path,
            session,
        })
    }

    fn op_context(&self) -> OpContext {
        OpContext {
            archive_marker: self.config.archive.marker,
            ..OpContext::now()
        }
    }

    fn save(&self) -> Result<(), project_io::ProjectFileError> {
        project_io::save_project_file(&self.path, &ProjectFile::from_session(&self.session))
    }

    /// Apply ops in order and save once if any of them changed something
    fn apply_all(&mut self, ops: &[Op]) -> Result<bool, Box<dyn std::error::Error>> {
        let ctx = self.op_context();
        let mut changed = false;
        for op in ops {
            changed |= self.session.apply(op, &ctx);
        }
        if changed {
            self.save()?;
        }
        Ok(changed)
    }
}

fn report(op: &str, changed: bool, json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string_pretty(&ChangeJson { op, changed })?);
    } else if changed {
        println!("{}: ok", op);
    } else {
        println!("{}: nothing changed", op);
    }
    Ok(())
}

fn run_op(start: &Path, op: Op, json: bool) -> CmdResult {
    let mut ws = Workspace::open(start)?;
    let changed = ws.apply_all(std::slice::from_ref(&op))?;
    report(op.name(), changed, json)
}

fn parse_date_arg(s: &str) -> Result<chrono::NaiveDate, String> {
    parse_iso_date(s).ok_or_else(|| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

/// Sanitize an alias argument. Aliases no user has are allowed, but worth
/// a warning.
fn alias_arg(ws: &Workspace, raw: Option<&str>) -> Result<Option<String>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let alias = sanitize_alias(raw);
    if alias.is_empty() {
        return Err(format!("invalid alias '{}'", raw));
    }
    if find_user(ws.session.users(), &alias).is_none() {
        tracing::warn!(alias = %alias, "no user has this alias; it will show as unassigned");
    }
    Ok(Some(alias))
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(start: &Path, args: ListArgs, json: bool) -> CmdResult {
    let ws = Workspace::open(start)?;
    let projects = if args.archive {
        ws.session.archived_projects()
    } else {
        ws.session.projects()
    };
    let filter = TaskFilter {
        assignee: args.assignee.as_deref().map(|a| match a {
            "none" => None,
            other => Some(sanitize_alias(other)),
        }),
        completed: match (args.open, args.done) {
            (true, _) => Some(false),
            (_, true) => Some(true),
            _ => None,
        },
    };

    if json {
        let results: Vec<ProjectTasksJson> = projects
            .iter()
            .map(|p| ProjectTasksJson {
                title: &p.title,
                start_line: p.start_line,
                end_line: p.end_line,
                tasks: p.tasks.iter().filter(|t| filter.matches(t)).collect(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (i, project) in projects.iter().enumerate() {
            if i > 0 {
                println!();
            }
            for line in format_project_listing(project, &filter) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn cmd_headings(start: &Path, json: bool) -> CmdResult {
    let ws = Workspace::open(start)?;
    let projects = ws.session.projects();

    if json {
        let headings: Vec<HeadingJson> = projects
            .iter()
            .flat_map(|p| {
                p.headings.iter().map(move |h| HeadingJson {
                    project: &p.title,
                    heading: h,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&headings)?);
    } else {
        for heading in projects.iter().flat_map(|p| &p.headings) {
            println!("{}", format_heading(heading));
        }
    }
    Ok(())
}

fn cmd_summary(start: &Path, json: bool) -> CmdResult {
    let ws = Workspace::open(start)?;
    let all = ws.session.all_projects();
    let users = ws.session.users();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary_to_json(&all, users))?);
    } else {
        for line in format_summary(&all, users) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Task edits
// ---------------------------------------------------------------------------

fn cmd_toggle(start: &Path, args: LinesArg, completed: bool, json: bool) -> CmdResult {
    let mut ws = Workspace::open(start)?;
    // toggling never changes the line count, so every index stays valid
    let ops: Vec<Op> = args
        .lines
        .iter()
        .map(|&line| Op::ToggleCompletion { line, completed })
        .collect();
    let changed = ws.apply_all(&ops)?;
    report("toggle_completion", changed, json)
}

fn cmd_assign(start: &Path, args: AssignArgs, json: bool) -> CmdResult {
    let mut ws = Workspace::open(start)?;
    let alias = alias_arg(&ws, args.alias.as_deref())?;
    let op = Op::SetAssignee {
        line: args.line,
        alias,
    };
    let changed = ws.apply_all(std::slice::from_ref(&op))?;
    report(op.name(), changed, json)
}

fn cmd_date(start: &Path, args: DateArgs, json: bool) -> CmdResult {
    let kind = match args.kind {
        DateArg::Creation => DateKind::Creation,
        DateArg::Due => DateKind::Due,
        DateArg::Completion => DateKind::Completion,
    };
    let date = args.date.as_deref().map(parse_date_arg).transpose()?;
    run_op(
        start,
        Op::SetDate {
            line: args.line,
            kind,
            date,
        },
        json,
    )
}

fn cmd_cost(start: &Path, args: CostArgs, json: bool) -> CmdResult {
    let cost = match args.amount.as_deref() {
        Some(amount) => Some(
            Cost::parse(amount)
                .ok_or_else(|| format!("invalid cost '{}' (expected e.g. 2000 or 12.50)", amount))?,
        ),
        None => None,
    };
    run_op(
        start,
        Op::SetCost {
            line: args.line,
            cost,
        },
        json,
    )
}

fn cmd_update(start: &Path, args: UpdateArgs, json: bool) -> CmdResult {
    let mut ws = Workspace::open(start)?;
    let alias = alias_arg(&ws, args.by.as_deref())?;
    let op = match args.lines.as_slice() {
        [line] => Op::AddUpdate {
            task_line: *line,
            text: args.text,
            alias,
        },
        _ => Op::AddBulkUpdates {
            task_lines: args.lines,
            text: args.text,
            alias,
        },
    };
    let changed = ws.apply_all(std::slice::from_ref(&op))?;
    report(op.name(), changed, json)
}

fn cmd_edit_update(start: &Path, args: EditUpdateArgs, json: bool) -> CmdResult {
    let mut ws = Workspace::open(start)?;
    let op = if args.delete {
        Op::DeleteUpdate { line: args.line }
    } else {
        let date = args.date.as_deref().map(parse_date_arg).transpose()?;
        Op::EditUpdate {
            line: args.line,
            edit: UpdateEdit {
                date,
                text: args.text.unwrap_or_default(),
                assignee_alias: alias_arg(&ws, args.by.as_deref())?,
            },
        }
    };
    let changed = ws.apply_all(std::slice::from_ref(&op))?;
    report(op.name(), changed, json)
}

fn cmd_edit(start: &Path, args: EditArgs, json: bool) -> CmdResult {
    let content = if args.content == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        args.content
    };
    run_op(
        start,
        Op::EditBlock {
            start: args.start,
            count: args.count,
            content,
        },
        json,
    )
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

fn cmd_mv(start: &Path, args: MvArgs, json: bool) -> CmdResult {
    let direction = match args.direction {
        Direction::Up => MoveDirection::Up,
        Direction::Down => MoveDirection::Down,
        Direction::Top => MoveDirection::Top,
        Direction::Bottom => MoveDirection::Bottom,
    };
    run_op(
        start,
        Op::ReorderTask {
            line: args.line,
            direction,
        },
        json,
    )
}

fn cmd_add(start: &Path, args: AddArgs, json: bool) -> CmdResult {
    let mut ws = Workspace::open(start)?;
    if let Some(line) = args.under {
        let is_heading = matches!(
            ws.session.documents().live.line(line).map(classify),
            Some(LineKind::Heading { .. })
        );
        if !is_heading {
            return Err(format!("line {} is not a heading", line).into());
        }
    }
    let op = Op::AddTask {
        heading_line: args.under,
        text: args.text,
        alias: alias_arg(&ws, args.by.as_deref())?,
    };
    let changed = ws.apply_all(std::slice::from_ref(&op))?;
    report(op.name(), changed, json)
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

fn cmd_archive(start: &Path, args: LineArg, json: bool) -> CmdResult {
    let mut ws = Workspace::open(start)?;
    let op = match ws.session.documents().live.line(args.line).map(classify) {
        Some(LineKind::Heading { .. }) => Op::ArchiveSection {
            heading_line: args.line,
        },
        _ => Op::ArchiveTask { line: args.line },
    };
    let changed = ws.apply_all(std::slice::from_ref(&op))?;
    report(op.name(), changed, json)
}

fn cmd_restore(start: &Path, args: LineArg, json: bool) -> CmdResult {
    let mut ws = Workspace::open(start)?;
    let op = match ws.session.documents().archive.line(args.line).map(classify) {
        Some(LineKind::Heading { .. }) => Op::RestoreSection {
            heading_line: args.line,
        },
        _ => Op::RestoreTask { line: args.line },
    };
    let changed = ws.apply_all(std::slice::from_ref(&op))?;
    report(op.name(), changed, json)
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

fn cmd_user(start: &Path, args: UserCmd, json: bool) -> CmdResult {
    let mut ws = Workspace::open(start)?;
    let op = match args.action {
        UserAction::List => {
            let users = ws.session.users();
            if json {
                println!("{}", serde_json::to_string_pretty(users)?);
            } else {
                for user in users {
                    println!("{}", format_user(user));
                }
            }
            return Ok(());
        }
        UserAction::Add(args) => {
            let mut user = User::new(&args.alias, args.name.unwrap_or_default());
            user.emails = args.emails;
            ws.session.add_user(user)?;
            "add_user"
        }
        UserAction::Rename(args) => {
            ws.session.rename_user(&args.old, &args.new)?;
            "rename_user"
        }
        UserAction::Rm(args) => {
            ws.session.delete_user(&args.alias)?;
            "delete_user"
        }
    };
    ws.save()?;
    report(op, true, json)
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

fn cmd_import(start: &Path, args: ImportArgs, json: bool) -> CmdResult {
    let ws = Workspace::open(start)?;
    // validated before anything is written
    let file = project_io::load_project_file(Path::new(&args.file))?;
    project_io::save_project_file(&ws.path, &file)?;
    tracing::info!(from = %args.file, users = file.users.len(), "imported project file");
    report("import", true, json)
}

fn cmd_export(start: &Path, args: ExportArgs) -> CmdResult {
    let ws = Workspace::open(start)?;
    let text = if args.markdown {
        ws.session.documents().live.to_string()
    } else {
        format!(
            "{}\n",
            serde_json::to_string_pretty(&ProjectFile::from_session(&ws.session))?
        )
    };
    match args.output {
        Some(out) => {
            atomic_write(Path::new(&out), text.as_bytes())?;
            eprintln!("wrote {}", out);
        }
        None => print!("{}", text),
    }
    Ok(())
}
