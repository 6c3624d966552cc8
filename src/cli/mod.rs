mod commands;
mod helper;
mod render;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use commands::{all_commands_info, Command};
use helper::CliHelper;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use serde_json::Value;
use strum_macros::Display;
use tracing::debug;

use crate::catalog::DatabaseCatalogController;
use crate::client::RemoteStore;
use crate::config::schema::DbAdminConfig;
use crate::data_types::{Row, TableSnapshot};
use crate::error::{report, AdminError};
use crate::notify::{NotificationKind, Notifier};
use crate::state::TableStateController;
use crate::templates::SqlTemplateController;

pub use render::render_snapshot;

const HISTORY_FILE: &str = ".dbadmin_history";

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("Could not write output: {0}")]
    Output(#[from] io::Error),

    #[error("{0}")]
    Usage(String),

    #[error("{0} cancelled")]
    Cancelled(&'static str),
}

impl CliError {
    /// Controller failures already went out as notifications.
    pub fn is_reported(&self) -> bool {
        matches!(self, CliError::Admin(_))
    }
}

/// How query results and tables get written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned text table
    Table,
    /// One JSON object per row
    Json,
}

pub struct AdminCli {
    tables: TableStateController,
    templates: SqlTemplateController,
    catalog: DatabaseCatalogController,
    notifier: Notifier,
    format: OutputFormat,
}

impl AdminCli {
    pub fn new(store: Arc<dyn RemoteStore>, config: &DbAdminConfig, notifier: Notifier) -> Self {
        let tables = TableStateController::new(store.clone(), notifier.clone());
        let templates =
            SqlTemplateController::new(store.clone(), tables.clone(), notifier.clone());
        let catalog = DatabaseCatalogController::new(
            store,
            tables.clone(),
            notifier.clone(),
            config.ui.export_file_name.clone(),
        );

        AdminCli {
            tables,
            templates,
            catalog,
            notifier,
            format: OutputFormat::Table,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    fn prompt(&self) -> String {
        let db = self.catalog.db_name();
        let db = if db.is_empty() { "dbadmin" } else { &db };
        match self.tables.table_name() {
            Some(table) => format!("{db}/{table}> "),
            None => format!("{db}> "),
        }
    }

    // Interactive loop for running commands from a CLI
    pub async fn repl_loop(&self) -> rustyline::Result<()> {
        let mut rl = Editor::new()?;
        rl.set_helper(Some(CliHelper {}));
        rl.load_history(HISTORY_FILE).ok();

        self.catalog.refresh().await.ok();
        self.flush_notifications();

        loop {
            let mut stdout = io::stdout();
            let outcome = match rl.readline(&self.prompt()) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) if line.starts_with('\\') => {
                    rl.add_history_entry(line.trim_end())?;
                    let command = line.split_whitespace().collect::<Vec<_>>().join(" ");
                    match command[1..].parse::<Command>() {
                        Ok(Command::Quit) => break,
                        Ok(cmd) => {
                            self.handle_command(&cmd, &mut stdout, &mut |q| confirm(&mut rl, q))
                                .await
                        }
                        Err(e) => Err(CliError::Usage(e)),
                    }
                }
                Ok(line) => {
                    rl.add_history_entry(line.trim_end())?;
                    self.exec_and_print(&line, &mut stdout).await
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("\\q");
                    break;
                }
                Err(err) => {
                    eprintln!("Error while reading input: {err:?}");
                    break;
                }
            };

            self.flush_notifications();
            if let Err(e) = outcome {
                if !e.is_reported() {
                    eprintln!("{e}");
                }
            }
        }

        rl.save_history(HISTORY_FILE)
    }

    /// Run `;`-separated commands and statements, stopping at the first
    /// failure. Destructive commands only go ahead when `assume_yes` is set.
    pub async fn run_one_off<W: Write>(
        &self,
        input: &str,
        mut output: W,
        assume_yes: bool,
    ) -> Result<(), CliError> {
        for s in input.split(';') {
            let s = s.trim();
            if s.is_empty() {
                continue;
            }

            let outcome = match s.strip_prefix('\\') {
                Some(command) => match command.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(cmd) => {
                        self.handle_command(&cmd, &mut output, &mut |_| assume_yes)
                            .await
                    }
                    Err(e) => Err(CliError::Usage(e)),
                },
                None => self.exec_and_print(s, &mut output).await,
            };

            self.flush_notifications();
            outcome?;
        }
        Ok(())
    }

    fn flush_notifications(&self) {
        for n in self.notifier.drain() {
            match n.kind {
                NotificationKind::Success => eprintln!("{}", n.message),
                NotificationKind::Error => eprintln!("{}: {}", n.kind, n.message),
            }
        }
    }

    fn print_snapshot(&self, snapshot: &TableSnapshot, out: &mut dyn Write) -> io::Result<()> {
        match self.format {
            OutputFormat::Table => writeln!(out, "{}", render_snapshot(snapshot)),
            OutputFormat::Json => {
                for row in &snapshot.rows {
                    serde_json::to_writer(&mut *out, row)?;
                    writeln!(out)?;
                }
                Ok(())
            }
        }
    }

    fn require_table(&self, operation: &str) -> Result<String, CliError> {
        self.tables.table_name().ok_or_else(|| {
            report(
                &self.notifier,
                operation,
                AdminError::NotProvided { what: "Table" },
            )
            .into()
        })
    }

    // Handle a client command
    async fn handle_command(
        &self,
        cmd: &Command,
        out: &mut dyn Write,
        confirm: &mut dyn FnMut(&str) -> bool,
    ) -> Result<(), CliError> {
        debug!("Handling command {cmd:?}");
        match cmd {
            Command::Help => {
                for (usage, description) in all_commands_info() {
                    writeln!(out, "{usage:<32} {description}")?;
                }
            }
            Command::ListTables => {
                let info = self.catalog.refresh().await?;
                for table in info.tables {
                    writeln!(out, "{table}")?;
                }
            }
            Command::SelectTable(name) => {
                self.tables.select_table(name).await?;
                self.print_snapshot(&self.tables.snapshot(), out)?;
            }
            Command::TableView => {
                self.tables.show_table_view();
                self.print_snapshot(&self.tables.snapshot(), out)?;
            }
            Command::ListTemplates => {
                for name in self.templates.list_templates().await? {
                    writeln!(out, "{name}")?;
                }
            }
            Command::RunTemplate(name) => {
                let table = self.require_table("Running SQL template")?;
                let result = self.templates.run_template(name, &table).await?;
                self.print_snapshot(&result, out)?;
            }
            Command::SaveTemplate { name, query } => {
                self.templates.save_template(name, query).await?;
            }
            Command::EditCell { id, column, value } => {
                self.tables
                    .edit_cell(id, column, Value::String(value.clone()))
                    .await?;
            }
            Command::DeleteRow(id) => self.tables.delete_row_by_id(id).await?,
            Command::InsertRow(fields) => {
                let row: Row = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                self.tables.insert_row(&row).await?;
            }
            Command::CreateTable { name, columns } => {
                let result = self.catalog.create_table(name, columns).await?;
                if !result.is_null() {
                    writeln!(out, "{result}")?;
                }
            }
            Command::DropTable => {
                let table = self.require_table("Dropping table")?;
                if !confirm(&format!("Drop table {table}? This can't be undone.")) {
                    return Err(CliError::Cancelled("Drop"));
                }
                self.tables.drop_current_table().await?;
                self.catalog.invalidate().await.ok();
            }
            Command::Backup => {
                let message = self.catalog.backup().await?;
                writeln!(out, "{message}")?;
            }
            Command::Restore => {
                if !confirm("Replace the database with its last backup?") {
                    return Err(CliError::Cancelled("Restore"));
                }
                let message = self.catalog.restore().await?;
                writeln!(out, "{message}")?;
            }
            Command::Export(dir) => {
                let dir = dir.as_deref().map(PathBuf::from).unwrap_or_default();
                let view = self.tables.view();
                let path = self.catalog.export(view.snapshot(), &dir).await?;
                writeln!(out, "{}", path.display())?;
            }
            Command::Quit => {
                panic!("Unexpected quit, this should be handled by the caller")
            }
        }
        Ok(())
    }

    // Run a statement against the open table and print the result
    async fn exec_and_print(&self, query: &str, out: &mut dyn Write) -> Result<(), CliError> {
        let now = Instant::now();
        let sql = query.trim().trim_end_matches(';');
        let table = self.tables.table_name();

        let result = self.templates.run_query(sql, table.as_deref()).await?;
        self.print_snapshot(&result, out)?;
        if self.format == OutputFormat::Table {
            writeln!(out, "Time: {:.3}s", now.elapsed().as_secs_f64())?;
        }
        Ok(())
    }
}

fn confirm(rl: &mut Editor<CliHelper, DefaultHistory>, question: &str) -> bool {
    // Answers are single words, so the statement validator is out of the way
    rl.set_helper(None);
    let answer = rl.readline(&format!("{question} [y/N] "));
    rl.set_helper(Some(CliHelper {}));

    matches!(answer, Ok(a) if matches!(a.trim().to_lowercase().as_str(), "y" | "yes"))
}
