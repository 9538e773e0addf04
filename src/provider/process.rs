//! Subprocess-backed clients and dump transports.
//!
//! All SQL and dump traffic goes through the servers' own client programs
//! (`psql`/`pg_dump`, `mysql`/`mysqldump`); no driver crate is involved.
//! Passwords travel via the programs' environment variables, never argv.

use crate::error::AnonymizerError;
use crate::provider::{DumpTransport, SqlClient};
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};

/// Server coordinates shared by every client program invocation.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

fn spawn_error(program: &str, err: std::io::Error) -> AnonymizerError {
    AnonymizerError::Process {
        program: program.to_string(),
        message: err.to_string(),
    }
}

fn status_error(program: &str, stderr: &[u8]) -> AnonymizerError {
    let message = String::from_utf8_lossy(stderr).trim().to_string();
    AnonymizerError::Process {
        program: program.to_string(),
        message: if message.is_empty() {
            "exited with non-zero status".to_string()
        } else {
            message
        },
    }
}

/// Run a statement-bearing command to completion and map failure onto a
/// database error carrying the offending statement.
fn run_statement(mut command: Command, program: &str, statement: &str) -> Result<(), AnonymizerError> {
    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(program, e))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(AnonymizerError::database(
            statement,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

fn run_scalar(mut command: Command, program: &str) -> Result<Option<String>, AnonymizerError> {
    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(program, e))?;
    if !output.status.success() {
        return Err(status_error(program, &output.stderr));
    }
    let first = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string);
    Ok(first)
}

/// Drain the child's stderr on a thread. The child must never block writing
/// stderr while the parent blocks on the data pipe, and the full text has to
/// be available even when the data copy fails midway.
fn drain_stderr(child: &mut Child) -> Option<std::thread::JoinHandle<Vec<u8>>> {
    child.stderr.take().map(|mut stderr| {
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = stderr.read_to_end(&mut buffer);
            buffer
        })
    })
}

/// Settle a finished stream: reap the child, join stderr, and map the
/// outcome. A failed child wins over a pipe error from the copy, so the user
/// sees the SQL error instead of "broken pipe".
fn settle_stream(
    mut child: Child,
    program: &str,
    stderr: Option<std::thread::JoinHandle<Vec<u8>>>,
    copied: std::io::Result<u64>,
) -> Result<u64, AnonymizerError> {
    let status = child.wait().map_err(|e| spawn_error(program, e))?;
    let stderr = stderr
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    match (copied, status.success()) {
        (Ok(bytes), true) => Ok(bytes),
        (_, false) => Err(status_error(program, &stderr)),
        (Err(err), true) => Err(err.into()),
    }
}

/// Stream `input` into a spawned child's stdin and wait for it.
fn stream_into(mut child: Child, program: &str, input: &mut dyn Read) -> Result<u64, AnonymizerError> {
    let mut stdin = child.stdin.take().ok_or_else(|| AnonymizerError::Process {
        program: program.to_string(),
        message: "could not open stdin".to_string(),
    })?;
    let stderr = drain_stderr(&mut child);
    let copied = std::io::copy(input, &mut stdin);
    drop(stdin);

    settle_stream(child, program, stderr, copied)
}

/// Stream a spawned child's stdout into `output` and wait for it.
fn stream_from(mut child: Child, program: &str, output: &mut dyn Write) -> Result<u64, AnonymizerError> {
    let mut stdout = child.stdout.take().ok_or_else(|| AnonymizerError::Process {
        program: program.to_string(),
        message: "could not open stdout".to_string(),
    })?;
    let stderr = drain_stderr(&mut child);
    let copied = std::io::copy(&mut stdout, output);
    drop(stdout);

    settle_stream(child, program, stderr, copied)
}

/// `psql` connected to one database.
pub struct PsqlClient {
    settings: ConnectionSettings,
    database: String,
}

impl PsqlClient {
    pub fn new(settings: ConnectionSettings, database: impl Into<String>) -> Self {
        Self {
            settings,
            database: database.into(),
        }
    }

    fn base_command(&self) -> Command {
        let mut command = Command::new("psql");
        command
            .arg("--host")
            .arg(&self.settings.host)
            .arg("--port")
            .arg(self.settings.port.to_string())
            .arg("--username")
            .arg(&self.settings.user)
            .arg("--dbname")
            .arg(&self.database)
            .arg("--variable")
            .arg("ON_ERROR_STOP=1")
            .env("PGPASSWORD", &self.settings.password);
        command
    }
}

impl SqlClient for PsqlClient {
    fn execute(&mut self, statement: &str) -> Result<(), AnonymizerError> {
        let mut command = self.base_command();
        command.arg("--command").arg(statement);
        run_statement(command, "psql", statement)
    }

    fn query_scalar(&mut self, query: &str) -> Result<Option<String>, AnonymizerError> {
        let mut command = self.base_command();
        command
            .arg("--tuples-only")
            .arg("--no-align")
            .arg("--command")
            .arg(query);
        run_scalar(command, "psql")
    }
}

/// Restore via `psql` stdin, dump via `pg_dump` stdout.
pub struct PgDumpTransport {
    settings: ConnectionSettings,
    database: String,
}

impl PgDumpTransport {
    pub fn new(settings: ConnectionSettings, database: impl Into<String>) -> Self {
        Self {
            settings,
            database: database.into(),
        }
    }
}

impl DumpTransport for PgDumpTransport {
    fn restore(&mut self, input: &mut dyn Read) -> Result<u64, AnonymizerError> {
        let child = PsqlClient::new(self.settings.clone(), &self.database)
            .base_command()
            .arg("--quiet")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error("psql", e))?;
        stream_into(child, "psql", input)
    }

    fn dump(&mut self, output: &mut dyn Write) -> Result<u64, AnonymizerError> {
        let child = Command::new("pg_dump")
            .arg("--host")
            .arg(&self.settings.host)
            .arg("--port")
            .arg(self.settings.port.to_string())
            .arg("--username")
            .arg(&self.settings.user)
            .arg("--dbname")
            .arg(&self.database)
            .env("PGPASSWORD", &self.settings.password)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error("pg_dump", e))?;
        stream_from(child, "pg_dump", output)
    }
}

/// `mysql` client. With no database selected it serves as the admin
/// connection for CREATE/DROP DATABASE.
pub struct MySqlClient {
    settings: ConnectionSettings,
    database: Option<String>,
}

impl MySqlClient {
    pub fn new(settings: ConnectionSettings, database: Option<String>) -> Self {
        Self { settings, database }
    }

    fn base_command(&self) -> Command {
        let mut command = Command::new("mysql");
        command
            .arg("--host")
            .arg(&self.settings.host)
            .arg("--port")
            .arg(self.settings.port.to_string())
            .arg("--user")
            .arg(&self.settings.user)
            .env("MYSQL_PWD", &self.settings.password);
        if let Some(database) = &self.database {
            command.arg("--database").arg(database);
        }
        command
    }
}

impl SqlClient for MySqlClient {
    fn execute(&mut self, statement: &str) -> Result<(), AnonymizerError> {
        let mut command = self.base_command();
        command.arg("--execute").arg(statement);
        run_statement(command, "mysql", statement)
    }

    fn query_scalar(&mut self, query: &str) -> Result<Option<String>, AnonymizerError> {
        let mut command = self.base_command();
        command
            .arg("--batch")
            .arg("--skip-column-names")
            .arg("--execute")
            .arg(query);
        run_scalar(command, "mysql")
    }
}

/// Restore via `mysql` stdin, dump via `mysqldump` stdout.
pub struct MySqlDumpTransport {
    settings: ConnectionSettings,
    database: String,
}

impl MySqlDumpTransport {
    pub fn new(settings: ConnectionSettings, database: impl Into<String>) -> Self {
        Self {
            settings,
            database: database.into(),
        }
    }
}

impl DumpTransport for MySqlDumpTransport {
    fn restore(&mut self, input: &mut dyn Read) -> Result<u64, AnonymizerError> {
        let child = MySqlClient::new(self.settings.clone(), Some(self.database.clone()))
            .base_command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error("mysql", e))?;
        stream_into(child, "mysql", input)
    }

    fn dump(&mut self, output: &mut dyn Write) -> Result<u64, AnonymizerError> {
        let child = Command::new("mysqldump")
            .arg("--host")
            .arg(&self.settings.host)
            .arg("--port")
            .arg(self.settings.port.to_string())
            .arg("--user")
            .arg(&self.settings.user)
            .arg(&self.database)
            .env("MYSQL_PWD", &self.settings.password)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error("mysqldump", e))?;
        stream_from(child, "mysqldump", output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_sh(script: &str, stdin: Stdio, stdout: Stdio) -> Child {
        Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .unwrap()
    }

    #[test]
    fn test_stream_into_reports_child_error_not_broken_pipe() {
        // child reads a few bytes then dies mid-stream; the input is far
        // larger than a pipe buffer, so the copy hits a closed pipe
        let child = spawn_sh(
            "head -c 16 >/dev/null; echo 'ERROR: relation does not exist' >&2; exit 3",
            Stdio::piped(),
            Stdio::null(),
        );
        let payload = vec![b'x'; 4 * 1024 * 1024];
        let mut input = payload.as_slice();

        let err = stream_into(child, "sh", &mut input).unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains("relation does not exist"),
            "got: {message}"
        );
        assert!(!message.contains("Broken pipe"), "got: {message}");
    }

    #[test]
    fn test_stream_into_survives_noisy_stderr() {
        // stderr output well beyond a pipe buffer, emitted before stdin is
        // consumed; blocks forever unless stderr is drained concurrently
        let child = spawn_sh(
            "head -c 262144 /dev/zero >&2; cat >/dev/null",
            Stdio::piped(),
            Stdio::null(),
        );
        let payload = vec![b'x'; 1024 * 1024];
        let mut input = payload.as_slice();

        let bytes = stream_into(child, "sh", &mut input).unwrap();
        assert_eq!(bytes, 1024 * 1024);
    }

    #[test]
    fn test_stream_from_counts_bytes() {
        let child = spawn_sh("printf 'SELECT 1;'", Stdio::null(), Stdio::piped());
        let mut output = Vec::new();

        let bytes = stream_from(child, "sh", &mut output).unwrap();
        assert_eq!(bytes, 9);
        assert_eq!(output, b"SELECT 1;");
    }

    #[test]
    fn test_stream_from_failed_child_reports_stderr() {
        let child = spawn_sh(
            "printf 'partial output'; echo 'dump failed' >&2; exit 2",
            Stdio::null(),
            Stdio::piped(),
        );
        let mut output = Vec::new();

        let err = stream_from(child, "sh", &mut output).unwrap_err();
        assert!(err.to_string().contains("dump failed"), "got: {err}");
    }
}
