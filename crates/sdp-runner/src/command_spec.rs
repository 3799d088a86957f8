use std::collections::HashMap;
use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use tokio::process::Command as TokioCommand;

/// Specification for a command to execute.
///
/// Every subprocess the orchestrator spawns — hooks, the agent CLI, custom
/// gate rules, git porcelain — goes through this type. Arguments are stored
/// as discrete `OsString` elements and handed to `Command::args`, never
/// interpolated into a shell string, so no `sh -c` / `cmd /C` evaluation is
/// ever possible.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<Utf8PathBuf>,
    pub env: Option<HashMap<OsString, OsString>>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl AsRef<Utf8Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.get_or_insert_with(HashMap::new).insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let map = self.env.get_or_insert_with(HashMap::new);
        for (k, v) in envs {
            map.insert(k.into(), v.into());
        }
        self
    }

    /// Human-readable program name for error messages and evidence payloads.
    #[must_use]
    pub fn program_string(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd.as_std_path());
        }
        if let Some(ref env) = self.env {
            for (k, v) in env {
                cmd.env(k, v);
            }
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain_collects_args_cwd_env() {
        let cmd = CommandSpec::new("git")
            .arg("worktree")
            .args(["add", "--detach"])
            .cwd("/tmp")
            .env("GIT_TERMINAL_PROMPT", "0")
            .envs([("A", "1")]);
        assert_eq!(cmd.program, OsString::from("git"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(Utf8PathBuf::from("/tmp")));
        assert_eq!(cmd.env.unwrap().len(), 2);
    }

    #[test]
    fn shell_metacharacters_are_preserved_literally() {
        let cmd = CommandSpec::new("echo").arg("$(whoami)").arg("a;b|c");
        assert_eq!(cmd.args[0], OsString::from("$(whoami)"));
        assert_eq!(cmd.args[1], OsString::from("a;b|c"));
    }
}
