use anyhow::{bail, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use handlebars::Handlebars;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::model::Issue;
use crate::template;

/// The two things the sync loop needs from a reminders store.
pub trait ReminderSink {
    fn exists<'a>(&'a self, title: &'a str, list: &'a str) -> BoxFuture<'a, Result<bool>>;
    fn create<'a>(&'a self, title: &'a str, body: &'a str, list: &'a str)
        -> BoxFuture<'a, Result<()>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    AlreadyExists,
}

/// Creates a reminder for `issue` in `list` unless one with the same title is there.
pub async fn create_reminder<S>(sink: &S, issue: &Issue, list: &str) -> Result<Outcome>
where
    S: ReminderSink + ?Sized,
{
    let title = issue.reminder_title();
    let notes = issue.reminder_notes();

    if sink
        .exists(&title, list)
        .await
        .context("Could not query existing reminders")?
    {
        info!(iid = issue.iid, "Reminder already exists for issue #{}", issue.iid);
        return Ok(Outcome::AlreadyExists);
    }

    sink.create(&title, &notes, list)
        .await
        .context("Could not create reminder")?;
    info!(iid = issue.iid, "Created reminder for issue #{}: {}", issue.iid, issue.title);
    Ok(Outcome::Created)
}

/// AppleScript only needs its string delimiter escaped.
pub fn escape(s: &str) -> String {
    s.replace('"', "\\\"")
}

fn parse_bool(output: &str) -> bool {
    output.trim().eq_ignore_ascii_case("true")
}

#[derive(Serialize)]
struct ScriptData<'a> {
    list: &'a str,
    title: &'a str,
    body: &'a str,
}

/// Drives Reminders.app through `osascript`.
pub struct AppleScript {
    registry: Handlebars<'static>,
}

impl AppleScript {
    const OSASCRIPT: &'static str = "osascript";

    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(escape);
        registry.register_template_string("exists", template::EXISTS)?;
        registry.register_template_string("create", template::CREATE)?;
        Ok(Self { registry })
    }

    fn render(&self, name: &str, list: &str, title: &str, body: &str) -> Result<String> {
        Ok(self
            .registry
            .render(name, &ScriptData { list, title, body })?)
    }

    pub fn exists_script(&self, title: &str, list: &str) -> Result<String> {
        self.render("exists", list, title, "")
    }

    pub fn create_script(&self, title: &str, body: &str, list: &str) -> Result<String> {
        self.render("create", list, title, body)
    }

    async fn run(script: &str) -> Result<String> {
        debug!(%script, "running osascript");
        let output = Command::new(Self::OSASCRIPT)
            .arg("-e")
            .arg(script)
            .output()
            .await
            .context("Could not run osascript")?;
        if !output.status.success() {
            bail!(
                "osascript failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}

impl ReminderSink for AppleScript {
    fn exists<'a>(&'a self, title: &'a str, list: &'a str) -> BoxFuture<'a, Result<bool>> {
        async move {
            let script = self.exists_script(title, list)?;
            Ok(parse_bool(&Self::run(&script).await?))
        }
        .boxed()
    }

    fn create<'a>(
        &'a self,
        title: &'a str,
        body: &'a str,
        list: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let script = self.create_script(title, body, list)?;
            Self::run(&script).await?;
            Ok(())
        }
        .boxed()
    }
}
