use chrono::Local;
use outreach_client::{Notice, NoticeLevel, NoticeSink};
use outreach_core::{
    ConfigEntry, JobSummary, MessageTask, MessageTaskStatus, PollPhase, PollSnapshot, SearchTask,
    SearchTaskStatus, Template, User,
};

/// Prints notices to stderr so stdout stays parseable.
pub(crate) struct ConsoleNoticeSink;

impl NoticeSink for ConsoleNoticeSink {
    fn emit(&self, notice: Notice) {
        let tag = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
}

pub(crate) fn config_line(entry: &ConfigEntry) -> String {
    let value = entry.value.as_deref().unwrap_or("-");
    match &entry.description {
        Some(description) => format!("{} = {}  # {}", entry.key, value, description),
        None => format!("{} = {}", entry.key, value),
    }
}

/// Secrets longer than four characters show their last four; shorter ones
/// are hidden entirely.
pub(crate) fn masked(secret: Option<&str>) -> String {
    match secret {
        None => "(not set)".to_string(),
        Some(secret) => {
            let chars: Vec<char> = secret.chars().collect();
            if chars.len() <= 4 {
                return "****".to_string();
            }
            let visible: String = chars[chars.len() - 4..].iter().collect();
            format!("****{visible}")
        }
    }
}

pub(crate) fn search_task_line(task: &SearchTask) -> String {
    format!(
        "#{:<5} {:<10} {:<10} {:>6} results  {}",
        task.id,
        task.platform,
        task.status,
        task.result_count,
        task.name
    )
}

pub(crate) fn search_status_line(row: &SearchTaskStatus) -> String {
    let mut line = format!(
        "#{:<5} {:<10} {:>6} results",
        row.id, row.status, row.result_count
    );
    if let Some(error) = &row.error_message {
        line.push_str(&format!("  ({error})"));
    }
    line
}

pub(crate) fn message_task_line(task: &MessageTask) -> String {
    format!(
        "#{:<5} {:<10} {:>5.1}%  {}/{} sent, {} failed  {}",
        task.id,
        task.status,
        task.progress,
        task.success_count,
        task.total_users,
        task.failed_count,
        task.name
    )
}

pub(crate) fn message_status_line(row: &MessageTaskStatus) -> String {
    format!(
        "#{:<5} {:<10} {:>5.1}%  {} sent, {} failed",
        row.id, row.status, row.progress, row.success_count, row.failed_count
    )
}

pub(crate) fn template_line(template: &Template) -> String {
    let marker = if template.is_default { "*" } else { " " };
    format!(
        "{marker}#{:<5} {:<10} {}",
        template.id, template.platform, template.name
    )
}

pub(crate) fn user_line(user: &User) -> String {
    let name = user.display_name.as_deref().unwrap_or("");
    let contacted = if user.contacted { "contacted" } else { "" };
    format!(
        "#{:<6} {:<10} @{:<24} {:<24} {}",
        user.id, user.platform, user.username, name, contacted
    )
}

/// One block per snapshot: a stamped header, then one line per job.
pub(crate) fn snapshot_block<T: JobSummary>(
    snapshot: &PollSnapshot<T>,
    line: impl Fn(&T) -> String,
) -> String {
    let phase = match snapshot.phase {
        PollPhase::Idle => "idle",
        PollPhase::Polling => "polling",
        PollPhase::Exhausted => "gave up",
    };
    let mut block = format!(
        "-- {} {} ({} jobs, {} active)",
        Local::now().format("%H:%M:%S"),
        phase,
        snapshot.tracked.len(),
        snapshot
            .tracked
            .iter()
            .filter(|job| !job.is_terminal())
            .count()
    );
    if let Some(error) = &snapshot.last_error {
        block.push_str(&format!("\n   last error (retry {}): {}", snapshot.retry_count, error));
    }
    for job in &snapshot.tracked {
        block.push('\n');
        block.push_str(&line(job));
    }
    block
}
