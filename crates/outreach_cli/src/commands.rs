use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;

use anyhow::{bail, Context};
use outreach_client::{
    JobMonitor, MessageTaskFilter, SearchResultsFilter, SearchTaskFilter, ServiceContext,
    TemplateFilter,
};
use outreach_core::{
    JobSummary, PollTarget, SearchParams, SearchTaskCreate, API_TOKEN_KEY, SESSION_TOKEN_KEY,
};
use outreach_logging::outreach_info;

use crate::output::{
    config_line, masked, message_status_line, message_task_line, search_status_line,
    search_task_line, snapshot_block, template_line, user_line,
};
use crate::settings::{save_settings, Settings};
use crate::{ConfigAction, MessageTaskAction, SearchTaskAction, TemplateAction, TokenAction};

fn ensure(done: bool, what: &str) -> anyhow::Result<()> {
    if done {
        Ok(())
    } else {
        bail!("{what} failed")
    }
}

pub(crate) async fn config(ctx: &ServiceContext, action: ConfigAction) -> anyhow::Result<()> {
    let configs = ctx.configs();
    match action {
        ConfigAction::List => {
            for entry in configs.list().await {
                println!("{}", config_line(&entry));
            }
        }
        ConfigAction::Get { key } => match configs.get(&key).await {
            Some(entry) => println!("{}", config_line(&entry)),
            None => bail!("config {key} not found"),
        },
        ConfigAction::Set {
            key,
            value,
            description,
        } => {
            let entry = configs
                .update(&key, &value, description.as_deref())
                .await
                .with_context(|| format!("updating config {key}"))?;
            println!("{}", config_line(&entry));
        }
        ConfigAction::Delete { key } => ensure(configs.delete(&key).await, "delete")?,
        ConfigAction::Cached { key } => match configs.value(&key) {
            Some(value) => println!("{value}"),
            None => bail!("config {key} is not cached"),
        },
    }
    Ok(())
}

pub(crate) fn token(ctx: &ServiceContext, action: TokenAction) -> anyhow::Result<()> {
    let cache = ctx.cache();
    match action {
        TokenAction::SetApi { value } => {
            cache.set(API_TOKEN_KEY, value);
            outreach_info!("Provider token updated in local cache");
            println!("{API_TOKEN_KEY} saved");
        }
        TokenAction::SetSession { value } => {
            cache.set(SESSION_TOKEN_KEY, value);
            outreach_info!("Session token updated in local cache");
            println!("{SESSION_TOKEN_KEY} saved");
        }
        TokenAction::Show => {
            println!("{API_TOKEN_KEY}: {}", masked(cache.get(API_TOKEN_KEY).as_deref()));
            println!(
                "{SESSION_TOKEN_KEY}: {}",
                masked(cache.get(SESSION_TOKEN_KEY).as_deref())
            );
        }
    }
    Ok(())
}

pub(crate) async fn search_tasks(
    ctx: &ServiceContext,
    settings: &Settings,
    action: SearchTaskAction,
) -> anyhow::Result<()> {
    let tasks = ctx.search_tasks();
    match action {
        SearchTaskAction::List {
            platform,
            keyword,
            page,
            page_size,
        } => {
            let filter = SearchTaskFilter {
                platform,
                keyword,
                page,
                page_size,
            };
            let listing = tasks.list(&filter).await;
            for task in &listing.items {
                println!("{}", search_task_line(task));
            }
            println!("{} of {} tasks", listing.len(), listing.total);
        }
        SearchTaskAction::Show { id } => match tasks.get(id).await {
            Some(task) => {
                println!("{}", search_task_line(&task));
                if let Some(error) = task.error_message {
                    println!("error: {error}");
                }
            }
            None => bail!("search task {id} not found"),
        },
        SearchTaskAction::Create {
            name,
            platform,
            keywords,
            limit,
        } => {
            let payload = SearchTaskCreate {
                name,
                platform,
                search_params: SearchParams {
                    keywords,
                    ..SearchParams::default()
                },
                results_limit: limit,
            };
            let task = tasks.create(&payload).await?;
            println!("{}", search_task_line(&task));
        }
        SearchTaskAction::Start { id } => ensure(tasks.start(id).await, "start")?,
        SearchTaskAction::Stop { id } => ensure(tasks.stop(id).await, "stop")?,
        SearchTaskAction::Delete { id } => ensure(tasks.delete(id).await, "delete")?,
        SearchTaskAction::Status { ids } => {
            for row in tasks.status_of(&ids).await? {
                println!("{}", search_status_line(&row));
            }
        }
        SearchTaskAction::Results {
            id,
            keyword,
            page,
            page_size,
        } => {
            let filter = SearchResultsFilter {
                keyword,
                page,
                page_size,
            };
            let listing = tasks.results(id, &filter).await;
            for user in &listing.items {
                println!("{}", user_line(user));
            }
            println!("{} of {} profiles", listing.len(), listing.total);
        }
        SearchTaskAction::Watch { ids } => {
            let monitor = tasks.monitor(target_for(ids), settings.search_poll());
            watch(monitor, search_status_line).await?;
        }
    }
    Ok(())
}

pub(crate) async fn message_tasks(
    ctx: &ServiceContext,
    settings: &Settings,
    action: MessageTaskAction,
) -> anyhow::Result<()> {
    let tasks = ctx.message_tasks();
    match action {
        MessageTaskAction::List {
            keyword,
            page,
            page_size,
        } => {
            let filter = MessageTaskFilter {
                keyword,
                page,
                page_size,
            };
            let listing = tasks.list(&filter).await;
            for task in &listing.items {
                println!("{}", message_task_line(task));
            }
            println!("{} of {} tasks", listing.len(), listing.total);
        }
        MessageTaskAction::Show { id } => match tasks.get(id).await {
            Some(task) => {
                println!("{}", message_task_line(&task));
                if let Some(template) = &task.template {
                    println!("template: {}", template_line(template));
                }
            }
            None => bail!("message task {id} not found"),
        },
        MessageTaskAction::Start { id } => ensure(tasks.start(id).await, "start")?,
        MessageTaskAction::Stop { id } => ensure(tasks.stop(id).await, "stop")?,
        MessageTaskAction::Delete { id } => ensure(tasks.delete(id).await, "delete")?,
        MessageTaskAction::Status { ids } => {
            for row in tasks.status_of(&ids).await? {
                println!("{}", message_status_line(&row));
            }
        }
        MessageTaskAction::Watch { ids } => {
            let monitor = tasks.monitor(target_for(ids), settings.message_poll());
            watch(monitor, message_status_line).await?;
        }
    }
    Ok(())
}

pub(crate) async fn templates(ctx: &ServiceContext, action: TemplateAction) -> anyhow::Result<()> {
    let templates = ctx.templates();
    match action {
        TemplateAction::List { keyword, platform } => {
            let filter = TemplateFilter {
                keyword,
                platform,
                ..TemplateFilter::default()
            };
            for template in templates.list(&filter).await.items {
                println!("{}", template_line(&template));
            }
        }
        TemplateAction::Show { id } => match templates.get(id).await {
            Some(template) => {
                println!("{}", template_line(&template));
                println!("{}", template.content);
                if !template.variables.is_empty() {
                    println!("variables: {}", template.variables.join(", "));
                }
            }
            None => bail!("template {id} not found"),
        },
        TemplateAction::Preview { id, vars } => {
            let variables: BTreeMap<String, String> = vars.into_iter().collect();
            let preview = templates.preview(id, &variables).await;
            if preview.is_empty() {
                bail!("no preview available for template {id}");
            }
            println!("{preview}");
        }
        TemplateAction::SetDefault { id } => {
            ensure(templates.set_default(id).await, "set default")?
        }
        TemplateAction::Delete { id } => ensure(templates.delete(id).await, "delete")?,
    }
    Ok(())
}

pub(crate) fn show_settings(path: &Path, settings: &Settings, write: bool) -> anyhow::Result<()> {
    println!("{settings:#?}");
    if write {
        save_settings(path, settings)?;
        println!("written to {}", path.display());
    }
    Ok(())
}

fn target_for(ids: Vec<i64>) -> PollTarget {
    if ids.is_empty() {
        PollTarget::All
    } else {
        PollTarget::ids(ids)
    }
}

/// Prints every snapshot change until Ctrl-C.
async fn watch<T>(monitor: JobMonitor<T>, line: fn(&T) -> String) -> anyhow::Result<()>
where
    T: JobSummary + Clone + Debug + Send + Sync + 'static,
{
    let mut updates = monitor.subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    monitor.start();
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("listening for Ctrl-C")?;
                monitor.stop();
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                println!("{}", snapshot_block(&snapshot, line));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ids_watches_everything() {
        assert_eq!(target_for(Vec::new()), PollTarget::All);
        assert_eq!(target_for(vec![2, 1, 2]), PollTarget::ids([1, 2]));
    }
}
