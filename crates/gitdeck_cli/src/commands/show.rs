//! `gitdeck show`: repository detail view.

use console::style;
use gitdeck::cache::repos;
use gitdeck::remote::RepoDetail;
use gitdeck::StarState;

use super::shared::{App, CliResult, parse_full_name, report, star_marker};

/// Fetch a repository, store its star count and print the details.
pub(crate) async fn handle_show(app: &App, full_name: &str) -> CliResult {
    let (owner, name) = parse_full_name(full_name)?;
    let sync = app.star_sync(app.remote().await?);

    let detail = sync.load_detail(owner, name).await.map_err(report)?;
    let star_state = match repos::find_by_id(app.cache.db(), detail.repo.id).await? {
        Some(_) => sync.reconcile(detail.repo.id).await.map_err(report)?,
        None => StarState::Unknown,
    };

    for line in detail_lines(&detail, star_state) {
        if app.is_tty {
            println!("{}", style_line(&line));
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

fn style_line(line: &str) -> String {
    match line.split_once(": ") {
        Some((label, value)) => format!("{}: {value}", style(label).bold()),
        None => style(line).cyan().bold().to_string(),
    }
}

fn detail_lines(detail: &RepoDetail, star_state: StarState) -> Vec<String> {
    let repo = &detail.repo;
    let mut lines = vec![
        format!("{} {}", star_marker(star_state), repo.full_name()),
        format!("URL: {}", detail.html_url),
    ];
    if let Some(description) = &repo.description {
        lines.push(format!("Description: {description}"));
    }
    if let Some(homepage) = &detail.homepage {
        lines.push(format!("Homepage: {homepage}"));
    }
    lines.push(format!(
        "Language: {}",
        repo.language.as_deref().unwrap_or("-")
    ));
    lines.push(format!("Stars: {}", repo.stargazers_count));
    lines.push(format!("Forks: {}", repo.forks_count));
    if let Some(watchers) = detail.subscribers_count {
        lines.push(format!("Watchers: {watchers}"));
    }
    lines.push(format!("Open issues: {}", detail.open_issues_count));
    lines.push(format!("Default branch: {}", repo.default_branch));
    if !detail.topics.is_empty() {
        lines.push(format!("Topics: {}", detail.topics.join(", ")));
    }
    let mut flags = Vec::new();
    if detail.is_fork {
        flags.push("fork");
    }
    if detail.is_archived {
        flags.push("archived");
    }
    if !flags.is_empty() {
        lines.push(format!("Flags: {}", flags.join(", ")));
    }
    lines.push(format!("Updated: {}", repo.updated_at));
    lines
}
