//! Subcommand implementations. User-facing text goes through the
//! [`Catalog`]; diagnostics go through `tracing`.

use std::sync::Arc;

use devboards_comments::{CommentError, CommentStore};
use devboards_core::comment::ANONYMOUS_AUTHOR_KEY;
use devboards_core::{Author, Catalog, Comment, CommentId, JobId, JobQuery};
use devboards_feed::{
    Anchor, FeedPager, IntersectionEntry, JobSource, LoadOutcome, ManualViewport, ScrollTrigger,
    TriggerOptions,
};
use tokio::sync::mpsc;

use crate::config::AppConfig;

/// Sentinel placed after the last rendered job.
const FEED_END_ANCHOR: &str = "job-feed-end";

// ---------------------------------------------------------------------------
// Job feed
// ---------------------------------------------------------------------------

/// Page through the feed by scrolling the end-of-list sentinel into view
/// `scrolls` times.
pub async fn scroll_jobs(
    source: Arc<dyn JobSource>,
    catalog: &Catalog,
    config: &AppConfig,
    query: JobQuery,
    scrolls: u32,
) -> anyhow::Result<()> {
    let pager = FeedPager::new(source, config.page_size).with_query(query);
    let viewport = ManualViewport::new();
    let anchor = Anchor::new(FEED_END_ANCHOR);

    let (crossings_tx, mut crossings) = mpsc::unbounded_channel();
    let mut trigger = ScrollTrigger::new(Arc::new(viewport.clone()));
    trigger.attach(
        anchor.clone(),
        TriggerOptions::new(move || {
            let _ = crossings_tx.send(());
        }),
    );

    for _ in 0..scrolls {
        // An empty or fully rendered list shows the sentinel.
        viewport.report(&anchor, IntersectionEntry::visible(1.0));
        if crossings.recv().await.is_none() {
            break;
        }

        let before = pager.len().await;
        let outcome = pager.load_next().await.map_err(|e| {
            anyhow::Error::new(e).context(catalog.translate("jobs.error.page").to_string())
        })?;

        match outcome {
            LoadOutcome::Loaded(appended) => {
                for posting in pager.items().await.iter().skip(before) {
                    let location = posting.location.as_deref().unwrap_or("-");
                    let remote = if posting.remote { " (remote)" } else { "" };
                    println!(
                        "{}  {} at {}, {}{}",
                        posting.id, posting.title, posting.company, location, remote
                    );
                }
                let count = appended.to_string();
                let loaded = pager.len().await.to_string();
                println!(
                    "{}",
                    catalog.format(
                        "jobs.page",
                        &[("count", count.as_str()), ("total", loaded.as_str())]
                    )
                );
            }
            LoadOutcome::Busy => {}
            LoadOutcome::Exhausted => break,
        }

        if pager.is_exhausted().await {
            break;
        }
        // Newly rendered postings push the sentinel off screen.
        viewport.report(&anchor, IntersectionEntry::hidden());
    }

    if pager.is_exhausted().await {
        println!("{}", catalog.translate("jobs.exhausted"));
    }
    trigger.detach();
    Ok(())
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

pub async fn show_comments(
    store: &CommentStore,
    catalog: &Catalog,
    job_id: JobId,
) -> anyhow::Result<()> {
    let view = store.view(job_id.clone());
    let Some(comments) = view
        .ensure_loaded()
        .await
        .map_err(|e| comment_failure(catalog, e))?
    else {
        return Ok(());
    };
    print_thread(catalog, &job_id, &comments);
    Ok(())
}

pub async fn post_comment(
    store: &CommentStore,
    catalog: &Catalog,
    job_id: JobId,
    author: Option<String>,
    text: &str,
) -> anyhow::Result<()> {
    let view = store.view(job_id.clone());
    view.ensure_loaded()
        .await
        .map_err(|e| comment_failure(catalog, e))?;

    let author = author.map(Author::new).unwrap_or_else(Author::anonymous);
    let Some(stored) = view
        .add(author, text)
        .await
        .map_err(|e| comment_failure(catalog, e))?
    else {
        return Ok(());
    };

    tracing::info!(job_id = %job_id, comment_id = %stored.id, "Comment posted");
    println!(
        "{}",
        catalog.format("comments.added", &[("author", author_name(catalog, &stored))])
    );
    print_thread(catalog, &job_id, &view.comments().await);
    Ok(())
}

pub async fn edit_comment(
    store: &CommentStore,
    catalog: &Catalog,
    job_id: JobId,
    id: CommentId,
    text: &str,
) -> anyhow::Result<()> {
    let view = store.view(job_id.clone());
    view.ensure_loaded()
        .await
        .map_err(|e| comment_failure(catalog, e))?;

    if view
        .edit(&id, text)
        .await
        .map_err(|e| comment_failure(catalog, e))?
        .is_some()
    {
        println!("{}", catalog.format("comments.edited", &[("id", id.as_str())]));
        print_thread(catalog, &job_id, &view.comments().await);
    }
    Ok(())
}

pub async fn delete_comment(
    store: &CommentStore,
    catalog: &Catalog,
    job_id: JobId,
    id: CommentId,
) -> anyhow::Result<()> {
    let view = store.view(job_id.clone());
    view.ensure_loaded()
        .await
        .map_err(|e| comment_failure(catalog, e))?;

    if view
        .delete(&id)
        .await
        .map_err(|e| comment_failure(catalog, e))?
        .is_some()
    {
        println!("{}", catalog.format("comments.deleted", &[("id", id.as_str())]));
        print_thread(catalog, &job_id, &view.comments().await);
    }
    Ok(())
}

fn print_thread(catalog: &Catalog, job_id: &JobId, comments: &[Comment]) {
    if comments.is_empty() {
        println!("{}", catalog.translate("comments.empty"));
        return;
    }
    let count = comments.len().to_string();
    println!(
        "{}",
        catalog.format(
            "comments.count",
            &[("count", count.as_str()), ("job", job_id.as_str())]
        )
    );
    for comment in comments {
        println!(
            "  [{}] {} ({}): {}",
            comment.id,
            author_name(catalog, comment),
            comment.date.format("%Y-%m-%d %H:%M"),
            comment.text
        );
    }
}

fn author_name<'a>(catalog: &'a Catalog, comment: &'a Comment) -> &'a str {
    if comment.author.is_anonymous() {
        catalog.translate(ANONYMOUS_AUTHOR_KEY)
    } else {
        comment.author.display_name()
    }
}

/// Wrap a store failure with its localized message.
fn comment_failure(catalog: &Catalog, err: CommentError) -> anyhow::Error {
    let message = match &err {
        CommentError::NotFound(id) => catalog.format(err.message_key(), &[("id", id.as_str())]),
        _ => catalog.translate(err.message_key()).to_string(),
    };
    anyhow::Error::new(err).context(message)
}
