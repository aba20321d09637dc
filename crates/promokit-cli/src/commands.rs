//! Command handlers, called from `main` once config, client and session
//! store are set up.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use promokit_client::PromoApiClient;
use promokit_core::{AppConfig, PromotionIdea};
use promokit_flow::{
    FileSessionStore, FlowError, GenerationSession, ImageSelection, PublishOutcome,
    SubmissionEncoder,
};

use crate::images;

pub(crate) struct Context {
    pub(crate) config: AppConfig,
    pub(crate) store: Arc<FileSessionStore>,
    pub(crate) client: Arc<PromoApiClient>,
}

impl Context {
    fn session(&self) -> GenerationSession {
        GenerationSession::from_client(self.store.clone(), self.client.clone())
    }
}

fn user_error(e: FlowError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

/// Encode the survey, upload images and run the first generation.
pub(crate) async fn run_generate(
    ctx: &Context,
    form: &Path,
    image_paths: &[PathBuf],
    json: bool,
) -> anyhow::Result<()> {
    let values = promokit_core::load_survey(form)?;

    let mut selection = ImageSelection::new();
    selection.extend(images::read_images(image_paths)?);
    if !selection.rejected().is_empty() {
        println!("skipped non-image files: {}", selection.rejected().join(", "));
    }

    let encoder = SubmissionEncoder::new(ctx.store.clone(), ctx.client.clone())
        .with_max_upload_bytes(ctx.config.max_upload_bytes)
        .with_subdir(ctx.config.upload_subdir.clone());
    let encoded = encoder
        .encode(&values, selection.into_files())
        .await
        .map_err(user_error)?;
    if !encoded.excluded.is_empty() {
        println!(
            "excluded files over {} bytes: {}",
            ctx.config.max_upload_bytes,
            encoded.excluded.join(", ")
        );
    }

    let ideas = ctx
        .session()
        .generate(&encoded.request)
        .await
        .map_err(user_error)?;
    print_ideas(&ideas, json)
}

/// Show the ideas cached from the last generation.
pub(crate) fn run_ideas(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let mut session = ctx.session();
    let ideas = session.restore()?;
    if ideas.is_empty() {
        println!("no ideas yet; run `promokit generate` first");
        return Ok(());
    }
    print_ideas(ideas, json)
}

pub(crate) async fn run_regenerate(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let ideas = ctx.session().regenerate().await.map_err(user_error)?;
    print_ideas(&ideas, json)
}

/// Publish one idea by id.
pub(crate) async fn run_publish(ctx: &Context, idea_id: &str) -> anyhow::Result<()> {
    let mut session = ctx.session();
    if session.restore()?.is_empty() {
        anyhow::bail!("no ideas to publish; run `promokit generate` first");
    }

    match session.select_by_id(idea_id).await.map_err(user_error)? {
        PublishOutcome::Published => println!("published idea {idea_id}"),
        PublishOutcome::AcceptedDespiteRateLimit => {
            println!("published idea {idea_id} (platform rate limit reported; post accepted)");
        }
    }
    Ok(())
}

fn print_ideas(ideas: &[PromotionIdea], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(ideas)?);
    } else {
        print!("{}", render_ideas(ideas));
    }
    Ok(())
}

/// Human-readable listing, one block per idea.
pub(crate) fn render_ideas(ideas: &[PromotionIdea]) -> String {
    let mut out = String::new();
    for idea in ideas {
        let _ = writeln!(out, "[{}] {}", idea.id, idea.title);
        if idea.variant_id.is_none() {
            let _ = writeln!(out, "    (cannot be published: no server variant id)");
        }
        for line in idea.summary.lines() {
            let _ = writeln!(out, "    {line}");
        }
        if !idea.tags.is_empty() {
            let _ = writeln!(out, "    {}", idea.tags.join(" "));
        }
        out.push('\n');
    }
    out
}
