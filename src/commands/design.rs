//! Pipeline Commands
//!
//! `design`, `questions`, `script` and `run`. The first three split the
//! pipeline at the review point so the CSV header can be edited between
//! invocations; `run` goes straight through.

use survey_designer_core::survey::first_duplicate_question;
use tracing::warn;

use super::print_degraded;
use crate::services::pipeline::{AcceptSchema, PipelineFailure, RunOptions};
use crate::state::AppContext;
use crate::storage::artifacts::ArtifactKind;
use crate::utils::error::{AppError, AppResult};

/// Write the error artifact and turn the failure into the command error.
fn record_failure(ctx: &AppContext, failure: &PipelineFailure) -> AppError {
    let id = ctx.store.allocate_id(&failure.partial.query, failure.partial.started_at);
    match ctx.store.save_error(&id, failure) {
        Ok(path) => eprintln!("Run details written to {}", path.display()),
        Err(e) => warn!(error = %e, "could not write error artifact"),
    }
    AppError::from(failure)
}

pub async fn design(ctx: &AppContext, query: &str) -> AppResult<()> {
    let design = match ctx.pipeline.design(query).await {
        Ok(design) => design,
        Err(failure) => return Err(record_failure(ctx, &failure)),
    };
    let id = ctx.store.allocate_id(query, design.started_at);
    ctx.store.save_design(&id, &design)?;

    println!("Survey id: {id}");
    for category in &design.classification.off_taxonomy {
        println!(
            "Note: {} = '{}' is not in the taxonomy",
            category,
            design.classification.vector.get(*category)
        );
    }
    println!("Headings:");
    for (i, column) in design.schema.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, column);
    }
    println!(
        "Edit {} if needed, then run `survey-designer questions {id}`",
        ctx.store.path_for(&id, ArtifactKind::Template).display()
    );
    Ok(())
}

pub async fn questions(ctx: &AppContext, survey_id: &str) -> AppResult<()> {
    let schema = ctx.store.load_schema(survey_id)?;
    let description = ctx.store.load_description(survey_id)?;

    let set = ctx.pipeline.synthesize_questions(&schema, &description).await;
    let path = ctx.store.save_questions(survey_id, &set.definition)?;

    println!("{} questions written to {}", set.definition.len(), path.display());
    print_degraded("columns", &set.degraded);
    Ok(())
}

pub async fn script(ctx: &AppContext, survey_id: &str) -> AppResult<()> {
    let definition = ctx.store.load_questions(survey_id)?;
    if definition.is_empty() {
        return Err(AppError::validation(format!("survey '{survey_id}' has no questions")));
    }
    if let Some(question) = first_duplicate_question(&definition) {
        return Err(AppError::validation(format!(
            "question '{question}' appears more than once in survey '{survey_id}'"
        )));
    }

    let set = ctx.pipeline.synthesize_script(&definition).await;
    let path = ctx.store.save_script(survey_id, &set.script)?;

    println!("{} script steps written to {}", set.script.len(), path.display());
    print_degraded("steps", &set.degraded);
    Ok(())
}

pub async fn run(ctx: &AppContext, query: &str, generate_script: bool) -> AppResult<()> {
    let options = RunOptions { generate_script };
    let artifacts = match ctx.pipeline.run(query, options, &AcceptSchema).await {
        Ok(artifacts) => artifacts,
        Err(failure) => return Err(record_failure(ctx, &failure)),
    };
    let id = ctx.store.allocate_id(query, artifacts.started_at);
    let written = ctx.store.save_run(&id, &artifacts)?;

    println!("Survey id: {id}");
    for path in &written {
        println!("  {}", path.display());
    }
    if let Some(questions) = &artifacts.questions {
        print_degraded("columns", &questions.degraded);
    }
    if let Some(script) = &artifacts.script {
        print_degraded("steps", &script.degraded);
    }
    Ok(())
}
