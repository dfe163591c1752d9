//! Answer Command
//!
//! Turns one respondent reply into the value stored for the question.

use crate::services::answers::extract_answer;
use crate::state::AppContext;
use crate::utils::error::AppResult;

pub async fn handle(ctx: &AppContext, question: &str, transcript: &str) -> AppResult<()> {
    let outcome = extract_answer(ctx.gateway(), question, transcript).await;
    if let Some(reason) = &outcome.degraded {
        eprintln!("Using the raw reply: {reason}");
    }
    println!("{}", outcome.value);
    Ok(())
}
