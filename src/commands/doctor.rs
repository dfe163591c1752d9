//! Doctor Command
//!
//! Checks that both providers respond and that the configured local model is
//! installed. Fails when the active provider is unhealthy.

use survey_designer_llm::{describe_error, ProviderHealth, ProviderMode};

use crate::state::AppContext;
use crate::utils::error::{AppError, AppResult};

fn report(health: &ProviderHealth, active: bool) {
    let marker = if active { "*" } else { " " };
    let status = match &health.status {
        Ok(()) => "ok".to_string(),
        Err(e) => describe_error(e),
    };
    println!(
        "{marker} {:<5} {} ({}): {}",
        health.mode.to_string(),
        health.provider,
        health.model,
        status
    );
    if let Some(models) = &health.models {
        println!("        installed: {}", models.join(", "));
    }
    if health.model_missing() {
        println!(
            "        model '{}' is not installed; run `ollama pull {}`",
            health.model, health.model
        );
    }
}

pub async fn handle(ctx: &AppContext) -> AppResult<()> {
    let gateway = ctx.gateway();
    let active = gateway.mode();

    let (cloud, local) = tokio::join!(
        gateway.health(ProviderMode::Cloud),
        gateway.health(ProviderMode::Local)
    );
    report(&cloud, active == ProviderMode::Cloud);
    report(&local, active == ProviderMode::Local);

    let active_health = if active == ProviderMode::Cloud { &cloud } else { &local };
    if active_health.status.is_err() || active_health.model_missing() {
        return Err(AppError::config(format!("active provider ({active}) is not ready")));
    }
    Ok(())
}
