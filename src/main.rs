use cupids_vault::{
    AppConfig, AppContext, HttpVaultEndpoint, InMemoryStorage, VaultService, VaultStatus,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cupids_vault=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    info!(endpoint = %config.endpoint_url, "Starting Cupid's Vault");

    // Session and persistent storage only live for this process
    let context = AppContext::new(config, Arc::new(InMemoryStorage::new()));
    let endpoint = Arc::new(HttpVaultEndpoint::new(
        context.http.clone(),
        context.config.endpoint_url.clone(),
    ));
    let vault = VaultService::new(&context, endpoint, Arc::new(InMemoryStorage::new()))?;

    match vault.status() {
        VaultStatus::Closed => {
            info!("The vault is closed");
            return Ok(());
        }
        VaultStatus::AlreadyPlayed(record) => {
            info!(player = %record.name, verdict = %record.result, "Already played");
            return Ok(());
        }
        VaultStatus::Ready => info!("The vault is open"),
    }

    let mut args = std::env::args().skip(1);
    let (Some(first_name), Some(last_initial)) = (args.next(), args.next()) else {
        info!("Usage: cupids-vault <first name> <last initial>");
        return Ok(());
    };

    let record = match vault.play(&first_name, &last_initial).await {
        Ok(record) => record,
        Err(e) => {
            error!(error = %e, "Play failed");
            return Err(e.into());
        }
    };

    let plan = vault.spin(&mut rand::rng())?;
    for phase in plan.phases() {
        tokio::time::sleep(phase.duration).await;
        info!(rotation = phase.rotation, "Wheel turning");
    }

    let result = vault.settle(&plan);
    info!(
        player = %record.name,
        verdict = %result.verdict,
        spin_message = result.message.unwrap_or_default(),
        claim_code = result.claim_code.as_deref().unwrap_or_default(),
        "Wheel settled"
    );

    context.teardown();
    Ok(())
}
