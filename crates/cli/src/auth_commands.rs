use std::{sync::Arc, time::Duration};

use {
    anyhow::Result,
    clap::Subcommand,
    jiro_config::Config,
    jiro_oauth::{AuthorizationFlow, TokenStore, now_epoch_secs},
};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in via the browser consent flow.
    Login {
        /// Print the consent URL instead of opening a browser.
        #[arg(long, default_value_t = false)]
        no_browser: bool,
    },
    /// Show authentication status.
    Status,
    /// Discard the stored tokens.
    Logout,
}

pub async fn handle_auth(action: AuthAction, config: Config) -> Result<()> {
    match action {
        AuthAction::Login { no_browser } => login(config, no_browser).await,
        AuthAction::Status => status(&config),
        AuthAction::Logout => logout(&config),
    }
}

async fn login(config: Config, no_browser: bool) -> Result<()> {
    let redirect_uri = config.redirect_uri.clone();
    let store = TokenStore::new(&config.token_store_dir);
    let flow = Arc::new(AuthorizationFlow::new(config, store).with_browser(!no_browser));

    let task = tokio::spawn({
        let flow = Arc::clone(&flow);
        async move { flow.run().await }
    });

    // Surface the consent URL once the flow has built it.
    while flow.authorization_url().is_none() && !task.is_finished() {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    if let Some(url) = flow.authorization_url() {
        if no_browser {
            println!("Visit this URL to authorize jiro:\n{url}");
        } else {
            println!("Opening browser for authentication...");
            println!("If nothing opens, visit:\n{url}");
        }
        println!("Waiting for callback on {redirect_uri} ...");
    }

    let tokens = task.await??;
    let valid_for = tokens.expires_at.saturating_sub(now_epoch_secs());
    println!("Logged in; access token valid for {}m", valid_for / 60);
    Ok(())
}

fn status(config: &Config) -> Result<()> {
    let store = TokenStore::new(&config.token_store_dir);
    let Some(tokens) = store.load()? else {
        println!("Not authenticated. Run: jiro auth login");
        return Ok(());
    };

    let now = now_epoch_secs();
    if tokens.expires_at > now {
        let remaining = tokens.expires_at - now;
        println!(
            "Authenticated [valid ({}h {}m remaining)]",
            remaining / 3600,
            (remaining % 3600) / 60
        );
    } else if tokens.refresh_token.is_some() {
        println!("Authenticated [expired, refreshes on next call]");
    } else {
        println!("Authenticated [expired; run: jiro auth login]");
    }
    if let Some(scope) = &tokens.scope {
        println!("Scopes: {scope}");
    }
    Ok(())
}

fn logout(config: &Config) -> Result<()> {
    TokenStore::new(&config.token_store_dir).delete()?;
    println!("Logged out");
    Ok(())
}
