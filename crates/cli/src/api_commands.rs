use {
    anyhow::{Context, Result},
    clap::Args,
    jiro_api::ApiClient,
    jiro_config::Config,
    reqwest::Method,
};

#[derive(Args)]
pub struct ApiArgs {
    /// Site-relative REST path (e.g. /rest/api/3/myself).
    pub path: String,

    /// HTTP method.
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// JSON request body, inline or `@file`.
    #[arg(long, short = 'd')]
    pub data: Option<String>,
}

pub async fn api(args: ApiArgs, config: Config) -> Result<()> {
    let method = parse_method(&args.method)?;
    let body = match args.data.as_deref() {
        Some(data) => Some(parse_body(data)?),
        None => None,
    };

    let client = ApiClient::new(config);
    if !client.ensure_authenticated().await {
        anyhow::bail!("not authenticated; run: jiro auth login");
    }

    match client.request(method, &args.path, body.as_ref(), None).await? {
        Some(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        None => println!("(no content)"),
    }
    Ok(())
}

pub async fn whoami(config: Config) -> Result<()> {
    let client = ApiClient::new(config);
    let resources = client.accessible_resources().await?;
    if resources.is_empty() {
        println!("The stored token grants access to no Jira Cloud sites.");
        return Ok(());
    }
    for resource in resources {
        println!(
            "{}  {}  {}",
            resource.id,
            resource.url,
            resource.name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method `{method}`"))
}

fn parse_body(data: &str) -> Result<serde_json::Value> {
    let raw = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request body from {path}"))?,
        None => data.to_string(),
    };
    serde_json::from_str(&raw).context("request body is not valid JSON")
}
