use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Parser)]
#[command(name = "cms-cli")]
#[command(about = "Tourism CMS CLI - browse and publish content over HTTP", long_about = None)]
struct Cli {
    /// Base URL of the CMS server
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Bearer token from `cms-cli login`
    #[arg(long, env = "CMS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange credentials for a bearer token and print it
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CMS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// List one page of a resource
    List {
        resource: Resource,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        /// draft, published or archived (ignored without a token)
        #[arg(long)]
        status: Option<String>,
    },
    #[command(subcommand)]
    Content(ContentCommands),
    /// Show recent audit log entries (admin only)
    Audit {
        #[arg(long)]
        entity_type: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ContentCommands {
    /// Show the live version
    Active { kind: ContentKind },
    /// Make a version live
    Activate { kind: ContentKind, id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Resource {
    Destinations,
    Tours,
    Blog,
    Events,
    Categories,
    Media,
}

impl Resource {
    fn path(self) -> &'static str {
        match self {
            Resource::Destinations => "destinations",
            Resource::Tours => "tours",
            Resource::Blog => "blog",
            Resource::Events => "events",
            Resource::Categories => "categories",
            Resource::Media => "media",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ContentKind {
    Homepage,
    AboutUs,
}

impl ContentKind {
    fn path(self) -> &'static str {
        match self {
            ContentKind::Homepage => "homepage",
            ContentKind::AboutUs => "about-us",
        }
    }
}

#[derive(Serialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    expires_in: i64,
}

#[derive(Deserialize, Debug)]
struct Page {
    items: Vec<Value>,
    pagination: PageMeta,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PageMeta {
    page: u32,
    total: i64,
    total_pages: i64,
}

struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    fn new(api_url: &str, token: Option<String>) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base: format!("{}/api", api_url.trim_end_matches('/')),
            token,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}/{}", self.base, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder
            .send()
            .await
            .context("Failed to send request to CMS API")?;
        let status = response.status();
        let body = response.text().await.context("Failed to read response body")?;

        if !status.is_success() {
            return Err(anyhow!(error_message(status, &body)));
        }

        serde_json::from_str(&body).context("Failed to parse CMS API response")
    }
}

/// The server's `{"error": {"message"}}` text, or the bare status when the body is not JSON.
fn error_message(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string));
    match message {
        Some(message) => format!("request failed ({}): {}", status.as_u16(), message),
        None => format!("request failed with status: {status}"),
    }
}

/// One line per row: id, best-effort label, status when the resource has one.
fn summarize(item: &Value) -> String {
    let id = item["id"].as_str().unwrap_or("-");
    let label = ["title", "name", "originalName"]
        .iter()
        .find_map(|key| item[*key].as_str())
        .unwrap_or("-");
    let mut line = format!("{id}  {label}");
    if let Some(slug) = item["slug"].as_str() {
        line.push_str(&format!("  /{slug}"));
    }
    if let Some(status) = item["status"].as_str() {
        line.push_str(&format!("  [{status}]"));
    }
    line
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.api_url, cli.token);

    match cli.command {
        Commands::Login { email, password } => login(&client, email, password).await?,
        Commands::List {
            resource,
            page,
            limit,
            status,
        } => list(&client, resource, page, limit, status).await?,
        Commands::Content(ContentCommands::Active { kind }) => {
            let version: Value = client
                .send(client.request(Method::GET, &format!("content/{}/active", kind.path())))
                .await?;
            print_version(&version)?;
        }
        Commands::Content(ContentCommands::Activate { kind, id }) => {
            let version: Value = client
                .send(client.request(
                    Method::POST,
                    &format!("content/{}/{}/activate", kind.path(), id),
                ))
                .await?;
            println!("✓ Version activated!");
            print_version(&version)?;
        }
        Commands::Audit { entity_type, page } => audit(&client, entity_type, page).await?,
    }

    Ok(())
}

async fn login(client: &ApiClient, email: String, password: String) -> Result<()> {
    let response: LoginResponse = client
        .send(
            client
                .request(Method::POST, "auth/login")
                .json(&LoginRequest { email, password }),
        )
        .await?;

    eprintln!("✓ Logged in; token valid for {}s", response.expires_in);
    println!("{}", response.token);
    Ok(())
}

async fn list(
    client: &ApiClient,
    resource: Resource,
    page: Option<u32>,
    limit: Option<u32>,
    status: Option<String>,
) -> Result<()> {
    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(page) = page {
        query.push(("page", page.to_string()));
    }
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    if let Some(status) = status {
        query.push(("status", status));
    }

    let result: Page = client
        .send(client.request(Method::GET, resource.path()).query(&query))
        .await?;

    for item in &result.items {
        println!("{}", summarize(item));
    }
    println!(
        "-- page {} of {} ({} total)",
        result.pagination.page, result.pagination.total_pages, result.pagination.total
    );
    Ok(())
}

async fn audit(client: &ApiClient, entity_type: Option<String>, page: Option<u32>) -> Result<()> {
    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(entity_type) = entity_type {
        query.push(("entityType", entity_type));
    }
    if let Some(page) = page {
        query.push(("page", page.to_string()));
    }

    let result: Page = client
        .send(client.request(Method::GET, "audit-logs").query(&query))
        .await?;

    for entry in &result.items {
        println!(
            "{}  {:<8} {:<12} {}  by {}",
            entry["createdAt"].as_str().unwrap_or("-"),
            entry["action"].as_str().unwrap_or("-"),
            entry["entityType"].as_str().unwrap_or("-"),
            entry["entityId"].as_str().unwrap_or("-"),
            entry["actorLabel"].as_str().unwrap_or("-"),
        );
    }
    println!(
        "-- page {} of {} ({} total)",
        result.pagination.page, result.pagination.total_pages, result.pagination.total
    );
    Ok(())
}

fn print_version(version: &Value) -> Result<()> {
    println!(
        "  {} v{}  {}",
        version["id"].as_str().unwrap_or("-"),
        version["version"].as_i64().unwrap_or_default(),
        version["title"].as_str().unwrap_or("-"),
    );
    println!("{}", serde_json::to_string_pretty(&version["blocks"])?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_uses_server_text() {
        let body = r#"{"error":{"code":"FORBIDDEN","message":"admin role required"}}"#;
        assert_eq!(
            error_message(StatusCode::FORBIDDEN, body),
            "request failed (403): admin role required"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>"),
            "request failed with status: 502 Bad Gateway"
        );
    }

    #[test]
    fn test_summarize() {
        let tour = json!({ "id": "t1", "title": "Reef Dive", "slug": "reef-dive", "status": "draft" });
        assert_eq!(summarize(&tour), "t1  Reef Dive  /reef-dive  [draft]");

        let media = json!({ "id": "m1", "originalName": "beach.png" });
        assert_eq!(summarize(&media), "m1  beach.png");
    }

    #[test]
    fn test_client_base_url() {
        let client = ApiClient::new("http://localhost:8000/", None);
        assert_eq!(client.base, "http://localhost:8000/api");
    }
}
