use clap::{Parser, Subcommand};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::agent::{ConversationEntry, Orchestrator, Role};
use crate::clients::ollama::OllamaClient;
use crate::core::mcp::{RpcReq, RpcResp};
use crate::infra::boot::{Harness, PAGE_TAB};
use crate::infra::config::Config;

#[derive(Parser)]
#[command(name = "webmcp-harness")]
#[command(about = "WebMCP tool-calling harness")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the page, relay and MCP surfaces (default)
    Serve,
    /// Chat with the local model against the in-process page
    Chat,
    /// List the tools a running harness exposes
    Tools {
        /// Service URL
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Health check the service
    Health {
        /// Service URL to check
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
        /// Also probe the configured model backend
        #[arg(long)]
        backend: bool,
    },
    /// Validate configuration
    Config {
        /// Validate config without starting service
        #[arg(long)]
        validate: bool,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    run_commands(cli.command.unwrap_or(Commands::Serve)).await
}

pub async fn run_commands(command: Commands) -> ExitCode {
    match command {
        Commands::Serve => {
            let cfg = match Config::load() {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("❌ Configuration validation failed: {e}");
                    return ExitCode::FAILURE;
                }
            };
            match crate::infra::boot::run_server(cfg).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!(error = %e, "server exited with error");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Chat => match chat().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Chat failed: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Tools { url } => match list_tools(&url).await {
            Ok(tools) => {
                println!("🔧 {} tool{}", tools.len(), if tools.len() == 1 { "" } else { "s" });
                for (name, description) in tools {
                    println!("  📌 {name}: {description}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Listing tools failed: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Health { url, backend } => {
            let mut code = match health_check(&url).await {
                Ok(_) => {
                    println!("✅ Service is healthy");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("❌ Health check failed: {e}");
                    ExitCode::FAILURE
                }
            };
            if backend {
                code = match Config::load() {
                    Ok(cfg) if backend_health(&cfg).await => code,
                    Ok(_) => ExitCode::FAILURE,
                    Err(e) => {
                        eprintln!("❌ Configuration validation failed: {e}");
                        ExitCode::FAILURE
                    }
                };
            }
            code
        }
        Commands::Config { validate } => match Config::load() {
            Ok(cfg) => {
                if validate {
                    println!("✅ Configuration is valid");
                } else {
                    match toml::to_string_pretty(&cfg) {
                        Ok(s) => println!("{s}"),
                        Err(e) => {
                            eprintln!("❌ Cannot render configuration: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn health_check(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/healthz", url.trim_end_matches('/')))
        .timeout(std::time::Duration::from_millis(500))
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(format!("HTTP {}", response.status()).into())
    }
}

async fn backend_health(cfg: &Config) -> bool {
    if OllamaClient::from_config(&cfg.backend).health().await {
        println!("✅ Model backend reachable at {}", cfg.backend.base_url);
        true
    } else {
        eprintln!("❌ Model backend unreachable at {}", cfg.backend.base_url);
        false
    }
}

async fn list_tools(url: &str) -> Result<Vec<(String, String)>, Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let resp: RpcResp = client
        .post(format!("{}/rpc", url.trim_end_matches('/')))
        .json(&RpcReq::new(serde_json::json!(1), "tools/list", serde_json::json!({})))
        .timeout(std::time::Duration::from_secs(2))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    if let Some(err) = resp.error {
        return Err(format!("rpc error {}: {}", err.code, err.message).into());
    }
    let tools = resp
        .result
        .as_ref()
        .and_then(|r| r.get("tools"))
        .and_then(|t| t.as_array())
        .ok_or("response has no tools array")?;
    Ok(tools
        .iter()
        .map(|t| {
            let field = |k: &str| t.get(k).and_then(|v| v.as_str()).unwrap_or_default().to_string();
            (field("name"), field("description"))
        })
        .collect())
}

async fn chat() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    let harness = Harness::start(&cfg)?;
    let backend = OllamaClient::from_config(&cfg.backend);
    if !backend.health().await {
        eprintln!(
            "⚠️  Ollama is not reachable at {}. Start it with `ollama serve`.",
            cfg.backend.base_url
        );
    }
    let mut orchestrator = Orchestrator::new(PAGE_TAB, harness.relay.clone(), Arc::new(backend))
        .with_history_window(cfg.agent.history_window);
    let tools = orchestrator.refresh_tools().await.len();
    println!("✅ Found {tools} WebMCP tools on this page (model {})", cfg.backend.model);
    println!("Type a message, or `exit` to quit.");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    chat_loop(&mut orchestrator, stdin, &mut std::io::stdout()).await
}

/// Read utterances line by line until EOF or `exit`, printing each reply.
pub async fn chat_loop<R, W>(orchestrator: &mut Orchestrator, input: R, out: &mut W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if matches!(line, "exit" | "quit") {
            break;
        }
        for entry in orchestrator.handle_utterance(line).await {
            writeln!(out, "{}", render(&entry))?;
        }
    }
    writeln!(out)?;
    Ok(())
}

fn render(entry: &ConversationEntry) -> String {
    match entry.role {
        Role::ToolTrace => format!("🔧 {}", entry.content),
        Role::System => format!("❌ {}", entry.content),
        Role::Assistant => format!("🤖 {}", entry.content),
        Role::User => format!("🧑 {}", entry.content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mock::ScriptedBackend;
    use serial_test::serial;
    use std::env;

    #[tokio::test]
    async fn health_check_fails_without_a_service() {
        let result = health_check("http://localhost:9").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn health_check_ok_and_error_paths() {
        use httpmock::prelude::*;
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/healthz");
            then.status(200).body("ok");
        });
        assert!(health_check(&server.base_url()).await.is_ok());

        let bad = MockServer::start();
        bad.mock(|when, then| {
            when.method(GET).path("/healthz");
            then.status(500);
        });
        assert!(health_check(&bad.base_url()).await.is_err());
    }

    #[tokio::test]
    async fn list_tools_reads_rpc_result() {
        use httpmock::prelude::*;
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST).path("/rpc").body_contains("tools/list");
            then.status(200).json_body(serde_json::json!({
                "jsonrpc": "2.0", "id": 1,
                "result": {"tools": [{"name": "add_todo", "description": "Add a todo", "inputSchema": {"type": "object"}}]}
            }));
        });
        let tools = list_tools(&server.base_url()).await.unwrap();
        m.assert();
        assert_eq!(tools, vec![("add_todo".to_string(), "Add a todo".to_string())]);
    }

    #[tokio::test]
    async fn list_tools_surfaces_rpc_errors() {
        use httpmock::prelude::*;
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rpc");
            then.status(200).json_body(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "unknown method"}
            }));
        });
        let err = list_tools(&server.base_url()).await.unwrap_err();
        assert!(err.to_string().contains("-32601"));
    }

    #[tokio::test]
    #[serial]
    async fn run_commands_config_success() {
        env::remove_var("MODE");
        env::remove_var("WEBMCP_CONFIG");
        let code = run_commands(Commands::Config { validate: true }).await;
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[tokio::test]
    #[serial]
    async fn run_commands_config_failure() {
        env::set_var("MODE", "nope");
        let code = run_commands(Commands::Config { validate: true }).await;
        assert_eq!(code, ExitCode::FAILURE);
        env::remove_var("MODE");
    }

    #[tokio::test]
    async fn run_commands_health_fails_against_nothing() {
        let code = run_commands(Commands::Health { url: "http://localhost:9".into(), backend: false }).await;
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[tokio::test]
    #[serial]
    async fn health_backend_uses_the_config_file() {
        use httpmock::prelude::*;
        let service = MockServer::start();
        service.mock(|when, then| {
            when.method(GET).path("/healthz");
            then.status(200).body("ok");
        });
        let ollama = MockServer::start();
        let tags = ollama.mock(|when, then| {
            when.method(GET).path("/api/tags");
            then.status(200).json_body(serde_json::json!({"models": []}));
        });

        let path = env::temp_dir().join(format!("webmcp-health-{}.toml", std::process::id()));
        std::fs::write(&path, format!("[backend]\nbase_url = \"{}\"\n", ollama.base_url())).unwrap();
        env::remove_var("OLLAMA_URL");
        env::remove_var("MODE");
        env::set_var("WEBMCP_CONFIG", &path);

        let code = run_commands(Commands::Health { url: service.base_url(), backend: true }).await;
        env::remove_var("WEBMCP_CONFIG");
        let _ = std::fs::remove_file(&path);

        assert_eq!(code, ExitCode::SUCCESS);
        tags.assert();
    }

    #[tokio::test]
    async fn chat_loop_runs_tools_and_stops_on_exit() {
        let harness = Harness::start(&Config::default()).unwrap();
        let backend = Arc::new(ScriptedBackend::with_responses([
            r#"{"tool":"add_todo","parameters":{"text":"call mum"}}"#,
            "never used",
        ]));
        let mut orchestrator = Orchestrator::new(PAGE_TAB, harness.relay.clone(), backend.clone());
        let input: &[u8] = b"add a todo to call mum\nexit\nlist my todos\n";
        let mut out = Vec::new();
        chat_loop(&mut orchestrator, input, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("🔧 Calling add_todo({\"text\":\"call mum\"})"), "{text}");
        assert!(text.contains("🤖 "));
        assert_eq!(backend.remaining_responses(), 1);
        assert_eq!(harness.store.len(), 3);
    }
}
