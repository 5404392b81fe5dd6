//! Deployment simulation against a scripted network.
//!
//! A script is a TOML file:
//!
//! ```toml
//! # Answer every seed URL with 200 unless listed below (default: true)
//! auto_seed = true
//!
//! [[responses]]
//! url = "/data/plans.json"
//! status = 200
//! body = "[]"
//! content_type = "application/json"
//!
//! [[steps]]
//! action = "offline"
//!
//! [[steps]]
//! action = "fetch"
//! url = "/workouts"
//! html = true
//!
//! [[steps]]
//! action = "message"
//! command = "PROMPT_INSTALL"
//! ```

use std::fs;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use offline_core::{EngineConfig, Method, Request, Response, ResponseKind};
use offline_fetch::ScriptedNetwork;
use offline_worker::{
    CacheStatus, ClientCommand, EventResult, InMemoryStorage, MetricsSnapshot, ServiceWorker,
    WorkerError, WorkerEvent,
};
use serde::{Deserialize, Serialize};

use super::SimulateArgs;
use crate::context::Context;
use crate::output::{Output, Served};

/// A simulation script.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Script {
    #[serde(default = "default_true")]
    auto_seed: bool,
    #[serde(default)]
    responses: Vec<ScriptedResponse>,
    #[serde(default)]
    steps: Vec<Step>,
}

fn default_true() -> bool {
    true
}

/// A response the scripted network gives for one URL.
#[derive(Debug, Clone, Deserialize)]
struct ScriptedResponse {
    url: String,
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default)]
    body: String,
    content_type: Option<String>,
    #[serde(default)]
    kind: ResponseKind,
    #[serde(default)]
    redirected: bool,
}

fn default_status() -> u16 {
    200
}

impl ScriptedResponse {
    fn to_response(&self) -> Response {
        let response = Response::new(self.status)
            .with_body(self.body.clone())
            .with_kind(self.kind)
            .with_redirected(self.redirected);
        match &self.content_type {
            Some(content_type) => response.with_content_type(content_type.clone()),
            None => response,
        }
    }
}

/// One thing that happens during the simulation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
enum Step {
    /// A view requests a URL.
    Fetch {
        url: String,
        #[serde(default)]
        html: bool,
        #[serde(default)]
        method: Option<String>,
    },
    /// The whole network goes down.
    Offline,
    /// The network comes back.
    Online,
    /// One URL starts failing.
    Fail { url: String },
    /// One URL stops failing.
    Heal { url: String },
    /// Change what the network answers for a URL.
    Respond(ScriptedResponse),
    /// A view posts a command, e.g. `PROMPT_INSTALL`.
    Message { command: String },
}

/// What happened at one step.
#[derive(Debug, Serialize)]
struct StepRecord {
    step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<CacheStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivered: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StepRecord {
    fn new(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            source: None,
            http_status: None,
            rule: None,
            bytes: None,
            delivered: None,
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    generation: String,
    seeded: usize,
    steps: Vec<StepRecord>,
    metrics: MetricsSnapshot,
}

/// Run the simulate command.
pub async fn run(args: SimulateArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.script);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let script: Script = toml::from_str(&content)
        .with_context(|| format!("Failed to parse script {}", path.display()))?;

    let network = Arc::new(build_network(&script, &ctx.config)?);
    let storage = Arc::new(InMemoryStorage::new());
    let worker = ServiceWorker::new(ctx.config.clone(), storage, network.clone())
        .context("Failed to create worker")?;
    let mut view = worker.connect();

    ctx.output.header(&format!("Deploying {}", worker.generation()));
    let (installed, activated) = worker.start().await.context("Deployment failed")?;
    ctx.output.success(&format!("Installed {} entries", installed.entries));
    ctx.output.success(&format!(
        "Activated; removed {} stale generation(s), claimed {} view(s)",
        activated.deleted.len(),
        activated.claimed
    ));

    ctx.output.header("Steps");
    let total = script.steps.len();
    let mut records = Vec::with_capacity(total);

    for (i, step) in script.steps.iter().enumerate() {
        let record = run_step(step, &worker, &network, ctx).await?;
        let failed = record.error.is_some();

        print_record(&ctx.output, i + 1, total, &record);
        while let Some(event) = view.try_recv() {
            ctx.output.view_event(&event.to_json());
        }

        records.push(record);
        if failed && args.fail_fast {
            break;
        }
    }

    let report = SimulationReport {
        generation: worker.generation().to_string(),
        seeded: installed.entries,
        steps: records,
        metrics: worker.metrics(),
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.header("Metrics");
    ctx.output.metrics(&report.metrics);

    Ok(())
}

fn build_network(script: &Script, config: &EngineConfig) -> Result<ScriptedNetwork> {
    let network = ScriptedNetwork::for_origin(&config.origin_url()?);

    if script.auto_seed {
        for url in config.seed_urls()? {
            network.set_response(&url.to_string(), Response::ok(url.path().to_string()));
        }
    }

    for scripted in &script.responses {
        let url = config.resolve(&scripted.url)?;
        network.set_response(&url.to_string(), scripted.to_response());
    }

    Ok(network)
}

async fn run_step(
    step: &Step,
    worker: &ServiceWorker,
    network: &ScriptedNetwork,
    ctx: &Context,
) -> Result<StepRecord> {
    let config = &ctx.config;

    let record = match step {
        Step::Fetch { url, html, method } => {
            let url = config.resolve(url)?;
            let method = match method {
                Some(m) => m.to_ascii_uppercase().parse::<Method>()?,
                None => Method::GET,
            };
            let mut request = Request::new(method.clone(), url.clone());
            if *html {
                request = request.with_header("Accept", "text/html");
            }

            let mut record = StepRecord::new(format!("{} {}", method, url));
            record.rule = Some(worker.route(&request).rule.to_string());

            match worker.dispatch(WorkerEvent::Fetch(request)).await {
                Ok(EventResult::Fetched(outcome)) => {
                    record.source = Some(outcome.status);
                    record.http_status = Some(outcome.response.status);
                    record.bytes = Some(outcome.response.body.len());
                }
                Ok(_) => {}
                Err(WorkerError::Fetch(e)) => record.error = Some(e.to_string()),
                Err(e) => return Err(e.into()),
            }
            record
        }
        Step::Offline => {
            network.set_online(false);
            StepRecord::new("network offline")
        }
        Step::Online => {
            network.set_online(true);
            StepRecord::new("network online")
        }
        Step::Fail { url } => {
            let url = config.resolve(url)?;
            network.fail(&url.to_string());
            StepRecord::new(format!("fail {}", url))
        }
        Step::Heal { url } => {
            let url = config.resolve(url)?;
            network.heal(&url.to_string());
            StepRecord::new(format!("heal {}", url))
        }
        Step::Respond(scripted) => {
            let url = config.resolve(&scripted.url)?;
            network.set_response(&url.to_string(), scripted.to_response());
            StepRecord::new(format!("respond {} with {}", url, scripted.status))
        }
        Step::Message { command } => {
            let payload = serde_json::json!({ "type": command }).to_string();
            let command = ClientCommand::from_json(&payload)
                .with_context(|| format!("Unknown command {}", command))?;

            let mut record = StepRecord::new(format!("message {}", payload));
            if let EventResult::Delivered(n) =
                worker.dispatch(WorkerEvent::Message(command)).await?
            {
                record.delivered = Some(n);
            }
            record
        }
    };

    ctx.output.debug(&format!("{:?}", step));
    Ok(record)
}

fn print_record(output: &Output, num: usize, total: usize, record: &StepRecord) {
    if let Some(error) = &record.error {
        output.step(num, total, &format!("{} ✗ {}", record.step, error));
        return;
    }

    if let (Some(status), Some(http_status)) = (record.source, record.http_status) {
        output.served(
            num,
            total,
            &Served {
                status,
                http_status,
                request: &record.step,
                rule: record.rule.as_deref().unwrap_or("-"),
                bytes: record.bytes.unwrap_or(0),
            },
        );
        return;
    }

    match record.delivered {
        Some(n) => output.step(num, total, &format!("{} → {} view(s)", record.step, n)),
        None => output.step(num, total, &record.step),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offline_core::RequestUrl;
    use offline_fetch::Fetcher;

    #[test]
    fn test_parse_script() {
        let script: Script = toml::from_str(
            r#"
            [[responses]]
            url = "/data/plans.json"
            body = "[]"

            [[steps]]
            action = "offline"

            [[steps]]
            action = "fetch"
            url = "/workouts"
            html = true

            [[steps]]
            action = "respond"
            url = "/styles/main.css"
            status = 500

            [[steps]]
            action = "message"
            command = "PROMPT_INSTALL"
            "#,
        )
        .unwrap();

        assert!(script.auto_seed);
        assert_eq!(script.responses[0].status, 200);
        assert_eq!(script.steps.len(), 4);
        assert!(matches!(script.steps[1], Step::Fetch { html: true, .. }));
        assert!(matches!(&script.steps[2], Step::Respond(r) if r.status == 500));
    }

    #[tokio::test]
    async fn test_build_network_auto_seeds() {
        let script: Script = toml::from_str(
            r#"
            [[responses]]
            url = "/manifest.json"
            body = "{}"
            content_type = "application/manifest+json"

            [[responses]]
            url = "https://cdn.example.net/lib.js"
            body = "lib"
            "#,
        )
        .unwrap();
        let config = EngineConfig::default();
        let network = build_network(&script, &config).unwrap();

        let root = config.root_url().unwrap();
        let response = network.fetch(&Request::get(root)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), Some("/"));

        let manifest = config.resolve("/manifest.json").unwrap();
        let response = network.fetch(&Request::get(manifest)).await.unwrap();
        assert_eq!(response.text(), Some("{}"));
        assert_eq!(response.kind, ResponseKind::Basic);

        let lib = RequestUrl::parse("https://cdn.example.net/lib.js").unwrap();
        let response = network.fetch(&Request::get(lib)).await.unwrap();
        assert_eq!(response.kind, ResponseKind::Opaque);
    }

    #[test]
    fn test_unknown_step_rejected() {
        let result: Result<Script, _> = toml::from_str(
            r#"
            [[steps]]
            action = "reboot"
            "#,
        );
        assert!(result.is_err());
    }
}
