//! Integration Test Runner
//!
//! Boots the users service on an ephemeral port inside this process and
//! drives both client call styles against it.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin integration-test
//!
//! # Run only tests whose name contains a pattern
//! cargo run --bin integration-test -- --filter paging
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use anyhow::{Context, ensure};
use http::StatusCode;
use response_envelope::{Continuation, EnvelopeOptions, PayloadState, TransportError};
use response_envelope_examples::{
    ApiError, AppState, ClientError, User, UserServiceClient, init_tracing, router,
};

/// ANSI color codes for terminal output
mod colors {
    pub const GREEN: &str = "\x1b[32m";
    pub const RED: &str = "\x1b[31m";
    pub const CYAN: &str = "\x1b[36m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

/// Test result
#[derive(Debug)]
struct TestResult {
    name: &'static str,
    passed: bool,
    duration: Duration,
    output: String,
}

type TestFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A named scenario run against a fresh server.
struct Scenario {
    name: &'static str,
    run: fn(UserServiceClient, AppState) -> TestFuture,
}

async fn start_server(state: AppState) -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(state)).await {
            tracing::error!(error = %e, "server stopped");
        }
    });
    Ok(format!("http://{addr}"))
}

fn classic_get(client: UserServiceClient, _: AppState) -> TestFuture {
    Box::pin(async move {
        let user = client.get_user(1).await?;
        ensure!(user.name == "Ada", "unexpected user {user:?}");
        Ok(())
    })
}

fn envelope_get(client: UserServiceClient, _: AppState) -> TestFuture {
    Box::pin(async move {
        let envelope = client.get_user_with_response(2).await?;
        ensure!(envelope.status() == StatusCode::OK);
        ensure!(envelope.headers().contains("etag"), "missing etag");
        ensure!(envelope.state() == PayloadState::Raw);

        let raw = envelope.raw_body().clone();
        let user = envelope.payload()?;
        ensure!(user.name == "Grace");
        ensure!(envelope.state() == PayloadState::Materialized);
        ensure!(envelope.raw_body() == &raw, "raw body changed");
        Ok(())
    })
}

fn not_found(client: UserServiceClient, _: AppState) -> TestFuture {
    Box::pin(async move {
        let envelope = client.get_user_with_response(99).await?;
        ensure!(envelope.status() == StatusCode::NOT_FOUND);
        let error: ApiError = envelope.deserialize()?;
        ensure!(error.code == "not_found");

        match client.get_user(99).await {
            Err(ClientError::Api {
                status,
                error: Some(error),
            }) => {
                ensure!(status == StatusCode::NOT_FOUND);
                ensure!(error.message.contains("99"));
                Ok(())
            }
            other => anyhow::bail!("expected an api error, got {other:?}"),
        }
    })
}

fn delete_no_content(client: UserServiceClient, _: AppState) -> TestFuture {
    Box::pin(async move {
        let envelope = client.delete_user_with_response(3).await?;
        ensure!(envelope.status() == StatusCode::NO_CONTENT);
        ensure!(envelope.raw_body().is_empty());
        ensure!(!envelope.expects_body());

        let user = envelope.typed::<User>();
        ensure!(user.payload_opt()?.is_none(), "204 should have no payload");

        client.delete_user(4).await?;
        ensure!(client.get_user(4).await.is_err());
        Ok(())
    })
}

fn paging(client: UserServiceClient, state: AppState) -> TestFuture {
    Box::pin(async move {
        let users = client.list_users().await?;
        ensure!(users.len() == 5, "expected 5 users, got {}", users.len());

        let mut page = client.list_users_with_response(None).await?;
        let mut pages = 1;
        while let Continuation::Next(link) = page.continuation() {
            let link = link.to_string();
            page = client.list_users_with_response(Some(link.as_str())).await?;
            pages += 1;
        }
        ensure!(pages == 3, "expected 3 pages, got {pages}");

        let delta = page.delta_link().context("last page has no delta link")?.to_string();
        state
            .upsert(User {
                id: 7,
                name: "Dennis".to_string(),
                email: "dennis@example.com".to_string(),
            })
            .await;
        let changes = client.list_users_with_response(Some(delta.as_str())).await?;
        ensure!(changes.items().iter().any(|u| u.id == 7), "delta missed new user");
        Ok(())
    })
}

fn negotiated_text(client: UserServiceClient, _: AppState) -> TestFuture {
    Box::pin(async move {
        ensure!(client.health().await? == "ok");
        Ok(())
    })
}

fn body_limit(client: UserServiceClient, _: AppState) -> TestFuture {
    Box::pin(async move {
        let tiny = UserServiceClient::with_options(
            client.base_url(),
            EnvelopeOptions::new().max_body_bytes(8),
        );
        match tiny.get_user(1).await {
            Err(ClientError::Transport(TransportError::BodyTooLarge { limit: 8 })) => Ok(()),
            other => anyhow::bail!("expected body limit error, got {other:?}"),
        }
    })
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "classic get",
        run: classic_get,
    },
    Scenario {
        name: "envelope get",
        run: envelope_get,
    },
    Scenario {
        name: "not found",
        run: not_found,
    },
    Scenario {
        name: "delete no content",
        run: delete_no_content,
    },
    Scenario {
        name: "paging",
        run: paging,
    },
    Scenario {
        name: "negotiated text",
        run: negotiated_text,
    },
    Scenario {
        name: "body limit",
        run: body_limit,
    },
];

async fn run_scenario(scenario: &Scenario) -> TestResult {
    let start = Instant::now();
    let state = AppState::seeded();
    let result = match start_server(state.clone()).await {
        Ok(url) => (scenario.run)(UserServiceClient::new(url), state).await,
        Err(e) => Err(e),
    };
    TestResult {
        name: scenario.name,
        passed: result.is_ok(),
        duration: start.elapsed(),
        output: result.err().map(|e| format!("{e:#}")).unwrap_or_default(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let filter = args
        .iter()
        .position(|a| a == "--filter")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    println!(
        "{}{}=== response-envelope integration tests ==={}",
        colors::BOLD,
        colors::CYAN,
        colors::RESET
    );
    println!();

    let mut results = Vec::new();
    for scenario in SCENARIOS {
        if filter.is_some_and(|f| !scenario.name.contains(f)) {
            continue;
        }
        let result = run_scenario(scenario).await;
        if result.passed {
            println!(
                "  {}PASS{} {} ({:?})",
                colors::GREEN,
                colors::RESET,
                result.name,
                result.duration
            );
        } else {
            println!(
                "  {}FAIL{} {} ({:?})",
                colors::RED,
                colors::RESET,
                result.name,
                result.duration
            );
            println!("       {}", result.output);
        }
        results.push(result);
    }

    let failed = results.iter().filter(|r| !r.passed).count();
    println!();
    println!(
        "{}{} passed, {} failed{}",
        colors::BOLD,
        results.len() - failed,
        failed,
        colors::RESET
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
