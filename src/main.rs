use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use palette_core::app::config::EngineConfig;
use palette_core::app::palette::Palette;
use palette_core::app::persistence::{get_recent_path, load_recent_commands, save_recent_commands};
use palette_core::app::r#loop::{spawn_sync, SyncSettings};
use palette_core::app::state::{CountdownState, PaletteSession};
use palette_core::domain::models::{ActionResult, AuthContext};
use palette_core::infrastructure::memory::{InMemoryWorkspace, RoleAuthorizer};

fn setup_tracing() {
    // Logs go to stderr so they do not interleave with palette output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn current_user() -> AuthContext {
    let user = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
    let roles = std::env::var("PALETTE_ROLES").unwrap_or_else(|_| "member".to_string());
    let roles: Vec<&str> = roles.split(',').map(str::trim).filter(|r| !r.is_empty()).collect();
    AuthContext::new(user, &roles)
}

fn print_result(result: &ActionResult) {
    let status = if result.ok { "ok" } else { "err" };
    println!("[{status}] {}", result.message);
    if let Some(target) = &result.navigate {
        println!("  -> {target}");
    }
    for suggestion in &result.suggestions {
        println!("  ? {suggestion}");
    }
}

fn format_countdown(state: &CountdownState) -> String {
    if state.is_active {
        format!(
            "Timer: {:02}:{:02}",
            state.time_left_seconds / 60,
            state.time_left_seconds % 60
        )
    } else {
        "Timer: aus".to_string()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let config = EngineConfig::load()?;
    let workspace = Arc::new(InMemoryWorkspace::new());
    let palette = Palette::from_config(&config, workspace.clone(), Arc::new(RoleAuthorizer::default()))?;
    let auth = current_user();

    let recent_path = get_recent_path();
    let recent = recent_path
        .as_deref()
        .map(load_recent_commands)
        .unwrap_or_default();
    let mut session = PaletteSession::with_recent(recent);

    let sync = spawn_sync(
        workspace,
        SyncSettings {
            poll_interval: config.poll_interval(),
            tick_rate: config.tick(),
        },
    );

    // Full minutes and on/off flips only, so the prompt stays readable.
    let mut countdown = sync.countdown.clone();
    let mut expired = sync.subscribe_expired();
    let printer = tokio::spawn(async move {
        let mut last = CountdownState::default();
        loop {
            tokio::select! {
                changed = countdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *countdown.borrow_and_update();
                    if state.is_active != last.is_active
                        || (state.is_active && state.time_left_seconds % 60 == 0)
                    {
                        println!("{}", format_countdown(&state));
                    }
                    last = state;
                }
                Ok(()) = expired.recv() => println!("Timer abgelaufen."),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            ":q" => break,
            ":help" => {
                for pattern in palette.registry().all() {
                    println!("{:<40} {}", pattern.phrase(), pattern.description);
                }
                continue;
            }
            ":recent" => {
                for (i, input) in session.recent().iter().enumerate() {
                    println!("{i}: {input}");
                }
                continue;
            }
            _ => {}
        }

        session.open();
        if let Some(index) = line.strip_prefix(":!") {
            let recalled = index.trim().parse::<usize>().is_ok_and(|i| session.recall(i));
            if !recalled {
                println!("[err] kein Eintrag {index}");
                continue;
            }
        } else {
            session.update_input(line);
        }

        let result = session.execute(&palette, &auth).await;
        print_result(&result);
    }

    if let Some(path) = recent_path {
        save_recent_commands(&path, session.recent());
    }
    printer.abort();
    sync.shutdown().await?;
    Ok(())
}
