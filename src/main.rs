// SPDX-License-Identifier: MPL-2.0

use clap::{Parser, Subcommand};
use inkdrop::api::{LeaderboardPeriod, SessionFilters};
use inkdrop::config::APP_NAME;
use inkdrop::runtime::block_on;
use inkdrop::state::{ChatTheme, FontSize};
use inkdrop::{App, AppError, Config};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "inkdrop", version, about = "Reading sessions and streaks from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session on this device
    Login { email: String, password: String },
    /// Create an account
    Register {
        username: String,
        email: String,
        password: String,
    },
    Logout,
    Whoami,
    /// Show the current streak
    Streak,
    /// Check in for today
    CheckIn,
    /// Restore a lapsed streak with ink drops
    Restore,
    /// Show today's reading challenge
    Challenge,
    Leaderboard {
        #[arg(default_value = "weekly")]
        period: LeaderboardPeriod,
    },
    /// List past reading sessions
    Sessions {
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        book: Option<String>,
        /// Follow pagination to the end
        #[arg(long)]
        all: bool,
    },
    Stats {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Time a reading session interactively
    Read {
        book_id: String,
        bookshelf_item_id: String,
        start_page: u32,
    },
    /// Show or change chat appearance
    Prefs {
        #[arg(long)]
        theme: Option<ChatTheme>,
        #[arg(long)]
        scale: Option<f64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{APP_NAME}: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_filter.clone()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{APP_NAME}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(&app, cli.command);
    print_notifications(&app);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn run(app: &App, command: Command) -> Result<(), AppError> {
    match command {
        Command::Login { email, password } => {
            block_on(app.sign_in(&email, &password))?;
            return Ok(());
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            block_on(app.sign_up(&username, &email, &password))?;
            return Ok(());
        }
        Command::Prefs { theme, scale } => return prefs(app, theme, scale),
        _ => {}
    }

    if !block_on(app.restore_session()) {
        println!("Not signed in. Run `inkdrop login <email> <password>` first.");
        return Err(AppError::NotSignedIn);
    }

    match command {
        Command::Logout => app.sign_out(),
        Command::Whoami => {
            if let Some(user) = app.auth.snapshot().user {
                println!("{} <{}>", user.display_name(), user.email);
                println!("Ink drops: {}", user.ink_drops);
            }
        }
        Command::Streak => print_streak(app),
        Command::CheckIn => {
            block_on(app.check_in())?;
            print_streak(app);
        }
        Command::Restore => {
            block_on(app.restore_streak())?;
            print_streak(app);
        }
        Command::Challenge => match block_on(app.streak.fetch_today_challenge())? {
            Some(c) => {
                let status = if c.completed { "done" } else { "open" };
                println!("{} [{status}] {}/{}", c.title, c.progress, c.target);
                if let Some(description) = c.description {
                    println!("  {description}");
                }
                println!("  Reward: {} ink drops", c.reward);
            }
            None => println!("No challenge today"),
        },
        Command::Leaderboard { period } => {
            for entry in block_on(app.streak.fetch_leaderboard(period))? {
                println!(
                    "{:>3}. {:<24} {} days",
                    entry.rank, entry.username, entry.current_streak
                );
            }
        }
        Command::Sessions { limit, book, all } => {
            let filters = SessionFilters {
                book_id: book,
                ..SessionFilters::with_limit(limit)
            };
            block_on(app.sessions.fetch_sessions(filters, false))?;
            while all && block_on(app.sessions.load_more())? {}

            let state = app.sessions.snapshot();
            for session in &state.history {
                let when = session.start_time.format("%Y-%m-%d %H:%M");
                if !session.is_finished() {
                    println!("{when}  {}  from page {}  (in progress)", session.book_id, session.start_page);
                    continue;
                }
                println!(
                    "{when}  {}  pages {}-{}  {} min",
                    session.book_id,
                    session.start_page,
                    session.end_page.map_or("?".to_string(), |p| p.to_string()),
                    session.duration.unwrap_or(0) / 60
                );
            }
            println!("{} of {} sessions", state.history.len(), state.pagination.total);
        }
        Command::Stats { days } => {
            block_on(async {
                tokio::join!(
                    app.sessions.fetch_overall_stats(),
                    app.sessions.fetch_daily_stats(days)
                )
            });
            let state = app.sessions.snapshot();
            if let Some(o) = state.overall {
                println!(
                    "{} sessions, {} pages, {} min, {} ink drops",
                    o.total_sessions,
                    o.total_pages_read,
                    o.total_reading_time / 60,
                    o.total_ink_drops_earned
                );
            }
            for day in state.daily {
                println!("{}  {} pages  {} min", day.date, day.pages_read, day.reading_time / 60);
            }
        }
        Command::Read {
            book_id,
            bookshelf_item_id,
            start_page,
        } => read(app, &book_id, &bookshelf_item_id, start_page)?,
        Command::Login { .. } | Command::Register { .. } | Command::Prefs { .. } => {}
    }
    Ok(())
}

fn print_streak(app: &App) {
    let state = app.streak.snapshot();
    match state.view.current() {
        Some(streak) => {
            println!(
                "Current streak: {} days (longest {})",
                streak.current_streak, streak.longest_streak
            );
            if let Some(target) = streak.milestones.next_target() {
                println!("Next milestone: {target} days");
            }
            if streak.can_restore {
                println!("A lapsed streak can be restored with `inkdrop restore`");
            }
        }
        None => println!("Streak unavailable"),
    }
}

/// Line-driven session timer: `pause <seconds>`, `end <page>`, `quit`.
fn read(app: &App, book_id: &str, bookshelf_item_id: &str, start_page: u32) -> Result<(), AppError> {
    block_on(app.sessions.start_session(book_id, bookshelf_item_id, start_page))?;
    println!("Reading from page {start_page}. Commands: pause <seconds>, end <page>, quit");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        match (words.next(), words.next().map(str::parse::<f64>)) {
            (Some("pause"), Some(Ok(secs))) if secs >= 0.0 && secs.is_finite() => {
                app.sessions.record_pause(Duration::from_secs_f64(secs));
                println!("Pause recorded");
            }
            (Some("end"), Some(Ok(page))) if page >= 0.0 => {
                block_on(app.finish_session(page as u32))?;
                return Ok(());
            }
            (Some("quit"), _) => {
                app.sessions.cancel_pending();
                println!("Session left open");
                return Ok(());
            }
            _ => println!("Commands: pause <seconds>, end <page>, quit"),
        }
        print_notifications(app);
        let _ = io::stdout().flush();
    }
    Ok(())
}

fn prefs(app: &App, theme: Option<ChatTheme>, scale: Option<f64>) -> Result<(), AppError> {
    let mut prefs = app.chat_preferences();
    if theme.is_some() || scale.is_some() {
        if let Some(theme) = theme {
            prefs.theme = theme;
        }
        if let Some(scale) = scale {
            prefs.text_scale = FontSize::snapped(scale);
        }
        app.save_chat_preferences(&prefs)?;
    }
    println!(
        "Theme: {}  Text size: {} ({:.2}x)",
        prefs.theme,
        prefs.text_scale.label(),
        prefs.text_scale.scale_factor()
    );
    Ok(())
}

/// Drain toasts and alerts to the terminal.
fn print_notifications(app: &App) {
    for toast in app.toasts.visible() {
        println!("{}", toast.message);
        app.toasts.dismiss(toast.id);
    }
    while let Some(alert) = app.alerts.current() {
        eprintln!("{}: {}", alert.title, alert.message);
        app.alerts.dismiss();
    }
}
