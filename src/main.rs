use std::error::Error as StdError;
use std::io;

use clap::{CommandFactory, Parser};
use nu_ansi_term::Color;
use reedline::{FileBackedHistory, Reedline, Signal};
use tracing::info;

use tablesmith::auth::CredentialStore;
use tablesmith::cli::{Args, Shell};
use tablesmith::commands::{CommandContext, CommandRegistry};
use tablesmith::config::Config;
use tablesmith::prompt::ShellPrompt;
use tablesmith::{database, logging, SqlAssistant};

fn main() -> Result<(), Box<dyn StdError>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async_main());
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));
    result
}

async fn async_main() -> Result<(), Box<dyn StdError>> {
    let args = Args::parse();

    // Handle shell completion generation if requested
    if let Some(shell) = args.completions {
        let mut cmd = Args::command();
        match shell {
            Shell::Bash => clap_complete::generate(
                clap_complete::shells::Bash,
                &mut cmd,
                "tablesmith",
                &mut io::stdout(),
            ),
            Shell::Zsh => clap_complete::generate(
                clap_complete::shells::Zsh,
                &mut cmd,
                "tablesmith",
                &mut io::stdout(),
            ),
            Shell::Fish => clap_complete::generate(
                clap_complete::shells::Fish,
                &mut cmd,
                "tablesmith",
                &mut io::stdout(),
            ),
            Shell::PowerShell => clap_complete::generate(
                clap_complete::shells::PowerShell,
                &mut cmd,
                "tablesmith",
                &mut io::stdout(),
            ),
            Shell::Elvish => clap_complete::generate(
                clap_complete::shells::Elvish,
                &mut cmd,
                "tablesmith",
                &mut io::stdout(),
            ),
        }
        return Ok(());
    }

    let config = Config::load();
    logging::init(config.log_level);

    let user = login(&args, &config)?;
    info!(user = %user.username, "authenticated");

    let connection_url = args
        .connection_url
        .clone()
        .or_else(|| config.database_url.clone())
        .ok_or("Connection URL is required. Pass it as an argument or set database_url in the config file.")?;

    let url = database::normalize_url(&connection_url)?;
    let db_name = url.path().trim_start_matches('/').to_string();

    let pool = database::connect(&connection_url).await.map_err(|e| {
        eprintln!("Failed to connect to database: {e}");
        e
    })?;
    println!("✓ Successfully connected to database");

    // The assistant either comes up with a working model or the run ends
    // here; there is no AI-disabled mode.
    let assistant = SqlAssistant::new(&config.ai).map_err(|e| {
        eprintln!("{}", e.user_message());
        e
    })?;

    let ctx = CommandContext::new(pool, &config, assistant);
    let registry = CommandRegistry::new();

    // -c commands: execute and exit
    if !args.command.is_empty() {
        for command in &args.command {
            let trimmed = command.trim();
            if trimmed.is_empty() {
                continue;
            }
            if registry.execute(trimmed, &ctx).await? {
                break;
            }
        }
        ctx.assistant.shutdown();
        return Ok(());
    }

    run_interactive(ctx, registry, user.username, db_name).await
}

/// Authenticate against the XML credential list before anything touches the
/// database. Missing arguments are prompted for.
fn login(args: &Args, config: &Config) -> Result<tablesmith::auth::User, Box<dyn StdError>> {
    let store = CredentialStore::load(&config.users_file)?;

    let username = match args.username.clone() {
        Some(username) => username,
        None => inquire::Text::new("Username:").prompt()?,
    };
    let password = match args.password.clone() {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };

    store
        .authenticate(&username, &password)
        .ok_or_else(|| "Authentication failed".into())
}

async fn run_interactive(
    ctx: CommandContext,
    registry: CommandRegistry,
    username: String,
    db_name: String,
) -> Result<(), Box<dyn StdError>> {
    let history_path = Config::get_config_directory().map(|dir| dir.join("history"))?;
    let history = Box::new(match FileBackedHistory::with_file(1000, history_path) {
        Ok(history) => history,
        Err(e) => {
            eprintln!("Warning: Could not create history file: {e}");
            FileBackedHistory::default()
        }
    });

    let mut line_editor = Reedline::create().with_history(history);
    let prompt = ShellPrompt::new(username, db_name);

    println!("{}", Color::Cyan.paint("tablesmith — type \\h for help"));

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(input) => {
                let input_trimmed = input.trim();
                if input_trimmed.is_empty() {
                    continue;
                }

                if input_trimmed.starts_with('\\') {
                    match registry.execute(input_trimmed, &ctx).await {
                        Ok(should_exit) => {
                            if should_exit {
                                break;
                            }
                        }
                        Err(e) => eprintln!("Error executing command: {e}"),
                    }
                } else {
                    eprintln!("Commands start with a backslash. Type \\h for help.");
                }
            }
            Signal::CtrlC => {
                println!("^C");
                continue;
            }
            Signal::CtrlD => {
                println!("\nGoodbye!");
                break;
            }
        }
    }

    ctx.assistant.shutdown();
    Ok(())
}
