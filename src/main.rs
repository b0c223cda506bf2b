use std::io::Write;

use commbot::cli::{self, Command};
use commbot::{
    AskResponse, Authenticator, BackendClient, ChatBackend, ChatId, ClientError, Config, FileStore,
    LoadOutcome, PendingSend, SendOutcome, SessionManager,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::{JoinError, JoinHandle};

type Session = SessionManager<BackendClient, FileStore>;
type AskTask = (PendingSend, JoinHandle<Result<AskResponse, ClientError>>);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging()?;

    let config = Config::from_env()?;
    let store = FileStore::open(&config.state_file)?;
    let backend = BackendClient::new(&config)?;
    tracing::info!("State file: {}", store.path().display());

    let auth = Authenticator::new(backend.clone(), store.clone());
    let mut session = SessionManager::new(backend, store);

    println!("💬 CommBot - type `help` for commands");
    restore(&mut session).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut waiting: Option<AskTask> = None;

    loop {
        print_prompt(&session);

        tokio::select! {
            finished = wait_for_answer(&mut waiting) => {
                if let Some((pending, _)) = waiting.take() {
                    let result = finished.unwrap_or_else(|e| Err(ClientError::Http(e.to_string())));
                    println!();
                    match session.complete_send(pending, result).await {
                        Ok(SendOutcome::Answered(message)) => println!("{}", cli::render_message(&message)),
                        Ok(SendOutcome::Stale { chat_id }) => {
                            println!("(an answer arrived for chat {}; open it to read)", chat_id)
                        }
                        Err(e) => eprintln!("❌ {}", e),
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match Command::parse(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("❌ {}", e);
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }
                handle(command, &auth, &mut session, &mut waiting).await;
            }
        }
    }

    if let Some((_, handle)) = waiting.take() {
        handle.abort();
    }
    println!("Bye 👋");
    Ok(())
}

async fn wait_for_answer(task: &mut Option<AskTask>) -> Result<Result<AskResponse, ClientError>, JoinError> {
    match task {
        Some((_, handle)) => handle.await,
        None => std::future::pending().await,
    }
}

fn print_prompt(session: &Session) {
    if session.is_typing() {
        print!("(bot is typing…) ");
    }
    let title = session.active_chat().map(|c| c.title.as_str()).unwrap_or("no chat");
    print!("[{}]> ", title);
    let _ = std::io::stdout().flush();
}

async fn restore(session: &mut Session) {
    match session.load().await {
        Ok(LoadOutcome::Unauthenticated) => {
            println!("Not logged in. Use `login <email>` or `signup <email>`.");
        }
        Ok(LoadOutcome::Ready) => show(session),
        Err(e) => eprintln!("❌ Could not load chats: {}", e),
    }
}

fn show(session: &Session) {
    println!("{}", cli::render_chats(session.chats(), session.active_chat_id()));
    if session.active_chat_id().is_some() {
        println!("----");
        let log = cli::render_log(session.messages());
        if !log.is_empty() {
            println!("{}", log);
        }
    }
    let staged = cli::render_attachments(session.files(), session.urls());
    if !staged.is_empty() {
        println!("{}", staged);
    }
}

async fn read_password() -> std::io::Result<String> {
    tokio::task::spawn_blocking(|| rpassword::prompt_password("Password: "))
        .await
        .map_err(std::io::Error::other)?
}

fn chat_at(session: &Session, index: usize) -> Option<ChatId> {
    let chat = session.chats().get(index).map(|c| c.id);
    if chat.is_none() {
        eprintln!("❌ No chat number {}", index + 1);
    }
    chat
}

fn report<T, E: std::fmt::Display>(result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!("❌ {}", e);
            None
        }
    }
}

async fn handle(
    command: Command,
    auth: &Authenticator<BackendClient, FileStore>,
    session: &mut Session,
    waiting: &mut Option<AskTask>,
) {
    match command {
        Command::Empty | Command::Quit => {}
        Command::Help => println!("{}", cli::HELP),
        Command::Login { email } => {
            let Some(password) = report(read_password().await) else { return };
            if report(auth.login(&email, &password).await).is_some() {
                restore(session).await;
            }
        }
        Command::Signup { email } => {
            let Some(password) = report(read_password().await) else { return };
            if report(auth.signup(&email, &password).await).is_some() {
                println!("✅ Account created. Log in with `login {}`.", email);
            }
        }
        Command::Logout => {
            report(session.logout());
        }
        Command::Chats | Command::Show => show(session),
        Command::New => {
            if report(session.new_chat().await).is_some() {
                show(session);
            }
        }
        Command::Open(index) => {
            let Some(chat_id) = chat_at(session, index) else { return };
            if report(session.select_chat(chat_id).await).is_some() {
                show(session);
            }
        }
        Command::Delete(index) => {
            let Some(chat_id) = chat_at(session, index) else { return };
            if report(session.delete_chat(chat_id).await).is_some() {
                show(session);
            }
        }
        Command::Rename { index, title } => {
            let Some(chat_id) = chat_at(session, index) else { return };
            report(session.rename_chat(chat_id, &title).await);
        }
        Command::Attach(path) => {
            if report(session.add_file_from_path(&path).await).is_some() {
                println!("{}", cli::render_attachments(session.files(), session.urls()));
            }
        }
        Command::Detach(index) => match session.remove_file(index) {
            Some(file) => println!("Removed {}", file.name),
            None => eprintln!("❌ No file number {}", index + 1),
        },
        Command::Url(url) => {
            session.set_url_draft(url);
            if !session.commit_url_draft() {
                println!("Already attached");
            }
        }
        Command::Unurl(index) => match session.remove_url(index) {
            Some(url) => println!("Removed {}", url),
            None => eprintln!("❌ No URL number {}", index + 1),
        },
        Command::Send(text) => {
            session.set_draft(text);
            match session.begin_send().await {
                Ok(Some(pending)) => {
                    let backend = session.backend().clone();
                    let request = pending.request().clone();
                    let handle = tokio::spawn(async move { backend.ask(&request).await });
                    *waiting = Some((pending, handle));
                }
                Ok(None) => println!("Open a chat first (`new` or `open <n>`)."),
                Err(e) => eprintln!("❌ {}", e),
            }
        }
    }
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Get log level from environment; the shell owns stdout so logs stay quiet by default
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,commbot=trace,reqwest=info,hyper=info".to_string()
        } else {
            "warn,commbot=info,reqwest=warn,hyper=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();

    tracing::info!("CommBot client starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Log level: {}", log_level);
    Ok(())
}
