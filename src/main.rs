mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
};
use tracing::{debug, info, warn};

use typecoach::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    exercise::{find_lesson, Lesson, LESSONS},
    export::{write_history_csv, FREE_PRACTICE_LABEL},
    logging, metrics,
    runtime::{Runner, TerminalEvents, TutorEvent},
    util::{format_duration, key_label, mean},
    Exercise, KeyClock, ProgressStore, SessionRecorder, TutorError, TypingPolicy, TypingSession,
};

/// typing tutor with per-key error tracking and session history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Practice typing against built-in lessons or your own text. Every finished session is saved with its speed, accuracy and missed keys, and the stats command shows trends and problem keys."
)]
pub struct Cli {
    /// progress file to use instead of the default location
    #[clap(long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// increase log verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[clap(flatten)]
    practice: PracticeArgs,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PracticeArgs {
    /// custom text to practice (free practice)
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// built-in lesson to draw texts from
    #[clap(short = 'l', long, conflicts_with = "prompt")]
    lesson: Option<String>,

    /// enable strict mode: mistakes must be corrected before moving on
    #[clap(long)]
    strict: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// print summary, recent trend, lesson averages and problem keys
    Stats,
    /// write the session history as CSV
    Export {
        /// destination file
        file: PathBuf,
    },
    /// list the built-in lessons
    Lessons,
}

/// Where the next exercise comes from
#[derive(Debug, Clone)]
pub enum ExerciseSource {
    Custom(String),
    Lesson(&'static Lesson),
}

impl ExerciseSource {
    fn next_exercise(&self) -> Result<Exercise, TutorError> {
        match self {
            ExerciseSource::Custom(text) => Exercise::free(text.clone()),
            ExerciseSource::Lesson(lesson) => lesson.exercise(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Typing,
    Results,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Saved,
    Failed(String),
}

#[derive(Debug)]
pub struct App {
    pub config: Config,
    pub policy: TypingPolicy,
    pub source: ExerciseSource,
    pub exercise: Exercise,
    pub recorder: SessionRecorder,
    pub store: ProgressStore,
    pub state: AppState,
    pub last_result: Option<TypingSession>,
    pub save_status: Option<SaveStatus>,
    // Finished session whose save failed, kept for a manual retry
    unsaved: Option<TypingSession>,
    clock: KeyClock,
}

impl App {
    pub fn new(
        config: Config,
        policy: TypingPolicy,
        source: ExerciseSource,
        store: ProgressStore,
    ) -> Result<Self, TutorError> {
        let exercise = source.next_exercise()?;
        Ok(Self {
            config,
            policy,
            source,
            recorder: SessionRecorder::new(exercise.clone(), policy),
            exercise,
            store,
            state: AppState::Typing,
            last_result: None,
            save_status: None,
            unsaved: None,
            clock: KeyClock::new(),
        })
    }

    /// Start over, on the same text when `new_text` is false.
    pub fn reset(&mut self, new_text: bool) -> Result<(), TutorError> {
        if new_text {
            self.exercise = self.source.next_exercise()?;
        }
        self.recorder = SessionRecorder::new(self.exercise.clone(), self.policy);
        self.clock = KeyClock::new();
        self.state = AppState::Typing;
        Ok(())
    }

    /// Returns false once the user asked to quit.
    pub fn on_key(&mut self, key: KeyEvent) -> Result<bool, TutorError> {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return Ok(false);
        }

        match self.state {
            AppState::Typing => match key.code {
                KeyCode::Backspace => {
                    self.recorder.backspace();
                }
                KeyCode::Enter => self.on_char('\n'),
                KeyCode::Tab => self.on_char('\t'),
                KeyCode::Char(c) => self.on_char(c),
                _ => {}
            },
            AppState::Results => match key.code {
                KeyCode::Char('r') => self.reset(false)?,
                KeyCode::Char('n') => self.reset(true)?,
                KeyCode::Char('s') => self.retry_save(),
                _ => {}
            },
        }
        Ok(true)
    }

    fn on_char(&mut self, c: char) {
        if let Err(e) = self.recorder.handle_keystroke(self.clock.stamp(c)) {
            warn!(error = %e, "keystroke rejected");
            return;
        }
        if self.recorder.has_finished() {
            self.complete();
        }
    }

    fn complete(&mut self) {
        let done = std::mem::replace(
            &mut self.recorder,
            SessionRecorder::new(self.exercise.clone(), self.policy),
        );
        match done.finalize() {
            Ok(session) => {
                self.last_result = Some(session.clone());
                self.save(session);
                self.state = AppState::Results;
            }
            Err(e) => warn!(error = %e, "could not finalize session"),
        }
    }

    fn save(&mut self, session: TypingSession) {
        match self.store.append(session.clone()) {
            Ok(()) => {
                self.unsaved = None;
                self.save_status = Some(SaveStatus::Saved);
            }
            Err(e) => {
                warn!(
                    path = %self.store.path().display(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "session not saved"
                );
                if e.is_retryable() {
                    self.unsaved = Some(session);
                }
                self.save_status = Some(SaveStatus::Failed(e.to_string()));
            }
        }
    }

    pub fn retry_save(&mut self) {
        if let Some(session) = self.unsaved.take() {
            self.save(session);
        }
    }

    pub fn has_unsaved(&self) -> bool {
        self.unsaved.is_some()
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("typecoach: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let data_path = cli
        .data
        .clone()
        .or_else(AppDirs::progress_path)
        .unwrap_or_else(|| PathBuf::from("typecoach_progress.json"));

    match cli.command {
        Some(Command::Stats) => {
            logging::init_stderr(cli.verbose);
            let config = load_config();
            let store = ProgressStore::load(&data_path)?;
            print_stats(&store, &config);
            Ok(())
        }
        Some(Command::Export { ref file }) => {
            logging::init_stderr(cli.verbose);
            let store = ProgressStore::load(&data_path)?;
            let rows = write_history_csv(&store, File::create(file)?)?;
            println!("Exported {} sessions to {}", rows, file.display());
            Ok(())
        }
        Some(Command::Lessons) => {
            for lesson in LESSONS {
                println!("{:<12} {}", lesson.id, lesson.title);
            }
            Ok(())
        }
        None => practice(&cli, data_path),
    }
}

fn practice(cli: &Cli, data_path: PathBuf) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    logging::init_file(cli.verbose, &data_path.with_file_name("typecoach.log"));

    let config = load_config();
    let policy = TypingPolicy::from_strict(cli.practice.strict || config.strict);
    let source = match (&cli.practice.prompt, &cli.practice.lesson) {
        (Some(text), _) => ExerciseSource::Custom(text.clone()),
        (None, Some(id)) => ExerciseSource::Lesson(
            find_lesson(id).ok_or_else(|| TutorError::invalid(format!("unknown lesson: {id}")))?,
        ),
        (None, None) => ExerciseSource::Lesson(&LESSONS[0]),
    };

    // Load before touching the terminal so a corrupt file is reported plainly
    let store = ProgressStore::load(&data_path)?;
    let mut app = App::new(config, policy, source, store)?;
    info!(path = %data_path.display(), strict = policy.is_strict(), "starting practice");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::with_default_tick(TerminalEvents::new());

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            // Redraw keeps the live wpm moving
            TutorEvent::Tick | TutorEvent::Resize => {}
            TutorEvent::Key(key) => {
                if !app.on_key(key)? {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn load_config() -> Config {
    let store = FileConfigStore::new();
    let config = store.load();
    debug!(path = %store.path().display(), "configuration loaded");
    config
}

fn lesson_label(lesson: Option<&str>) -> &str {
    lesson.unwrap_or(FREE_PRACTICE_LABEL)
}

fn print_stats(store: &ProgressStore, config: &Config) {
    if store.is_empty() {
        println!("No sessions recorded yet.");
        return;
    }

    let summary = metrics::summary(store);
    println!("Sessions:         {}", summary.total_sessions);
    println!("Practice time:    {}", format_duration(summary.total_secs));
    println!("Characters:       {}", summary.total_chars);
    println!(
        "Average:          {:.1} wpm (sd {:.1}), {:.1}% accuracy",
        summary.average_wpm,
        summary.wpm_std_dev,
        summary.average_accuracy * 100.0
    );
    let history = store.history();
    let adjusted_wpm: Vec<f64> = history.iter().map(|s| config.adjusted_wpm(s)).collect();
    let adjusted_acc: Vec<f64> = history.iter().map(|s| config.adjusted_accuracy(s)).collect();
    println!(
        "Adjusted:         {:.1} wpm, {:.1}% accuracy ({} wpm and {} errors per backspace)",
        mean(&adjusted_wpm).unwrap_or(0.0),
        mean(&adjusted_acc).unwrap_or(0.0) * 100.0,
        config.backspace_penalty,
        config.backspace_accuracy_weight
    );
    println!("Backspaces:       {}", summary.total_backspaces);
    println!("Practice days:    {}", summary.practice_days);
    if let Some(best) = &summary.best_wpm {
        println!(
            "Best speed:       {:.1} wpm ({}, {})",
            best.wpm(),
            lesson_label(best.lesson.as_deref()),
            best.started_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        );
    }
    if let Some(best) = &summary.best_accuracy {
        println!("Best accuracy:    {:.1}%", best.accuracy_percent());
    }
    if let Some((lesson, count)) = &summary.most_practiced {
        println!(
            "Most practiced:   {} ({} times)",
            lesson_label(lesson.as_deref()),
            count
        );
    }
    if let Some(weak) = &summary.weakest_lesson {
        println!(
            "Needs practice:   {} (avg {:.0} wpm)",
            lesson_label(weak.lesson.as_deref()),
            weak.average_wpm
        );
    }

    println!();
    println!("Recent trend (oldest first):");
    for point in metrics::recent_trend(store, config.trend_window) {
        println!("  {:>6.1} wpm  {:>5.1}%", point.wpm, point.accuracy * 100.0);
    }

    println!();
    println!("Lessons by average speed:");
    for avg in metrics::per_lesson_averages(store) {
        println!(
            "  {:<16} {:>6.1} wpm  {} sessions, last {}",
            lesson_label(avg.lesson.as_deref()),
            avg.average_wpm,
            avg.sessions,
            avg.last_practiced
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default()
        );
    }

    let keys = metrics::top_problem_keys(store, config.top_keys);
    if !keys.is_empty() {
        println!();
        println!("Problem keys:");
        for (key, count) in keys {
            println!("  {:<6} {}", key_label(key), count);
        }

        println!();
        println!("Errors by finger:");
        for (finger, count) in metrics::finger_errors(store) {
            println!("  {:<13} {}", finger.to_string(), count);
        }
    }
}
