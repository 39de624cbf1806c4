//! survey-runner: headless driver for the survey core.
//!
//! Usage:
//!   survey-runner [status|plans|surveys|events|complete <id>|withdraw] --data-dir ./data --db progress.db
//!   survey-runner --ipc-mode --db progress.db

use anyhow::Result;
use survey_core::{
    completion::AnswerSheet,
    config::{DataDirSource, SessionOptions},
    error::SurveyError,
    progress::ReferralRecord,
    scheduler::{ScheduledCompletion, TaskHandle},
    session::SurveySession,
    store::SurveyStore,
    types::{Day, Millis},
};
use std::env;
use std::io::{self, BufRead, Write};

/// Flags that consume the following argument.
const VALUE_FLAGS: &[&str] = &["--data-dir", "--db", "--day", "--seed"];

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Complete {
        survey_id: String,
        #[serde(default)]
        answers:   Option<AnswerSheet>,
    },
    Start {
        survey_id: String,
    },
    Cancel {
        task_id: u64,
    },
    Advance {
        ms: Millis,
    },
    EnterDay {
        day: Day,
    },
    Withdraw,
    Teardown,
    Quit,
}

#[derive(serde::Serialize)]
struct SurveyRow {
    id:              String,
    title:           String,
    category:        String,
    reward:          f64,
    required_plan:   String,
    question_count:  usize,
    times_completed: usize,
}

#[derive(serde::Serialize, Default)]
struct UiState {
    catalog_ready:           bool,
    progress_ready:          bool,
    now:                     Millis,
    plan:                    Option<String>,
    daily_quota:             u32,
    surveys_completed_today: u32,
    remaining_quota:         u32,
    total_earnings:          f64,
    pending_earnings:        f64,
    withdrawal_ready:        bool,
    available:               Vec<SurveyRow>,
    pending:                 Vec<ScheduledCompletion>,
    referrals:               Option<ReferralRecord>,
    revision:                u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let cancel_on_teardown = args.iter().any(|a| a == "--cancel-on-teardown");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let day = flag_value(&args, "--day")
        .and_then(|d| d.parse::<Day>().ok())
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let store = SurveyStore::open(db)?;
    store.migrate()?;

    let options = SessionOptions {
        seed,
        cancel_on_teardown,
        ..SessionOptions::default()
    };
    let mut session = SurveySession::open(store, &DataDirSource::new(data_dir), options)?;

    if !session.catalog_ready() {
        // Render the unavailable state rather than guessing.
        if let Err(e) = session.catalog() {
            eprintln!("Catalog unavailable: {e}");
        }
        if ipc_mode {
            println!("{}", serde_json::to_string(&build_ui_state(&session, 0))?);
        }
        std::process::exit(2);
    }

    session.enter_day(day)?;

    if ipc_mode {
        return run_ipc_loop(&mut session);
    }

    let positional = positional_args(&args);
    match positional.as_slice() {
        [] | ["status"] => print_status(&session, day)?,
        ["plans"] => print_plans(&session)?,
        ["surveys"] => print_surveys(&session)?,
        ["events"] => print_events(&session)?,
        ["complete", survey_id] => match session.complete(survey_id) {
            Ok(r) => println!(
                "Completed {} (+{:.0}). {} left today.",
                r.survey_id, r.reward, r.remaining_quota
            ),
            Err(e) if e.is_rejection() => println!("Rejected: {e}"),
            Err(e) => return Err(e.into()),
        },
        ["withdraw"] => match session.request_withdrawal() {
            Ok(n) => println!(
                "Withdrawal of {:.0} requested on {}. You will be contacted to confirm.",
                n.pending, n.plan
            ),
            Err(e) if e.is_rejection() => println!("Rejected: {e}"),
            Err(e) => return Err(e.into()),
        },
        other => {
            log::warn!("Unknown command: {}", other.join(" "));
            eprintln!("Unknown command: {}", other.join(" "));
            std::process::exit(1);
        }
    }

    Ok(())
}

fn run_ipc_loop(session: &mut SurveySession) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mut now: Millis = 0;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => Ok(serde_json::Value::Null),
            IpcCommand::Complete { survey_id, answers } => {
                let result = match answers {
                    Some(sheet) => session.submit(&survey_id, &sheet),
                    None => session.complete(&survey_id),
                };
                result.map(|r| serde_json::json!({ "receipt": r }))
            }
            IpcCommand::Start { survey_id } => session
                .start_survey(&survey_id, now)
                .map(|t| serde_json::json!({ "scheduled": t })),
            IpcCommand::Cancel { task_id } => session
                .cancel(TaskHandle(task_id))
                .map(|c| serde_json::json!({ "cancelled": c })),
            IpcCommand::Advance { ms } => {
                now = now.saturating_add(ms);
                session.poll(now).map(|outcomes| {
                    let fired: Vec<_> = outcomes
                        .into_iter()
                        .map(|o| match o.result {
                            Ok(r) => serde_json::json!({ "task": o.task, "receipt": r }),
                            Err(e) => serde_json::json!({ "task": o.task, "error": error_json(&e) }),
                        })
                        .collect();
                    serde_json::json!({ "fired": fired })
                })
            }
            IpcCommand::EnterDay { day } => session
                .enter_day(day)
                .map(|reset| serde_json::json!({ "reset": reset })),
            IpcCommand::Withdraw => session
                .request_withdrawal()
                .map(|n| serde_json::json!({ "withdrawal": n })),
            IpcCommand::Teardown => session
                .teardown_view()
                .map(|c| serde_json::json!({ "cancelled": c })),
        };

        let result = match reply {
            Ok(v) => v,
            Err(e) if e.is_rejection() => serde_json::json!({ "error": error_json(&e) }),
            Err(e) => return Err(e.into()),
        };

        let state = build_ui_state(session, now);
        writeln!(
            stdout,
            "{}",
            serde_json::json!({ "result": result, "state": state })
        )?;
        stdout.flush()?;
    }
    Ok(())
}

fn error_json(e: &SurveyError) -> serde_json::Value {
    serde_json::json!({ "code": e.code(), "message": e.to_string() })
}

fn build_ui_state(session: &SurveySession, now: Millis) -> UiState {
    let mut state = UiState {
        catalog_ready: session.catalog_ready(),
        progress_ready: session.progress_ready(),
        now,
        pending: session.pending_completions().to_vec(),
        ..UiState::default()
    };

    let Ok(progress) = session.progress() else {
        return state;
    };
    let plan = session.active_plan().ok().flatten();

    state.plan = plan.map(|p| p.plan_name.clone());
    state.daily_quota = plan.map(|p| p.daily_survey).unwrap_or(0);
    state.surveys_completed_today = progress.surveys_completed_today;
    state.remaining_quota = session.remaining_quota().unwrap_or(0);
    state.total_earnings = progress.total_earnings;
    state.pending_earnings = progress.pending_earnings;
    state.withdrawal_ready = session.withdrawal_ready().unwrap_or(false);
    state.referrals = Some(progress.referrals.clone());
    state.revision = session.revision().unwrap_or(0);
    state.available = session
        .available_surveys()
        .unwrap_or_default()
        .into_iter()
        .map(|s| SurveyRow {
            id:              s.id.clone(),
            title:           s.title.clone(),
            category:        s.category.clone(),
            reward:          s.reward,
            required_plan:   s.required_plan.clone(),
            question_count:  s.questions.len(),
            times_completed: progress.times_completed(&s.id),
        })
        .collect();
    state
}

fn print_status(session: &SurveySession, day: Day) -> Result<()> {
    let progress = session.progress()?;
    let plan = session.active_plan()?;

    println!("=== PROGRESS ({day}) ===");
    match plan {
        Some(p) => {
            println!("  plan:             {}", p.plan_name);
            println!(
                "  today:            {}/{}",
                progress.surveys_completed_today, p.daily_survey
            );
            println!("  withdraw at:      {:.0}", p.minimum_withdrawal);
        }
        None => println!("  plan:             none (choose a plan to unlock surveys)"),
    }
    println!("  total earnings:   {:.0}", progress.total_earnings);
    println!("  pending earnings: {:.0}", progress.pending_earnings);
    println!("  completed:        {}", progress.completed_surveys.len());
    println!(
        "  referrals:        {} (code {}, earned {:.0})",
        progress.referrals.total_referrals,
        progress.referrals.referral_code,
        progress.referrals.referral_earnings
    );
    if let Some(saved_at) = session.store().progress_saved_at()? {
        println!("  last saved:       {saved_at}");
    }
    if session.withdrawal_ready()? {
        println!("  withdrawal available: run `survey-runner withdraw`");
    }
    Ok(())
}

fn print_plans(session: &SurveySession) -> Result<()> {
    let catalog = session.catalog()?;
    let current = session.active_plan()?.map(|p| p.plan_name.as_str());

    println!("=== PLANS ===");
    for p in &catalog.plans {
        let marker = if Some(p.plan_name.as_str()) == current { "*" } else { " " };
        println!(
            " {marker} {:<9} | {:>2} surveys/day | {:>4.0} per survey | ~{:>6.0}/month | withdraw at {:>5.0} | {}",
            p.plan_name,
            p.daily_survey,
            p.earning_per_survey,
            p.monthly_income,
            p.minimum_withdrawal,
            if p.is_free() { "free".to_string() } else { format!("{:.0}/month", p.price) }
        );
    }
    println!();
    println!(
        "To upgrade, pay the plan price to till {} ({}).",
        catalog.payment_details.till_number, catalog.payment_details.till_name
    );
    Ok(())
}

fn print_surveys(session: &SurveySession) -> Result<()> {
    let progress = session.progress()?;
    let available = session.available_surveys()?;
    let can_start = session.can_start()?;

    println!("=== AVAILABLE SURVEYS ===");
    if available.is_empty() {
        println!("  No surveys available for your current plan. Consider upgrading!");
        return Ok(());
    }
    if !can_start {
        println!("  You've completed all surveys for today! Come back tomorrow.");
    }
    for s in available {
        let done = progress.times_completed(&s.id);
        println!(
            "  {:<4} {:<24} {:>4.0} | {:<8} | {:<6} | {}{}",
            s.id,
            s.title,
            s.reward,
            s.required_plan,
            s.difficulty,
            s.duration,
            if done > 0 { format!(" (done x{done})") } else { String::new() }
        );
    }
    Ok(())
}

fn print_events(session: &SurveySession) -> Result<()> {
    println!("=== RECENT EVENTS ===");
    for e in session.store().recent_events(20)? {
        match e.decode() {
            Ok(event) => println!("  r{:<4} {:<22} {:?}", e.revision, e.event_type, event),
            Err(_) => println!("  r{:<4} {:<22} {} (undecoded)", e.revision, e.event_type, e.payload),
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

/// Arguments that are neither flags nor flag values, program name excluded.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for a in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&a.as_str()) {
            skip_next = true;
        } else if !a.starts_with("--") {
            out.push(a.as_str());
        }
    }
    out
}
