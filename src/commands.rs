use crate::{emit_success, OutputMode};
use owo_colors::OwoColorize;
use rollbook::config::{self, RollbookConfig};
use rollbook::grading::RawScores;
use rollbook::ui::{self, section, stats_table, success, summary_row, theme, Icons};
use rollbook::{MessageLog, RecordService, SqliteStore};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct StudentRow {
    #[tabled(rename = "Roll No")]
    rollno: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Grade")]
    grade: String,
}

#[derive(Tabled)]
struct MessageRow {
    #[tabled(rename = "#")]
    id: i64,
    #[tabled(rename = "Sent")]
    timestamp: String,
    #[tabled(rename = "From")]
    fromid: String,
    #[tabled(rename = "To")]
    toid: String,
    #[tabled(rename = "Content")]
    content: String,
}

/// Open the store at the flag path, else the configured one
fn open_store(config: &RollbookConfig, database: Option<PathBuf>) -> anyhow::Result<(SqliteStore, PathBuf)> {
    let path = database.unwrap_or_else(|| config.database_path());
    config::ensure_db_dir(&path)?;
    tracing::debug!("Opening database {}", path.display());
    let store = SqliteStore::open(&path)?;
    Ok((store, path))
}

pub fn run_init(
    output_mode: OutputMode,
    path: &Path,
    database: Option<PathBuf>,
    port: Option<u16>,
    seed: bool,
    force: bool,
) -> anyhow::Result<()> {
    let settings = RollbookConfig {
        database: Some(
            database
                .unwrap_or_else(|| config::default_database_path_in(Path::new(".")))
                .to_string_lossy()
                .to_string(),
        ),
        port: Some(port.unwrap_or(config::DEFAULT_PORT)),
        seed: Some(seed),
    };
    config::write_config(path, &settings, force)?;

    if output_mode.is_human() {
        success(&format!("Wrote {}", path.display()));
        summary_row("database", &settings.database_path().display().to_string());
        summary_row("port", &settings.port().to_string());
        summary_row("seed", &settings.seed().to_string());
    } else {
        emit_success(output_mode, "init", serde_json::to_value(&settings)?)?;
    }
    Ok(())
}

pub fn run_serve(
    output_mode: OutputMode,
    config: &RollbookConfig,
    database: Option<PathBuf>,
    port: Option<u16>,
    seed: bool,
) -> anyhow::Result<()> {
    let (mut store, path) = open_store(config, database)?;
    let port = port.unwrap_or_else(|| config.port());

    if seed || config.seed() {
        rollbook::seed::seed_sample_data(&mut store)?;
    }

    if output_mode.is_human() {
        ui::header("Rollbook API");
        ui::info("Database", &path.display().to_string());
    } else {
        emit_success(
            output_mode,
            "serve",
            serde_json::json!({ "database": path, "port": port }),
        )?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(rollbook::server::start_server(port, store, path))
}

pub fn run_seed(output_mode: OutputMode, config: &RollbookConfig, database: Option<PathBuf>) -> anyhow::Result<()> {
    let (mut store, _) = open_store(config, database)?;
    let seeded = rollbook::seed::seed_sample_data(&mut store)?;

    if output_mode.is_human() {
        if seeded {
            success("Seeded sample students");
        } else {
            ui::warn("Database already has students; nothing seeded");
        }
    } else {
        emit_success(output_mode, "seed", serde_json::json!({ "seeded": seeded }))?;
    }
    Ok(())
}

pub fn run_students(output_mode: OutputMode, config: &RollbookConfig, database: Option<PathBuf>) -> anyhow::Result<()> {
    let (mut store, _) = open_store(config, database)?;
    let students = RecordService::new(&mut store).list_students()?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "students", serde_json::to_value(&students)?);
    }

    if students.is_empty() {
        println!("{} No students yet.", Icons::BOOK);
        return Ok(());
    }

    let rows: Vec<StudentRow> = students
        .into_iter()
        .map(|row| {
            let (avg, grade) = match &row.marks {
                Some(m) => (
                    format!("{:.2}", m.avg()),
                    m.grade().style(theme().grade(m.grade())).to_string(),
                ),
                None => ("-".to_string(), "-".to_string()),
            };
            StudentRow {
                rollno: row.student.rollno,
                name: row.student.name,
                class: format!("{}{}", row.student.class, row.student.section),
                avg,
                grade,
            }
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

pub fn run_show(
    output_mode: OutputMode,
    config: &RollbookConfig,
    database: Option<PathBuf>,
    rollno: &str,
) -> anyhow::Result<()> {
    let (mut store, _) = open_store(config, database)?;
    let record = RecordService::new(&mut store).get_student_record(rollno)?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "show", serde_json::to_value(&record)?);
    }

    let student = &record.student;
    println!("{} {} ({})", Icons::PERSON, student.name.bold(), student.rollno);
    summary_row("Class", &format!("{} {}", student.class, student.section));
    summary_row("DOB", &student.dob);
    summary_row("Faculty", &student.handlingfaculty);

    section("Marks");
    match &record.marks {
        Some(marks) => {
            let s = marks.scores();
            for (subject, score) in [
                ("Tamil", s.tamil),
                ("English", s.english),
                ("Maths", s.maths),
                ("Science", s.science),
                ("Social", s.social),
            ] {
                summary_row(subject, &score.to_string());
            }
            summary_row(
                "Average",
                &format!(
                    "{:.2} ({})",
                    marks.avg(),
                    marks.grade().style(theme().grade(marks.grade()))
                ),
            );
        }
        None => println!("  {}", ui::muted("no marks recorded")),
    }

    section("Parents");
    match &record.parents {
        Some(parents) => {
            summary_row("Name", &parents.parentsname);
            summary_row(Icons::PHONE, &parents.phonenumber);
            summary_row(Icons::MAIL, &parents.emailid);
            summary_row("Address", &parents.address);
        }
        None => println!("  {}", ui::muted("no guardian on file")),
    }
    Ok(())
}

pub fn run_marks(
    output_mode: OutputMode,
    config: &RollbookConfig,
    database: Option<PathBuf>,
    rollno: &str,
    scores: &[String],
) -> anyhow::Result<()> {
    let (mut store, _) = open_store(config, database)?;

    let score = |i: usize| {
        scores
            .get(i)
            .map(|s| serde_json::Value::String(s.clone()))
            .unwrap_or(serde_json::Value::Null)
    };
    let raw = RawScores {
        tamil: score(0),
        english: score(1),
        maths: score(2),
        science: score(3),
        social: score(4),
    };

    let summary = RecordService::new(&mut store).upsert_marks_record(rollno, &raw)?;

    if output_mode.is_human() {
        success(&format!(
            "Marks saved for {}: average {:.2}, grade {}",
            rollno,
            summary.avg,
            summary.grade.style(theme().grade(summary.grade))
        ));
    } else {
        emit_success(output_mode, "marks", serde_json::to_value(summary)?)?;
    }
    Ok(())
}

pub fn run_messages(
    output_mode: OutputMode,
    config: &RollbookConfig,
    database: Option<PathBuf>,
    rollno: &str,
) -> anyhow::Result<()> {
    let (mut store, _) = open_store(config, database)?;
    let messages = MessageLog::new(&mut store).list_for_student(rollno)?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "messages", serde_json::to_value(&messages)?);
    }

    if messages.is_empty() {
        println!("{} No messages for {}.", Icons::MAIL, rollno);
        return Ok(());
    }

    let rows: Vec<MessageRow> = messages
        .into_iter()
        .map(|m| MessageRow {
            id: m.id,
            timestamp: m.timestamp,
            fromid: m.fromid,
            toid: m.toid,
            content: m.content,
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    Ok(())
}

pub fn run_stats(output_mode: OutputMode, config: &RollbookConfig, database: Option<PathBuf>) -> anyhow::Result<()> {
    let (store, path) = open_store(config, database)?;
    let stats = store.stats()?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "stats", serde_json::to_value(&stats)?);
    }

    println!("{} Rollbook Statistics ({})", Icons::STATS, ui::dim(&path.display().to_string()));
    let students = stats.students.to_string();
    let marks = stats.marks.to_string();
    let parents = stats.parents.to_string();
    let messages = stats.messages.to_string();
    println!(
        "{}",
        stats_table(&[
            ("Students", &students),
            ("Marks", &marks),
            ("Parents", &parents),
            ("Messages", &messages),
        ])
    );
    Ok(())
}
