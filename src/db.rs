use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::course::{CleanedCourse, RawCourse};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

// ── Raw ──

/// Drop and recreate `raw_courses`, then insert every course verbatim.
/// All scraped fields are TEXT so nothing gets coerced on the way in.
pub fn rebuild_raw(conn: &Connection, courses: &[RawCourse]) -> Result<usize> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS raw_courses;
        CREATE TABLE raw_courses (
            ID        INTEGER PRIMARY KEY,
            Name_HE   TEXT NOT NULL,
            Name_EN   TEXT NOT NULL,
            Faculty   TEXT NOT NULL,
            Semester  TEXT NOT NULL,
            Language  TEXT NOT NULL,
            Points    TEXT NOT NULL,
            Exam_Type TEXT NOT NULL
        );
        ",
    )?;

    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT INTO raw_courses VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)")?;
        for c in courses {
            count += stmt
                .execute(rusqlite::params![
                    c.id, c.name_he, c.name_en, c.faculty, c.semester, c.language, c.points,
                    c.exam_type,
                ])
                .with_context(|| format!("Failed to insert raw course {}", c.id))?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_raw(conn: &Connection) -> Result<Vec<RawCourse>> {
    let mut stmt = conn.prepare(
        "SELECT ID, Name_HE, Name_EN, Faculty, Semester, Language, Points, Exam_Type
         FROM raw_courses ORDER BY ID",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RawCourse {
                id: row.get(0)?,
                name_he: row.get(1)?,
                name_en: row.get(2)?,
                faculty: row.get(3)?,
                semester: row.get(4)?,
                language: row.get(5)?,
                points: row.get(6)?,
                exam_type: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Cleaned ──

pub fn rebuild_cleaned(conn: &Connection, courses: &[CleanedCourse]) -> Result<usize> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS cleaned_courses;
        CREATE TABLE cleaned_courses (
            ID        INTEGER PRIMARY KEY,
            Name_HE   TEXT NOT NULL,
            Name_EN   TEXT,
            Faculty   TEXT,
            Semester  TEXT,
            Language  TEXT,
            Points    REAL,
            Exam_Type TEXT
        );
        CREATE INDEX idx_cleaned_faculty ON cleaned_courses(Faculty);
        ",
    )?;

    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt =
            tx.prepare("INSERT INTO cleaned_courses VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)")?;
        for c in courses {
            count += stmt
                .execute(rusqlite::params![
                    c.id, c.name_he, c.name_en, c.faculty, c.semester, c.language, c.points,
                    c.exam_type,
                ])
                .with_context(|| format!("Failed to insert cleaned course {}", c.id))?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// A `cleaned_courses` row as stored; unknown values read back as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRow {
    pub id: u32,
    pub name_he: String,
    pub name_en: Option<String>,
    pub faculty: Option<String>,
    pub semester: Option<String>,
    pub language: Option<String>,
    pub points: Option<f64>,
    pub exam_type: Option<String>,
}

#[derive(Debug, Default)]
pub struct CourseFilter<'a> {
    pub faculty: Option<&'a str>,
    /// Courses whose semester code contains this code, e.g. "A" matches "AB".
    pub semester: Option<&'a str>,
    pub limit: Option<usize>,
}

pub fn fetch_cleaned(conn: &Connection, filter: &CourseFilter) -> Result<Vec<CleanedRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(f) = filter.faculty {
        conditions.push(format!("Faculty = ?{}", params.len() + 1));
        params.push(Box::new(f.to_string()));
    }
    if let Some(s) = filter.semester {
        conditions.push(format!("instr(Semester, ?{}) > 0", params.len() + 1));
        params.push(Box::new(s.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    let limit_clause = match filter.limit {
        Some(n) => format!(" LIMIT {}", n),
        None => String::new(),
    };

    let sql = format!(
        "SELECT ID, Name_HE, Name_EN, Faculty, Semester, Language, Points, Exam_Type
         FROM cleaned_courses{} ORDER BY ID{}",
        where_clause, limit_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(CleanedRow {
                id: row.get(0)?,
                name_he: row.get(1)?,
                name_en: row.get(2)?,
                faculty: row.get(3)?,
                semester: row.get(4)?,
                language: row.get(5)?,
                points: row.get(6)?,
                exam_type: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub raw: usize,
    pub cleaned: usize,
    pub unknown_semester: usize,
    pub unknown_language: usize,
    pub unknown_points: usize,
    pub faculties: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> {
        conn.query_row(sql, [], |r| r.get(0))
            .with_context(|| format!("Query failed: {}", sql))
    };
    let raw = count("SELECT COUNT(*) FROM raw_courses")?;
    let cleaned = count("SELECT COUNT(*) FROM cleaned_courses")?;
    let unknown_semester = count("SELECT COUNT(*) FROM cleaned_courses WHERE Semester IS NULL")?;
    let unknown_language = count("SELECT COUNT(*) FROM cleaned_courses WHERE Language IS NULL")?;
    let unknown_points = count("SELECT COUNT(*) FROM cleaned_courses WHERE Points IS NULL")?;

    let mut stmt = conn.prepare(
        "SELECT COALESCE(Faculty, ''), COUNT(*) AS n
         FROM cleaned_courses GROUP BY Faculty ORDER BY n DESC, Faculty LIMIT 10",
    )?;
    let faculties = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stats {
        raw,
        cleaned,
        unknown_semester,
        unknown_language,
        unknown_points,
        faculties,
    })
}
