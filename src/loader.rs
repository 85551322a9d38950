use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rusqlite::Connection;
use tracing::info;

use crate::course::{CleanedCourse, RawCourse};
use crate::db;
use crate::normalize::normalize;

pub struct LoadStats {
    pub loaded: usize,
    pub unknown_semester: usize,
    pub unknown_language: usize,
    pub unknown_points: usize,
}

impl LoadStats {
    pub fn print(&self) {
        println!(
            "Loaded {} courses ({} without semester, {} without language, {} without points).",
            self.loaded, self.unknown_semester, self.unknown_language, self.unknown_points,
        );
    }
}

/// Rebuild both relations from `courses`. Nothing from a previous load survives.
pub fn clean_and_load(conn: &Connection, courses: &[RawCourse]) -> Result<LoadStats> {
    let inserted = db::rebuild_raw(conn, courses)?;
    info!("raw_courses: {} rows", inserted);

    let raw = db::fetch_raw(conn)?;
    let cleaned = normalize_all(&raw)?;

    let stats = LoadStats {
        loaded: db::rebuild_cleaned(conn, &cleaned)?,
        unknown_semester: cleaned.iter().filter(|c| c.semester.is_unknown()).count(),
        unknown_language: cleaned.iter().filter(|c| c.language.is_unknown()).count(),
        unknown_points: cleaned.iter().filter(|c| c.points.is_unknown()).count(),
    };
    info!("cleaned_courses: {} rows", stats.loaded);
    Ok(stats)
}

fn normalize_all(raw: &[RawCourse]) -> Result<Vec<CleanedCourse>> {
    let pb = ProgressBar::new(raw.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut cleaned = Vec::with_capacity(raw.len());
    for chunk in raw.chunks(500) {
        cleaned.par_extend(chunk.par_iter().map(normalize));
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CourseFilter;

    fn conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    fn raw(id: u32, semester: &str, language: &str, points: &str) -> RawCourse {
        RawCourse {
            id,
            name_he: format!("קורס {}", id),
            name_en: format!("Course {}", id),
            faculty: "הפקולטה למדעי החברה: כלכלה".into(),
            semester: semester.into(),
            language: language.into(),
            points: points.into(),
            exam_type: "בחינה".into(),
        }
    }

    fn sample() -> Vec<RawCourse> {
        vec![
            raw(11, "סמסטר א", "עברית", "4.0"),
            raw(12, "סמסטר א סמסטר ב", "עברית ואנגלית", "2 נקודות"),
            raw(40, "", "נלמד בערבית", "ללא"),
            RawCourse {
                faculty: "מדעי הרוח".into(),
                ..raw(41, "קיץ", "", " 007 ")
            },
        ]
    }

    #[test]
    fn raw_round_trip_is_exact() {
        let conn = conn();
        let courses = sample();
        clean_and_load(&conn, &courses).unwrap();
        assert_eq!(db::fetch_raw(&conn).unwrap(), courses);
    }

    #[test]
    fn cleaned_rows() {
        let conn = conn();
        let stats = clean_and_load(&conn, &sample()).unwrap();
        assert_eq!(stats.loaded, 4);
        assert_eq!(stats.unknown_semester, 1);
        assert_eq!(stats.unknown_language, 1);
        assert_eq!(stats.unknown_points, 1);

        let rows = db::fetch_cleaned(&conn, &CourseFilter::default()).unwrap();
        let ids: Vec<u32> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![11, 12, 40, 41]);

        assert_eq!(rows[0].faculty.as_deref(), Some("הפקולטה למדעי החברה"));
        assert_eq!(rows[0].semester.as_deref(), Some("A"));
        assert_eq!(rows[0].language.as_deref(), Some("He"));
        assert_eq!(rows[0].points, Some(4.0));

        assert_eq!(rows[1].semester.as_deref(), Some("AB"));
        assert_eq!(rows[1].language.as_deref(), Some("He&En"));

        assert_eq!(rows[2].semester, None);
        assert_eq!(rows[2].language.as_deref(), Some("ערבית"));
        assert_eq!(rows[2].points, None);

        assert_eq!(rows[3].faculty.as_deref(), Some("מדעי הרוח"));
        assert_eq!(rows[3].semester.as_deref(), Some("C"));
        assert_eq!(rows[3].language, None);
        assert_eq!(rows[3].points, Some(7.0));
        assert_eq!(rows[3].exam_type.as_deref(), Some("בחינה"));
    }

    #[test]
    fn reload_is_idempotent() {
        let conn = conn();
        clean_and_load(&conn, &sample()).unwrap();
        let first = db::fetch_cleaned(&conn, &CourseFilter::default()).unwrap();
        clean_and_load(&conn, &sample()).unwrap();
        let second = db::fetch_cleaned(&conn, &CourseFilter::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn reload_drops_previous_rows() {
        let conn = conn();
        clean_and_load(&conn, &sample()).unwrap();
        clean_and_load(&conn, &sample()[..1]).unwrap();
        assert_eq!(db::fetch_raw(&conn).unwrap().len(), 1);
        let s = db::get_stats(&conn).unwrap();
        assert_eq!((s.raw, s.cleaned), (1, 1));
    }

    #[test]
    fn duplicate_ids_fail_the_load() {
        let conn = conn();
        let courses = vec![raw(5, "", "", ""), raw(5, "", "", "")];
        assert!(clean_and_load(&conn, &courses).is_err());
    }

    #[test]
    fn filters() {
        let conn = conn();
        clean_and_load(&conn, &sample()).unwrap();

        let first_semester = CourseFilter {
            semester: Some("A"),
            ..Default::default()
        };
        let ids: Vec<u32> = db::fetch_cleaned(&conn, &first_semester)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![11, 12]);

        let humanities = CourseFilter {
            faculty: Some("מדעי הרוח"),
            limit: Some(5),
            ..Default::default()
        };
        assert_eq!(db::fetch_cleaned(&conn, &humanities).unwrap().len(), 1);

        let s = db::get_stats(&conn).unwrap();
        assert_eq!(s.faculties[0], ("הפקולטה למדעי החברה".to_string(), 3));
    }
}
