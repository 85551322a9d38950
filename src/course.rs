use std::fmt;

use rusqlite::types::{ToSql, ToSqlOutput, Value};
use serde::{Deserialize, Serialize};

/// One catalog entry as scraped. Keys match the snapshot document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCourse {
    #[serde(rename = "ID")]
    pub id: u32,
    #[serde(rename = "Name_HE")]
    pub name_he: String,
    #[serde(rename = "Name_EN")]
    pub name_en: String,
    #[serde(rename = "Faculty")]
    pub faculty: String,
    #[serde(rename = "Semester")]
    pub semester: String,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "Points")]
    pub points: String,
    #[serde(rename = "Exam_Type")]
    pub exam_type: String,
}

/// Result of a field parser: either a canonical value or an explicit unknown.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Known(T),
    Unknown,
}

impl<T> Parsed<T> {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Parsed::Unknown)
    }
}

impl<T: ToSql> ToSql for Parsed<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Parsed::Known(v) => v.to_sql(),
            Parsed::Unknown => Ok(ToSqlOutput::Owned(Value::Null)),
        }
    }
}

/// Semesters a course runs in. Rendered as concatenated codes in A, B, Y, C order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Semester {
    pub first: bool,
    pub second: bool,
    pub yearly: bool,
    pub summer: bool,
}

impl Semester {
    pub fn is_empty(&self) -> bool {
        !(self.first || self.second || self.yearly || self.summer)
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes = [
            (self.first, 'A'),
            (self.second, 'B'),
            (self.yearly, 'Y'),
            (self.summer, 'C'),
        ];
        for (present, code) in codes {
            if present {
                write!(f, "{}", code)?;
            }
        }
        Ok(())
    }
}

impl ToSql for Semester {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

/// Teaching language. Courses taught in neither Hebrew nor English keep the
/// language name as written on the site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    Hebrew,
    English,
    HebrewAndEnglish,
    Other(String),
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Hebrew => f.write_str("He"),
            Language::English => f.write_str("En"),
            Language::HebrewAndEnglish => f.write_str("He&En"),
            Language::Other(name) => f.write_str(name),
        }
    }
}

impl ToSql for Language {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanedCourse {
    pub id: u32,
    pub name_he: String,
    pub name_en: String,
    pub faculty: String,
    pub semester: Parsed<Semester>,
    pub language: Parsed<Language>,
    pub points: Parsed<f64>,
    /// Passed through as scraped; no encoding is defined for it yet.
    pub exam_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semester_codes_render_in_fixed_order() {
        let s = Semester {
            summer: true,
            first: true,
            ..Default::default()
        };
        assert_eq!(s.to_string(), "AC");
        assert!(Semester::default().is_empty());
    }

    #[test]
    fn language_codes() {
        assert_eq!(Language::HebrewAndEnglish.to_string(), "He&En");
        assert_eq!(Language::Other("ערבית".into()).to_string(), "ערבית");
    }

    #[test]
    fn raw_course_uses_snapshot_keys() {
        let c = RawCourse {
            id: 11,
            name_he: "מבוא".into(),
            name_en: "Intro".into(),
            faculty: String::new(),
            semester: String::new(),
            language: String::new(),
            points: "2".into(),
            exam_type: String::new(),
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["ID"], 11);
        assert_eq!(v["Name_HE"], "מבוא");
        assert_eq!(v["Exam_Type"], "");
        assert_eq!(v.as_object().unwrap().len(), 8);
    }
}
