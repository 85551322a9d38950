use tracing::warn;

use crate::course::{CleanedCourse, Language, Parsed, RawCourse, Semester};

const FIRST_SEMESTER: &str = "סמסטר א";
const SECOND_SEMESTER: &str = "סמסטר ב";
const YEARLY: &str = "שנתי";
const SUMMER: &str = "קיץ";

const HEBREW: &str = "עברית";
const ENGLISH: &str = "אנגלית";
const TAUGHT_IN: &str = "נלמד ב";

pub fn parse_semester(raw: &str) -> Parsed<Semester> {
    let semester = Semester {
        first: raw.contains(FIRST_SEMESTER),
        second: raw.contains(SECOND_SEMESTER),
        yearly: raw.contains(YEARLY),
        summer: raw.contains(SUMMER),
    };
    if semester.is_empty() {
        Parsed::Unknown
    } else {
        Parsed::Known(semester)
    }
}

/// Hebrew/English markers win; language courses ("נלמד ב<X>") keep X verbatim.
pub fn parse_language(raw: &str) -> Parsed<Language> {
    match (raw.contains(HEBREW), raw.contains(ENGLISH)) {
        (true, true) => return Parsed::Known(Language::HebrewAndEnglish),
        (true, false) => return Parsed::Known(Language::Hebrew),
        (false, true) => return Parsed::Known(Language::English),
        (false, false) => {}
    }
    match raw.split_once(TAUGHT_IN) {
        Some((_, rest)) if !rest.trim().is_empty() => {
            Parsed::Known(Language::Other(rest.trim().to_string()))
        }
        _ => Parsed::Unknown,
    }
}

/// The first numeric token is the credit count, wherever it sits in the text.
pub fn parse_points(raw: &str) -> Parsed<f64> {
    raw.split_whitespace()
        .find_map(|token| token.parse::<f64>().ok())
        .map_or(Parsed::Unknown, Parsed::Known)
}

/// "Faculty: Sub-unit" -> "Faculty".
pub fn parse_faculty(raw: &str) -> String {
    match raw.split_once(':') {
        Some((faculty, _)) => faculty.trim().to_string(),
        None => raw.to_string(),
    }
}

pub fn normalize(raw: &RawCourse) -> CleanedCourse {
    let semester = parse_semester(&raw.semester);
    if semester.is_unknown() {
        warn!("for course number {} ({}) semester not found", raw.id, raw.name_he);
    }
    let language = parse_language(&raw.language);
    if language.is_unknown() {
        warn!("for course number {} ({}) language not found", raw.id, raw.name_he);
    }
    let points = parse_points(&raw.points);
    if points.is_unknown() {
        warn!("for course number {} ({}) credit points not found", raw.id, raw.name_he);
    }

    CleanedCourse {
        id: raw.id,
        name_he: raw.name_he.clone(),
        name_en: raw.name_en.clone(),
        faculty: parse_faculty(&raw.faculty),
        semester,
        language,
        points,
        exam_type: raw.exam_type.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semester_code(raw: &str) -> Option<String> {
        match parse_semester(raw) {
            Parsed::Known(s) => Some(s.to_string()),
            Parsed::Unknown => None,
        }
    }

    #[test]
    fn semester_markers() {
        assert_eq!(semester_code("סמסטר א").as_deref(), Some("A"));
        assert_eq!(semester_code("סמסטר א, סמסטר ב").as_deref(), Some("AB"));
        assert_eq!(semester_code("קיץ").as_deref(), Some("C"));
        assert_eq!(semester_code("שנתי").as_deref(), Some("Y"));
        assert_eq!(semester_code("סמסטר ב או קיץ").as_deref(), Some("BC"));
        assert_eq!(parse_semester(""), Parsed::Unknown);
        assert_eq!(parse_semester("Fall"), Parsed::Unknown);
    }

    #[test]
    fn language_markers() {
        assert_eq!(parse_language("עברית"), Parsed::Known(Language::Hebrew));
        assert_eq!(parse_language("שפת ההוראה: אנגלית"), Parsed::Known(Language::English));
        assert_eq!(
            parse_language("עברית ואנגלית"),
            Parsed::Known(Language::HebrewAndEnglish)
        );
        assert_eq!(
            parse_language("אנגלית, עברית"),
            Parsed::Known(Language::HebrewAndEnglish)
        );
    }

    #[test]
    fn taught_in_keeps_trailing_text() {
        assert_eq!(
            parse_language("נלמד בערבית"),
            Parsed::Known(Language::Other("ערבית".into()))
        );
        assert_eq!(
            parse_language("נלמד ב יידיש "),
            Parsed::Known(Language::Other("יידיש".into()))
        );
        // bare marker carries no language
        assert_eq!(parse_language("נלמד ב"), Parsed::Unknown);
        assert_eq!(parse_language(""), Parsed::Unknown);
        assert_eq!(parse_language("French"), Parsed::Unknown);
    }

    #[test]
    fn hebrew_marker_beats_taught_in() {
        assert_eq!(parse_language("נלמד בעברית"), Parsed::Known(Language::Hebrew));
    }

    #[test]
    fn points_first_numeric_token() {
        assert_eq!(parse_points("4.0 credit hours weekly"), Parsed::Known(4.0));
        assert_eq!(parse_points("נקודות זכות: 2 (שעתיים)"), Parsed::Known(2.0));
        assert_eq!(parse_points("  3  "), Parsed::Known(3.0));
        assert_eq!(parse_points("credit hours"), Parsed::Unknown);
        assert_eq!(parse_points(""), Parsed::Unknown);
    }

    #[test]
    fn faculty_drops_sub_unit() {
        assert_eq!(parse_faculty("Science: Computer Science"), "Science");
        assert_eq!(parse_faculty("Humanities"), "Humanities");
        assert_eq!(parse_faculty(" Law : Public: Int'l"), "Law");
        assert_eq!(parse_faculty(""), "");
    }

    #[test]
    fn normalize_record() {
        let raw = RawCourse {
            id: 11,
            name_he: "מבוא".into(),
            name_en: "Intro".into(),
            faculty: "Science: Computer Science".into(),
            semester: "סמסטר א סמסטר ב".into(),
            language: "לא צוין".into(),
            points: "4.0 credit hours weekly".into(),
            exam_type: "עבודה".into(),
        };
        let c = normalize(&raw);
        assert_eq!(c.id, 11);
        assert_eq!(c.faculty, "Science");
        assert_eq!(
            c.semester,
            Parsed::Known(Semester {
                first: true,
                second: true,
                ..Default::default()
            })
        );
        assert!(c.language.is_unknown());
        assert_eq!(c.points, Parsed::Known(4.0));
        assert_eq!(c.exam_type, "עבודה");
    }
}
