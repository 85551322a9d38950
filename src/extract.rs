use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::course::RawCourse;

fn div_class(class: &str) -> Selector {
    Selector::parse(&format!("div.{}", class)).unwrap()
}

static NAME_HE: LazyLock<Selector> = LazyLock::new(|| div_class("data-course-title"));
static NAME_EN: LazyLock<Selector> = LazyLock::new(|| div_class("data-course-title-en"));
static FACULTY: LazyLock<Selector> = LazyLock::new(|| div_class("data-school"));
static SEMESTER: LazyLock<Selector> = LazyLock::new(|| div_class("additional-data-semester"));
static LANGUAGE: LazyLock<Selector> = LazyLock::new(|| div_class("additional-data-language"));
static POINTS: LazyLock<Selector> =
    LazyLock::new(|| div_class("additional-data-student-points"));
static EXAM_TYPE: LazyLock<Selector> = LazyLock::new(|| div_class("additional-data-test"));

/// The seven text fields of a course page. Missing elements are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub name_he: String,
    pub name_en: String,
    pub faculty: String,
    pub semester: String,
    pub language: String,
    pub points: String,
    pub exam_type: String,
}

impl RawFields {
    /// A page is a real catalog entry iff it carries a Hebrew title.
    /// The endpoint answers 200 for every number, so status alone says nothing.
    pub fn into_course(self, id: u32) -> Option<RawCourse> {
        if self.name_he.is_empty() {
            return None;
        }
        Some(RawCourse {
            id,
            name_he: self.name_he,
            name_en: self.name_en,
            faculty: self.faculty,
            semester: self.semester,
            language: self.language,
            points: self.points,
            exam_type: self.exam_type,
        })
    }
}

pub fn extract(html: &str) -> RawFields {
    let doc = Html::parse_document(html);
    RawFields {
        name_he: first_text(&doc, &NAME_HE),
        name_en: first_text(&doc, &NAME_EN),
        faculty: first_text(&doc, &FACULTY),
        semester: first_text(&doc, &SEMESTER),
        language: first_text(&doc, &LANGUAGE),
        points: first_text(&doc, &POINTS),
        exam_type: first_text(&doc, &EXAM_TYPE),
    }
}

fn first_text(doc: &Html, selector: &Selector) -> String {
    doc.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
