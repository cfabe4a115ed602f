use std::sync::OnceLock;

use regex::Regex;

use crate::types::{Locale, Perspective};

fn arabic_script() -> &'static Regex {
    static ARABIC: OnceLock<Regex> = OnceLock::new();
    ARABIC.get_or_init(|| {
        Regex::new(
            "[\\u{0600}-\\u{06FF}\\u{0750}-\\u{077F}\\u{08A0}-\\u{08FF}\\u{FB50}-\\u{FDFF}\\u{FE70}-\\u{FEFF}]",
        )
        .expect("arabic script pattern is valid")
    })
}

/// Interpretations are produced in the language the dream was written in.
pub fn detect_locale(dream_text: &str) -> Locale {
    if arabic_script().is_match(dream_text) {
        Locale::Arabic
    } else {
        Locale::English
    }
}

pub fn prompt_for(perspective: Perspective, locale: Locale, dream_text: &str) -> String {
    match (perspective, locale) {
        (Perspective::Religious, Locale::English) => format!(
            "As an Islamic scholar, provide a thoughtful interpretation of this dream \
             according to Islamic tradition and teachings. Focus on spiritual guidance \
             and references to Islamic principles: \"{dream_text}\""
        ),
        (Perspective::Religious, Locale::Arabic) => format!(
            "كعالم إسلامي، قدم تفسيراً مدروساً لهذا الحلم وفقاً للتقاليد والتعاليم \
             الإسلامية. ركز على الإرشاد الروحي والمراجع للمبادئ الإسلامية: \"{dream_text}\""
        ),
        (Perspective::Spiritual, Locale::English) => format!(
            "As a spiritual guide, provide an interpretation of this dream from a \
             universal spiritual perspective, focusing on personal growth, symbolism, \
             and inner wisdom: \"{dream_text}\""
        ),
        (Perspective::Spiritual, Locale::Arabic) => format!(
            "كمرشد روحي، قدم تفسيراً لهذا الحلم من منظور روحي شامل، مع التركيز على \
             النمو الشخصي والرمزية والحكمة الداخلية: \"{dream_text}\""
        ),
        (Perspective::Psychological, Locale::English) => format!(
            "As a psychologist, provide an interpretation of this dream from a \
             psychological perspective, focusing on subconscious processes, emotional \
             patterns, and mental states: \"{dream_text}\""
        ),
        (Perspective::Psychological, Locale::Arabic) => format!(
            "كطبيب نفسي، قدم تفسيراً لهذا الحلم من منظور نفسي، مع التركيز على \
             العمليات اللاوعية والأنماط العاطفية والحالات الذهنية: \"{dream_text}\""
        ),
    }
}
